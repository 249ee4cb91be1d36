use comment_board::db::{Database, StoreError};
use comment_board::models::*;
use speculate2::speculate;

fn post(
    db: &Database,
    board: BoardId,
    author: &str,
    text: &str,
    parent_id: Option<CommentId>,
) -> CommentRecord {
    db.create_comment(
        board,
        author,
        CreateCommentInput {
            text: text.to_string(),
            parent_id,
            ..Default::default()
        },
    )
    .expect("Failed to create comment")
}

fn png(name: &str) -> NewFile {
    NewFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
}

fn store_error(e: anyhow::Error) -> StoreError {
    e.downcast::<StoreError>().expect("Expected a StoreError")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "create_comment" {
        it "creates a top-level comment" {
            let comment = post(&db, 1, "alice", "Hello", None);

            assert_eq!(comment.board_id, 1);
            assert_eq!(comment.author_id, "alice");
            assert_eq!(comment.text, "Hello");
            assert!(comment.parent_id.is_none());
            assert!(comment.attached_files.is_empty());
        }

        it "trims the stored text" {
            let comment = post(&db, 1, "alice", "  spaced out \n", None);
            assert_eq!(comment.text, "spaced out");
        }

        it "rejects blank text" {
            let err = db.create_comment(1, "alice", CreateCommentInput {
                text: "   ".to_string(),
                ..Default::default()
            }).unwrap_err();

            assert_eq!(store_error(err), StoreError::EmptyText);
        }

        it "creates a reply under an existing parent" {
            let parent = post(&db, 1, "alice", "Parent", None);
            let reply = post(&db, 1, "bob", "Reply", Some(parent.id));

            assert_eq!(reply.parent_id, Some(parent.id));
        }

        it "rejects a parent from another board" {
            let elsewhere = post(&db, 2, "alice", "Other board", None);
            let err = db.create_comment(1, "bob", CreateCommentInput {
                text: "Reply".to_string(),
                parent_id: Some(elsewhere.id),
                ..Default::default()
            }).unwrap_err();

            assert_eq!(store_error(err), StoreError::UnknownParent(elsewhere.id));
        }

        it "stores new files in order" {
            let comment = db.create_comment(1, "alice", CreateCommentInput {
                text: "With files".to_string(),
                new_files: vec![png("a.png"), png("b.png")],
                ..Default::default()
            }).expect("Failed to create");

            let names: Vec<_> = comment.attached_files.iter().map(|f| f.display_name.as_str()).collect();
            assert_eq!(names, vec!["a.png", "b.png"]);

            let stored = db.get_file(&comment.attached_files[0].file_id)
                .expect("Query failed")
                .expect("File missing");
            assert_eq!(stored.content_type, "image/png");
            assert_eq!(stored.data, vec![0x89, 0x50, 0x4e, 0x47]);
            assert_eq!(stored.comment_id, comment.id);
        }
    }

    describe "get_comments" {
        it "returns empty list for an unknown board" {
            assert!(db.get_comments(42).expect("Query failed").is_empty());
        }

        it "returns only the board's comments in creation order" {
            let first = post(&db, 1, "alice", "First", None);
            post(&db, 2, "alice", "Elsewhere", None);
            let second = post(&db, 1, "bob", "Second", Some(first.id));

            let comments = db.get_comments(1).expect("Query failed");
            let ids: Vec<_> = comments.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![first.id, second.id]);
        }

        it "includes attachments per comment" {
            db.create_comment(1, "alice", CreateCommentInput {
                text: "Files".to_string(),
                new_files: vec![png("a.png")],
                ..Default::default()
            }).expect("Failed to create");
            post(&db, 1, "bob", "No files", None);

            let comments = db.get_comments(1).expect("Query failed");
            assert_eq!(comments[0].attached_files.len(), 1);
            assert!(comments[1].attached_files.is_empty());
        }
    }

    describe "update_comment" {
        it "replaces text for the author" {
            let comment = post(&db, 1, "alice", "Draft", None);
            let updated = db.update_comment(1, comment.id, "alice", UpdateCommentInput {
                text: "Final".to_string(),
                ..Default::default()
            }).expect("Failed to update");

            assert_eq!(updated.text, "Final");
            assert!(updated.updated_at >= comment.updated_at);
        }

        it "refuses other actors" {
            let comment = post(&db, 1, "alice", "Mine", None);
            let err = db.update_comment(1, comment.id, "mallory", UpdateCommentInput {
                text: "Hijacked".to_string(),
                ..Default::default()
            }).unwrap_err();

            assert_eq!(store_error(err), StoreError::NotAuthor(comment.id));
            let unchanged = db.get_comment(comment.id).expect("Query failed").expect("Missing");
            assert_eq!(unchanged.text, "Mine");
        }

        it "reports missing comments" {
            let err = db.update_comment(1, 999, "alice", UpdateCommentInput {
                text: "Nope".to_string(),
                ..Default::default()
            }).unwrap_err();

            assert_eq!(store_error(err), StoreError::NotFound(999));
        }

        it "keeps only listed files and appends new ones" {
            let comment = db.create_comment(1, "alice", CreateCommentInput {
                text: "Files".to_string(),
                new_files: vec![png("a.png"), png("b.png")],
                ..Default::default()
            }).expect("Failed to create");
            let keep = comment.attached_files[1].file_id.clone();
            let dropped = comment.attached_files[0].file_id.clone();

            let updated = db.update_comment(1, comment.id, "alice", UpdateCommentInput {
                text: "Files v2".to_string(),
                keep_file_ids: vec![keep.clone()],
                new_files: vec![png("c.png")],
                ..Default::default()
            }).expect("Failed to update");

            let names: Vec<_> = updated.attached_files.iter().map(|f| f.display_name.as_str()).collect();
            assert_eq!(names, vec!["b.png", "c.png"]);
            assert_eq!(updated.attached_files[0].file_id, keep);
            assert!(db.get_file(&dropped).expect("Query failed").is_none());
        }
    }

    describe "delete_comment" {
        it "deletes replies and their files with the parent" {
            let parent = post(&db, 1, "alice", "Parent", None);
            let reply = db.create_comment(1, "bob", CreateCommentInput {
                text: "Reply".to_string(),
                parent_id: Some(parent.id),
                new_files: vec![png("r.png")],
                ..Default::default()
            }).expect("Failed to create");
            let other = post(&db, 1, "carol", "Unrelated", None);

            db.delete_comment(1, parent.id, "alice").expect("Failed to delete");

            let ids: Vec<_> = db.get_comments(1).expect("Query failed").iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![other.id]);
            assert!(db.get_file(&reply.attached_files[0].file_id).expect("Query failed").is_none());
        }

        it "refuses other actors" {
            let comment = post(&db, 1, "alice", "Mine", None);
            let err = db.delete_comment(1, comment.id, "bob").unwrap_err();

            assert_eq!(store_error(err), StoreError::NotAuthor(comment.id));
            assert!(db.get_comment(comment.id).expect("Query failed").is_some());
        }

        it "reports comments on another board as missing" {
            let comment = post(&db, 1, "alice", "Mine", None);
            let err = db.delete_comment(2, comment.id, "alice").unwrap_err();

            assert_eq!(store_error(err), StoreError::NotFound(comment.id));
        }
    }

    describe "open" {
        it "persists to disk across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("comments.db");

            let first = Database::open(path.clone()).expect("Failed to open");
            first.migrate().expect("Failed to migrate");
            post(&first, 1, "alice", "Persisted", None);
            drop(first);

            let second = Database::open(path).expect("Failed to reopen");
            second.migrate().expect("Failed to migrate");
            let comments = second.get_comments(1).expect("Query failed");
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].text, "Persisted");
        }
    }
}
