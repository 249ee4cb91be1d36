mod schema;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

/// Rejections the API exposes to clients as-is. Everything else from the
/// store is an internal error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Comment text must not be empty")]
    EmptyText,

    #[error("Parent comment {0} not found on this board")]
    UnknownParent(CommentId),

    #[error("Comment {0} not found")]
    NotFound(CommentId),

    #[error("Only the author can modify comment {0}")]
    NotAuthor(CommentId),
}

/// A persisted attachment with its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_id: FileId,
    pub comment_id: CommentId,
    pub display_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "comment-board")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("comments.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // Reply and file cleanup rely on ON DELETE CASCADE
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Comment queries
    // ============================================================

    /// All comments on a board in creation order, with their attachments.
    pub fn get_comments(&self, board_id: BoardId) -> Result<Vec<CommentRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let mut files_by_comment: HashMap<CommentId, Vec<AttachedFile>> = HashMap::new();
        let mut stmt = conn.prepare(
            "SELECT f.comment_id, f.id, f.display_name
             FROM comment_files f JOIN comments c ON c.id = f.comment_id
             WHERE c.board_id = ? ORDER BY f.comment_id, f.position",
        )?;
        let rows = stmt.query_map([board_id], |row| {
            Ok((
                row.get::<_, CommentId>(0)?,
                AttachedFile {
                    file_id: row.get(1)?,
                    display_name: row.get(2)?,
                },
            ))
        })?;
        for row in rows {
            let (comment_id, file) = row?;
            files_by_comment.entry(comment_id).or_default().push(file);
        }

        let mut stmt = conn.prepare(
            "SELECT id, board_id, parent_id, author_id, text, created_at, updated_at
             FROM comments WHERE board_id = ? ORDER BY id",
        )?;
        let comments = stmt
            .query_map([board_id], row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|mut comment| {
                comment.attached_files = files_by_comment.remove(&comment.id).unwrap_or_default();
                comment
            })
            .collect();

        Ok(comments)
    }

    pub fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        load_comment(&conn, id)
    }

    // ============================================================
    // Comment mutations
    // ============================================================

    pub fn create_comment(
        &self,
        board_id: BoardId,
        author_id: &str,
        input: CreateCommentInput,
    ) -> Result<CommentRecord> {
        let text = validate_text(&input.text)?;

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        if let Some(parent_id) = input.parent_id {
            let parent_board: Option<BoardId> = tx
                .query_row(
                    "SELECT board_id FROM comments WHERE id = ?",
                    [parent_id],
                    |row| row.get(0),
                )
                .optional()?;
            if parent_board != Some(board_id) {
                return Err(StoreError::UnknownParent(parent_id).into());
            }
        }

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO comments (board_id, parent_id, author_id, text, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (board_id, input.parent_id, author_id, &text, &now, &now),
        )?;
        let id = tx.last_insert_rowid();
        insert_files(&tx, id, 0, &input.new_files)?;

        let comment = load_comment(&tx, id)?
            .ok_or_else(|| anyhow::anyhow!("Comment {} vanished after insert", id))?;
        tx.commit()?;

        tracing::debug!(board_id, comment_id = id, "Created comment");
        Ok(comment)
    }

    /// Replace a comment's text and attachments.
    ///
    /// Persisted files not named in `keep_file_ids` are deleted; new files are
    /// appended after the kept ones.
    pub fn update_comment(
        &self,
        board_id: BoardId,
        id: CommentId,
        actor_id: &str,
        input: UpdateCommentInput,
    ) -> Result<CommentRecord> {
        let text = validate_text(&input.text)?;

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let existing = load_comment(&tx, id)?
            .filter(|c| c.board_id == board_id)
            .ok_or(StoreError::NotFound(id))?;
        if !existing.is_authored_by(actor_id) {
            return Err(StoreError::NotAuthor(id).into());
        }

        let keep: HashSet<&str> = input.keep_file_ids.iter().map(String::as_str).collect();
        for file in &existing.attached_files {
            if !keep.contains(file.file_id.as_str()) {
                tx.execute("DELETE FROM comment_files WHERE id = ?", [&file.file_id])?;
            }
        }

        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM comment_files WHERE comment_id = ?",
            [id],
            |row| row.get(0),
        )?;
        insert_files(&tx, id, next_position, &input.new_files)?;

        tx.execute(
            "UPDATE comments SET text = ?, updated_at = ? WHERE id = ?",
            (&text, Utc::now().to_rfc3339(), id),
        )?;

        let comment = load_comment(&tx, id)?
            .ok_or_else(|| anyhow::anyhow!("Comment {} vanished during update", id))?;
        tx.commit()?;

        tracing::debug!(board_id, comment_id = id, "Updated comment");
        Ok(comment)
    }

    /// Delete a comment together with its replies and their files.
    pub fn delete_comment(&self, board_id: BoardId, id: CommentId, actor_id: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let author: Option<String> = conn
            .query_row(
                "SELECT author_id FROM comments WHERE id = ? AND board_id = ?",
                (id, board_id),
                |row| row.get(0),
            )
            .optional()?;
        match author {
            None => return Err(StoreError::NotFound(id).into()),
            Some(author) if author != actor_id => return Err(StoreError::NotAuthor(id).into()),
            Some(_) => {}
        }

        conn.execute("DELETE FROM comments WHERE id = ?", [id])?;
        tracing::debug!(board_id, comment_id = id, "Deleted comment");
        Ok(())
    }

    // ============================================================
    // Files
    // ============================================================

    pub fn get_file(&self, file_id: &str) -> Result<Option<StoredFile>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let file = conn
            .query_row(
                "SELECT id, comment_id, display_name, content_type, data
                 FROM comment_files WHERE id = ?",
                [file_id],
                |row| {
                    Ok(StoredFile {
                        file_id: row.get(0)?,
                        comment_id: row.get(1)?,
                        display_name: row.get(2)?,
                        content_type: row.get(3)?,
                        data: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(file)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn validate_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyText.into());
    }
    Ok(trimmed.to_string())
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        board_id: row.get(1)?,
        parent_id: row.get(2)?,
        author_id: row.get(3)?,
        text: row.get(4)?,
        attached_files: Vec::new(),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn load_comment(conn: &Connection, id: CommentId) -> Result<Option<CommentRecord>> {
    let comment = conn
        .query_row(
            "SELECT id, board_id, parent_id, author_id, text, created_at, updated_at
             FROM comments WHERE id = ?",
            [id],
            row_to_comment,
        )
        .optional()?;

    let Some(mut comment) = comment else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, display_name FROM comment_files WHERE comment_id = ? ORDER BY position",
    )?;
    comment.attached_files = stmt
        .query_map([id], |row| {
            Ok(AttachedFile {
                file_id: row.get(0)?,
                display_name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(comment))
}

fn insert_files(
    conn: &Connection,
    comment_id: CommentId,
    first_position: i64,
    files: &[NewFile],
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    for (offset, file) in files.iter().enumerate() {
        conn.execute(
            "INSERT INTO comment_files (id, comment_id, display_name, content_type, data, position, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                comment_id,
                &file.name,
                &file.content_type,
                &file.data,
                first_position + offset as i64,
                &now,
            ),
        )?;
    }
    Ok(())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
