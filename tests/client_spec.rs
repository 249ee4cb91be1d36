//! HTTP client specs against a live server on an ephemeral port.

use std::sync::Arc;

use comment_board::api::{create_router, create_router_with_security, SecurityConfig};
use comment_board::client::{ClientError, HttpCommentService};
use comment_board::db::Database;
use comment_board::error::CommentError;
use comment_board::models::*;
use comment_board::service::CommentService;
use comment_board::session::{LogNotifier, Mode, Outcome, SessionController};
use comment_board::sync::FetchStatus;

async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server crashed");
    });
    format!("http://{}/api/v1", addr)
}

async fn start() -> String {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    spawn_server(create_router(db)).await
}

fn session_for(client: HttpCommentService, board: BoardId) -> SessionController {
    SessionController::new(board, Arc::new(client), Arc::new(LogNotifier::new(true)))
}

#[tokio::test]
async fn health_check_succeeds() {
    let url = start().await;
    let client = HttpCommentService::new(url, None, "alice");

    client.health().await.expect("Health check failed");
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let url = start().await;
    let client = HttpCommentService::new(format!("{}/", url), None, "alice");

    let comments = client.list_comments(1).await.expect("List failed");
    assert!(comments.is_empty());
}

#[tokio::test]
async fn session_round_trip_over_http() {
    let url = start().await;
    let mut alice = session_for(HttpCommentService::new(url.clone(), None, "alice"), 5);
    let mut bob = session_for(HttpCommentService::new(url, None, "bob"), 5);

    let root = alice
        .create_comment("Release notes draft")
        .await
        .applied()
        .expect("Create failed");

    assert_eq!(bob.refresh().await, Outcome::Applied(()));
    bob.start_reply(root.id);
    assert!(bob.paste_image("diagram.png", "image/png", vec![7, 7, 7]));
    let reply = bob
        .submit_reply("Looks good")
        .await
        .applied()
        .expect("Reply failed");

    assert_eq!(bob.mode(), Mode::Idle);
    assert_eq!(bob.fetch_status(), FetchStatus::Succeeded);
    assert_eq!(bob.tree().len(), 1);
    assert_eq!(bob.tree()[0].children[0].id(), reply.id);
    assert_eq!(reply.attached_files.len(), 1);

    // Alice's view is stale until she refetches
    assert_eq!(alice.refresh().await, Outcome::Skipped);
    assert_eq!(alice.records().len(), 1);
}

#[tokio::test]
async fn edit_keeps_and_drops_files_over_http() {
    let url = start().await;
    let client = HttpCommentService::new(url.clone(), None, "alice");
    let created = client
        .post_comment(
            1,
            &CreateCommentInput {
                text: "Two files".to_string(),
                new_files: vec![
                    NewFile::new("a.png", "image/png", vec![1]),
                    NewFile::new("b.png", "image/png", vec![2]),
                ],
                ..Default::default()
            },
        )
        .await
        .expect("Create failed");
    let kept = created.attached_files[1].file_id.clone();

    let mut session = session_for(HttpCommentService::new(url, None, "alice"), 1);
    session.refresh().await;
    session.start_edit(created.id);
    session.remove_file(&FileKey::Persisted(created.attached_files[0].file_id.clone()));
    let keep = session.kept_file_ids();
    assert_eq!(keep, vec![kept.clone()]);

    let updated = session
        .save_edit("One file", keep)
        .await
        .applied()
        .expect("Save failed");

    assert_eq!(updated.text, "One file");
    assert_eq!(updated.attached_files.len(), 1);
    assert_eq!(client.download_file(&kept).await.expect("Download failed"), vec![2]);
    assert!(matches!(
        client.download_file(&created.attached_files[0].file_id).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn editing_someone_elses_comment_is_a_permission_error() {
    let url = start().await;
    let alice = HttpCommentService::new(url.clone(), None, "alice");
    let root = alice
        .post_comment(1, &CreateCommentInput {
            text: "Mine".to_string(),
            ..Default::default()
        })
        .await
        .expect("Create failed");

    let mut mallory = session_for(HttpCommentService::new(url, None, "mallory"), 1);
    mallory.refresh().await;
    mallory.start_edit(root.id);
    let outcome = mallory.save_edit("Hijacked", Vec::new()).await;

    assert!(matches!(outcome, Outcome::Failed(CommentError::Permission(_))));
    assert_eq!(mallory.mode(), Mode::Editing(root.id));
}

#[tokio::test]
async fn unknown_parent_is_a_validation_error() {
    let url = start().await;
    let client = HttpCommentService::new(url, None, "alice");

    let err = client
        .create_comment(1, CreateCommentInput {
            text: "Orphan".to_string(),
            parent_id: Some(999),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CommentError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_missing_comment_is_a_validation_error() {
    let url = start().await;
    let client = HttpCommentService::new(url, None, "alice");

    let err = client.delete_comment(1, 42).await.unwrap_err();

    assert!(matches!(err, CommentError::Validation(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = HttpCommentService::new("http://127.0.0.1:1/api/v1", None, "alice");

    let err = client.fetch_comments(1).await.unwrap_err();

    assert!(matches!(err, CommentError::Transport(_)));
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let url = spawn_server(create_router_with_security(
        db,
        SecurityConfig::with_api_key("s3cret"),
    ))
    .await;

    let anonymous = HttpCommentService::new(url.clone(), None, "alice");
    assert!(matches!(
        anonymous.list_comments(1).await,
        Err(ClientError::Unauthorized)
    ));

    let authorized = HttpCommentService::new(url, Some("s3cret".to_string()), "alice");
    authorized.list_comments(1).await.expect("Authorized list failed");
}
