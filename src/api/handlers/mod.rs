use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};

use super::ACTOR_HEADER;
use crate::db::{Database, StoreError};
use crate::models::*;
use crate::tree::{build_tree, forest_to_json};

// ============================================================
// Error Handling
// ============================================================

/// Map a store error to a response.
///
/// [`StoreError`] rejections are exposed to the client with a matching
/// status. Anything else is logged server-side and returned as a generic
/// message to avoid leaking internal details.
fn store_error(e: anyhow::Error) -> (StatusCode, String) {
    if let Some(rejection) = e.downcast_ref::<StoreError>() {
        let status = match rejection {
            StoreError::EmptyText | StoreError::UnknownParent(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::NotAuthor(_) => StatusCode::FORBIDDEN,
        };
        tracing::warn!("Rejected: {}", rejection);
        return (status, rejection.to_string());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Actor
// ============================================================

/// The acting user, taken from the `X-Actor-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub ActorId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Actor(v.to_string()))
            .ok_or((
                StatusCode::UNAUTHORIZED,
                format!("Missing {} header", ACTOR_HEADER),
            ))
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Comments
// ============================================================

pub async fn list_comments(
    State(db): State<Database>,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Vec<CommentRecord>>, (StatusCode, String)> {
    db.get_comments(board_id).map(Json).map_err(store_error)
}

pub async fn get_comment_tree(
    State(db): State<Database>,
    Path(board_id): Path<BoardId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let comments = db.get_comments(board_id).map_err(store_error)?;
    let body = forest_to_json(&build_tree(&comments)).map_err(|e| store_error(e.into()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

pub async fn create_comment(
    State(db): State<Database>,
    Path(board_id): Path<BoardId>,
    Actor(actor): Actor,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<CommentRecord>), (StatusCode, String)> {
    db.create_comment(board_id, &actor, input)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(store_error)
}

pub async fn update_comment(
    State(db): State<Database>,
    Path((board_id, id)): Path<(BoardId, CommentId)>,
    Actor(actor): Actor,
    Json(input): Json<UpdateCommentInput>,
) -> Result<Json<CommentRecord>, (StatusCode, String)> {
    db.update_comment(board_id, id, &actor, input)
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_comment(
    State(db): State<Database>,
    Path((board_id, id)): Path<(BoardId, CommentId)>,
    Actor(actor): Actor,
) -> Result<StatusCode, (StatusCode, String)> {
    db.delete_comment(board_id, id, &actor)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

// ============================================================
// Files
// ============================================================

pub async fn download_file(
    State(db): State<Database>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let file = db
        .get_file(&file_id)
        .map_err(store_error)?
        .ok_or((StatusCode::NOT_FOUND, "File not found".to_string()))?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        file.display_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    ))
}
