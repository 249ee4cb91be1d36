//! Collaborator boundary between the session controller and the server.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BoardId, CommentId, CommentRecord, CreateCommentInput, UpdateCommentInput};

/// Fetch and mutation requests for comment boards.
///
/// Implementations never retry; retry is always a user re-submission.
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Full flat list of a board's comments, in server order.
    async fn fetch_comments(&self, board: BoardId) -> Result<Vec<CommentRecord>>;

    async fn create_comment(
        &self,
        board: BoardId,
        input: CreateCommentInput,
    ) -> Result<CommentRecord>;

    async fn update_comment(
        &self,
        board: BoardId,
        id: CommentId,
        input: UpdateCommentInput,
    ) -> Result<CommentRecord>;

    async fn delete_comment(&self, board: BoardId, id: CommentId) -> Result<()>;
}
