//! Error taxonomy for comment mutations and fetches.

use thiserror::Error;

/// Failure of a comment fetch or mutation, as seen by the session controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommentError {
    /// The request was rejected as malformed (empty text, unknown parent,
    /// unsupported paste). Empty text is normally caught before any request.
    #[error("Invalid comment: {0}")]
    Validation(String),

    /// The actor may not modify this comment. Decided by the server.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Network or server failure.
    #[error("Request failed: {0}")]
    Transport(String),
}

impl CommentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

pub type Result<T, E = CommentError> = std::result::Result<T, E>;
