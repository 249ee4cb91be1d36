use serde::Serialize;

use crate::models::CommentId;

/// Edit/reply state of a board view. Editing and replying are mutually
/// exclusive across the whole board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "comment_id", rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Editing(CommentId),
    Replying(CommentId),
}

impl Mode {
    pub fn editing_id(&self) -> Option<CommentId> {
        match self {
            Self::Editing(id) => Some(*id),
            _ => None,
        }
    }

    pub fn reply_target_id(&self) -> Option<CommentId> {
        match self {
            Self::Replying(id) => Some(*id),
            _ => None,
        }
    }

    /// The comment this mode is attached to, if any.
    pub fn target(&self) -> Option<CommentId> {
        match self {
            Self::Idle => None,
            Self::Editing(id) | Self::Replying(id) => Some(*id),
        }
    }
}
