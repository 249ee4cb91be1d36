use crate::error::CommentError;
use crate::models::{CommentId, CommentRecord, CreateCommentInput, UpdateCommentInput};

/// A mutation request ready to send to the comment service.
#[derive(Debug, Clone)]
pub enum Mutation {
    Create(CreateCommentInput),
    Update(CommentId, UpdateCommentInput),
    Delete(CommentId),
}

/// Successful result of a [`Mutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Created(CommentRecord),
    Updated(CommentRecord),
    Deleted(CommentId),
}

/// What issued a mutation, used to apply its settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Draft,
    Edit(CommentId),
    Reply(CommentId),
    Delete(CommentId),
}

/// An issued mutation, tagged with the session generation it was issued in.
///
/// Hand it back to [`SessionController::settle`](super::SessionController::settle)
/// with the service's answer.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub(crate) generation: u64,
    pub(crate) draft_generation: u64,
    pub(crate) origin: Origin,
    pub mutation: Mutation,
}

/// Result of a user intent that may send a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Nothing was sent: empty text, wrong mode or declined confirmation.
    Skipped,
    Applied(T),
    /// The request failed. Already reported through the notifier.
    Failed(CommentError),
    /// The answer arrived after the session moved on and was discarded.
    Stale,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Skipped => Outcome::Skipped,
            Self::Applied(value) => Outcome::Applied(f(value)),
            Self::Failed(err) => Outcome::Failed(err),
            Self::Stale => Outcome::Stale,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            _ => None,
        }
    }
}
