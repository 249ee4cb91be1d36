//! Domain models for comment boards.
//!
//! # Core Concepts
//!
//! ## Server Records
//!
//! - [`CommentRecord`]: One comment as stored by the server. Comments form a
//!   forest through `parent_id`; a `None` parent is a top-level comment.
//! - [`AttachedFile`]: A file descriptor already persisted server-side.
//!
//! ## Derived Views
//!
//! - [`CommentNode`]: A record plus its ordered replies, rebuilt from the flat
//!   list on every fetch. Nodes are immutable views with no identity across
//!   rebuilds.
//!
//! ## Client-Only State
//!
//! These live only in memory while a comment is being edited or replied to:
//!
//! - [`PendingFile`]: Either a persisted file kept across an edit, or a
//!   [`NewFile`] selected locally and waiting for upload.

mod attachment;
mod comment;

pub use attachment::*;
pub use comment::*;

/// Identifier of a discussion board (one set of comments).
pub type BoardId = i64;

/// Server-assigned identifier of a comment.
pub type CommentId = i64;

/// Server-assigned identifier of a persisted file.
pub type FileId = String;

/// Opaque identifier of the acting user.
pub type ActorId = String;
