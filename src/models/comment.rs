use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActorId, AttachedFile, BoardId, CommentId, FileId, NewFile};

/// A single comment as delivered by the server.
///
/// Records are read-only from the client's point of view; every change goes
/// through a mutation request followed by a refetch of the whole board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: CommentId,
    pub board_id: BoardId,
    /// Parent comment on the same board. `None` for top-level comments.
    pub parent_id: Option<CommentId>,
    pub author_id: ActorId,
    /// Comment body. May embed inline `<img>` markup for pasted images.
    pub text: String,
    #[serde(default)]
    pub attached_files: Vec<AttachedFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentRecord {
    pub fn is_authored_by(&self, actor: &str) -> bool {
        self.author_id == actor
    }
}

/// A comment with its nested replies, used for tree responses.
///
/// The record fields are flattened into the JSON form, with an additional
/// `children` array in input list order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub record: CommentRecord,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(record: CommentRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> CommentId {
        self.record.id
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    /// Pre-order traversal yielding each node with its depth (roots are 0).
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(self, 0)],
        }
    }
}

// Reply chains can nest arbitrarily deep; tear them down without recursing.
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Pre-order iterator over a comment subtree.
pub struct Walk<'a> {
    stack: Vec<(&'a CommentNode, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a CommentNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        Some((node, depth))
    }
}

/// Input for creating a comment. `parent_id` makes it a reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub text: String,
    pub parent_id: Option<CommentId>,
    /// Always empty for new comments; the server ignores it.
    #[serde(default)]
    pub keep_file_ids: Vec<FileId>,
    #[serde(default)]
    pub new_files: Vec<NewFile>,
}

/// Input for updating a comment.
///
/// `keep_file_ids` lists exactly which already-persisted attachments survive
/// the edit; anything not listed is removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCommentInput {
    pub text: String,
    /// Author of the comment being edited, passed through for the server's
    /// permission check.
    #[serde(default)]
    pub author_id: Option<ActorId>,
    #[serde(default)]
    pub keep_file_ids: Vec<FileId>,
    #[serde(default)]
    pub new_files: Vec<NewFile>,
}
