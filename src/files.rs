//! Per-comment transient attachment state.
//!
//! Two independent [`FileRegistry`] instances exist per board view: one for
//! the comment being edited and one for the active reply target. An entry
//! exists only while its comment is in that mode; leaving the mode removes
//! the key rather than emptying it.

use std::collections::{HashMap, HashSet};

use crate::models::{CommentId, FileId, NewFile, PendingFile};

/// Replacement value or update function for [`FileRegistry::set_for`].
pub enum FileUpdate {
    Replace(Vec<PendingFile>),
    Apply(Box<dyn FnOnce(&[PendingFile]) -> Vec<PendingFile>>),
}

impl FileUpdate {
    pub fn apply(f: impl FnOnce(&[PendingFile]) -> Vec<PendingFile> + 'static) -> Self {
        Self::Apply(Box::new(f))
    }

    /// Append one file to whatever is there.
    pub fn push(file: impl Into<PendingFile>) -> Self {
        let file = file.into();
        Self::apply(move |current| {
            let mut next = current.to_vec();
            next.push(file);
            next
        })
    }
}

impl From<Vec<PendingFile>> for FileUpdate {
    fn from(files: Vec<PendingFile>) -> Self {
        Self::Replace(files)
    }
}

/// Ordered, duplicate-free pending files keyed by comment id.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    entries: HashMap<CommentId, Vec<PendingFile>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files for `id`, empty if the key is absent.
    pub fn get(&self, id: CommentId) -> &[PendingFile] {
        self.entries.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: CommentId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Reset the entry for `id` to an empty list.
    pub fn init(&mut self, id: CommentId) {
        self.entries.insert(id, Vec::new());
    }

    /// Replace or transform the entry for `id`, creating it if absent.
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn set_for(&mut self, id: CommentId, update: impl Into<FileUpdate>) {
        let next = match update.into() {
            FileUpdate::Replace(files) => files,
            FileUpdate::Apply(f) => f(self.get(id)),
        };
        self.entries.insert(id, dedup(next));
    }

    /// Remove the entry for `id` entirely.
    pub fn clear(&mut self, id: CommentId) {
        self.entries.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn dedup(files: Vec<PendingFile>) -> Vec<PendingFile> {
    let mut seen = HashSet::new();
    files.into_iter().filter(|f| seen.insert(f.key())).collect()
}

/// Persisted ids to keep, in order.
pub fn kept_file_ids(files: &[PendingFile]) -> Vec<FileId> {
    files
        .iter()
        .filter_map(|f| match f {
            PendingFile::Persisted(file) => Some(file.file_id.clone()),
            PendingFile::Local(_) => None,
        })
        .collect()
}

/// Local files awaiting upload, in order.
pub fn new_files(files: &[PendingFile]) -> Vec<NewFile> {
    files
        .iter()
        .filter_map(|f| match f {
            PendingFile::Local(file) => Some(file.clone()),
            PendingFile::Persisted(_) => None,
        })
        .collect()
}

/// The edit and reply registries of one board view.
#[derive(Debug, Clone, Default)]
pub struct AttachmentState {
    pub edit: FileRegistry,
    pub reply: FileRegistry,
}

impl AttachmentState {
    pub fn new() -> Self {
        Self::default()
    }
}
