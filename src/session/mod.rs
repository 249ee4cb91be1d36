//! Comment session controller for one mounted board view.
//!
//! The controller owns the board's flat comment list and derived tree, the
//! edit/reply [`Mode`], the text buffers, and the pending attachment
//! registries. UI intents come in as method calls; mutations go out through a
//! [`CommentService`] and come back through [`SessionController::settle`].
//!
//! # Transitions
//!
//! Every mode change goes through one function that first runs the exit
//! cleanup of the current mode (drop its file entry, clear its buffer) and
//! then the entry setup of the next. Each change bumps a generation counter;
//! a settlement carrying an older generation is discarded as stale. The
//! top-level draft has its own generation, bumped whenever its text or files
//! change, so a late create never clears newer draft input.
//!
//! # Synchronization
//!
//! Successful mutations never patch the local list. They mark the board as
//! needing a refetch, and [`SessionController::refresh`] reloads it.

mod mode;
mod notify;
mod ticket;

use std::sync::Arc;

use tokio::sync::watch;

pub use mode::Mode;
pub use notify::{LogNotifier, Notifier};
pub use ticket::{Mutation, Outcome, Settled, Ticket};

use ticket::Origin;

use crate::error::Result;
use crate::files::{self, AttachmentState, FileUpdate};
use crate::models::{
    BoardId, CommentId, CommentNode, CommentRecord, CreateCommentInput, FileId, FileKey, NewFile,
    PendingFile, UpdateCommentInput,
};
use crate::paste;
use crate::service::CommentService;
use crate::sync::{FetchStatus, SyncPolicy};
use crate::tree::build_tree;

pub struct SessionController {
    board: BoardId,
    service: Arc<dyn CommentService>,
    notifier: Arc<dyn Notifier>,
    records: Vec<CommentRecord>,
    tree: Vec<CommentNode>,
    sync: SyncPolicy,
    mode: Mode,
    generation: u64,
    files: AttachmentState,
    edit_text: String,
    reply_text: String,
    draft_text: String,
    draft_files: Vec<PendingFile>,
    draft_generation: u64,
    status_tx: watch::Sender<FetchStatus>,
}

impl SessionController {
    pub fn new(
        board: BoardId,
        service: Arc<dyn CommentService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            board,
            service,
            notifier,
            records: Vec::new(),
            tree: Vec::new(),
            sync: SyncPolicy::new(),
            mode: Mode::Idle,
            generation: 0,
            files: AttachmentState::new(),
            edit_text: String::new(),
            reply_text: String::new(),
            draft_text: String::new(),
            draft_files: Vec::new(),
            draft_generation: 0,
            status_tx: watch::channel(FetchStatus::Idle).0,
        }
    }

    // ============================================================
    // Read access
    // ============================================================

    pub fn board(&self) -> BoardId {
        self.board
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tree(&self) -> &[CommentNode] {
        &self.tree
    }

    pub fn records(&self) -> &[CommentRecord] {
        &self.records
    }

    pub fn record(&self, id: CommentId) -> Option<&CommentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.sync.status(self.board)
    }

    /// Subscribe to this board's fetch status, e.g. to show a loading
    /// indicator while a refetch is in flight.
    pub fn watch_fetch_status(&self) -> watch::Receiver<FetchStatus> {
        self.status_tx.subscribe()
    }

    pub fn edit_files(&self, id: CommentId) -> &[PendingFile] {
        self.files.edit.get(id)
    }

    pub fn reply_files(&self, id: CommentId) -> &[PendingFile] {
        self.files.reply.get(id)
    }

    pub fn draft_files(&self) -> &[PendingFile] {
        &self.draft_files
    }

    pub fn attachments(&self) -> &AttachmentState {
        &self.files
    }

    pub fn edit_text(&self) -> &str {
        &self.edit_text
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn draft_text(&self) -> &str {
        &self.draft_text
    }

    /// Persisted files still attached to the comment being edited.
    pub fn kept_file_ids(&self) -> Vec<FileId> {
        match self.mode {
            Mode::Editing(id) => files::kept_file_ids(self.files.edit.get(id)),
            _ => Vec::new(),
        }
    }

    // ============================================================
    // Mode transitions
    // ============================================================

    /// Open the editor on `id`. Any other edit or reply is cancelled first.
    pub fn start_edit(&mut self, id: CommentId) {
        if self.mode == Mode::Editing(id) {
            return;
        }
        self.enter(Mode::Editing(id));

        if let Some(record) = self.records.iter().find(|r| r.id == id) {
            self.edit_text = record.text.clone();
            let existing = record
                .attached_files
                .iter()
                .cloned()
                .map(PendingFile::Persisted)
                .collect::<Vec<_>>();
            self.files.edit.set_for(id, existing);
        }
    }

    pub fn cancel_edit(&mut self) {
        if matches!(self.mode, Mode::Editing(_)) {
            self.enter(Mode::Idle);
        }
    }

    /// Make `id` the reply target. Any edit or other reply is cancelled first.
    pub fn start_reply(&mut self, id: CommentId) {
        if self.mode == Mode::Replying(id) {
            return;
        }
        self.enter(Mode::Replying(id));
    }

    pub fn cancel_reply(&mut self) {
        if matches!(self.mode, Mode::Replying(_)) {
            self.enter(Mode::Idle);
        }
    }

    fn enter(&mut self, next: Mode) {
        match self.mode {
            Mode::Idle => {}
            Mode::Editing(id) => {
                self.files.edit.clear(id);
                self.edit_text.clear();
            }
            Mode::Replying(id) => {
                self.files.reply.clear(id);
                self.reply_text.clear();
            }
        }

        match next {
            Mode::Idle => {}
            Mode::Editing(id) => self.files.edit.init(id),
            Mode::Replying(id) => self.files.reply.init(id),
        }

        tracing::debug!(board = self.board, from = ?self.mode, to = ?next, "Session mode");
        self.mode = next;
        self.generation += 1;
    }

    // ============================================================
    // Buffers and attachments
    // ============================================================

    pub fn set_edit_text(&mut self, text: impl Into<String>) {
        if matches!(self.mode, Mode::Editing(_)) {
            self.edit_text = text.into();
        }
    }

    pub fn set_reply_text(&mut self, text: impl Into<String>) {
        if matches!(self.mode, Mode::Replying(_)) {
            self.reply_text = text.into();
        }
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        self.draft_text = text.into();
        self.draft_generation += 1;
    }

    /// Add a file to whichever composer is active: the editor, the reply
    /// box, or the top-level draft when idle.
    pub fn attach_file(&mut self, file: NewFile) {
        match self.mode {
            Mode::Editing(id) => self.files.edit.set_for(id, FileUpdate::push(file)),
            Mode::Replying(id) => self.files.reply.set_for(id, FileUpdate::push(file)),
            Mode::Idle => {
                let file = PendingFile::Local(file);
                if !self.draft_files.iter().any(|f| f.key() == file.key()) {
                    self.draft_files.push(file);
                }
                self.draft_generation += 1;
            }
        }
    }

    /// Remove a file from the active composer.
    pub fn remove_file(&mut self, key: &FileKey) {
        let key = key.clone();
        let drop_key = move |current: &[PendingFile]| -> Vec<PendingFile> {
            current.iter().filter(|f| f.key() != key).cloned().collect()
        };
        match self.mode {
            Mode::Editing(id) => self.files.edit.set_for(id, FileUpdate::apply(drop_key)),
            Mode::Replying(id) => self.files.reply.set_for(id, FileUpdate::apply(drop_key)),
            Mode::Idle => {
                self.draft_files = drop_key(&self.draft_files);
                self.draft_generation += 1;
            }
        }
    }

    /// Paste an image into the active composer: inline markup goes into the
    /// text buffer and the raw file joins the pending uploads.
    ///
    /// Returns `false` (after alerting) if the paste was rejected.
    pub fn paste_image(&mut self, name: &str, content_type: &str, data: Vec<u8>) -> bool {
        let pasted = match paste::paste_image(name, content_type, data) {
            Ok(pasted) => pasted,
            Err(e) => {
                self.notifier.alert(&e.to_string());
                return false;
            }
        };

        match self.mode {
            Mode::Editing(_) => self.edit_text.push_str(&pasted.markup),
            Mode::Replying(_) => self.reply_text.push_str(&pasted.markup),
            Mode::Idle => self.draft_text.push_str(&pasted.markup),
        }
        self.attach_file(pasted.file);
        true
    }

    // ============================================================
    // Issuing mutations
    // ============================================================

    /// Build the update request for the comment being edited.
    ///
    /// `None` when not editing or when `text` is blank.
    pub fn prepare_save_edit(&self, text: &str, keep_file_ids: Vec<FileId>) -> Option<Ticket> {
        let Mode::Editing(id) = self.mode else {
            tracing::debug!(board = self.board, "save_edit outside edit mode ignored");
            return None;
        };
        let text = non_blank(text)?;

        let input = UpdateCommentInput {
            text,
            author_id: self.record(id).map(|r| r.author_id.clone()),
            keep_file_ids,
            new_files: files::new_files(self.files.edit.get(id)),
        };
        Some(self.ticket(Origin::Edit(id), Mutation::Update(id, input)))
    }

    /// Build the create request for a reply to the current target.
    pub fn prepare_submit_reply(&self, text: &str) -> Option<Ticket> {
        let Mode::Replying(id) = self.mode else {
            tracing::debug!(board = self.board, "submit_reply without a reply target ignored");
            return None;
        };
        let text = non_blank(text)?;

        let input = CreateCommentInput {
            text,
            parent_id: Some(id),
            keep_file_ids: Vec::new(),
            new_files: files::new_files(self.files.reply.get(id)),
        };
        Some(self.ticket(Origin::Reply(id), Mutation::Create(input)))
    }

    /// Build the create request for a top-level comment. Allowed in any mode.
    pub fn prepare_create(&self, text: &str) -> Option<Ticket> {
        let text = non_blank(text)?;

        let input = CreateCommentInput {
            text,
            parent_id: None,
            keep_file_ids: Vec::new(),
            new_files: files::new_files(&self.draft_files),
        };
        Some(self.ticket(Origin::Draft, Mutation::Create(input)))
    }

    /// Build the delete request for `id` after asking the user to confirm.
    pub fn prepare_delete(&self, id: CommentId) -> Option<Ticket> {
        if !self.notifier.confirm("Delete this comment?") {
            return None;
        }
        Some(self.ticket(Origin::Delete(id), Mutation::Delete(id)))
    }

    fn ticket(&self, origin: Origin, mutation: Mutation) -> Ticket {
        Ticket {
            generation: self.generation,
            draft_generation: self.draft_generation,
            origin,
            mutation,
        }
    }

    // ============================================================
    // Settling mutations
    // ============================================================

    /// Apply the service's answer to a ticket.
    ///
    /// Success marks the board for refetch and closes the originating edit or
    /// reply. Failure is alerted once and leaves the session where it was. An
    /// answer for an edit or reply the user has already left is discarded,
    /// and a create does not clear a draft that changed while it was in flight.
    pub fn settle(&mut self, ticket: Ticket, result: Result<Settled>) -> Outcome<Settled> {
        let stale = match ticket.origin {
            Origin::Edit(_) | Origin::Reply(_) => ticket.generation != self.generation,
            Origin::Draft | Origin::Delete(_) => false,
        };

        let settled = match result {
            Ok(settled) => settled,
            Err(e) if stale => {
                tracing::warn!(board = self.board, error = %e, "Discarding stale mutation failure");
                return Outcome::Stale;
            }
            Err(e) => {
                tracing::warn!(board = self.board, error = %e, "Comment mutation failed");
                self.notifier.alert(&e.to_string());
                return Outcome::Failed(e);
            }
        };

        self.sync.mark_mutated(self.board);
        self.publish_status();
        if stale {
            tracing::debug!(board = self.board, "Discarding stale mutation result");
            return Outcome::Stale;
        }

        match ticket.origin {
            Origin::Edit(_) | Origin::Reply(_) => self.enter(Mode::Idle),
            Origin::Draft => {
                if ticket.draft_generation != self.draft_generation {
                    tracing::debug!(board = self.board, "Draft changed during create, keeping it");
                    return Outcome::Stale;
                }
                self.draft_text.clear();
                self.draft_files.clear();
                self.draft_generation += 1;
            }
            Origin::Delete(id) => {
                if self.mode.target() == Some(id) {
                    self.enter(Mode::Idle);
                }
            }
        }
        Outcome::Applied(settled)
    }

    // ============================================================
    // Request/response convenience
    // ============================================================

    /// Send a ticket's mutation to the service and settle it.
    pub async fn dispatch(&mut self, ticket: Ticket) -> Outcome<Settled> {
        let service = Arc::clone(&self.service);
        let result = execute(service.as_ref(), self.board, ticket.mutation.clone()).await;
        let outcome = self.settle(ticket, result);
        if matches!(outcome, Outcome::Applied(_) | Outcome::Stale) {
            self.refresh().await;
        }
        outcome
    }

    pub async fn save_edit(
        &mut self,
        text: &str,
        keep_file_ids: Vec<FileId>,
    ) -> Outcome<CommentRecord> {
        match self.prepare_save_edit(text, keep_file_ids) {
            Some(ticket) => record_outcome(self.dispatch(ticket).await),
            None => Outcome::Skipped,
        }
    }

    pub async fn submit_reply(&mut self, text: &str) -> Outcome<CommentRecord> {
        match self.prepare_submit_reply(text) {
            Some(ticket) => record_outcome(self.dispatch(ticket).await),
            None => Outcome::Skipped,
        }
    }

    pub async fn create_comment(&mut self, text: &str) -> Outcome<CommentRecord> {
        match self.prepare_create(text) {
            Some(ticket) => record_outcome(self.dispatch(ticket).await),
            None => Outcome::Skipped,
        }
    }

    pub async fn delete(&mut self, id: CommentId) -> Outcome<()> {
        match self.prepare_delete(id) {
            Some(ticket) => self.dispatch(ticket).await.map(|_| ()),
            None => Outcome::Skipped,
        }
    }

    // ============================================================
    // Fetching
    // ============================================================

    /// Reload the board if it has never loaded or a mutation made it stale.
    ///
    /// Fetch failures leave the status `Failed` and are alerted. Nothing is
    /// retried automatically; see [`retry_fetch`](Self::retry_fetch).
    pub async fn refresh(&mut self) -> Outcome<()> {
        if !self.sync.needs_fetch(self.board) {
            return Outcome::Skipped;
        }
        self.fetch().await
    }

    /// User-initiated retry after a failed fetch.
    pub async fn retry_fetch(&mut self) -> Outcome<()> {
        if self.fetch_status() != FetchStatus::Failed {
            return Outcome::Skipped;
        }
        self.fetch().await
    }

    async fn fetch(&mut self) -> Outcome<()> {
        if !self.sync.begin_fetch(self.board) {
            return Outcome::Skipped;
        }
        self.publish_status();

        let service = Arc::clone(&self.service);
        match service.fetch_comments(self.board).await {
            Ok(records) => {
                self.sync.finish_fetch(self.board, true);
                self.publish_status();
                self.load(records);
                Outcome::Applied(())
            }
            Err(e) => {
                tracing::warn!(board = self.board, error = %e, "Failed to fetch comments");
                self.sync.finish_fetch(self.board, false);
                self.publish_status();
                self.notifier.alert(&e.to_string());
                Outcome::Failed(e)
            }
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.fetch_status());
    }

    fn load(&mut self, records: Vec<CommentRecord>) {
        self.tree = build_tree(&records);
        self.records = records;
        tracing::debug!(board = self.board, comments = self.records.len(), "Loaded comments");

        // The edit or reply target may have been deleted, directly or with an ancestor
        if let Some(target) = self.mode.target() {
            if !self.records.iter().any(|r| r.id == target) {
                tracing::debug!(board = self.board, comment_id = target, "Session target is gone");
                self.enter(Mode::Idle);
            }
        }
    }
}

async fn execute(
    service: &dyn CommentService,
    board: BoardId,
    mutation: Mutation,
) -> Result<Settled> {
    match mutation {
        Mutation::Create(input) => service
            .create_comment(board, input)
            .await
            .map(Settled::Created),
        Mutation::Update(id, input) => service
            .update_comment(board, id, input)
            .await
            .map(Settled::Updated),
        Mutation::Delete(id) => service
            .delete_comment(board, id)
            .await
            .map(|()| Settled::Deleted(id)),
    }
}

fn record_outcome(outcome: Outcome<Settled>) -> Outcome<CommentRecord> {
    match outcome {
        Outcome::Applied(Settled::Created(record) | Settled::Updated(record)) => {
            Outcome::Applied(record)
        }
        Outcome::Applied(Settled::Deleted(_)) | Outcome::Skipped => Outcome::Skipped,
        Outcome::Failed(e) => Outcome::Failed(e),
        Outcome::Stale => Outcome::Stale,
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("board", &self.board)
            .field("mode", &self.mode)
            .field("generation", &self.generation)
            .field("comments", &self.records.len())
            .field("fetch_status", &self.fetch_status())
            .finish()
    }
}
