//! Per-board fetch status.
//!
//! The flat comment list is never patched locally. Every successful mutation
//! marks the board `NeedsRefetch`, and the next refresh reloads the whole list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::BoardId;

/// Where a board's comment list stands relative to the server.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
    NeedsRefetch,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::NeedsRefetch => "needs_refetch",
        }
    }
}

/// Fetch status for every board a view has touched. Unknown boards are `Idle`.
#[derive(Debug, Clone, Default)]
pub struct SyncPolicy {
    boards: HashMap<BoardId, FetchStatus>,
}

impl SyncPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, board: BoardId) -> FetchStatus {
        self.boards.get(&board).copied().unwrap_or_default()
    }

    /// True when the board has never loaded or a mutation made it stale.
    pub fn needs_fetch(&self, board: BoardId) -> bool {
        matches!(
            self.status(board),
            FetchStatus::Idle | FetchStatus::NeedsRefetch
        )
    }

    /// Start a fetch. Returns `false` if one is already in flight.
    pub fn begin_fetch(&mut self, board: BoardId) -> bool {
        if self.status(board) == FetchStatus::Loading {
            return false;
        }
        self.set(board, FetchStatus::Loading);
        true
    }

    /// Record the outcome of a fetch started with [`begin_fetch`](Self::begin_fetch).
    ///
    /// A success is ignored if a mutation landed while the fetch was in
    /// flight; the board stays `NeedsRefetch`.
    pub fn finish_fetch(&mut self, board: BoardId, ok: bool) {
        match (self.status(board), ok) {
            (FetchStatus::Loading, true) => self.set(board, FetchStatus::Succeeded),
            (FetchStatus::Loading, false) => self.set(board, FetchStatus::Failed),
            (FetchStatus::NeedsRefetch, _) => {
                tracing::debug!(board, "Fetch settled after a mutation, keeping needs_refetch");
            }
            (status, _) => {
                tracing::warn!(board, status = status.as_str(), "Fetch settled without begin_fetch");
            }
        }
    }

    /// Record a successful create, update or delete.
    pub fn mark_mutated(&mut self, board: BoardId) {
        match self.status(board) {
            FetchStatus::Succeeded | FetchStatus::Loading => {
                self.set(board, FetchStatus::NeedsRefetch)
            }
            _ => {}
        }
    }

    fn set(&mut self, board: BoardId, next: FetchStatus) {
        let prev = self.boards.insert(board, next).unwrap_or_default();
        if prev != next {
            tracing::debug!(board, from = prev.as_str(), to = next.as_str(), "Fetch status");
        }
    }
}
