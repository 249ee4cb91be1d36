//! Threaded comment boards.
//!
//! The client core turns a board's flat comment list into a reply forest
//! ([`tree`]), tracks per-comment pending attachments ([`files`]), and runs
//! the edit/reply session state machine ([`session`]) with refetch-based
//! synchronization ([`sync`]). The server side ([`db`], [`api`]) and the HTTP
//! collaborator ([`client`]) make the whole loop runnable.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod models;
pub mod paste;
pub mod service;
pub mod session;
pub mod sync;
pub mod tree;
pub mod tree_render;
