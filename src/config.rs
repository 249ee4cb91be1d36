//! Runtime configuration loaded from environment variables.
//!
//! - `COMMENT_BOARD_URL` - API base URL (default: `http://localhost:17020/api/v1`)
//! - `COMMENT_BOARD_API_KEY` - Bearer key; enables auth on the server when set
//! - `COMMENT_BOARD_ACTOR` - Acting user id sent as `X-Actor-Id` (default: `$USER`)
//! - `COMMENT_BOARD_DB` - SQLite path for `serve` (default: platform data dir)

use std::path::PathBuf;

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:17020/api/v1";

/// Default port for `serve`, matching [`DEFAULT_URL`].
pub const DEFAULT_PORT: u16 = 17020;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub actor_id: String,
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            base_url: get("COMMENT_BOARD_URL").unwrap_or_else(|| DEFAULT_URL.to_string()),
            api_key: get("COMMENT_BOARD_API_KEY"),
            actor_id: get("COMMENT_BOARD_ACTOR")
                .or_else(|| get("USER"))
                .unwrap_or_else(|| "anonymous".to_string()),
            db_path: get("COMMENT_BOARD_DB").map(PathBuf::from),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        api_key: Option<String>,
        actor_id: Option<String>,
    ) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
        if let Some(actor) = actor_id {
            self.actor_id = actor;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
