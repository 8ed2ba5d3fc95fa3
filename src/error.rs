//! Error types shared across the crate

use thiserror::Error;

pub type Result<T, E = BotError> = std::result::Result<T, E>;

/// Top-level error for bot operations.
///
/// Only `Config` is fatal; fetch and notify failures are handled at the
/// polling-loop boundary and never terminate the process.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("notify error: {0}")]
    Notify(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
