//! Herald error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HeraldError>;

#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration unreadable or invalid. Fatal at startup.
    #[error("Config error: {0}")]
    Config(String),

    /// Persistence (SQLite) failure. Propagated to the caller; a trigger
    /// cycle that hits this aborts its remaining entries.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Channel/transport failure for a single delivery attempt.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Content violates a construction invariant (e.g. media kind without
    /// a media ref). Detected before any delivery starts.
    #[error("Invalid content: {0}")]
    Content(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
