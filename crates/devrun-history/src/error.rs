//! Error types for devrun-history

use thiserror::Error;

/// History error type
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing the history file failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
