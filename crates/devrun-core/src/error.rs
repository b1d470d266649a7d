//! Error types for devrun-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// No live session for the requested key
    #[error("Process is not running")]
    NotRunning,

    /// A viewer expected a different run than the live one
    #[error("Run mismatch (expected {expected}, active {active})")]
    RunMismatch {
        /// Run the caller asked for
        expected: String,
        /// Run currently holding the key
        active: String,
    },

    /// A configured port is already bound by someone else
    #[error("port {port} is already in use")]
    PortUnavailable {
        /// Configured port
        port: u16,
    },

    /// Spawning the child process failed
    #[error("spawn error: {0}")]
    Spawn(String),

    /// Delivering a signal to the process group failed
    #[error("signal error: {0}")]
    Signal(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// History store error
    #[error("history error: {0}")]
    History(#[from] devrun_history::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
