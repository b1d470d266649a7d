//! Viewer protocol - messages exchanged with attached terminal viewers

use crate::runner::TerminalMode;
use crate::runtime::ServiceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of an attached viewer
pub type ViewerId = Uuid;

/// Server to viewer messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ViewerMessage {
    /// Current status, sent once on attach
    Meta {
        /// Live run
        run_id: String,
        /// When the run started
        started_at: DateTime<Utc>,
        /// Starting or ready
        status: ServiceStatus,
        /// Whether the run is believed usable
        ready: bool,
        /// How the child is attached
        mode: TerminalMode,
        /// Whether a pseudo-terminal could be allocated
        pty_available: bool,
        /// Warnings seen so far
        warnings: Vec<String>,
        /// URL a human would open
        #[serde(skip_serializing_if = "Option::is_none")]
        effective_url: Option<String>,
        /// Port of the effective URL
        #[serde(skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
    },
    /// Terminal output, either a live chunk or a replay burst
    Output {
        /// Raw text
        data: String,
    },
    /// Non-fatal notice
    Error {
        /// Human readable reason
        error: String,
    },
    /// The run ended; the server closes the connection next
    Exited {
        /// Exit code
        exit_code: i32,
        /// Run that ended
        run_id: String,
    },
}

impl ViewerMessage {
    /// Whether the connection should close after delivering this message
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. })
    }
}

/// Viewer to server messages
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Raw keystrokes
    Input {
        /// Bytes as text
        data: String,
    },
    /// Terminal geometry change
    Resize {
        /// Columns
        cols: u16,
        /// Rows
        rows: u16,
    },
}

impl ClientMessage {
    /// Parse a text frame; anything malformed yields `None`
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Sending half of a viewer connection
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    id: ViewerId,
    sender: mpsc::UnboundedSender<ViewerMessage>,
}

impl ViewerHandle {
    /// Create a handle and the receiver the connection drains
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ViewerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    /// Viewer id
    #[must_use]
    pub fn id(&self) -> ViewerId {
        self.id
    }

    /// Queue a message; false once the connection has gone away
    pub fn send(&self, message: ViewerMessage) -> bool {
        self.sender.send(message).is_ok()
    }
}
