//! WebSocket module for devrun
//!
//! Provides real-time communication endpoints:
//! - /ws - Terminal viewer for one service's live run
//! - /ws/client-logs - Browser log lines forwarded into a live run

pub mod client_logs;
pub mod terminal;

pub use client_logs::client_logs_handler;
pub use terminal::terminal_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new()
        .route("/ws", get(terminal_handler))
        .route("/ws/client-logs", get(client_logs_handler))
}
