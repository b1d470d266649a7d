//! Web API module for devrun
//!
//! Provides REST API endpoints for:
//! - Health, aggregate state and capabilities
//! - Process lifecycle (start, stop, restart, stdin)
//! - Log tails and snapshots
//! - Service history

pub mod capabilities;
pub mod error;
pub mod health;
pub mod history;
pub mod logs;
pub mod processes;
pub mod snapshot;
pub mod state;

#[cfg(test)]
mod tests;

use axum::Router;
use serde::Serialize;

pub use capabilities::capabilities_routes;
pub use error::ApiError;
pub use health::health_routes;
pub use history::history_routes;
pub use logs::logs_routes;
pub use processes::processes_routes;
pub use snapshot::snapshot_routes;
pub use state::state_routes;

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(state_routes())
        .merge(processes_routes())
        .merge(logs_routes())
        .merge(history_routes())
        .merge(snapshot_routes())
        .merge(capabilities_routes())
}

/// Clamp an optional size parameter into `[min, max]`, defaulting when absent
pub(crate) fn clamp_or_default(value: Option<usize>, default: usize, min: usize, max: usize) -> usize {
    value.unwrap_or(default).clamp(min, max)
}
