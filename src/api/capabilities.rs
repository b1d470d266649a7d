//! Capabilities endpoint
//!
//! GET /api/capabilities - Machine-readable description of the API

use super::history::{DEFAULT_HISTORY_LIMIT, MAX_AFTER_SEQ};
use super::logs::{DEFAULT_LOG_CHARS, MAX_LOG_CHARS, MIN_LOG_CHARS};
use super::snapshot::{DEFAULT_SNAPSHOT_CHARS, MAX_SNAPSHOT_CHARS, MIN_SNAPSHOT_CHARS};
use super::ApiResponse;
use axum::{routing::get, Extension, Json, Router};
use chrono::Utc;
use devrun_core::client_log::{MAX_CLIENT_LOG_BYTES, MAX_CLIENT_LOG_ENTRIES};
use devrun_core::ProcessManager;
use serde_json::{json, Value};

/// Create capabilities routes
pub fn capabilities_routes() -> Router {
    Router::new().route("/api/capabilities", get(get_capabilities))
}

/// Describe every endpoint with its parameters and limits
pub fn describe(retention: usize) -> Value {
    json!({
        "name": "devrun",
        "version": env!("CARGO_PKG_VERSION"),
        "now": Utc::now(),
        "description": "Supervises local development services and exposes their runs, logs and history.",
        "endpoints": {
            "state": {
                "method": "GET",
                "path": "/api/state",
            },
            "history": {
                "method": "GET",
                "path": "/api/history",
                "query": {
                    "projectId": "required",
                    "serviceName": "optional, defaults to the project's default service",
                    "afterSeq": { "default": 0, "min": 0, "max": MAX_AFTER_SEQ },
                    "limit": {
                        "default": DEFAULT_HISTORY_LIMIT.min(retention as u64),
                        "min": 1,
                        "max": retention,
                    },
                },
            },
            "clearHistory": {
                "method": "POST",
                "path": "/api/history/clear",
                "body": { "projectId": "required" },
            },
            "logs": {
                "method": "GET",
                "path": "/api/logs",
                "query": {
                    "projectId": "required",
                    "serviceName": "optional",
                    "runId": "optional, empty text when it is not the current or last run",
                    "chars": { "default": DEFAULT_LOG_CHARS, "min": MIN_LOG_CHARS, "max": MAX_LOG_CHARS },
                },
            },
            "process": {
                "start": { "method": "POST", "path": "/api/process/start" },
                "stop": { "method": "POST", "path": "/api/process/stop" },
                "restart": { "method": "POST", "path": "/api/process/restart" },
                "stdin": { "method": "POST", "path": "/api/process/stdin" },
                "body": { "projectId": "required", "serviceName": "optional" },
            },
            "snapshot": {
                "method": "POST",
                "path": "/api/snapshot",
                "body": {
                    "chars": {
                        "default": DEFAULT_SNAPSHOT_CHARS,
                        "min": MIN_SNAPSHOT_CHARS,
                        "max": MAX_SNAPSHOT_CHARS,
                    },
                },
            },
            "ws": {
                "path": "/ws",
                "query": {
                    "projectId": "required",
                    "serviceName": "optional",
                    "runId": "optional, refuses the connection when another run is live",
                    "replay": "optional boolean",
                    "readOnly": "optional boolean",
                },
            },
            "clientLogWs": {
                "path": "/ws/client-logs",
                "query": { "projectId": "required", "serviceName": "required", "runId": "required" },
                "message": {
                    "type": "client_log_batch",
                    "entries": [{
                        "level": "debug | log | info | warn | error",
                        "source": "console | window_error | unhandledrejection",
                        "ts": "RFC 3339 timestamp",
                        "message": "text",
                        "path": "page path",
                        "clientId": "browser tab id",
                    }],
                },
                "maxEntries": MAX_CLIENT_LOG_ENTRIES,
                "maxFrameBytes": MAX_CLIENT_LOG_BYTES,
            },
        },
        "pollingRecipe": [
            "GET /api/history?projectId=<id>&serviceName=<name> to read the first page.",
            "Call the returned pollHint to continue from nextAfterSeq.",
            "Repeat while hasMore is true, then poll periodically.",
        ],
    })
}

async fn get_capabilities(
    Extension(manager): Extension<ProcessManager>,
) -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(describe(manager.history_retention())))
}
