//! Snapshot endpoint
//!
//! POST /api/snapshot - Every running service with a short log tail

use super::{clamp_or_default, ApiResponse};
use axum::{routing::post, Extension, Json, Router};
use chrono::{DateTime, Utc};
use devrun_core::{ProcessManager, RunningService};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SNAPSHOT_CHARS: usize = 1200;
pub const MIN_SNAPSHOT_CHARS: usize = 200;
pub const MAX_SNAPSHOT_CHARS: usize = 6000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    #[serde(default)]
    pub chars: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogTail {
    pub project_id: String,
    pub service_name: String,
    pub run_id: Option<String>,
    pub tail: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub generated_at: DateTime<Utc>,
    pub chars: usize,
    pub running: Vec<RunningService>,
    pub log_tails: Vec<LogTail>,
}

/// Create snapshot routes
pub fn snapshot_routes() -> Router {
    Router::new().route("/api/snapshot", post(snapshot))
}

async fn snapshot(
    Extension(manager): Extension<ProcessManager>,
    request: Option<Json<SnapshotRequest>>,
) -> Json<ApiResponse<SnapshotResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let chars = clamp_or_default(
        request.chars,
        DEFAULT_SNAPSHOT_CHARS,
        MIN_SNAPSHOT_CHARS,
        MAX_SNAPSHOT_CHARS,
    );

    let running = manager.list_running().await;
    let mut log_tails = Vec::with_capacity(running.len());
    for service in &running {
        let key = &service.key;
        log_tails.push(LogTail {
            project_id: key.project_id.clone(),
            service_name: key.service_name.clone(),
            run_id: service.info.run_id.clone(),
            tail: manager
                .log_tail(
                    &key.project_id,
                    &key.service_name,
                    chars,
                    service.info.run_id.as_deref(),
                )
                .await,
        });
    }

    Json(ApiResponse::success(SnapshotResponse {
        generated_at: Utc::now(),
        chars,
        running,
        log_tails,
    }))
}
