//! Log tail endpoint
//!
//! GET /api/logs?projectId&serviceName&chars&runId

use super::processes::{resolve, ProcessPayload};
use super::{clamp_or_default, ApiError, ApiResponse};
use crate::server::catalog::Catalog;
use axum::extract::Query;
use axum::{routing::get, Extension, Json, Router};
use devrun_core::ProcessManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_LOG_CHARS: usize = 4000;
pub const MIN_LOG_CHARS: usize = 200;
pub const MAX_LOG_CHARS: usize = 50_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub project_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub chars: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    #[serde(flatten)]
    pub process: ProcessPayload,
    pub chars: usize,
    pub output: String,
}

/// Create log routes
pub fn logs_routes() -> Router {
    Router::new().route("/api/logs", get(get_logs))
}

/// Unparseable sizes fall back to the default rather than failing the read
fn parse_chars(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|r| r.trim().parse().ok())
}

async fn get_logs(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<LogsResponse>>, ApiError> {
    let (target, used_default) =
        resolve(&catalog, &query.project_id, query.service_name.as_deref())?;
    let chars = clamp_or_default(
        parse_chars(query.chars.as_deref()),
        DEFAULT_LOG_CHARS,
        MIN_LOG_CHARS,
        MAX_LOG_CHARS,
    );
    let run_id = query
        .run_id
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let output = manager
        .log_tail(&target.project_id, &target.service.name, chars, run_id)
        .await;

    Ok(Json(ApiResponse::success(LogsResponse {
        process: ProcessPayload::build(&manager, &target, used_default).await,
        chars,
        output,
    })))
}
