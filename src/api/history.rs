//! History endpoints
//!
//! GET /api/history?projectId&serviceName&afterSeq&limit - Cursor read
//! POST /api/history/clear - Drop a project's history

use super::processes::{resolve, ProcessPayload};
use super::{ApiError, ApiResponse};
use crate::server::catalog::Catalog;
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use devrun_core::{HistoryPage, ProcessManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_HISTORY_LIMIT: u64 = 25;
pub const MAX_AFTER_SEQ: u64 = 1_000_000_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub project_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub after_seq: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(flatten)]
    pub process: ProcessPayload,
    pub retention: usize,
    pub after_seq: u64,
    pub limit: u64,
    #[serde(flatten)]
    pub page: HistoryPage,
    pub poll_hint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryRequest {
    pub project_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryResponse {
    pub project_id: String,
    pub cleared: bool,
}

/// Create history routes
pub fn history_routes() -> Router {
    Router::new()
        .route("/api/history", get(get_history))
        .route("/api/history/clear", post(clear_history))
}

/// Parse an optional integer query parameter, enforcing `[min, max]`
pub(crate) fn parse_integer_param(
    raw: Option<&str>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(default);
    };
    let value: u64 = raw.parse().map_err(|_| {
        ApiError::BadRequest(format!("Invalid '{name}': expected an integer."))
    })?;
    if value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid '{name}': must be between {min} and {max}."
        )));
    }
    Ok(value)
}

/// URL a client polls next to continue from `next_after_seq`
fn poll_hint(project_id: &str, service_name: &str, next_after_seq: u64) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("projectId", project_id)
        .append_pair("serviceName", service_name);
    if next_after_seq > 0 {
        query.append_pair("afterSeq", &next_after_seq.to_string());
    }
    format!("/api/history?{}", query.finish())
}

async fn get_history(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryResponse>>, ApiError> {
    let (target, used_default) =
        resolve(&catalog, &query.project_id, query.service_name.as_deref())?;
    let retention = manager.history_retention();
    let after_seq = parse_integer_param(query.after_seq.as_deref(), "afterSeq", 0, 0, MAX_AFTER_SEQ)?;
    let limit = parse_integer_param(
        query.limit.as_deref(),
        "limit",
        DEFAULT_HISTORY_LIMIT.min(retention as u64),
        1,
        retention as u64,
    )?;

    let page = manager
        .history(&target.project_id, &target.service.name, after_seq, limit as usize)
        .await;
    let poll_hint = poll_hint(&target.project_id, &target.service.name, page.next_after_seq);

    Ok(Json(ApiResponse::success(HistoryResponse {
        process: ProcessPayload::build(&manager, &target, used_default).await,
        retention,
        after_seq,
        limit,
        page,
        poll_hint,
    })))
}

async fn clear_history(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Json(request): Json<ClearHistoryRequest>,
) -> Result<Json<ApiResponse<ClearHistoryResponse>>, ApiError> {
    let project = catalog
        .project(request.project_id.trim())
        .ok_or_else(|| ApiError::NotFound(format!("Unknown project: {}", request.project_id)))?;
    let cleared = manager
        .clear_history_for_project(&project.id)
        .await
        .map_err(ApiError::from)?;
    info!(project_id = %project.id, cleared, "History cleared");

    Ok(Json(ApiResponse::success(ClearHistoryResponse {
        project_id: project.id.clone(),
        cleared,
    })))
}
