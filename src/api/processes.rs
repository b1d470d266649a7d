//! Process lifecycle endpoints
//!
//! POST /api/process/start - Start a service (idempotent)
//! POST /api/process/stop - Ask a service to stop
//! POST /api/process/restart - Replace a service's run
//! POST /api/process/stdin - Send raw input to a service

use super::{ApiError, ApiResponse};
use crate::server::catalog::Catalog;
use axum::{routing::post, Extension, Json, Router};
use devrun_core::{ProcessManager, RunInfo, ServiceTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body naming a service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub project_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
}

/// Body carrying input for a service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdinRequest {
    pub project_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub input: String,
}

/// A service and its current status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayload {
    pub project_id: String,
    pub service_name: String,
    pub used_default_service: bool,
    pub configured_port: Option<u16>,
    #[serde(flatten)]
    pub run: RunInfo,
}

impl ProcessPayload {
    pub(crate) async fn build(
        manager: &ProcessManager,
        target: &ServiceTarget,
        used_default_service: bool,
    ) -> Self {
        Self {
            project_id: target.project_id.clone(),
            service_name: target.service.name.clone(),
            used_default_service,
            configured_port: target.service.port,
            run: manager
                .run_info(&target.project_id, &target.service.name)
                .await,
        }
    }
}

/// Result of a lifecycle action
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action: &'static str,
    pub accepted: bool,
    pub process: ProcessPayload,
}

/// Create process routes
pub fn processes_routes() -> Router {
    Router::new()
        .route("/api/process/start", post(start_process))
        .route("/api/process/stop", post(stop_process))
        .route("/api/process/restart", post(restart_process))
        .route("/api/process/stdin", post(write_stdin))
}

/// Resolve a request against the catalog, noting whether the default was used
pub(crate) fn resolve(
    catalog: &Catalog,
    project_id: &str,
    service_name: Option<&str>,
) -> Result<(ServiceTarget, bool), ApiError> {
    let requested = service_name.map(str::trim).filter(|s| !s.is_empty());
    let target = catalog.resolve(project_id.trim(), requested)?;
    Ok((target, requested.is_none()))
}

async fn respond(
    manager: &ProcessManager,
    action: &'static str,
    accepted: bool,
    target: &ServiceTarget,
    used_default: bool,
) -> Json<ApiResponse<ActionResult>> {
    Json(ApiResponse::success(ActionResult {
        action,
        accepted,
        process: ProcessPayload::build(manager, target, used_default).await,
    }))
}

async fn start_process(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ApiResponse<ActionResult>>, ApiError> {
    let (target, used_default) =
        resolve(&catalog, &request.project_id, request.service_name.as_deref())?;
    manager.start(&target).await?;
    Ok(respond(&manager, "start", true, &target, used_default).await)
}

async fn stop_process(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ApiResponse<ActionResult>>, ApiError> {
    let (target, used_default) =
        resolve(&catalog, &request.project_id, request.service_name.as_deref())?;
    let stopped = manager
        .stop(&target.project_id, &target.service.name)
        .await;
    Ok(respond(&manager, "stop", stopped, &target, used_default).await)
}

async fn restart_process(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ApiResponse<ActionResult>>, ApiError> {
    let (target, used_default) =
        resolve(&catalog, &request.project_id, request.service_name.as_deref())?;
    let session = manager.restart(&target).await?;
    info!(key = %target.key(), run_id = %session.run_id(), "Restarted via API");
    Ok(respond(&manager, "restart", true, &target, used_default).await)
}

async fn write_stdin(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Json(request): Json<StdinRequest>,
) -> Result<Json<ApiResponse<ActionResult>>, ApiError> {
    let (target, used_default) =
        resolve(&catalog, &request.project_id, request.service_name.as_deref())?;
    let written = manager
        .write_input(&target.project_id, &target.service.name, &request.input)
        .await;
    Ok(respond(&manager, "stdin", written, &target, used_default).await)
}
