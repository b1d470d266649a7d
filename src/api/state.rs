//! Aggregate state endpoint
//!
//! GET /api/state - Configured projects with per-service status, plus running list

use super::ApiResponse;
use crate::server::catalog::Catalog;
use axum::{routing::get, Extension, Json, Router};
use chrono::{DateTime, Utc};
use devrun_core::{ProcessManager, RunInfo, RunningService};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub name: String,
    pub cmd: String,
    pub cwd: Option<String>,
    pub port: Option<u16>,
    pub run: RunInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub id: String,
    pub name: String,
    pub root: String,
    pub default_service: Option<String>,
    pub services: Vec<ServiceState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub now: DateTime<Utc>,
    pub projects: Vec<ProjectState>,
    pub running: Vec<RunningService>,
}

/// Create state routes
pub fn state_routes() -> Router {
    Router::new().route("/api/state", get(get_state))
}

/// Build the aggregate state view
pub async fn build_state(manager: &ProcessManager, catalog: &Catalog) -> StateResponse {
    let mut projects = Vec::with_capacity(catalog.projects().len());
    for project in catalog.projects() {
        let mut services = Vec::with_capacity(project.services.len());
        for service in &project.services {
            services.push(ServiceState {
                name: service.name.clone(),
                cmd: service.cmd.clone(),
                cwd: service.cwd.as_ref().map(|c| c.display().to_string()),
                port: service.port,
                run: manager.run_info(&project.id, &service.name).await,
            });
        }
        projects.push(ProjectState {
            id: project.id.clone(),
            name: project.name.clone(),
            root: project.root.display().to_string(),
            default_service: project.default_service.clone(),
            services,
        });
    }

    StateResponse {
        now: Utc::now(),
        projects,
        running: manager.list_running().await,
    }
}

async fn get_state(
    Extension(manager): Extension<ProcessManager>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Json<ApiResponse<StateResponse>> {
    Json(ApiResponse::success(build_state(&manager, &catalog).await))
}
