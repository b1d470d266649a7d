//! Router-level tests for the HTTP API

use crate::server::build_router;
use crate::server::catalog::Catalog;
use crate::server::config::{ProjectConfig, ServiceConfig};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use devrun_core::{ManagerConfig, ProcessManager, ServiceHistoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn service(name: &str, cmd: &str, port: Option<u16>) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        cmd: cmd.to_string(),
        cwd: None,
        port,
    }
}

fn setup(services: Vec<ServiceConfig>) -> (Router, ProcessManager) {
    let catalog = Catalog::from_config(&[ProjectConfig {
        id: "shop".to_string(),
        name: "Shop".to_string(),
        root: std::env::temp_dir().display().to_string(),
        default_service: None,
        services,
    }])
    .unwrap();

    let config = ManagerConfig {
        shell: "/bin/sh".to_string(),
        stop_grace: Duration::from_millis(200),
        ..ManagerConfig::default()
    };
    let manager = ProcessManager::new(config, Arc::new(ServiceHistoryStore::in_memory(50)));
    let router = build_router(manager.clone(), Arc::new(catalog), CancellationToken::new());
    (router, manager)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (router, _) = setup(vec![]);
    let (status, body) = call(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_capabilities_reflect_retention() {
    let (router, _) = setup(vec![]);
    let (status, body) = call(&router, "GET", "/api/capabilities", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["name"], "devrun");
    assert_eq!(data["endpoints"]["history"]["query"]["limit"]["max"], 50);
    assert_eq!(data["endpoints"]["history"]["query"]["limit"]["default"], 25);
    assert_eq!(data["endpoints"]["clientLogWs"]["path"], "/ws/client-logs");
    assert!(data["pollingRecipe"].is_array());
}

#[tokio::test]
async fn test_state_lists_configured_services() {
    let (router, _) = setup(vec![service("web", "sleep 30", Some(5173))]);
    let (status, body) = call(&router, "GET", "/api/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let project = &body["data"]["projects"][0];
    assert_eq!(project["id"], "shop");
    assert_eq!(project["services"][0]["name"], "web");
    assert_eq!(project["services"][0]["port"], 5173);
    assert_eq!(project["services"][0]["run"]["running"], false);
    assert!(body["data"]["running"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_project_is_404() {
    let (router, _) = setup(vec![service("web", "sleep 30", None)]);
    let (status, body) = call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "blog" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unknown project: blog");

    let (status, _) = call(
        &router,
        "GET",
        "/api/logs?projectId=shop&serviceName=db",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_stop_and_history() {
    let (router, manager) = setup(vec![service("web", "echo booting; sleep 30", None)]);

    let (status, body) = call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let process = &body["data"]["process"];
    assert_eq!(body["data"]["action"], "start");
    assert_eq!(process["serviceName"], "web");
    assert_eq!(process["usedDefaultService"], true);
    assert_eq!(process["running"], true);
    let run_id = process["runId"].as_str().unwrap().to_string();

    let (_, again) = call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "shop", "serviceName": "web" })),
    )
    .await;
    assert_eq!(again["data"]["process"]["runId"], run_id.as_str());

    let (status, body) = call(
        &router,
        "GET",
        "/api/history?projectId=shop&serviceName=web",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["events"][0]["type"], "start");
    assert_eq!(data["events"][0]["runId"], run_id.as_str());
    assert_eq!(data["latestSeq"], 1);
    assert_eq!(data["nextAfterSeq"], 1);
    assert_eq!(data["hasMore"], false);
    assert_eq!(data["retention"], 50);
    assert_eq!(data["serviceName"], "web");
    assert_eq!(data["running"], true);
    assert_eq!(data["runId"], run_id.as_str());
    assert!(data["status"].is_string());
    assert_eq!(
        data["pollHint"],
        "/api/history?projectId=shop&serviceName=web&afterSeq=1"
    );

    let (status, body) = call(
        &router,
        "POST",
        "/api/process/stop",
        Some(json!({ "projectId": "shop", "serviceName": "web" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted"], true);

    manager.stop_all(Duration::from_secs(3)).await;
    let (_, body) = call(
        &router,
        "POST",
        "/api/process/stop",
        Some(json!({ "projectId": "shop" })),
    )
    .await;
    assert_eq!(body["data"]["accepted"], false);
}

#[tokio::test]
async fn test_history_parameter_validation() {
    let (router, _) = setup(vec![service("web", "sleep 30", None)]);

    let (status, body) = call(
        &router,
        "GET",
        "/api/history?projectId=shop&limit=0",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid 'limit': must be between 1 and 50.");

    let (status, _) = call(
        &router,
        "GET",
        "/api/history?projectId=shop&afterSeq=abc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&router, "GET", "/api/history?projectId=shop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limit"], 25);
    assert_eq!(body["data"]["afterSeq"], 0);
}

#[tokio::test]
async fn test_logs_clamp_and_stale_run() {
    let (router, manager) = setup(vec![service("web", "echo api-log-line; sleep 30", None)]);
    call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "shop" })),
    )
    .await;

    let (status, body) = call(
        &router,
        "GET",
        "/api/logs?projectId=shop&chars=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["chars"], 200);

    let (_, body) = call(
        &router,
        "GET",
        "/api/logs?projectId=shop&runId=not-this-run",
        None,
    )
    .await;
    assert_eq!(body["data"]["output"], "");

    let (status, body) = call(
        &router,
        "GET",
        "/api/logs?projectId=shop&chars=abc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["chars"], 4000);

    manager.stop_all(Duration::from_secs(3)).await;
}

#[tokio::test]
async fn test_snapshot_defaults() {
    let (router, manager) = setup(vec![service("web", "sleep 30", None)]);
    call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "shop" })),
    )
    .await;

    let (status, body) = call(&router, "POST", "/api/snapshot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["chars"], 1200);
    assert_eq!(body["data"]["running"][0]["serviceName"], "web");
    assert_eq!(body["data"]["logTails"][0]["projectId"], "shop");

    let (_, body) = call(&router, "POST", "/api/snapshot", Some(json!({ "chars": 99999 }))).await;
    assert_eq!(body["data"]["chars"], 6000);

    manager.stop_all(Duration::from_secs(3)).await;
}

#[tokio::test]
async fn test_stdin_without_session() {
    let (router, _) = setup(vec![service("web", "sleep 30", None)]);
    let (status, body) = call(
        &router,
        "POST",
        "/api/process/stdin",
        Some(json!({ "projectId": "shop", "input": "ls\n" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted"], false);
    assert_eq!(body["data"]["action"], "stdin");
}

#[tokio::test]
async fn test_port_conflict_is_409() {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    let (router, _) = setup(vec![service("web", "sleep 30", Some(port))]);

    let (status, body) = call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], format!("port {port} is already in use"));
}

#[tokio::test]
async fn test_clear_history() {
    let (router, manager) = setup(vec![service("web", "sleep 30", None)]);
    call(
        &router,
        "POST",
        "/api/process/start",
        Some(json!({ "projectId": "shop" })),
    )
    .await;
    manager.stop_all(Duration::from_secs(3)).await;

    let (status, body) = call(
        &router,
        "POST",
        "/api/history/clear",
        Some(json!({ "projectId": "shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cleared"], true);

    let (_, body) = call(&router, "GET", "/api/history?projectId=shop", None).await;
    assert!(body["data"]["events"].as_array().unwrap().is_empty());

    let (status, _) = call(
        &router,
        "POST",
        "/api/history/clear",
        Some(json!({ "projectId": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
