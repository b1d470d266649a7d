//! Server initialization
//!
//! Contains the main `run()` function that loads configuration, opens the
//! history store, builds the supervisor and serves the HTTP/WebSocket API.

use super::catalog::Catalog;
use super::loader::load_config;
use super::shutdown::shutdown_signal_with_token;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use devrun_core::{ProcessManager, ServiceHistoryStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// How long shutdown waits for services to exit before killing them
const SHUTDOWN_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-line overrides for `serve`
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
}

/// Build the main router with all endpoints
pub fn build_router(
    manager: ProcessManager,
    catalog: Arc<Catalog>,
    shutdown: CancellationToken,
) -> Router {
    Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .route("/", get(|| async { "devrun supervisor" }))
        .layer(Extension(manager))
        .layer(Extension(catalog))
        .layer(Extension(shutdown))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run(options: ServeOptions) -> Result<()> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(host) = options.host {
        config.server.host = host;
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }

    let catalog =
        Arc::new(Catalog::from_config(&config.projects).context("Invalid project configuration")?);
    info!(projects = catalog.projects().len(), "Service catalog loaded");

    let history_path = config.history_path();
    let history = Arc::new(
        ServiceHistoryStore::open(&history_path, config.history.effective_retention())
            .await
            .with_context(|| format!("Failed to open history at {}", history_path.display()))?,
    );

    let manager_config = config.supervisor.to_manager_config();
    info!(
        shell = %manager_config.shell,
        stop_grace_ms = manager_config.stop_grace.as_millis() as u64,
        ready_grace_ms = manager_config.ready_grace.as_millis() as u64,
        "Supervisor configured"
    );
    let manager = ProcessManager::new(manager_config, history);

    let shutdown = CancellationToken::new();
    let app = build_router(manager.clone(), catalog, shutdown.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_token(shutdown))
        .await
        .context("HTTP server error")?;

    info!("Stopping supervised services...");
    let report = manager.stop_all(SHUTDOWN_STOP_TIMEOUT).await;
    info!(
        requested = report.requested,
        forced = report.forced,
        "devrun shutdown complete"
    );
    Ok(())
}
