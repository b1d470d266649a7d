//! Client log WebSocket handler
//!
//! A browser page bound to one run streams `client_log_batch` frames here.
//! The connection is pinned to the run id given at connect time; once that
//! run is gone every further batch is refused and the socket closed.

use super::terminal::{close, non_empty};
use axum::{
    extract::{
        ws::{close_code, Message, WebSocket, WebSocketUpgrade},
        Query,
    },
    response::IntoResponse,
    Extension,
};
use devrun_core::client_log::MAX_CLIENT_LOG_BYTES;
use devrun_core::{parse_client_log_batch, ClientLogError, ProcessManager};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Connect-time parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLogQuery {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
}

/// Target of a client log connection
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    project_id: String,
    service_name: String,
    run_id: String,
}

impl ClientLogQuery {
    fn target(&self) -> Option<Target> {
        Some(Target {
            project_id: non_empty(self.project_id.as_deref())?.to_string(),
            service_name: non_empty(self.service_name.as_deref())?.to_string(),
            run_id: non_empty(self.run_id.as_deref())?.to_string(),
        })
    }
}

/// What to do with one incoming frame
#[derive(Debug, PartialEq, Eq)]
enum FrameOutcome {
    /// Ingest and keep going
    Continue,
    /// Close with a policy violation
    Refuse(String),
}

/// WebSocket upgrade handler
pub async fn client_logs_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ClientLogQuery>,
    Extension(manager): Extension<ProcessManager>,
    Extension(shutdown): Extension<CancellationToken>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, manager, query, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    manager: ProcessManager,
    query: ClientLogQuery,
    shutdown: CancellationToken,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(target) = query.target() else {
        close(&mut sender, close_code::POLICY, "Missing projectId/serviceName/runId").await;
        return;
    };
    if let Err(e) = manager
        .validate_client_log_target(&target.project_id, &target.service_name, &target.run_id)
        .await
    {
        debug!(project_id = %target.project_id, service = %target.service_name, error = %e, "Client log stream refused");
        close(&mut sender, close_code::POLICY, &e.to_string()).await;
        return;
    }

    info!(
        project_id = %target.project_id,
        service = %target.service_name,
        run_id = %target.run_id,
        "Client log stream connected"
    );

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let payload = match incoming {
                    Some(Ok(Message::Text(text))) => Some(text.into_bytes()),
                    Some(Ok(Message::Binary(bytes))) => Some(bytes),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => None,
                };
                let Some(payload) = payload else {
                    continue;
                };
                if let FrameOutcome::Refuse(reason) = handle_frame(&manager, &target, &payload).await {
                    debug!(project_id = %target.project_id, service = %target.service_name, reason = %reason, "Closing client log stream");
                    close(&mut sender, close_code::POLICY, &reason).await;
                    break;
                }
            }
            _ = shutdown.cancelled() => {
                close(&mut sender, close_code::AWAY, "Server shutting down").await;
                break;
            }
        }
    }

    debug!(project_id = %target.project_id, service = %target.service_name, "Client log stream disconnected");
}

/// Oversized frames are skipped; anything else invalid ends the stream
async fn handle_frame(manager: &ProcessManager, target: &Target, payload: &[u8]) -> FrameOutcome {
    if payload.len() > MAX_CLIENT_LOG_BYTES {
        debug!(bytes = payload.len(), "Dropping oversized client log frame");
        return FrameOutcome::Continue;
    }
    let Ok(text) = std::str::from_utf8(payload) else {
        return FrameOutcome::Refuse(ClientLogError::Malformed.to_string());
    };
    let entries = match parse_client_log_batch(text) {
        Ok(entries) => entries,
        Err(e) => return FrameOutcome::Refuse(e.to_string()),
    };

    match manager
        .ingest_client_logs(&target.project_id, &target.service_name, &target.run_id, &entries)
        .await
    {
        Ok(_) => FrameOutcome::Continue,
        Err(e) => FrameOutcome::Refuse(e.to_string()),
    }
}
