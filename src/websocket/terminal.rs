//! Terminal viewer WebSocket handler
//!
//! One connection follows one service's live run: a `meta` message, an
//! optional replay burst, then live output until the run exits.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query,
    },
    response::IntoResponse,
    Extension,
};
use devrun_core::{ClientMessage, ProcessManager, ViewerHandle, ViewerMessage};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest close reason a frame may carry
const MAX_CLOSE_REASON: usize = 120;

/// Connect-time parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalQuery {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub replay: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub read_only: Option<String>,
}

impl TerminalQuery {
    fn replay(&self) -> bool {
        self.replay.as_deref().map(str::trim) != Some("0")
    }

    fn read_only(&self) -> bool {
        matches!(
            self.read_only.as_deref().map(str::trim),
            Some("1" | "true")
        )
    }

    fn expected_run_id(&self) -> Option<&str> {
        non_empty(self.run_id.as_deref())
    }
}

pub(super) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// WebSocket upgrade handler
pub async fn terminal_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<TerminalQuery>,
    Extension(manager): Extension<ProcessManager>,
    Extension(shutdown): Extension<CancellationToken>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, manager, query, shutdown))
}

pub(super) type Sender = SplitSink<WebSocket, Message>;

async fn send_message(sender: &mut Sender, message: &ViewerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode viewer message");
            true
        }
    }
}

pub(super) async fn close(sender: &mut Sender, code: u16, reason: &str) {
    let mut end = reason.len().min(MAX_CLOSE_REASON);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    let frame = CloseFrame {
        code,
        reason: Cow::Owned(reason[..end].to_string()),
    };
    let _ = sender.send(Message::Close(Some(frame))).await;
}

/// Refuse a connection: error notice, then a policy close
async fn reject(sender: &mut Sender, reason: &str) {
    send_message(
        sender,
        &ViewerMessage::Error {
            error: reason.to_string(),
        },
    )
    .await;
    close(sender, close_code::POLICY, reason).await;
}

/// Handle WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    manager: ProcessManager,
    query: TerminalQuery,
    shutdown: CancellationToken,
) {
    let (mut sender, mut receiver) = socket.split();

    let (Some(project_id), Some(service_name)) = (
        non_empty(query.project_id.as_deref()).map(str::to_string),
        non_empty(query.service_name.as_deref()).map(str::to_string),
    ) else {
        reject(&mut sender, "Missing projectId/serviceName").await;
        return;
    };

    let (viewer, mut outgoing) = ViewerHandle::channel();
    let viewer_id = viewer.id();
    let read_only = query.read_only();
    let run_id = match manager
        .attach(
            &project_id,
            &service_name,
            viewer,
            query.replay(),
            query.expected_run_id(),
        )
        .await
    {
        Ok(run_id) => run_id,
        Err(e) => {
            debug!(project_id = %project_id, service = %service_name, error = %e, "Viewer refused");
            reject(&mut sender, &e.to_string()).await;
            return;
        }
    };

    info!(
        project_id = %project_id,
        service = %service_name,
        run_id = %run_id,
        viewer = %viewer_id,
        read_only,
        "Viewer connected"
    );

    loop {
        tokio::select! {
            message = outgoing.recv() => {
                let Some(message) = message else {
                    break;
                };
                if !send_message(&mut sender, &message).await {
                    break;
                }
                if message.is_terminal() {
                    close(&mut sender, close_code::NORMAL, "Process exited").await;
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_text(&manager, &project_id, &service_name, &text, read_only).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown.cancelled() => {
                close(&mut sender, close_code::AWAY, "Server shutting down").await;
                break;
            }
        }
    }

    manager.detach(&project_id, &service_name, viewer_id).await;
    debug!(project_id = %project_id, service = %service_name, viewer = %viewer_id, "Viewer disconnected");
}

/// Apply one client frame; malformed frames are ignored
async fn handle_client_text(
    manager: &ProcessManager,
    project_id: &str,
    service_name: &str,
    text: &str,
    read_only: bool,
) {
    match ClientMessage::parse(text) {
        Some(ClientMessage::Input { data }) if !read_only => {
            manager.write_input(project_id, service_name, &data).await;
        }
        Some(ClientMessage::Input { .. }) => {}
        Some(ClientMessage::Resize { cols, rows }) => {
            manager.resize(project_id, service_name, cols, rows).await;
        }
        None => debug!(project_id, service = service_name, "Ignoring malformed viewer frame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(replay: Option<&str>, read_only: Option<&str>, run_id: Option<&str>) -> TerminalQuery {
        TerminalQuery {
            project_id: Some("shop".to_string()),
            service_name: Some("web".to_string()),
            replay: replay.map(String::from),
            run_id: run_id.map(String::from),
            read_only: read_only.map(String::from),
        }
    }

    #[test]
    fn test_replay_defaults_on() {
        assert!(query(None, None, None).replay());
        assert!(query(Some("1"), None, None).replay());
        assert!(query(Some("false"), None, None).replay());
        assert!(!query(Some("0"), None, None).replay());
    }

    #[test]
    fn test_read_only_flag() {
        assert!(!query(None, None, None).read_only());
        assert!(query(None, Some("1"), None).read_only());
        assert!(query(None, Some("true"), None).read_only());
        assert!(!query(None, Some("0"), None).read_only());
    }

    #[test]
    fn test_blank_run_id_is_ignored() {
        assert_eq!(query(None, None, Some("  ")).expected_run_id(), None);
        assert_eq!(query(None, None, Some("r1")).expected_run_id(), Some("r1"));
    }
}
