//! RunInfo - read-only status view of a live or recently ended run

use super::recent::RecentLog;
use crate::runner::TerminalMode;
use crate::runtime::ServiceStatus;
use crate::service::ServiceKey;
use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Status snapshot of one service
///
/// `Default` is the "never run" view: not running, no status, no run id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    /// Whether a live session exists
    pub running: bool,
    /// Starting/ready while live, stopped/error afterwards
    pub status: Option<ServiceStatus>,
    /// Whether the run is believed usable
    pub ready: bool,
    /// Live run, or the run that ended last
    pub run_id: Option<String>,
    /// Start of that run
    pub started_at: Option<DateTime<Utc>>,
    /// End of that run, if it ended
    pub exited_at: Option<DateTime<Utc>>,
    /// Attachment mode
    pub terminal_mode: Option<TerminalMode>,
    /// Whether a pseudo-terminal could be allocated
    pub pty_available: bool,
    /// Warnings seen during the run
    pub warnings: Vec<String>,
    /// URL a human would open
    pub effective_url: Option<String>,
    /// Port of the effective URL
    pub port: Option<u16>,
    /// Exit code of the ended run
    pub last_exit_code: Option<i32>,
    /// The run was ended by a restart
    pub exit_was_restart_replace: bool,
    /// The run was ended by an operator stop
    pub exit_was_stop_request: bool,
    /// Command line
    pub cmd: Option<String>,
    /// Working directory
    pub cwd: Option<String>,
    /// Attached viewers
    pub viewers: usize,
}

impl RunInfo {
    pub(crate) fn from_session(session: &Session, ready_grace: Duration) -> Self {
        let state = session.lock();
        let ready = state.runtime.is_ready(session.elapsed(), ready_grace);
        Self {
            running: true,
            status: Some(if ready {
                ServiceStatus::Ready
            } else {
                ServiceStatus::Starting
            }),
            ready,
            run_id: Some(session.run_id().to_string()),
            started_at: Some(session.started_at()),
            exited_at: None,
            terminal_mode: Some(state.runtime.terminal_mode),
            pty_available: state.runtime.pty_available,
            warnings: state.runtime.warnings.clone(),
            effective_url: state.runtime.effective_url.clone(),
            port: state.runtime.port,
            last_exit_code: None,
            exit_was_restart_replace: false,
            exit_was_stop_request: false,
            cmd: Some(session.command().to_string()),
            cwd: Some(session.cwd().display().to_string()),
            viewers: state.clients.len(),
        }
    }

    pub(crate) fn from_recent(recent: &RecentLog) -> Self {
        let crashed = recent.exit_code != 0
            && !recent.exit_was_restart_replace
            && !recent.exit_was_stop_request;
        Self {
            running: false,
            status: Some(if crashed {
                ServiceStatus::Error
            } else {
                ServiceStatus::Stopped
            }),
            ready: false,
            run_id: Some(recent.run_id.clone()),
            started_at: Some(recent.started_at),
            exited_at: Some(recent.exited_at),
            terminal_mode: Some(recent.runtime.terminal_mode),
            pty_available: recent.runtime.pty_available,
            warnings: recent.runtime.warnings.clone(),
            effective_url: recent.runtime.effective_url.clone(),
            port: recent.runtime.port,
            last_exit_code: Some(recent.exit_code),
            exit_was_restart_replace: recent.exit_was_restart_replace,
            exit_was_stop_request: recent.exit_was_stop_request,
            cmd: Some(recent.command.clone()),
            cwd: Some(recent.cwd.display().to_string()),
            viewers: 0,
        }
    }
}

/// A live session as listed by [`super::ProcessManager::list_running`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningService {
    /// Which service
    #[serde(flatten)]
    pub key: ServiceKey,
    /// Its status
    #[serde(flatten)]
    pub info: RunInfo,
}

/// Outcome of [`super::ProcessManager::stop_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopAllReport {
    /// Sessions asked to stop
    pub requested: usize,
    /// Sessions still alive at the deadline and killed
    pub forced: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeState;
    use std::path::PathBuf;

    fn recent(exit_code: i32, replaced: bool, stopped: bool) -> RecentLog {
        RecentLog {
            run_id: "r1".to_string(),
            transcript: String::new(),
            exit_code,
            exited_at: Utc::now(),
            started_at: Utc::now(),
            runtime: RuntimeState::new(TerminalMode::Pipe),
            command: "make".to_string(),
            cwd: PathBuf::from("/tmp"),
            exit_was_restart_replace: replaced,
            exit_was_stop_request: stopped,
        }
    }

    #[test]
    fn test_status_from_exit() {
        assert_eq!(
            RunInfo::from_recent(&recent(0, false, false)).status,
            Some(ServiceStatus::Stopped)
        );
        assert_eq!(
            RunInfo::from_recent(&recent(1, false, false)).status,
            Some(ServiceStatus::Error)
        );
        assert_eq!(
            RunInfo::from_recent(&recent(137, true, false)).status,
            Some(ServiceStatus::Stopped)
        );
        assert_eq!(
            RunInfo::from_recent(&recent(130, false, true)).status,
            Some(ServiceStatus::Stopped)
        );
    }

    #[test]
    fn test_never_run_is_empty() {
        let info = RunInfo::default();
        assert!(!info.running);
        assert!(info.status.is_none());
        assert!(info.run_id.is_none());

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["running"], false);
        assert!(value["status"].is_null());
    }

    #[test]
    fn test_running_service_flattens() {
        let listed = RunningService {
            key: ServiceKey::new("web", "api"),
            info: RunInfo::from_recent(&recent(0, false, false)),
        };
        let value = serde_json::to_value(&listed).unwrap();
        assert_eq!(value["projectId"], "web");
        assert_eq!(value["serviceName"], "api");
        assert_eq!(value["runId"], "r1");
        assert_eq!(value["status"], "stopped");
    }
}
