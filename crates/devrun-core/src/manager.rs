//! Manager - session registry and lifecycle authority
//!
//! The registry maps each [`ServiceKey`] to at most one live [`Session`].
//! `start`, `stop` and `restart` hold the registry lock for their whole
//! check-and-act step, including the history append, so for one key the
//! history always reads start < stop_requested/restart_requested < exit.
//! Nothing waits on a timer while holding the lock.
//!
//! Exit handling is gated on identity: a session's exit may only remove the
//! registry entry if the entry is still that exact `Arc`. A restart marks the
//! outgoing run id as replaced; the marker is consumed by that run's exit.

mod config;
mod recent;
mod run_info;


pub use config::{default_shell, ManagerConfig};
pub use run_info::{RunInfo, RunningService, StopAllReport};

use crate::client_log::ClientLogEntry;
use crate::error::{Error, Result};
use crate::ports;
use crate::runner::{
    RunnerEvent, SpawnRequest, SpawnedProcess, Spawner, SystemSpawner, TerminalMode,
};
use crate::runtime::ServiceStatus;
use crate::service::{ServiceKey, ServiceTarget};
use crate::session::Session;
use crate::transcript::tail_chars;
use crate::viewer::{ViewerHandle, ViewerId};
use devrun_history::{HistoryEventType, HistoryPage, NewHistoryEvent, ServiceHistoryStore};
use recent::{RecentLog, RecentLogs};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Smallest geometry forwarded to a terminal
const MIN_COLS: u16 = 20;
const MIN_ROWS: u16 = 8;

/// How often `stop_all` checks for remaining sessions
const STOP_ALL_POLL: Duration = Duration::from_millis(50);

struct Registry {
    sessions: HashMap<ServiceKey, Arc<Session>>,
    recent: RecentLogs,
    replaced: HashSet<String>,
}

struct Inner {
    config: ManagerConfig,
    history: Arc<ServiceHistoryStore>,
    spawner: Arc<dyn Spawner>,
    registry: Mutex<Registry>,
}

/// Supervises one process per (project, service)
#[derive(Clone)]
pub struct ProcessManager {
    inner: Arc<Inner>,
}

impl ProcessManager {
    /// Create a manager spawning real processes
    #[must_use]
    pub fn new(config: ManagerConfig, history: Arc<ServiceHistoryStore>) -> Self {
        Self::with_spawner(config, history, Arc::new(SystemSpawner))
    }

    /// Create a manager with a custom spawner
    #[must_use]
    pub fn with_spawner(
        config: ManagerConfig,
        history: Arc<ServiceHistoryStore>,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        let registry = Registry {
            sessions: HashMap::new(),
            recent: RecentLogs::new(config.max_recent_logs),
            replaced: HashSet::new(),
        };
        Self {
            inner: Arc::new(Inner {
                config,
                history,
                spawner,
                registry: Mutex::new(registry),
            }),
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Start a service; returns the existing session if one is live
    pub async fn start(&self, target: &ServiceTarget) -> Result<Arc<Session>> {
        let mut registry = self.inner.registry.lock().await;
        self.inner.start_locked(&mut registry, target).await
    }

    /// Ask a live session to stop; false if nothing is running
    ///
    /// Returns right after the interrupt. The process gets the configured
    /// grace window before it is killed.
    pub async fn stop(&self, project_id: &str, service_name: &str) -> bool {
        let key = ServiceKey::new(project_id, service_name);
        let registry = self.inner.registry.lock().await;
        let Some(session) = registry.sessions.get(&key).cloned() else {
            return false;
        };

        session.lock().stop_requested = true;
        self.inner
            .record(
                NewHistoryEvent::new(project_id, service_name, HistoryEventType::StopRequested)
                    .with_run_id(session.run_id()),
            )
            .await;

        if let Err(e) = session.runner().interrupt() {
            warn!(key = %key, error = %e, "Interrupt failed, killing");
            if let Err(e) = session.runner().kill() {
                warn!(key = %key, error = %e, "Kill failed");
            }
        }
        drop(registry);

        info!(key = %key, run_id = %session.run_id(), "Stop requested");
        self.schedule_kill(session);
        true
    }

    /// Replace the live session (if any) with a fresh run
    ///
    /// The outgoing run is killed and unregistered under the lock. Waiting for
    /// a strict port to be released happens with the lock dropped; the
    /// following start re-checks the key, so a start that slipped in between
    /// is returned instead of spawning a second run.
    pub async fn restart(&self, target: &ServiceTarget) -> Result<Arc<Session>> {
        let key = target.key();
        let mut registry = self.inner.registry.lock().await;
        let outgoing = registry.sessions.get(&key).cloned();

        let mut event = NewHistoryEvent::new(
            &target.project_id,
            &target.service.name,
            HistoryEventType::RestartRequested,
        );
        if let Some(old) = &outgoing {
            event = event
                .with_run_id(old.run_id())
                .with_data(json!({ "previousRunId": old.run_id() }));
        }
        self.inner.record(event).await;

        let Some(old) = outgoing else {
            return self.inner.start_locked(&mut registry, target).await;
        };

        info!(key = %key, run_id = %old.run_id(), "Restart replacing run");
        registry.replaced.insert(old.run_id().to_string());
        if let Err(e) = old.runner().kill() {
            warn!(key = %key, error = %e, "Kill during restart failed");
        }
        registry.sessions.remove(&key);

        let Some(port) = target.service.port else {
            return self.inner.start_locked(&mut registry, target).await;
        };
        drop(registry);

        if !ports::wait_for_port_release(port, self.inner.config.port_release_timeout).await {
            debug!(key = %key, port, "Port still held after restart kill");
        }
        let mut registry = self.inner.registry.lock().await;
        self.inner.start_locked(&mut registry, target).await
    }

    /// Forward raw input and record any command lines it completes
    pub async fn write_input(&self, project_id: &str, service_name: &str, input: &str) -> bool {
        let Some(session) = self.session(project_id, service_name).await else {
            return false;
        };
        if let Err(e) = session.runner().write(input.as_bytes()) {
            warn!(key = %session.key(), error = %e, "Input write failed");
            return false;
        }

        let lines = session.lock().input.feed(input);
        for line in lines {
            self.inner
                .record(
                    NewHistoryEvent::new(project_id, service_name, HistoryEventType::StdinCommand)
                        .with_run_id(session.run_id())
                        .with_data(json!({ "command": line })),
                )
                .await;
        }
        true
    }

    /// Resize the terminal, flooring at 20x8
    pub async fn resize(&self, project_id: &str, service_name: &str, cols: u16, rows: u16) -> bool {
        let Some(session) = self.session(project_id, service_name).await else {
            return false;
        };
        if let Err(e) = session
            .runner()
            .resize(cols.max(MIN_COLS), rows.max(MIN_ROWS))
        {
            debug!(key = %session.key(), error = %e, "Resize failed");
        }
        true
    }

    /// Attach a viewer to the live run, returning its run id
    pub async fn attach(
        &self,
        project_id: &str,
        service_name: &str,
        viewer: ViewerHandle,
        replay: bool,
        expected_run_id: Option<&str>,
    ) -> Result<String> {
        let session = self
            .session(project_id, service_name)
            .await
            .ok_or(Error::NotRunning)?;

        if let Some(expected) = expected_run_id {
            if expected != session.run_id() {
                return Err(Error::RunMismatch {
                    expected: expected.to_string(),
                    active: session.run_id().to_string(),
                });
            }
        }

        let viewer_id = viewer.id();
        session.attach(viewer, replay, self.inner.config.ready_grace)?;
        debug!(key = %session.key(), viewer = %viewer_id, replay, "Viewer attached");
        Ok(session.run_id().to_string())
    }

    /// Detach a viewer; the process keeps running
    pub async fn detach(&self, project_id: &str, service_name: &str, viewer: ViewerId) -> bool {
        match self.session(project_id, service_name).await {
            Some(session) => session.detach(viewer),
            None => false,
        }
    }

    /// Status of a service: live session, else last ended run, else empty
    pub async fn run_info(&self, project_id: &str, service_name: &str) -> RunInfo {
        let key = ServiceKey::new(project_id, service_name);
        let registry = self.inner.registry.lock().await;
        if let Some(session) = registry.sessions.get(&key) {
            return RunInfo::from_session(session, self.inner.config.ready_grace);
        }
        registry
            .recent
            .get(&key)
            .map(RunInfo::from_recent)
            .unwrap_or_default()
    }

    /// Last `chars` characters of the live or last ended run
    ///
    /// Empty when `expected_run_id` names a different run.
    pub async fn log_tail(
        &self,
        project_id: &str,
        service_name: &str,
        chars: usize,
        expected_run_id: Option<&str>,
    ) -> String {
        if chars == 0 {
            return String::new();
        }
        let key = ServiceKey::new(project_id, service_name);
        let registry = self.inner.registry.lock().await;
        let matches = |run_id: &str| expected_run_id.map_or(true, |expected| expected == run_id);

        if let Some(session) = registry.sessions.get(&key) {
            if !matches(session.run_id()) {
                return String::new();
            }
            return session.lock().transcript.tail(chars).to_string();
        }
        match registry.recent.get(&key) {
            Some(recent) if matches(&recent.run_id) => {
                tail_chars(&recent.transcript, chars).to_string()
            }
            _ => String::new(),
        }
    }

    /// Live session owning `run_id`, the only run client logs may target
    pub async fn validate_client_log_target(
        &self,
        project_id: &str,
        service_name: &str,
        run_id: &str,
    ) -> Result<Arc<Session>> {
        let session = self
            .session(project_id, service_name)
            .await
            .ok_or(Error::NotRunning)?;
        if session.run_id() != run_id {
            return Err(Error::RunMismatch {
                expected: run_id.to_string(),
                active: session.run_id().to_string(),
            });
        }
        Ok(session)
    }

    /// Write browser log entries into the run's transcript and history
    ///
    /// Returns how many entries were accepted. Fails when `run_id` is not the
    /// live run.
    pub async fn ingest_client_logs(
        &self,
        project_id: &str,
        service_name: &str,
        run_id: &str,
        entries: &[ClientLogEntry],
    ) -> Result<usize> {
        let session = self
            .validate_client_log_target(project_id, service_name, run_id)
            .await?;

        for entry in entries {
            if !session.append_external_line(&entry.terminal_line()) {
                return Err(Error::NotRunning);
            }
            self.inner
                .record(
                    NewHistoryEvent::new(project_id, service_name, HistoryEventType::ClientLog)
                        .with_run_id(run_id)
                        .with_data(json!({
                            "level": entry.level,
                            "ts": entry.ts,
                            "message": entry.message,
                            "path": entry.path,
                            "source": entry.source,
                            "clientId": entry.client_id,
                        })),
                )
                .await;
        }
        debug!(key = %session.key(), run_id, count = entries.len(), "Client logs ingested");
        Ok(entries.len())
    }

    /// Every live session
    pub async fn list_running(&self) -> Vec<RunningService> {
        let registry = self.inner.registry.lock().await;
        let mut running: Vec<RunningService> = registry
            .sessions
            .iter()
            .map(|(key, session)| RunningService {
                key: key.clone(),
                info: RunInfo::from_session(session, self.inner.config.ready_grace),
            })
            .collect();
        running.sort_by(|a, b| a.key.cmp(&b.key));
        running
    }

    /// Stop everything, wait up to `timeout`, then kill what is left
    pub async fn stop_all(&self, timeout: Duration) -> StopAllReport {
        let keys: Vec<ServiceKey> = {
            let registry = self.inner.registry.lock().await;
            registry.sessions.keys().cloned().collect()
        };
        for key in &keys {
            self.stop(&key.project_id, &key.service_name).await;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = self.inner.registry.lock().await.sessions.len();
            if remaining == 0 || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(STOP_ALL_POLL).await;
        }

        let stragglers: Vec<Arc<Session>> = {
            let registry = self.inner.registry.lock().await;
            registry.sessions.values().cloned().collect()
        };
        for session in &stragglers {
            warn!(key = %session.key(), "Session outlived shutdown grace, killing");
            if let Err(e) = session.runner().kill() {
                warn!(key = %session.key(), error = %e, "Kill failed");
            }
        }

        info!(requested = keys.len(), forced = stragglers.len(), "All sessions stopped");
        StopAllReport {
            requested: keys.len(),
            forced: stragglers.len(),
        }
    }

    /// Live session for a key
    pub async fn session(&self, project_id: &str, service_name: &str) -> Option<Arc<Session>> {
        let key = ServiceKey::new(project_id, service_name);
        self.inner.registry.lock().await.sessions.get(&key).cloned()
    }

    /// Cursor read of a service's history
    pub async fn history(
        &self,
        project_id: &str,
        service_name: &str,
        after_seq: u64,
        limit: usize,
    ) -> HistoryPage {
        self.inner
            .history
            .list(project_id, service_name, after_seq, limit)
            .await
    }

    /// Drop every history bucket of a project
    pub async fn clear_history_for_project(&self, project_id: &str) -> Result<bool> {
        Ok(self.inner.history.clear_project(project_id).await?)
    }

    /// Events kept per history bucket
    #[must_use]
    pub fn history_retention(&self) -> usize {
        self.inner.history.retention()
    }

    fn schedule_kill(&self, session: Arc<Session>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.stop_grace).await;
            let still_registered = {
                let registry = inner.registry.lock().await;
                registry
                    .sessions
                    .get(session.key())
                    .is_some_and(|current| Arc::ptr_eq(current, &session))
            };
            if still_registered {
                info!(key = %session.key(), run_id = %session.run_id(), "Stop grace elapsed, killing");
                if let Err(e) = session.runner().kill() {
                    warn!(key = %session.key(), error = %e, "Kill failed");
                }
            }
        });
    }
}

impl Inner {
    async fn start_locked(
        self: &Arc<Self>,
        registry: &mut Registry,
        target: &ServiceTarget,
    ) -> Result<Arc<Session>> {
        let key = target.key();
        if let Some(existing) = registry.sessions.get(&key) {
            return Ok(Arc::clone(existing));
        }

        if let Some(port) = target.service.port {
            if !ports::is_port_available(port) {
                warn!(key = %key, port, "Configured port is in use");
                return Err(Error::PortUnavailable { port });
            }
        }

        let cwd = target.working_dir();
        let request = SpawnRequest {
            command: target.service.cmd.clone(),
            cwd: cwd.clone(),
            shell: self.config.shell.clone(),
            strip_env: self.config.strip_env.clone(),
            cols: self.config.pty_cols,
            rows: self.config.pty_rows,
        };
        let SpawnedProcess {
            runner,
            events,
            pty_error,
        } = self.spawner.spawn(&request)?;

        registry.recent.remove(&key);
        let run_id = Uuid::new_v4().to_string();
        let mode = runner.mode();
        let session = Arc::new(Session::new(
            key.clone(),
            run_id.clone(),
            target.service.cmd.clone(),
            cwd.clone(),
            runner,
            pty_error.as_deref(),
            self.config.max_log_chars,
        ));
        registry.sessions.insert(key.clone(), Arc::clone(&session));

        self.record(
            NewHistoryEvent::new(&key.project_id, &key.service_name, HistoryEventType::Start)
                .with_run_id(&run_id)
                .with_data(json!({
                    "cmd": target.service.cmd,
                    "cwd": cwd.display().to_string(),
                    "mode": mode,
                    "ptyAvailable": mode == TerminalMode::Pty,
                })),
        )
        .await;

        tokio::spawn(Arc::clone(self).pump(Arc::clone(&session), events));

        info!(key = %key, run_id = %run_id, mode = %mode, pid = ?session.pid(), "Service started");
        Ok(session)
    }

    /// Drive a session's output until its exit event
    async fn pump(
        self: Arc<Self>,
        session: Arc<Session>,
        mut events: mpsc::UnboundedReceiver<RunnerEvent>,
    ) {
        let mut exit_code = None;
        while let Some(event) = events.recv().await {
            match event {
                RunnerEvent::Output(chunk) => session.ingest_output(&chunk),
                RunnerEvent::Exit(code) => {
                    exit_code = Some(code);
                    break;
                }
            }
        }
        self.handle_exit(&session, exit_code.unwrap_or(1)).await;
    }

    async fn handle_exit(&self, session: &Arc<Session>, exit_code: i32) {
        let snapshot = session.finish(exit_code);
        let key = session.key().clone();

        let mut registry = self.registry.lock().await;
        // A stop holding the lock before us has set this by now
        let stop_requested = session.lock().stop_requested;
        let replaced = registry.replaced.remove(session.run_id());
        let current = registry
            .sessions
            .get(&key)
            .is_some_and(|s| Arc::ptr_eq(s, session));
        if current {
            registry.sessions.remove(&key);
        }
        // A replacement already owns the key; its status must not be shadowed
        if !registry.sessions.contains_key(&key) {
            registry.recent.insert(
                key.clone(),
                RecentLog {
                    run_id: session.run_id().to_string(),
                    transcript: snapshot.transcript,
                    exit_code,
                    exited_at: snapshot.exited_at,
                    started_at: session.started_at(),
                    runtime: snapshot.runtime,
                    command: session.command().to_string(),
                    cwd: session.cwd().to_path_buf(),
                    exit_was_restart_replace: replaced,
                    exit_was_stop_request: stop_requested,
                },
            );
        }

        self.record(
            NewHistoryEvent::new(&key.project_id, &key.service_name, HistoryEventType::Exit)
                .with_run_id(session.run_id())
                .with_data(json!({
                    "exitCode": exit_code,
                    "replacedByRestart": replaced,
                    "stopRequested": stop_requested,
                })),
        )
        .await;
        drop(registry);

        let status = if exit_code != 0 && !replaced && !stop_requested {
            ServiceStatus::Error
        } else {
            ServiceStatus::Stopped
        };
        info!(
            key = %key,
            run_id = %session.run_id(),
            exit_code,
            replaced,
            stop_requested,
            status = %status,
            "Service exited"
        );
    }

    /// Append to history; persistence failures are logged, never fatal
    async fn record(&self, event: NewHistoryEvent) {
        let event_type = event.event_type;
        if let Err(e) = self.history.append(event).await {
            warn!(event_type = %event_type, error = %e, "Failed to persist history event");
        }
    }
}
