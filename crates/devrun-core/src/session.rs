//! Session - one live run of a service
//!
//! Immutable facts about the run (key, run id, start time, runner) sit on the
//! struct; everything the output pump mutates lives in [`SessionState`] behind
//! a short-lived std mutex. Holding that lock while appending output and
//! fanning it out is what keeps replay and live delivery free of gaps and
//! duplicates.

use crate::error::{Error, Result};
use crate::input::InputLineBuffer;
use crate::runner::{ProcessRunner, TerminalMode};
use crate::runtime::{RuntimeState, ServiceStatus};
use crate::service::ServiceKey;
use crate::transcript::Transcript;
use crate::viewer::{ViewerHandle, ViewerId, ViewerMessage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Mutable part of a session
pub(crate) struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) clients: HashMap<ViewerId, ViewerHandle>,
    pub(crate) input: InputLineBuffer,
    pub(crate) stop_requested: bool,
    pub(crate) exited: bool,
    pub(crate) runtime: RuntimeState,
}

impl SessionState {
    /// Send to every viewer, dropping the ones that went away
    fn broadcast(&mut self, message: &ViewerMessage) {
        self.clients.retain(|_, viewer| viewer.send(message.clone()));
    }
}

/// What the exit handler keeps once a run has ended
pub(crate) struct ExitSnapshot {
    pub(crate) transcript: String,
    pub(crate) runtime: RuntimeState,
    pub(crate) exited_at: DateTime<Utc>,
}

/// One live run
pub struct Session {
    key: ServiceKey,
    run_id: String,
    command: String,
    cwd: PathBuf,
    started_at: DateTime<Utc>,
    started: Instant,
    runner: Box<dyn ProcessRunner>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(
        key: ServiceKey,
        run_id: String,
        command: String,
        cwd: PathBuf,
        runner: Box<dyn ProcessRunner>,
        pty_error: Option<&str>,
        max_log_chars: usize,
    ) -> Self {
        let mode = runner.mode();
        let mut runtime = RuntimeState::new(mode);
        let mut transcript = Transcript::new(max_log_chars);

        transcript.push(&format!("\r\n[run {run_id}]\r\n$ {command}\r\n"));
        if let Some(reason) = pty_error {
            transcript.push(&format!(
                "\r\n[pty unavailable, using pipe mode: {reason}]\r\n"
            ));
            runtime.add_warning(format!("PTY unavailable, using pipe mode: {reason}"));
        }

        Self {
            key,
            run_id,
            command,
            cwd,
            started_at: Utc::now(),
            started: Instant::now(),
            runner,
            state: Mutex::new(SessionState {
                transcript,
                clients: HashMap::new(),
                input: InputLineBuffer::default(),
                stop_requested: false,
                exited: false,
                runtime,
            }),
        }
    }

    /// Registry key
    #[must_use]
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// Run id minted at start
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Command line
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Working directory
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Start time
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Attachment mode
    #[must_use]
    pub fn mode(&self) -> TerminalMode {
        self.runner.mode()
    }

    /// OS process id
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.runner.pid()
    }

    /// Number of attached viewers
    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.lock().clients.len()
    }

    /// Copy of the inferred runtime metadata
    #[must_use]
    pub fn runtime(&self) -> RuntimeState {
        self.lock().runtime.clone()
    }

    /// Whether the run is believed usable
    #[must_use]
    pub fn is_ready(&self, grace: Duration) -> bool {
        self.lock().runtime.is_ready(self.started.elapsed(), grace)
    }

    pub(crate) fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a chunk, update metadata and deliver it live
    pub(crate) fn ingest_output(&self, chunk: &str) {
        let mut state = self.lock();
        state.transcript.push(chunk);
        state.runtime.absorb(chunk);
        state.broadcast(&ViewerMessage::Output {
            data: chunk.to_string(),
        });
    }

    /// Append a line that did not come from the child itself
    ///
    /// Viewers see it like any other output; it never feeds URL or readiness
    /// detection. False once the run has ended.
    pub(crate) fn append_external_line(&self, line: &str) -> bool {
        let mut state = self.lock();
        if state.exited {
            return false;
        }
        state.transcript.push(line);
        state.broadcast(&ViewerMessage::Output {
            data: line.to_string(),
        });
        true
    }

    /// Add a viewer: meta first, then the optional replay burst
    pub(crate) fn attach(&self, viewer: ViewerHandle, replay: bool, grace: Duration) -> Result<()> {
        let mut state = self.lock();
        if state.exited {
            return Err(Error::NotRunning);
        }

        viewer.send(self.meta(&state, grace));
        if replay && !state.transcript.is_empty() {
            viewer.send(ViewerMessage::Output {
                data: state.transcript.as_str().to_string(),
            });
        }
        state.clients.insert(viewer.id(), viewer);
        Ok(())
    }

    /// Remove a viewer; the process keeps running
    pub(crate) fn detach(&self, viewer: ViewerId) -> bool {
        self.lock().clients.remove(&viewer).is_some()
    }

    /// Close out the run: final line, exit notice, drop every viewer
    pub(crate) fn finish(&self, exit_code: i32) -> ExitSnapshot {
        let mut state = self.lock();
        state.exited = true;

        let line = format!("\r\n[process exited {exit_code}]\r\n");
        state.transcript.push(&line);
        state.broadcast(&ViewerMessage::Output { data: line });
        state.broadcast(&ViewerMessage::Exited {
            exit_code,
            run_id: self.run_id.clone(),
        });
        state.clients.clear();

        ExitSnapshot {
            transcript: state.transcript.as_str().to_string(),
            runtime: state.runtime.clone(),
            exited_at: Utc::now(),
        }
    }

    fn meta(&self, state: &SessionState, grace: Duration) -> ViewerMessage {
        let ready = state.runtime.is_ready(self.started.elapsed(), grace);
        ViewerMessage::Meta {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            status: if ready {
                ServiceStatus::Ready
            } else {
                ServiceStatus::Starting
            },
            ready,
            mode: state.runtime.terminal_mode,
            pty_available: state.runtime.pty_available,
            warnings: state.runtime.warnings.clone(),
            effective_url: state.runtime.effective_url.clone(),
            port: state.runtime.port,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("run_id", &self.run_id)
            .field("mode", &self.runner.mode())
            .field("started_at", &self.started_at)
            .finish()
    }
}
