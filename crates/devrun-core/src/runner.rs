//! Runner - child processes behind one capability surface
//!
//! Two implementations exist:
//! - pty: full interactive terminal, resizable
//! - pipe: plain stdio pipes, used when no terminal device can be allocated
//!
//! Both run `<shell> -lc <command>` in their own process group and report
//! through a [`RunnerEvent`] channel: output chunks in production order, then
//! exactly one exit event.

mod decoder;
mod env;
mod group;
mod pipe;
mod pty;


use crate::error::Result;
use decoder::Utf8Decoder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

pub use env::child_env;

/// Time allowed for readers to drain after the child exits
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Size of a single read from the child
const READ_CHUNK: usize = 8192;

/// How a child is attached to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalMode {
    /// Pseudo-terminal
    Pty,
    /// Plain pipes
    Pipe,
}

impl TerminalMode {
    /// Returns the string representation of the mode
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pty => "pty",
            Self::Pipe => "pipe",
        }
    }
}

impl std::fmt::Display for TerminalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something a running child produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    /// Decoded output text
    Output(String),
    /// The child exited; always the last event
    Exit(i32),
}

/// Capabilities of a running child
pub trait ProcessRunner: Send + Sync {
    /// Attachment mode
    fn mode(&self) -> TerminalMode;

    /// OS process id, which is also the process group id
    fn pid(&self) -> Option<u32>;

    /// Forward raw bytes to the child's input
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Change terminal geometry; pipe runners accept and ignore it
    fn resize(&self, cols: u16, rows: u16) -> Result<()>;

    /// Ask the child to stop (Ctrl-C for pty, SIGINT to the group for pipe)
    fn interrupt(&self) -> Result<()>;

    /// Terminate the whole process group
    fn kill(&self) -> Result<()>;
}

/// What to run and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Command line handed to the shell
    pub command: String,
    /// Working directory
    pub cwd: PathBuf,
    /// Shell executable
    pub shell: String,
    /// Environment keys removed before spawning
    pub strip_env: Vec<String>,
    /// Initial terminal columns
    pub cols: u16,
    /// Initial terminal rows
    pub rows: u16,
}

/// A freshly spawned child
pub struct SpawnedProcess {
    /// Control surface
    pub runner: Box<dyn ProcessRunner>,
    /// Output and exit events
    pub events: mpsc::UnboundedReceiver<RunnerEvent>,
    /// Why the pseudo-terminal could not be used, when falling back to pipes
    pub pty_error: Option<String>,
}

impl std::fmt::Debug for SpawnedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("mode", &self.runner.mode())
            .field("pid", &self.runner.pid())
            .field("pty_error", &self.pty_error)
            .finish()
    }
}

/// Spawning seam used by the manager
#[cfg_attr(test, mockall::automock)]
pub trait Spawner: Send + Sync {
    /// Spawn a child for `request`
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess>;
}

/// Spawns real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess> {
        spawn_runner(request)
    }
}

/// Spawn with a pseudo-terminal, falling back to pipes when that fails
pub fn spawn_runner(request: &SpawnRequest) -> Result<SpawnedProcess> {
    match pty::spawn(request) {
        Ok(spawned) => Ok(spawned),
        Err(pty_error) => {
            warn!(error = %pty_error, command = %request.command, "PTY unavailable, using pipe mode");
            let mut spawned = pipe::spawn(request)?;
            spawned.pty_error = Some(pty_error.to_string());
            Ok(spawned)
        }
    }
}

/// Exit code of a finished child; signals map to `128 + signal`
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .unwrap_or_else(|| status.signal().map_or(1, |signal| 128 + signal))
}

/// Wait for the child, let the readers drain, then emit the exit event
pub(crate) async fn wait_for_exit(
    mut child: tokio::process::Child,
    readers: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedSender<RunnerEvent>,
) {
    let code = match child.wait().await {
        Ok(status) => exit_code(status),
        Err(e) => {
            warn!(error = %e, "Failed to wait for child");
            1
        }
    };

    for mut reader in readers {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
            reader.abort();
        }
    }

    let _ = events.send(RunnerEvent::Exit(code));
}

/// Forward decoded output from `reader` until it closes or fails
pub(crate) fn pump_output<R>(
    mut reader: R,
    events: mpsc::UnboundedSender<RunnerEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut decoder = Utf8Decoder::default();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let text = decoder.decode(&buf[..n]);
                    if !text.is_empty() && events.send(RunnerEvent::Output(text)).is_err() {
                        return;
                    }
                }
            }
        }
        let rest = decoder.finish();
        if !rest.is_empty() {
            let _ = events.send(RunnerEvent::Output(rest));
        }
    })
}
