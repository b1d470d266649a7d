//! Pseudo-terminal backed runner

use super::env::child_env;
use super::group::ProcessGroup;
use super::{pump_output, wait_for_exit, ProcessRunner, SpawnRequest, SpawnedProcess, TerminalMode};
use crate::error::{Error, Result};
use nix::sys::signal::Signal;
use pty_process::Size;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

/// Ctrl-C as typed on a terminal
const INTERRUPT_BYTE: u8 = 0x03;

enum PtyControl {
    Write(Vec<u8>),
    Resize { cols: u16, rows: u16 },
}

pub(crate) struct PtyRunner {
    pid: Option<u32>,
    group: ProcessGroup,
    control: mpsc::UnboundedSender<PtyControl>,
}

impl PtyRunner {
    fn send(&self, control: PtyControl) -> Result<()> {
        self.control
            .send(control)
            .map_err(|_| Error::Spawn("pty writer closed".to_string()))
    }
}

impl ProcessRunner for PtyRunner {
    fn mode(&self) -> TerminalMode {
        TerminalMode::Pty
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        self.send(PtyControl::Write(data.to_vec()))
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.send(PtyControl::Resize { cols, rows })
    }

    fn interrupt(&self) -> Result<()> {
        self.send(PtyControl::Write(vec![INTERRUPT_BYTE]))
    }

    fn kill(&self) -> Result<()> {
        self.group.signal(Signal::SIGKILL)
    }
}

/// Allocate a pty and spawn the command on it
pub(crate) fn spawn(request: &SpawnRequest) -> Result<SpawnedProcess> {
    let (pty, pts) =
        pty_process::open().map_err(|e| Error::Spawn(format!("failed to open pty: {e}")))?;
    pty.resize(Size::new(request.rows, request.cols))
        .map_err(|e| Error::Spawn(format!("failed to size pty: {e}")))?;

    // Builder methods consume self
    let mut command = pty_process::Command::new(&request.shell)
        .args(["-lc", request.command.as_str()])
        .env_clear();
    for (key, value) in child_env(&request.strip_env) {
        command = command.env(key, value);
    }
    command = command
        .env("TERM", "xterm-256color")
        .current_dir(&request.cwd);

    // The child calls setsid, so its pid doubles as the process group id
    let child = command
        .spawn(pts)
        .map_err(|e| Error::Spawn(format!("failed to spawn {}: {e}", request.shell)))?;
    let pid = child.id();

    let (reader, mut writer) = pty.into_split();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<PtyControl>();

    tokio::spawn(async move {
        while let Some(control) = control_rx.recv().await {
            match control {
                PtyControl::Write(bytes) => {
                    if let Err(e) = writer.write_all(&bytes).await {
                        debug!(error = %e, "PTY write failed");
                        break;
                    }
                }
                PtyControl::Resize { cols, rows } => {
                    if let Err(e) = writer.resize(Size::new(rows, cols)) {
                        debug!(error = %e, "PTY resize failed");
                    }
                }
            }
        }
    });

    // Reads fail with EIO once the last holder of the terminal side exits
    let reader_task = pump_output(reader, event_tx.clone());

    tokio::spawn(wait_for_exit(child, vec![reader_task], event_tx));

    debug!(pid = ?pid, shell = %request.shell, "Spawned pty child");

    Ok(SpawnedProcess {
        runner: Box::new(PtyRunner {
            pid,
            group: ProcessGroup::new(pid),
            control: control_tx,
        }),
        events: event_rx,
        pty_error: None,
    })
}
