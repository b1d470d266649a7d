//! Plain-pipe runner, used when no pseudo-terminal is available

use super::env::child_env;
use super::group::ProcessGroup;
use super::{pump_output, wait_for_exit, ProcessRunner, SpawnRequest, SpawnedProcess, TerminalMode};
use crate::error::{Error, Result};
use nix::sys::signal::Signal;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

pub(crate) struct PipeRunner {
    pid: Option<u32>,
    group: ProcessGroup,
    stdin: mpsc::UnboundedSender<Vec<u8>>,
}

impl ProcessRunner for PipeRunner {
    fn mode(&self) -> TerminalMode {
        TerminalMode::Pipe
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        self.stdin
            .send(data.to_vec())
            .map_err(|_| Error::Spawn("stdin closed".to_string()))
    }

    fn resize(&self, _cols: u16, _rows: u16) -> Result<()> {
        Ok(())
    }

    fn interrupt(&self) -> Result<()> {
        self.group.signal(Signal::SIGINT)
    }

    fn kill(&self) -> Result<()> {
        self.group.signal(Signal::SIGKILL)
    }
}

/// Spawn the command with piped stdio in a new process group
pub(crate) fn spawn(request: &SpawnRequest) -> Result<SpawnedProcess> {
    let mut command = tokio::process::Command::new(&request.shell);
    command
        .arg("-lc")
        .arg(&request.command)
        .current_dir(&request.cwd)
        .env_clear()
        .envs(child_env(&request.strip_env))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| Error::Spawn(format!("failed to spawn {}: {e}", request.shell)))?;
    let pid = child.id();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    if let Some(mut stdin) = child.stdin.take() {
        tokio::spawn(async move {
            while let Some(bytes) = stdin_rx.recv().await {
                if let Err(e) = stdin.write_all(&bytes).await {
                    debug!(error = %e, "stdin write failed");
                    break;
                }
                let _ = stdin.flush().await;
            }
        });
    }

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(pump_output(stdout, event_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(pump_output(stderr, event_tx.clone()));
    }

    tokio::spawn(wait_for_exit(child, readers, event_tx));

    debug!(pid = ?pid, shell = %request.shell, "Spawned pipe child");

    Ok(SpawnedProcess {
        runner: Box::new(PipeRunner {
            pid,
            group: ProcessGroup::new(pid),
            stdin: stdin_tx,
        }),
        events: event_rx,
        pty_error: None,
    })
}
