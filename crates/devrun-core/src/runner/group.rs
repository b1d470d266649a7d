//! Process-group signaling

use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::debug;

/// The group a child leads; signals reach every descendant that stayed in it
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    pub(crate) fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    /// Signal the group; a group that is already gone is not an error
    pub(crate) fn signal(&self, signal: Signal) -> Result<()> {
        let Some(pgid) = self.pgid else {
            return Ok(());
        };
        match killpg(Pid::from_raw(pgid), signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!(pgid, ?signal, "Process group already gone");
                Ok(())
            }
            Err(e) => Err(Error::Signal(format!("{signal:?} to group {pgid}: {e}"))),
        }
    }
}
