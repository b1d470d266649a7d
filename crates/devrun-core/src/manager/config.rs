//! Manager configuration

use std::time::Duration;

/// Knobs of a [`super::ProcessManager`]
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Shell used as `<shell> -lc <command>`
    pub shell: String,
    /// Wait between interrupt and forced kill on stop
    pub stop_grace: Duration,
    /// Quiet period after which a run counts as ready
    pub ready_grace: Duration,
    /// Transcript cap per run, in characters
    pub max_log_chars: usize,
    /// Ended runs kept for status and log queries
    pub max_recent_logs: usize,
    /// Environment keys never passed to children
    pub strip_env: Vec<String>,
    /// Initial terminal columns
    pub pty_cols: u16,
    /// Initial terminal rows
    pub pty_rows: u16,
    /// How long a restart waits for the outgoing run to free a strict port
    pub port_release_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            stop_grace: Duration::from_millis(1200),
            ready_grace: Duration::from_millis(2500),
            max_log_chars: 120_000,
            max_recent_logs: 100,
            strip_env: vec!["PORT".to_string()],
            pty_cols: 120,
            pty_rows: 32,
            port_release_timeout: Duration::from_millis(1500),
        }
    }
}

/// `$SHELL`, else `/bin/sh`
#[must_use]
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}
