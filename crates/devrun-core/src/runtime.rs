//! Runtime metadata inferred from a run's output

use crate::runner::TerminalMode;
use crate::signals::{choose_effective_url, port_from_url, scan_chunk};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Detected URLs kept per run
pub const MAX_DETECTED_URLS: usize = 20;

/// Distinct warnings kept per run
pub const MAX_WARNINGS: usize = 12;

/// Externally visible status of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Running, no ready evidence yet
    Starting,
    /// Running and believed usable
    Ready,
    /// Ended on purpose or cleanly
    Stopped,
    /// Ended with an unexpected non-zero code
    Error,
}

impl ServiceStatus {
    /// Returns the string representation of the status
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata of one run, updated from every output chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    /// How the child is attached
    pub terminal_mode: TerminalMode,
    /// Whether a pseudo-terminal could be allocated
    pub pty_available: bool,
    /// First-seen warning lines, case-insensitively unique
    pub warnings: Vec<String>,
    /// URL a human would open
    pub effective_url: Option<String>,
    /// Port of the effective URL
    pub port: Option<u16>,
    /// Sticky: set once any ready evidence shows up
    pub ready_hint_seen: bool,
    /// Recent unique URLs, oldest first
    pub detected_urls: Vec<String>,
}

impl RuntimeState {
    /// Fresh state for a run in `mode`
    #[must_use]
    pub fn new(mode: TerminalMode) -> Self {
        Self {
            terminal_mode: mode,
            pty_available: mode == TerminalMode::Pty,
            warnings: Vec::new(),
            effective_url: None,
            port: None,
            ready_hint_seen: false,
            detected_urls: Vec::new(),
        }
    }

    /// Fold one output chunk into the state
    pub fn absorb(&mut self, chunk: &str) {
        let signals = scan_chunk(chunk);

        if !signals.urls.is_empty() {
            for url in signals.urls {
                self.remember_url(url);
            }
            if let Some(effective) = choose_effective_url(&self.detected_urls) {
                self.port = port_from_url(&effective);
                self.effective_url = Some(effective);
                self.ready_hint_seen = true;
            }
        }

        if signals.ready {
            self.ready_hint_seen = true;
        }

        for warning in signals.warnings {
            self.add_warning(warning);
        }
    }

    /// Record a warning unless an equal one (ignoring case) exists or the list is full
    pub fn add_warning(&mut self, warning: impl Into<String>) -> bool {
        let warning = warning.into();
        if self.warnings.len() >= MAX_WARNINGS {
            return false;
        }
        let lowered = warning.to_lowercase();
        if self.warnings.iter().any(|w| w.to_lowercase() == lowered) {
            return false;
        }
        self.warnings.push(warning);
        true
    }

    /// Ready once a hint was seen or the grace period has passed
    #[must_use]
    pub fn is_ready(&self, elapsed: Duration, grace: Duration) -> bool {
        self.ready_hint_seen || elapsed >= grace
    }

    fn remember_url(&mut self, url: String) {
        self.detected_urls.retain(|u| *u != url);
        self.detected_urls.push(url);
        if self.detected_urls.len() > MAX_DETECTED_URLS {
            let excess = self.detected_urls.len() - MAX_DETECTED_URLS;
            self.detected_urls.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_adoption_sets_ready_and_port() {
        let mut state = RuntimeState::new(TerminalMode::Pty);
        state.absorb("  Local: http://localhost:4327\n");

        assert_eq!(state.effective_url.as_deref(), Some("http://localhost:4327/"));
        assert_eq!(state.port, Some(4327));
        assert!(state.ready_hint_seen);
    }

    #[test]
    fn test_local_url_wins_over_newer_remote() {
        let mut state = RuntimeState::new(TerminalMode::Pty);
        state.absorb("Local:   http://localhost:5173/\n");
        state.absorb("Network: http://192.168.0.10:5173/\n");

        assert_eq!(state.effective_url.as_deref(), Some("http://localhost:5173/"));
        assert_eq!(state.detected_urls.len(), 2);
    }

    #[test]
    fn test_repeated_url_moves_to_end() {
        let mut state = RuntimeState::new(TerminalMode::Pipe);
        state.absorb("http://localhost:1/ http://localhost:2/");
        state.absorb("http://localhost:1/");
        assert_eq!(
            state.detected_urls,
            vec!["http://localhost:2/".to_string(), "http://localhost:1/".to_string()]
        );
        assert_eq!(state.port, Some(1));
    }

    #[test]
    fn test_detected_urls_capped() {
        let mut state = RuntimeState::new(TerminalMode::Pty);
        for port in 0..30 {
            state.absorb(&format!("http://localhost:{}/\n", 3000 + port));
        }
        assert_eq!(state.detected_urls.len(), MAX_DETECTED_URLS);
        assert_eq!(state.detected_urls[0], "http://localhost:3010/");
        assert_eq!(state.port, Some(3029));
    }

    #[test]
    fn test_warnings_dedup_and_cap() {
        let mut state = RuntimeState::new(TerminalMode::Pty);
        state.absorb("Error: EADDRINUSE\n");
        state.absorb("error: eaddrinuse\n");
        assert_eq!(state.warnings, vec!["Error: EADDRINUSE".to_string()]);

        for i in 0..20 {
            state.add_warning(format!("warning {i}"));
        }
        assert_eq!(state.warnings.len(), MAX_WARNINGS);
        assert_eq!(state.warnings[0], "Error: EADDRINUSE");
    }

    #[test]
    fn test_readiness() {
        let mut state = RuntimeState::new(TerminalMode::Pty);
        let grace = Duration::from_millis(2500);
        assert!(!state.is_ready(Duration::from_millis(100), grace));
        assert!(state.is_ready(Duration::from_millis(2500), grace));

        state.absorb("compiled successfully\n");
        assert!(state.is_ready(Duration::ZERO, grace));
        state.absorb("tick\n");
        assert!(state.is_ready(Duration::ZERO, grace));
    }

    #[test]
    fn test_pipe_mode_reports_no_pty() {
        let state = RuntimeState::new(TerminalMode::Pipe);
        assert!(!state.pty_available);
    }
}
