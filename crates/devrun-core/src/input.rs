//! Best-effort reconstruction of typed command lines
//!
//! Raw keystrokes go to the child untouched; this buffer only approximates
//! "what the user typed" for history. It does not emulate a line discipline.

use crate::ansi::strip_ansi_escapes;

/// Characters kept in the scratch buffer
pub const MAX_INPUT_CHARS: usize = 2000;

/// Accumulates keystrokes and yields lines on Enter
#[derive(Debug, Clone)]
pub struct InputLineBuffer {
    pending: String,
    chars: usize,
    max_chars: usize,
}

impl Default for InputLineBuffer {
    fn default() -> Self {
        Self::new(MAX_INPUT_CHARS)
    }
}

impl InputLineBuffer {
    /// Create a buffer keeping at most `max_chars` characters
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self {
            pending: String::new(),
            chars: 0,
            max_chars: max_chars.max(1),
        }
    }

    /// Feed raw input, returning every non-blank line it completed
    pub fn feed(&mut self, input: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for c in strip_ansi_escapes(input).chars() {
            match c {
                '\r' | '\n' => {
                    let line = self.pending.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    self.clear();
                }
                '\x08' | '\x7f' => {
                    if self.pending.pop().is_some() {
                        self.chars -= 1;
                    }
                }
                // Ctrl-C, Ctrl-U
                '\x03' | '\x15' => self.clear(),
                '\t' => self.push(' '),
                c if c.is_control() => {}
                c => self.push(c),
            }
        }
        lines
    }

    /// Text typed since the last flush
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    fn push(&mut self, c: char) {
        self.pending.push(c);
        self.chars += 1;
        if self.chars > self.max_chars {
            let mut front = self.pending.chars();
            front.next();
            self.pending = front.as_str().to_string();
            self.chars -= 1;
        }
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.chars = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_line() {
        let mut buf = InputLineBuffer::default();
        assert_eq!(buf.feed("echo hi\n"), vec!["echo hi".to_string()]);
        assert_eq!(buf.pending(), "");
    }

    #[test]
    fn test_keystrokes_across_calls() {
        let mut buf = InputLineBuffer::default();
        for key in ["l", "s", " ", "-", "l"] {
            assert!(buf.feed(key).is_empty());
        }
        assert_eq!(buf.feed("\r"), vec!["ls -l".to_string()]);
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut buf = InputLineBuffer::default();
        assert_eq!(buf.feed("gti\x7f\x7fit\x08t status\r"), vec!["git status".to_string()]);
        // Backspace on an empty buffer is harmless
        assert!(buf.feed("\x08\x7f").is_empty());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let mut buf = InputLineBuffer::default();
        assert!(buf.feed("   \r\n\n").is_empty());
    }

    #[test]
    fn test_escape_sequences_stripped() {
        let mut buf = InputLineBuffer::default();
        assert_eq!(buf.feed("\x1b[Amake\x1b[D test\r"), vec!["make test".to_string()]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut buf = InputLineBuffer::default();
        assert_eq!(
            buf.feed("one\rtwo\r\nthr"),
            vec!["one".to_string(), "two".to_string()]
        );
        assert_eq!(buf.pending(), "thr");
    }

    #[test]
    fn test_ctrl_c_discards_line() {
        let mut buf = InputLineBuffer::default();
        assert!(buf.feed("rm -rf\x03").is_empty());
        assert_eq!(buf.feed("ls\n"), vec!["ls".to_string()]);
    }

    #[test]
    fn test_capacity_keeps_tail() {
        let mut buf = InputLineBuffer::new(5);
        buf.feed("abcdefgh");
        assert_eq!(buf.pending(), "defgh");

        let mut big = InputLineBuffer::default();
        big.feed(&"x".repeat(MAX_INPUT_CHARS + 50));
        assert_eq!(big.pending().chars().count(), MAX_INPUT_CHARS);
    }
}
