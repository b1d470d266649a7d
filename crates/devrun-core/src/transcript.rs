//! Transcript - bounded terminal output of one run

/// Output text capped at a number of characters, trimmed from the front
#[derive(Debug, Clone)]
pub struct Transcript {
    text: String,
    chars: usize,
    max_chars: usize,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            max_chars: max_chars.max(1),
        }
    }

    /// Append text, dropping the oldest characters past the cap
    pub fn push(&mut self, s: &str) {
        self.text.push_str(s);
        self.chars += s.chars().count();
        if self.chars > self.max_chars {
            let excess = self.chars - self.max_chars;
            let cut = self
                .text
                .char_indices()
                .nth(excess)
                .map_or(self.text.len(), |(i, _)| i);
            self.text.drain(..cut);
            self.chars = self.max_chars;
        }
    }

    /// Whole buffered text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// Last `n` characters
    #[must_use]
    pub fn tail(&self, n: usize) -> &str {
        tail_chars(&self.text, n)
    }
}

/// Last `n` characters of `s`
pub(crate) fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}
