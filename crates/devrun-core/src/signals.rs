//! Signals - heuristics over unstructured process output
//!
//! Every function here is pure: it takes a chunk of terminal text and returns
//! what it found. Applying the findings to a run is [`crate::runtime`]'s job.

use crate::ansi::strip_ansi_escapes;
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use url::{Host, Url};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>`]+"#).expect("valid url regex"));

static READY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)\b(?:listening on|listening at|ready in|ready on|compiled successfully|server started|server running|started server on|server listening|running at)\b|^\s*ready\b",
    )
    .expect("valid ready regex")
});

static WARNING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // address in use
        r"(?i)(eaddrinuse|address already in use)",
        // port retry notices from dev servers
        r"(?i)(port \d+ is (already )?in use|trying another|port \d+ is taken|using port \d+ instead)",
        // terminal fallback
        r"(?i)pty unavailable",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid warning regex"))
    .collect()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// Longest warning line kept verbatim
const MAX_WARNING_CHARS: usize = 240;

/// Everything found in one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSignals {
    /// Normalized URLs, in order of appearance
    pub urls: Vec<String>,
    /// Whether a ready phrase appeared
    pub ready: bool,
    /// Lines that look like operational warnings
    pub warnings: Vec<String>,
}

/// Scan one output chunk
#[must_use]
pub fn scan_chunk(chunk: &str) -> ChunkSignals {
    let text = strip_ansi_escapes(chunk);
    ChunkSignals {
        urls: extract_urls(&text),
        ready: has_ready_signal(&text),
        warnings: detect_warnings(&text),
    }
}

/// Find and normalize every absolute http(s) URL in `text`
#[must_use]
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .filter_map(|m| normalize_url(m.as_str()))
        .collect()
}

/// Normalize a raw URL match.
///
/// Strips trailing punctuation (closing brackets only when unbalanced) and
/// rewrites wildcard hosts to `localhost`.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = trim_url_tail(raw);
    let mut url = Url::parse(trimmed).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let wildcard = match url.host() {
        Some(Host::Ipv4(ip)) => ip == Ipv4Addr::UNSPECIFIED,
        Some(Host::Ipv6(ip)) => ip == Ipv6Addr::UNSPECIFIED,
        Some(Host::Domain(_)) => false,
        None => return None,
    };
    if wildcard {
        url.set_host(Some("localhost")).ok()?;
    }

    Some(url.to_string())
}

fn trim_url_tail(raw: &str) -> &str {
    let mut s = raw;
    loop {
        let Some(last) = s.chars().last() else {
            return s;
        };
        let strip = if TRAILING_PUNCTUATION.contains(&last) {
            true
        } else if let Some(open) = opener_for(last) {
            s.matches(last).count() > s.matches(open).count()
        } else {
            false
        };
        if !strip {
            return s;
        }
        s = &s[..s.len() - last.len_utf8()];
    }
}

fn opener_for(close: char) -> Option<char> {
    match close {
        ')' => Some('('),
        ']' => Some('['),
        '}' => Some('{'),
        _ => None,
    }
}

/// Whether a URL points at this machine
#[must_use]
pub fn is_local_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == "localhost" || h == "127.0.0.1"))
        .unwrap_or(false)
}

/// Most recent local URL, else the most recent URL of any kind
#[must_use]
pub fn choose_effective_url(urls: &[String]) -> Option<String> {
    urls.iter()
        .rev()
        .find(|u| is_local_url(u))
        .or_else(|| urls.last())
        .cloned()
}

/// Port of a URL, falling back to the scheme default
#[must_use]
pub fn port_from_url(url: &str) -> Option<u16> {
    Url::parse(url).ok()?.port_or_known_default()
}

/// Whether `text` contains a ready phrase
#[must_use]
pub fn has_ready_signal(text: &str) -> bool {
    READY_RE.is_match(text)
}

/// Lines of `text` that match a warning signature, trimmed
#[must_use]
pub fn detect_warnings(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| WARNING_RES.iter().any(|re| re.is_match(line)))
        .map(|line| line.chars().take(MAX_WARNING_CHARS).collect())
        .collect()
}
