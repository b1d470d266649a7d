//! ANSI escape handling for scanning terminal text

/// Strip ANSI escape sequences, leaving every other character in place.
///
/// Handles CSI (`ESC [ params final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// and two-byte escapes such as `ESC =`.
pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                // Parameters and intermediates (0x20-0x3F)
                while let Some(&next) = chars.peek() {
                    if next.is_ascii() && (0x20..=0x3F).contains(&(next as u8)) {
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Final byte (0x40-0x7E)
                if let Some(&next) = chars.peek() {
                    if next.is_ascii() && (0x40..=0x7E).contains(&(next as u8)) {
                        chars.next();
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_csi() {
        assert_eq!(strip_ansi_escapes("\x1b[32mgreen\x1b[0m"), "green");
        assert_eq!(strip_ansi_escapes("\x1b[1;36mbold\x1b[22m"), "bold");
        assert_eq!(strip_ansi_escapes("up\x1b[A"), "up");
    }

    #[test]
    fn test_strip_osc() {
        assert_eq!(strip_ansi_escapes("\x1b]0;title\x07text"), "text");
        assert_eq!(strip_ansi_escapes("\x1b]8;;http://x\x1b\\link"), "link");
    }

    #[test]
    fn test_keeps_control_characters() {
        assert_eq!(strip_ansi_escapes("a\r\nb\x08"), "a\r\nb\x08");
    }

    #[test]
    fn test_vite_banner() {
        let raw = "  \x1b[32m➜\x1b[39m  \x1b[1mLocal\x1b[22m:   \x1b[36mhttp://localhost:\x1b[1m5173\x1b[22m/\x1b[39m";
        assert_eq!(strip_ansi_escapes(raw), "  ➜  Local:   http://localhost:5173/");
    }

    #[test]
    fn test_trailing_escape() {
        assert_eq!(strip_ansi_escapes("done\x1b"), "done");
        assert_eq!(strip_ansi_escapes("done\x1b["), "done");
    }
}
