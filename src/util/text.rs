use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates `s` to at most `max_width` terminal columns, appending "..."
/// when text was cut.
///
/// Widths of three columns or less leave no room for the ellipsis, so the
/// result is just the characters that fit. Returns `Cow::Borrowed` whenever
/// the input already fits.
///
/// ```
/// use toplists::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width <= ELLIPSIS_WIDTH {
        (max_width, "")
    } else {
        (max_width - ELLIPSIS_WIDTH, ELLIPSIS)
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Removes terminal control characters and ANSI escape sequences.
///
/// API strings end up on a raw-mode terminal, so anything that could move
/// the cursor or retitle the window is dropped. Tab and newline survive.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let dirty = |c: char| c == '\u{7f}' || (c.is_ascii_control() && c != '\t' && c != '\n');
    if !s.chars().any(dirty) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            match chars.peek() {
                // CSI: parameters until a final byte in '@'..='~'
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC '\'
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{7}' {
                            break;
                        }
                        if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !dirty(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Human-readable size, e.g. `512 B`, `42 KB`, `1.3 MB`.
pub fn format_bytes(len: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;
    if len < KB {
        format!("{len} B")
    } else if len < MB {
        format!("{} KB", len / KB)
    } else {
        format!("{:.1} MB", len as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Hello World", 11), "Hello World");
        assert!(matches!(truncate_to_width("fits", 10), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "T");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // four 2-column characters = 8 columns; 7 leaves 4 for text
        assert_eq!(truncate_to_width("日本語版", 7), "日本...");
    }

    #[test]
    fn test_strip_clean_text_borrowed() {
        let s = "Plain headline\twith tab\nand newline";
        assert!(matches!(strip_control_chars(s), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_ansi_sequences() {
        assert_eq!(strip_control_chars("\u{1b}[31mRed\u{1b}[0m"), "Red");
        assert_eq!(strip_control_chars("\u{1b}]0;title\u{7}Body"), "Body");
        assert_eq!(strip_control_chars("\u{1b}]0;title\u{1b}\\Body"), "Body");
        assert_eq!(strip_control_chars("a\u{0}b\u{7f}c\rd"), "abcd");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(42 * 1024 + 10), "42 KB");
        assert_eq!(format_bytes(1024 * 1024 * 3 / 2), "1.5 MB");
    }
}
