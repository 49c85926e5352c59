use std::borrow::Cow;

use html2text::render::text_renderer::TrivialDecorator;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Display width of a string in terminal columns (CJK and emoji count 2).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncates a string to at most `max_width` terminal columns.
///
/// When the string does not fit, it is cut and "..." appended so the result
/// still fits. Widths of 3 or less have no room for the ellipsis and return
/// the longest prefix that fits. Returns `Cow::Borrowed` when nothing is cut.
///
/// ```
/// use feedreader::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width <= ELLIPSIS_WIDTH {
        (max_width, "")
    } else {
        (max_width - ELLIPSIS_WIDTH, ELLIPSIS)
    };

    let mut used = 0;
    let mut cut = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        cut = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..cut], suffix))
}

/// SEC-001: Removes terminal control characters and ANSI escape sequences
/// from feed-supplied text before it reaches a terminal.
///
/// Tab, newline and carriage return survive. CSI (`ESC [ ... final`) and OSC
/// (`ESC ] ... BEL` or `ESC ] ... ESC \`) sequences are dropped whole.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            if !is_stripped(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
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
            _ => {}
        }
    }

    Cow::Owned(out)
}

fn is_stripped(c: char) -> bool {
    c == '\x7f' || (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'))
}

/// Wrap width handed to html2text; large enough that it never wraps a snippet.
const SNIPPET_RENDER_WIDTH: usize = 10_000;

/// Builds a one-paragraph snippet from feed summary/content.
///
/// Renders the HTML to plain text with html2text (tags dropped, entities
/// decoded), collapses whitespace runs to a single space and caps the result
/// at `max_chars` characters, ellipsis included. Returns `None` when nothing
/// readable is left.
pub fn make_snippet(raw: &str, max_chars: usize) -> Option<String> {
    let plain = html2text::from_read_with_decorator(
        raw.as_bytes(),
        SNIPPET_RENDER_WIDTH,
        TrivialDecorator::new(),
    );

    let cleaned = strip_control_chars(&plain);
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || max_chars == 0 {
        return None;
    }

    if collapsed.chars().count() <= max_chars {
        return Some(collapsed);
    }
    if max_chars <= ELLIPSIS.len() {
        return Some(collapsed.chars().take(max_chars).collect());
    }

    let keep = max_chars - ELLIPSIS.len();
    let mut out: String = collapsed.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    Some(out)
}
