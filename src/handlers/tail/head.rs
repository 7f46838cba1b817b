//! Message head formatting for dashboard rows.

/// Heads longer than this many characters are cut.
pub const MAX_HEAD_CHARS: usize = 90;
/// Characters kept when a head is cut for length.
pub const CUT_HEAD_CHARS: usize = 87;
/// Marker appended to any truncated head.
pub const ELLIPSIS: &str = "...";

/// Short, display-safe preview of a message.
///
/// Keeps only the first line, cuts lines over [`MAX_HEAD_CHARS`] characters
/// to [`CUT_HEAD_CHARS`], appends [`ELLIPSIS`] when either happened, then
/// escapes markup. Invalid UTF-8 is replaced, not rejected.
pub fn message_head(message: &[u8]) -> String {
    let text = String::from_utf8_lossy(message);

    let (first_line, mut truncated) = match text.split_once('\n') {
        Some((line, _)) => (line, true),
        None => (text.as_ref(), false),
    };

    let mut head = if first_line.chars().count() > MAX_HEAD_CHARS {
        truncated = true;
        first_line.chars().take(CUT_HEAD_CHARS).collect::<String>()
    } else {
        first_line.to_string()
    };

    if truncated {
        head.push_str(ELLIPSIS);
    }

    escape_markup(&head)
}

/// Escape `& < > " '` for safe insertion into HTML.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
