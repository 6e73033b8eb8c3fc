//! TEXT value escaping (RFC 5545 §3.3.11).

/// Escape a TEXT value for writing into a content line.
///
/// Backslashes are doubled, any line break (CRLF, LF or CR) becomes the
/// two-character sequence `\n`, and `;` / `,` are backslash-escaped.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            _ => out.push(ch),
        }
    }

    out
}

/// Reverse [`escape_text`].
///
/// Only the escapes produced by `escape_text` are recognised (`\\`, `\n`,
/// `\N`, `\;`, `\,`); any other backslash sequence is kept verbatim.
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') | Some('N') => out.push('\n'),
            Some(';') => out.push(';'),
            Some(',') => out.push(','),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
