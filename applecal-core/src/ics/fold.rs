//! Content line folding and unfolding (RFC 5545 §3.1).

/// Maximum octets in one physical line, excluding the line break.
pub const FOLD_LIMIT: usize = 75;

/// Split a logical line into physical lines of at most [`FOLD_LIMIT`] octets.
///
/// Continuation lines start with a single space, which counts toward the
/// limit. Splits only fall between whole characters, so a multi-byte UTF-8
/// sequence is never cut.
pub fn fold_line(line: &str) -> Vec<String> {
    if line.len() <= FOLD_LIMIT {
        return vec![line.to_string()];
    }

    let mut folded = Vec::new();
    let mut current = String::new();

    for ch in line.chars() {
        if !current.is_empty() && current.len() + ch.len_utf8() > FOLD_LIMIT {
            folded.push(std::mem::take(&mut current));
            current.push(' ');
        }
        current.push(ch);
    }
    if !current.is_empty() {
        folded.push(current);
    }

    folded
}

/// Reassemble physical lines into logical lines.
///
/// A line starting with a space or tab continues the previous logical line;
/// the single leading whitespace character is dropped. A continuation with
/// nothing before it starts a logical line of its own.
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for raw in physical_lines(text) {
        match raw.strip_prefix([' ', '\t']) {
            Some(rest) => match lines.last_mut() {
                Some(last) => last.push_str(rest),
                None => lines.push(rest.to_string()),
            },
            None => lines.push(raw.to_string()),
        }
    }

    lines
}

/// Fold every logical line and join them with CRLF, with a trailing CRLF.
pub fn build_ics_text<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        for physical in fold_line(line.as_ref()) {
            out.push_str(&physical);
            out.push_str("\r\n");
        }
    }
    out
}

/// Split on CRLF, LF or lone CR.
fn physical_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\r', '\n']) {
            Some(idx) => {
                let line = &rest[..idx];
                let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[idx + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}
