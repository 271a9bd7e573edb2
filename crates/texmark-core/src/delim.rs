use crate::error::{Error, Result, context_around};
use crate::span::Span;

/// Finds the balanced `open`...`close` group starting at `pos`.
///
/// Returns `Ok(None)` when the byte at `pos` (after optional whitespace) is not
/// `open`: the caller reads that as "no argument here". The returned span
/// includes both delimiters. A delimiter preceded by a backslash is escaped and
/// does not count towards the depth. Running off the end of `text` is fatal.
pub fn match_group(
    text: &str,
    pos: usize,
    open: u8,
    close: u8,
    skip_whitespace: bool,
) -> Result<Option<Span>> {
    let bytes = text.as_bytes();
    let mut start = pos;
    if skip_whitespace {
        while start < bytes.len() && bytes[start].is_ascii_whitespace() {
            start += 1;
        }
    }
    if start >= bytes.len() || bytes[start] != open {
        return Ok(None);
    }

    let mut depth: i64 = 0;
    let mut idx = start;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if byte == b'\\' {
            // Skip whatever the backslash escapes, including another backslash.
            idx += 2;
            continue;
        }
        if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
            if depth == 0 {
                return Ok(Some(Span::new(start, idx + 1)));
            }
        }
        idx += 1;
    }

    Err(Error::Unbalanced {
        open: open as char,
        context: context_around(text, start),
    })
}
