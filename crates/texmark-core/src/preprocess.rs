//! Source rewrites that run before numbering.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::scan::is_escaped;

static HASH_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([^#]*)#").expect("hash span regex compiles"));

/// Applies every rewrite, in order.
pub fn preprocess(text: &str) -> String {
    let text = strip_control_chars(text);
    let text = protect_hash_percents(&text);
    let text = strip_comments(&text);
    let text = display_math_brackets(&text);
    let text = dollar_math(&text);
    let text = text.replace("\\myeqref", "\\eqref");
    let text = dashes(&text);
    hash_spans(&text)
}

/// Removes control characters other than line breaks and tabs. The render
/// pass uses some of them as placeholder delimiters.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'))
        .collect()
}

/// `%` inside `#code#` is code, not a comment.
pub fn protect_hash_percents(text: &str) -> String {
    HASH_SPAN
        .replace_all(text, |caps: &Captures<'_>| {
            let span = &caps[0];
            let mut out = String::with_capacity(span.len() + 4);
            for (idx, ch) in span.char_indices() {
                if ch == '%' && !is_escaped(span.as_bytes(), idx) {
                    out.push('\\');
                }
                out.push(ch);
            }
            out
        })
        .into_owned()
}

/// Drops everything from an unescaped `%` to the end of its line. Lines that
/// only held a comment are removed; lines that were already empty stay.
pub fn strip_comments(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let cut = line
            .char_indices()
            .find(|&(idx, ch)| ch == '%' && !is_escaped(line.as_bytes(), idx))
            .map(|(idx, _)| &line[..idx]);
        match cut {
            Some(kept) if kept.is_empty() => {}
            Some(kept) => lines.push(kept),
            None => lines.push(line),
        }
    }
    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// `\[ ... \]` becomes an unnumbered `equation*`. A `\\[` row break is left
/// alone.
pub fn display_math_brackets(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut idx = 0;
    while idx + 1 < bytes.len() {
        if bytes[idx] == b'\\' && !is_escaped(bytes, idx) {
            let replacement = match bytes[idx + 1] {
                b'[' => Some("\\begin{equation*}"),
                b']' => Some("\\end{equation*}"),
                _ => None,
            };
            if let Some(replacement) = replacement {
                out.push_str(&text[last..idx]);
                out.push_str(replacement);
                idx += 2;
                last = idx;
                continue;
            }
        }
        idx += 1;
    }
    out.push_str(&text[last..]);
    out
}

/// Pairs of unescaped `$` become the `dollar` environment. An unpaired
/// trailing `$` is kept as text.
pub fn dollar_math(text: &str) -> String {
    let bytes = text.as_bytes();
    let unescaped: Vec<usize> = bytes
        .iter()
        .enumerate()
        .filter(|&(idx, &b)| b == b'$' && !is_escaped(bytes, idx))
        .map(|(idx, _)| idx)
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for pair in unescaped.chunks_exact(2) {
        let (open, close) = (pair[0], pair[1]);
        out.push_str(&text[last..open]);
        out.push_str("\\begin{dollar}");
        out.push_str(&text[open + 1..close]);
        out.push_str("\\end{dollar}");
        last = close + 1;
    }
    out.push_str(&text[last..]);
    out
}

/// `---` and `--` become dashes, except inside `#code#` spans.
pub fn dashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in HASH_SPAN.find_iter(text) {
        out.push_str(&replace_dashes(&text[last..span.start()]));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&replace_dashes(&text[last..]));
    out
}

fn replace_dashes(text: &str) -> String {
    text.replace("---", "&mdash;").replace("--", "&ndash;")
}

/// `#code#` becomes the `hash` environment.
pub fn hash_spans(text: &str) -> String {
    HASH_SPAN
        .replace_all(text, r"\begin{hash}${1}\end{hash}")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{
        dashes, display_math_brackets, dollar_math, preprocess, protect_hash_percents,
        strip_comments, strip_control_chars,
    };

    #[test]
    fn comments_are_stripped_and_emptied_lines_dropped() {
        let text = "a % note\n% whole line\n\nb \\% c\n";
        assert_eq!(strip_comments(text), "a \n\nb \\% c\n");
    }

    #[test]
    fn percents_in_hash_spans_survive_comment_stripping() {
        let text = "#x % y# rest % gone";
        let protected = protect_hash_percents(text);
        assert_eq!(protected, r"#x \% y# rest % gone");
        assert_eq!(strip_comments(&protected), r"#x \% y# rest ");
    }

    #[test]
    fn display_brackets_skip_row_breaks() {
        assert_eq!(
            display_math_brackets(r"\[x\] a\\[2pt]"),
            r"\begin{equation*}x\end{equation*} a\\[2pt]"
        );
    }

    #[test]
    fn dollars_pair_up_unless_escaped() {
        assert_eq!(
            dollar_math(r"$a$ costs \$5 and $b$ $"),
            r"\begin{dollar}a\end{dollar} costs \$5 and \begin{dollar}b\end{dollar} $"
        );
    }

    #[test]
    fn dashes_outside_code() {
        assert_eq!(dashes("a---b--c #i--#"), "a&mdash;b&ndash;c #i--#");
    }

    #[test]
    fn control_characters_are_removed() {
        assert_eq!(strip_control_chars("a\u{1}b\u{2}\tc\n"), "ab\tc\n");
    }

    #[test]
    fn full_pipeline_order() {
        let out = preprocess("#a[i]--# and $x$ -- see \\myeqref{q} % c\n");
        assert_eq!(
            out,
            "\\begin{hash}a[i]--\\end{hash} and \\begin{dollar}x\\end{dollar} &ndash; see \\eqref{q} \n"
        );
    }
}
