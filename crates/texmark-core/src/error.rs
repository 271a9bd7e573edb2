use miette::Diagnostic;
use thiserror::Error;

/// Fatal conversion errors. Anything recoverable goes to
/// [`Diagnostics`](crate::Diagnostics) instead.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("couldn't match `{open}`:\n... {context} ...")]
    #[diagnostic(code(texmark::delimiter::unbalanced))]
    Unbalanced { open: char, context: String },

    #[error("unmatched environment `{name}`:\n... {context} ...")]
    #[diagnostic(code(texmark::environment::unmatched))]
    UnmatchedEnvironment { name: String, context: String },

    #[error("\\begin without an environment name:\n... {context} ...")]
    #[diagnostic(code(texmark::environment::unnamed))]
    UnnamedEnvironment { context: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

const CONTEXT_RADIUS: usize = 25;

/// Up to 25 bytes of `text` either side of `pos`, clamped to char boundaries.
pub(crate) fn context_around(text: &str, pos: usize) -> String {
    let mut start = pos.saturating_sub(CONTEXT_RADIUS);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (pos + CONTEXT_RADIUS).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::context_around;

    #[test]
    fn context_is_clamped_to_text() {
        assert_eq!(context_around("abc", 1), "abc");
        let long = "x".repeat(100);
        assert_eq!(context_around(&long, 50).len(), 50);
    }

    #[test]
    fn context_respects_char_boundaries() {
        let text = format!("{}é{}", "a".repeat(24), "b".repeat(30));
        let context = context_around(&text, 50);
        assert!(context.starts_with('é') || context.starts_with('b'));
    }
}
