//! Cross-reference placeholders and their resolution.
//!
//! References are rendered before every label of the batch is known, so the
//! render pass emits placeholders and [`resolve_references`] swaps them for
//! links once all documents are numbered. The placeholder delimiters are
//! control characters, which preprocessing strips from the source.

use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::context::Context;
use crate::label::kind_title;
use crate::render::escape_html;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new("\x01xref\x1f([^\x1f\x02]*)\x1f([^\x1f\x02]*)\x1f([^\x02]*)\x02")
        .expect("placeholder regex compiles")
});

/// Placeholder for a reference of `kind` to the label `key`. `text`, when
/// present, is shown instead of the label's number.
pub fn placeholder(kind: &str, key: &str, text: Option<&str>) -> String {
    format!(
        "\u{1}xref\u{1f}{kind}\u{1f}{key}\u{1f}{}\u{2}",
        text.unwrap_or_default()
    )
}

/// Replaces every placeholder in `html`, which will be written to `file`.
/// Unknown labels become an inline error marker and are recorded.
pub fn resolve_references(ctx: &mut Context, file: &Path, html: &str) -> String {
    let Context {
        labels,
        diagnostics,
        ..
    } = ctx;
    PLACEHOLDER
        .replace_all(html, |caps: &Captures<'_>| {
            let (kind, key, text) = (&caps[1], &caps[2], &caps[3]);
            match labels.get(key) {
                Some(target) => {
                    let href = relative_href(file, &target.file, &target.anchor);
                    let shown = if text.is_empty() {
                        display(kind, &target.number)
                    } else {
                        text.to_string()
                    };
                    format!("<a href=\"{}\">{shown}</a>", escape_html(&href))
                }
                None => {
                    diagnostics.undefined_label(key);
                    warn!(label = key, file = %file.display(), "undefined label");
                    let shown = if text.is_empty() {
                        display(kind, "??")
                    } else {
                        text.to_string()
                    };
                    format!("<span class=\"xref-error\">{shown}</span>")
                }
            }
        })
        .into_owned()
}

fn display(kind: &str, number: &str) -> String {
    match kind_title(kind) {
        Some(title) if kind != "cite" => format!("{title}&nbsp;{number}"),
        _ => number.to_string(),
    }
}

/// Link from the document `from` to `anchor` in the document `to`. Both
/// paths are relative to the output root.
pub fn relative_href(from: &Path, to: &Path, anchor: &str) -> String {
    if from == to {
        return format!("#{anchor}");
    }
    let from_dir: Vec<Component<'_>> = from
        .parent()
        .map(|dir| dir.components().collect())
        .unwrap_or_default();
    let target: Vec<Component<'_>> = to.components().collect();
    let target_dir = &target[..target.len().saturating_sub(1)];
    let common = from_dir
        .iter()
        .zip(target_dir)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|part| part.as_os_str().to_string_lossy().into_owned()),
    );
    format!("{}#{anchor}", parts.join("/"))
}
