//! Built-in command handlers.

use tracing::warn;

use crate::catlist::Html;
use crate::context::{Context, Mode};
use crate::error::Result;
use crate::label::{label_key, ref_kind};
use crate::render::{escape_html, process_recursively};
use crate::scan::Command;
use crate::xref::placeholder;

/// Unknown commands are kept verbatim with rendered arguments. Outside math
/// they are recorded for the end-of-run summary.
pub fn default(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    if !mode.contains(Mode::MATH) {
        ctx.diagnostics.unprocessed_command(&cmd.name);
    }
    passthrough(ctx, cmd, mode)
}

pub fn passthrough(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let mut out = Html::text(format!("\\{}", cmd.name));
    for arg in &cmd.optargs {
        out.push_str("[");
        out.append_owned(process_recursively(ctx, arg, mode)?);
        out.push_str("]");
    }
    for arg in &cmd.args {
        out.push_str("{");
        out.append_owned(process_recursively(ctx, arg, mode)?);
        out.push_str("}");
    }
    Ok(out)
}

pub fn wrap(
    ctx: &mut Context,
    cmd: &Command,
    mode: Mode,
    open: &str,
    close: &str,
) -> Result<Html> {
    let Some(arg) = cmd.arg(0) else {
        return missing_argument(ctx, cmd, mode);
    };
    let mut out = Html::text(open);
    out.append_owned(process_recursively(ctx, arg, mode)?);
    out.push_str(close);
    Ok(out)
}

pub fn strip(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    match cmd.arg(0) {
        Some(arg) => process_recursively(ctx, arg, mode),
        None => Ok(Html::new()),
    }
}

pub fn dots(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    if mode.contains(Mode::MATH) {
        return default(ctx, cmd, mode);
    }
    let glyph = match cmd.name.as_str() {
        "ldots" | "dots" => "&hellip;",
        "vdots" => "&#x22ee;",
        "cdots" => "&#x22ef;",
        other => {
            warn!(name = other, "unrecognized non-math dots");
            "?"
        }
    };
    Ok(Html::text(glyph))
}

pub fn graphics(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let Some(name) = cmd.arg(0) else {
        return missing_argument(ctx, cmd, mode);
    };
    let name = name.trim();
    ctx.request_image(name);
    Ok(Html::text(format!("<img src=\"{}.svg\"/>", escape_html(name))))
}

/// `\cite[note]{a,b}` becomes `[1, 2, note]` with one link per key.
pub fn cite(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let Some(keys) = cmd.arg(0) else {
        return missing_argument(ctx, cmd, mode);
    };
    let mut out = Html::text("[");
    for (idx, key) in keys.split(',').map(str::trim).enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push(placeholder("cite", &label_key("cite", key), None));
    }
    if let Some(note) = cmd.optarg(0) {
        out.push_str(", ");
        out.append_owned(process_recursively(ctx, note, mode)?);
    }
    out.push_str("]");
    Ok(out)
}

pub fn footnote(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    if mode.contains(Mode::TOC) {
        return Ok(Html::new());
    }
    let Some(body) = cmd.arg(0) else {
        return missing_argument(ctx, cmd, mode);
    };
    let body = process_recursively(ctx, body, mode)?.concat();
    let n = ctx.footnotes.push(body);
    Ok(Html::text(format!(
        "<sup class=\"footnote\"><a id=\"fnref:{n}\" href=\"#fn:{n}\">{n}</a></sup>"
    )))
}

pub fn url(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let Some(target) = cmd.arg(0) else {
        return missing_argument(ctx, cmd, mode);
    };
    let target = escape_html(target.trim());
    Ok(Html::text(format!("<a href=\"{target}\">{target}</a>")))
}

pub fn href(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let (Some(target), Some(text)) = (cmd.arg(0), cmd.arg(1)) else {
        return missing_argument(ctx, cmd, mode);
    };
    let mut out = Html::text(format!("<a href=\"{}\">", escape_html(target.trim())));
    out.append_owned(process_recursively(ctx, text, mode)?);
    out.push_str("</a>");
    Ok(out)
}

/// `\hyperref[key]{text}` links `text` to a bare label.
pub fn hyperref(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let (Some(key), Some(text)) = (cmd.optarg(0), cmd.arg(0)) else {
        return missing_argument(ctx, cmd, mode);
    };
    let text = process_recursively(ctx, text, mode)?.concat();
    Ok(Html::text(placeholder("", key.trim(), Some(&text))))
}

/// `\Kref{name}`: a placeholder resolved once every label is known.
pub fn reference(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    let Some(name) = cmd.arg(0) else {
        return missing_argument(ctx, cmd, mode);
    };
    let kind = ref_kind(&cmd.name).to_lowercase();
    let key = label_key(&kind, name.trim());
    Ok(Html::text(placeholder(&kind, &key, None)))
}

fn missing_argument(ctx: &mut Context, cmd: &Command, mode: Mode) -> Result<Html> {
    warn!(command = %cmd.name, "missing argument, passing command through");
    passthrough(ctx, cmd, mode)
}

#[cfg(test)]
mod tests {
    use crate::context::{Context, Mode};
    use crate::render::render_str;

    fn render(ctx: &mut Context, text: &str) -> String {
        render_str(ctx, text, Mode::empty()).unwrap()
    }

    #[test]
    fn dots_depend_on_mode() {
        let mut ctx = Context::default();
        assert_eq!(render(&mut ctx, r"a\ldots b"), "a&hellip; b");
        let html = render(&mut ctx, r"\begin{dollar}1,\ldots,n\end{dollar}");
        assert_eq!(html, r"\(1,\ldots,n\)");
    }

    #[test]
    fn worthless_commands_vanish() {
        let mut ctx = Context::default();
        assert_eq!(render(&mut ctx, r"a\vspace{1em}b\index{x}c"), "abc");
    }

    #[test]
    fn graphics_records_requests() {
        let mut ctx = Context::default();
        ctx.begin_document("ch/a.html");
        let html = render(&mut ctx, r"\includegraphics{figs/tree-2}");
        assert_eq!(html, "<img src=\"figs/tree-2.svg\"/>");
        assert_eq!(ctx.images.len(), 1);
        assert_eq!(ctx.images[0].name, "figs/tree-2");
    }

    #[test]
    fn footnotes_are_numbered_and_collected() {
        let mut ctx = Context::default();
        let html = render(&mut ctx, r"a\footnote{\emph{one}}b\footnote{two}");
        assert!(html.contains("href=\"#fn:1\""));
        assert!(html.contains("href=\"#fn:2\""));
        let notes = ctx.footnotes.take_html();
        assert!(notes.contains("<em>one</em>"));
    }

    #[test]
    fn missing_argument_falls_back_to_passthrough() {
        let mut ctx = Context::default();
        assert_eq!(render(&mut ctx, r"\emph x"), r"\emph x");
    }

    #[test]
    fn links() {
        let mut ctx = Context::default();
        assert_eq!(
            render(&mut ctx, r"\url{http://a.b/?x&y}"),
            "<a href=\"http://a.b/?x&amp;y\">http://a.b/?x&amp;y</a>"
        );
        assert_eq!(
            render(&mut ctx, r"\href{http://a.b}{\emph{here}}"),
            "<a href=\"http://a.b\"><em>here</em></a>"
        );
    }

    #[test]
    fn strip_renders_first_argument() {
        let mut ctx = Context::default();
        ctx.registry
            .register_command("javaonly", crate::registry::CommandRule::Strip);
        assert_eq!(render(&mut ctx, r"\javaonly{\emph{j}}"), "<em>j</em>");
    }
}
