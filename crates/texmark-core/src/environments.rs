//! Built-in environment handlers.

use crate::catlist::Html;
use crate::context::{Context, Mode};
use crate::error::Result;
use crate::label::kind_title;
use crate::render::{escape_html, process_recursively};
use crate::scan::{Command, Environment, get_environment, next_command};

/// Unknown environments become a `div` named after them. Outside math they
/// are recorded for the end-of-run summary.
pub fn default(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    if !mode.contains(Mode::MATH) {
        ctx.diagnostics.defaulted_environment(&env.name);
    }
    container(ctx, env, mode)
}

pub fn container(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let mut out = Html::text(format!("<div class=\"{}\">", env.name));
    out.append_owned(process_recursively(ctx, &env.content, mode)?);
    out.push(format!("</div><!-- {} -->", env.name));
    Ok(out)
}

/// Keeps the environment for the client-side math typesetter.
pub fn passthrough(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let mut open = format!("\\begin{{{}}}", env.name);
    for arg in &env.optargs {
        open.push_str(&format!("[{arg}]"));
    }
    for arg in &env.args {
        open.push_str(&format!("{{{arg}}}"));
    }
    let mut out = Html::text(open);
    out.append_owned(process_recursively(ctx, &env.content, mode)?);
    out.push(format!("\\end{{{}}}", env.name));
    Ok(out)
}

pub fn inline_math(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let mut out = Html::text("\\(");
    out.append_owned(process_recursively(ctx, &env.content, mode | Mode::MATH)?);
    out.push_str("\\)");
    Ok(out)
}

pub fn theorem_like(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let mut out = Html::text(format!("<div class=\"{}\">", env.name));
    out.push_str("<span class=\"title\">");
    match env.optarg(0) {
        Some(title) => out.append_owned(process_recursively(ctx, title, mode)?),
        None => out.push_str(kind_title(&env.name).unwrap_or_default()),
    }
    out.push_str("</span>");
    out.append_owned(process_recursively(ctx, &env.content, mode)?);
    out.push(format!("</div><!-- {} -->", env.name));
    Ok(out)
}

pub fn list(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let tag = if env.name == "enumerate" { "ol" } else { "ul" };
    let split = split_items(&env.content, "item")?;

    let mut out = Html::text(format!("<{tag} class=\"{}\">", env.name));
    if !split.lead.trim().is_empty() {
        out.append_owned(process_recursively(ctx, split.lead.trim(), mode)?);
    }
    for item in split.items {
        out.push_str("<li>");
        if let Some(label) = item.cmd.optarg(0) {
            out.push_str("<span class=\"item-label\">");
            out.append_owned(process_recursively(ctx, label, mode)?);
            out.push_str("</span> ");
        }
        out.append_owned(process_recursively(ctx, item.body.trim(), mode)?);
        out.push_str("</li>");
    }
    out.push(format!("</{tag}>"));
    Ok(out)
}

/// `\bibitem[anchor]{number}` entries, as rewritten by the numbering pass.
pub fn bibliography(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let split = split_items(&env.content, "bibitem")?;
    let mut out = Html::text("<div class=\"bibliography\">");
    for item in split.items {
        let id = item
            .cmd
            .optarg(0)
            .map(|anchor| format!(" id=\"{}\"", escape_html(anchor)))
            .unwrap_or_default();
        let number = item.cmd.arg(0).unwrap_or_default();
        out.push(format!(
            "<div class=\"bibitem\"{id}><span class=\"title\">[{number}]</span> "
        ));
        out.append_owned(process_recursively(ctx, item.body.trim(), mode)?);
        out.push_str("</div>");
    }
    out.push_str("</div><!-- bibliography -->");
    Ok(out)
}

pub fn tabular(ctx: &mut Context, env: &Environment, mode: Mode) -> Result<Html> {
    let mut out = Html::text("<table align=\"center\">");
    for row in split_rows(&env.content) {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        out.push_str("<tr>");
        for cell in row {
            let cell = process_recursively(ctx, cell.trim(), mode)?.concat();
            out.push(format!("<td>{}</td>", cell.trim()));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    Ok(out)
}

/// `#code#` spans, typeset as monospace math.
pub fn hash(env: &Environment, mode: Mode) -> Result<Html> {
    let code = escape_html(&escape_ampersands(&env.content));
    let inner = format!("\\mathtt{{{code}}}");
    if mode.contains(Mode::MATH) {
        Ok(Html::text(inner))
    } else {
        Ok(Html::text(format!("\\({inner}\\)")))
    }
}

struct Item<'a> {
    cmd: Command,
    body: &'a str,
}

struct SplitItems<'a> {
    /// Text before the first marker.
    lead: &'a str,
    items: Vec<Item<'a>>,
}

/// Splits `content` on top-level `\marker` commands. Markers inside nested
/// environments belong to those environments and are left alone.
///
/// The body of an `\item` starts after its optional label; the body of any
/// other marker starts after all of its arguments.
fn split_items<'a>(content: &'a str, marker: &str) -> Result<SplitItems<'a>> {
    let mut found: Vec<(Command, usize)> = Vec::new();
    let mut cursor = 0;
    while let Some(cmd) = next_command(content, cursor)? {
        if cmd.name == "begin" {
            cursor = get_environment(content, &cmd)?.span.end;
        } else if cmd.name == marker {
            let body_start = if marker == "item" {
                cmd.optargs_end()
            } else {
                cmd.span.end
            };
            cursor = body_start;
            found.push((cmd, body_start));
        } else {
            cursor = cmd.span.end;
        }
    }

    let lead_end = found
        .first()
        .map(|(cmd, _)| cmd.span.start)
        .unwrap_or(content.len());
    let ends: Vec<usize> = found
        .iter()
        .skip(1)
        .map(|(cmd, _)| cmd.span.start)
        .chain(std::iter::once(content.len()))
        .collect();
    let items = found
        .into_iter()
        .zip(ends)
        .map(|((cmd, start), end)| Item {
            cmd,
            body: &content[start..end],
        })
        .collect();
    Ok(SplitItems {
        lead: &content[..lead_end],
        items,
    })
}

/// Splits tabular content into rows on `\\` and cells on `&`, both only at
/// brace depth zero. Escaped `\&` and HTML entities are not separators.
fn split_rows(content: &str) -> Vec<Vec<&str>> {
    let bytes = content.as_bytes();
    let mut rows = Vec::new();
    let mut cells = Vec::new();
    let mut depth = 0i32;
    let mut cell_start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                if depth == 0 && bytes.get(idx + 1) == Some(&b'\\') {
                    cells.push(&content[cell_start..idx]);
                    rows.push(std::mem::take(&mut cells));
                    cell_start = idx + 2;
                }
                idx += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'&' if depth == 0 && !is_entity(bytes, idx) => {
                cells.push(&content[cell_start..idx]);
                cell_start = idx + 1;
            }
            _ => {}
        }
        idx += 1;
    }
    cells.push(&content[cell_start.min(content.len())..]);
    rows.push(cells);
    rows
}

/// `&name;` or `&#123;` / `&#x1f;` starting at `idx`.
fn is_entity(bytes: &[u8], idx: usize) -> bool {
    let rest = &bytes[idx + 1..];
    let body_len = if rest.first() == Some(&b'#') {
        1 + rest[1..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit() || **b == b'x')
            .count()
    } else {
        rest.iter().take_while(|b| b.is_ascii_alphanumeric()).count()
    };
    body_len > 0 && rest.get(body_len) == Some(&b';')
}

/// Backslash-escapes every `&` that is not already escaped.
fn escape_ampersands(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for ch in text.chars() {
        if ch == '&' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}
