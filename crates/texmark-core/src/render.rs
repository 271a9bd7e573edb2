use crate::catlist::Html;
use crate::commands;
use crate::context::{Context, Mode};
use crate::environments;
use crate::error::Result;
use crate::registry::{CommandRule, EnvironmentRule};
use crate::scan::{Command, Environment, get_environment, next_command};

/// Renders `text` to HTML fragments.
///
/// Literal text between commands is copied as is; each command or environment
/// goes to its handler, and handlers call back in here for their arguments and
/// content. Every recursive call works on a strict sub-span of its caller, so
/// well-formed input always terminates.
pub fn process_recursively(ctx: &mut Context, text: &str, mode: Mode) -> Result<Html> {
    let mut out = Html::new();
    let mut cursor = 0;
    while let Some(cmd) = next_command(text, cursor)? {
        out.push_str(&text[cursor..cmd.span.start]);
        if cmd.name == "begin" {
            let env = get_environment(text, &cmd)?;
            cursor = env.span.end;
            out.append_owned(dispatch_environment(ctx, text, &env, mode)?);
        } else {
            cursor = cmd.span.end;
            out.append_owned(dispatch_command(ctx, text, &cmd, mode)?);
        }
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Convenience wrapper returning one string.
pub fn render_str(ctx: &mut Context, text: &str, mode: Mode) -> Result<String> {
    Ok(process_recursively(ctx, text, mode)?.concat())
}

pub fn dispatch_command(ctx: &mut Context, text: &str, cmd: &Command, mode: Mode) -> Result<Html> {
    let Some(rule) = ctx.registry.command(&cmd.name) else {
        return commands::default(ctx, cmd, mode);
    };
    match rule {
        CommandRule::Wrap { open, close } => commands::wrap(ctx, cmd, mode, open, close),
        CommandRule::Literal(markup) => Ok(Html::text(markup)),
        CommandRule::Discard => Ok(Html::new()),
        CommandRule::Strip => commands::strip(ctx, cmd, mode),
        CommandRule::MathBreak => commands::passthrough(ctx, cmd, mode.difference(Mode::MATH)),
        CommandRule::Dots => commands::dots(ctx, cmd, mode),
        CommandRule::Graphics => commands::graphics(ctx, cmd, mode),
        CommandRule::Cite => commands::cite(ctx, cmd, mode),
        CommandRule::Footnote => commands::footnote(ctx, cmd, mode),
        CommandRule::Url => commands::url(ctx, cmd, mode),
        CommandRule::Href => commands::href(ctx, cmd, mode),
        CommandRule::Hyperref => commands::hyperref(ctx, cmd, mode),
        CommandRule::Ref => commands::reference(ctx, cmd, mode),
        CommandRule::Custom(handler) => handler(ctx, text, cmd, mode),
    }
}

pub fn dispatch_environment(
    ctx: &mut Context,
    text: &str,
    env: &Environment,
    mode: Mode,
) -> Result<Html> {
    let Some(rule) = ctx.registry.environment(&env.name) else {
        return environments::default(ctx, env, mode);
    };
    match rule {
        EnvironmentRule::InlineMath => environments::inline_math(ctx, env, mode),
        EnvironmentRule::DisplayMath => environments::passthrough(ctx, env, mode | Mode::MATH),
        EnvironmentRule::Passthrough => environments::passthrough(ctx, env, mode),
        EnvironmentRule::List => environments::list(ctx, env, mode),
        EnvironmentRule::TheoremLike => environments::theorem_like(ctx, env, mode),
        EnvironmentRule::Container => environments::container(ctx, env, mode),
        EnvironmentRule::Tabular => environments::tabular(ctx, env, mode),
        EnvironmentRule::Hash => environments::hash(env, mode),
        EnvironmentRule::Bibliography => environments::bibliography(ctx, env, mode),
        EnvironmentRule::Custom(handler) => handler(ctx, text, env, mode),
    }
}

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
