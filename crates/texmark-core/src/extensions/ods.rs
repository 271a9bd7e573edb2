//! Commands of the Open Data Structures sources.
//!
//! `\codeimport{Class.member.member}` (and its alias `\javaimport`) excerpts
//! members of a Java class through the context's [`CodeSource`](crate::CodeSource).
//! Language-only blocks for Java are kept, the other languages are dropped by
//! the standard table.

use tracing::warn;

use crate::catlist::Html;
use crate::commands;
use crate::context::{Context, Mode};
use crate::error::Result;
use crate::registry::{CommandRule, Registry};
use crate::render::escape_html;
use crate::scan::Command;

pub fn install(registry: &mut Registry) {
    registry
        .register_command("codeimport", CommandRule::Custom(codeimport))
        .register_command("javaimport", CommandRule::Custom(codeimport))
        .register_command("etal", CommandRule::Literal("<em>et al</em>"));
    for name in ["javaonly", "notpcode"] {
        registry.register_command(name, CommandRule::Strip);
    }
}

fn codeimport(ctx: &mut Context, _text: &str, cmd: &Command, mode: Mode) -> Result<Html> {
    let Some(target) = cmd.arg(0) else {
        warn!(command = %cmd.name, "missing argument, passing command through");
        return commands::passthrough(ctx, cmd, mode);
    };
    let target = target.trim();
    let (class, members) = target.split_once('.').unwrap_or((target, ""));

    let mut out = Html::text("<div class=\"codeimport\">");
    for member in split_members(members) {
        let found = ctx
            .code_source_mut()
            .and_then(|source| source.member(class, member));
        match found {
            Some(code) => out.push(format!(
                "<pre class=\"codeimport\"><code class=\"language-java\">{}</code></pre>",
                escape_html(&code)
            )),
            None => {
                warn!(class, member, "code member not found");
                out.push(format!("<!-- member not found: {class}.{member} -->"));
            }
        }
    }
    out.push_str("</div><!-- codeimport -->");
    Ok(out)
}

/// Splits `add(i,x).remove(i)` on dots outside parentheses.
fn split_members(members: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in members.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            '.' if depth == 0 => {
                out.push(&members[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&members[start..]);
    out.retain(|member| !member.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{install, split_members};
    use crate::context::{CodeSource, Context, Mode};
    use crate::registry::Registry;
    use crate::render::render_str;

    struct Fixed(HashMap<(String, String), String>);

    impl CodeSource for Fixed {
        fn member(&mut self, class: &str, member: &str) -> Option<String> {
            self.0.get(&(class.to_string(), member.to_string())).cloned()
        }
    }

    fn ods_context() -> Context {
        let mut registry = Registry::standard();
        install(&mut registry);
        let mut members = HashMap::new();
        members.insert(
            ("ArrayStack".to_string(), "get(i)".to_string()),
            "T get(int i) {\n  return a[i];\n}".to_string(),
        );
        Context::new(registry).with_code_source(Fixed(members))
    }

    #[test]
    fn members_split_outside_parentheses() {
        assert_eq!(split_members("add(i,x).remove(a.b)"), vec!["add(i,x)", "remove(a.b)"]);
        assert!(split_members("").is_empty());
    }

    #[test]
    fn imports_found_and_missing_members() {
        let mut ctx = ods_context();
        let html = render_str(
            &mut ctx,
            r"\codeimport{ArrayStack.get(i).set(i,x)}",
            Mode::empty(),
        )
        .unwrap();
        assert_eq!(
            html,
            "<div class=\"codeimport\"><pre class=\"codeimport\"><code class=\"language-java\">\
             T get(int i) {\n  return a[i];\n}</code></pre>\
             <!-- member not found: ArrayStack.set(i,x) --></div><!-- codeimport -->"
        );
    }

    #[test]
    fn language_blocks_and_etal() {
        let mut ctx = ods_context();
        let html = render_str(
            &mut ctx,
            r"Knuth \etal\ \javaonly{java}\cpponly{c++}",
            Mode::empty(),
        )
        .unwrap();
        assert_eq!(html, r"Knuth <em>et al</em>\ java");
    }

    #[test]
    fn without_a_code_source_every_member_is_missing() {
        let mut registry = Registry::standard();
        install(&mut registry);
        let mut ctx = Context::new(registry);
        let html = render_str(&mut ctx, r"\javaimport{Foo.bar}", Mode::empty()).unwrap();
        assert!(html.contains("<!-- member not found: Foo.bar -->"));
    }
}
