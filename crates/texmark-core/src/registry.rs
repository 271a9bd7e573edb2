//! Name-keyed dispatch tables for commands and environments.
//!
//! Each entry maps a name to a rule. Rules cover the built-in behaviours;
//! extension modules that need something else register a `Custom` function.
//! Names without an entry fall through to the default handlers in
//! [`render`](crate::render).

use std::collections::HashMap;

use crate::catlist::Html;
use crate::context::{Context, Mode};
use crate::error::Result;
use crate::scan::{Command, Environment};

pub type CommandFn = fn(&mut Context, &str, &Command, Mode) -> Result<Html>;
pub type EnvironmentFn = fn(&mut Context, &str, &Environment, Mode) -> Result<Html>;

#[derive(Clone, Copy)]
pub enum CommandRule {
    /// Renders the first argument between two fixed strings.
    Wrap {
        open: &'static str,
        close: &'static str,
    },
    /// Replaced by fixed markup.
    Literal(&'static str),
    /// Removed together with its arguments.
    Discard,
    /// Replaced by its rendered first argument.
    Strip,
    /// Passed through with math mode switched off for its arguments.
    MathBreak,
    Dots,
    Graphics,
    Cite,
    Footnote,
    Url,
    Href,
    Hyperref,
    Ref,
    Custom(CommandFn),
}

#[derive(Clone, Copy)]
pub enum EnvironmentRule {
    /// `$...$`, rendered as `\(...\)`.
    InlineMath,
    /// Kept as `\begin{name}...\end{name}` with content in math mode.
    DisplayMath,
    /// Kept as `\begin{name}...\end{name}` with the mode unchanged.
    Passthrough,
    List,
    TheoremLike,
    /// `<div class="name">` without recording a diagnostic.
    Container,
    Tabular,
    Hash,
    Bibliography,
    Custom(EnvironmentFn),
}

#[derive(Clone, Default)]
pub struct Registry {
    commands: HashMap<String, CommandRule>,
    environments: HashMap<String, EnvironmentRule>,
}

/// Label kinds that get a `\Klabel` and a `\Kref` command.
pub const LABEL_KINDS: &[&str] = &["", "fig", "eq", "thm", "lem", "exc", "chap", "sec"];

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in command and environment table.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_standard_commands();
        registry.register_standard_environments();
        registry
    }

    pub fn register_command(&mut self, name: impl Into<String>, rule: CommandRule) -> &mut Self {
        self.commands.insert(name.into(), rule);
        self
    }

    pub fn register_environment(
        &mut self,
        name: impl Into<String>,
        rule: EnvironmentRule,
    ) -> &mut Self {
        self.environments.insert(name.into(), rule);
        self
    }

    /// The rule for `name`. A `\Klabel` or `\Kref` whose kind has no entry of
    /// its own still gets the label or reference rule.
    pub fn command(&self, name: &str) -> Option<CommandRule> {
        self.commands
            .get(name)
            .copied()
            .or_else(|| kinded_rule(name))
    }

    pub fn environment(&self, name: &str) -> Option<EnvironmentRule> {
        self.environments.get(name).copied()
    }

    fn register_standard_commands(&mut self) {
        let wraps = [
            ("chapter", "<div class=\"chapter\">", "</div><!-- chapter -->"),
            ("section", "<h1>", "</h1>"),
            ("subsection", "<h2>", "</h2>"),
            ("subsubsection", "<h3>", "</h3>"),
            (
                "paragraph",
                "<div class=\"paragraph_title\">",
                "</div><!-- paragraph_title -->",
            ),
            ("emph", "<em>", "</em>"),
            ("textit", "<em>", "</em>"),
            ("textbf", "<strong>", "</strong>"),
            ("texttt", "<code>", "</code>"),
            ("caption", "<div class=\"caption\">", "</div><!-- caption -->"),
        ];
        for (name, open, close) in wraps {
            self.register_command(name, CommandRule::Wrap { open, close });
        }
        for name in ["chapter*", "section*", "subsection*", "subsubsection*"] {
            let base = name.trim_end_matches('*');
            if let Some(rule) = self.command(base) {
                self.register_command(name, rule);
            }
        }

        self.register_command("includegraphics", CommandRule::Graphics);
        self.register_command("cite", CommandRule::Cite);
        self.register_command("footnote", CommandRule::Footnote);
        self.register_command("url", CommandRule::Url);
        self.register_command("href", CommandRule::Href);
        self.register_command("hyperref", CommandRule::Hyperref);
        for name in ["ldots", "vdots", "cdots", "dots"] {
            self.register_command(name, CommandRule::Dots);
        }

        let worthless = [
            "newlength",
            "setlength",
            "addtolength",
            "vspace",
            "index",
            "qedhere",
            "end",
            "hline",
            "noindent",
            "centering",
            "cpponly",
            "cppimport",
            "pcodeonly",
            "pcodeimport",
        ];
        for name in worthless {
            self.register_command(name, CommandRule::Discard);
        }

        for kind in LABEL_KINDS {
            self.register_command(format!("{kind}label"), CommandRule::Discard);
            self.register_command(format!("{kind}ref"), CommandRule::Ref);
        }
        self.register_command("pageref", CommandRule::Ref);

        for name in ["mbox", "text"] {
            self.register_command(name, CommandRule::MathBreak);
        }
    }

    fn register_standard_environments(&mut self) {
        self.register_environment("dollar", EnvironmentRule::InlineMath);
        self.register_environment("tabular", EnvironmentRule::Tabular);
        self.register_environment("hash", EnvironmentRule::Hash);
        self.register_environment("thebibliography", EnvironmentRule::Bibliography);
        let display = [
            "equation",
            "equation*",
            "align",
            "align*",
            "eqnarray",
            "eqnarray*",
        ];
        for name in display {
            self.register_environment(name, EnvironmentRule::DisplayMath);
        }
        for name in ["array", "cases", "matrix", "pmatrix"] {
            self.register_environment(name, EnvironmentRule::Passthrough);
        }
        for name in ["itemize", "enumerate", "list", "description"] {
            self.register_environment(name, EnvironmentRule::List);
        }
        for name in ["thm", "lem", "exc", "proof"] {
            self.register_environment(name, EnvironmentRule::TheoremLike);
        }
        for name in ["figure", "center"] {
            self.register_environment(name, EnvironmentRule::Container);
        }
    }
}

fn kinded_rule(name: &str) -> Option<CommandRule> {
    let is_kind = |kind: &str| !kind.is_empty() && kind.bytes().all(|b| b.is_ascii_alphabetic());
    if name.strip_suffix("label").is_some_and(is_kind) {
        Some(CommandRule::Discard)
    } else if name.strip_suffix("ref").is_some_and(is_kind) {
        Some(CommandRule::Ref)
    } else {
        None
    }
}
