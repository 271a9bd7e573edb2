use once_cell::sync::Lazy;
use regex::Regex;

use crate::delim::match_group;
use crate::error::{Error, Result, context_around};
use crate::span::Span;

static COMMAND_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\([A-Za-z0-9]+\*?)").expect("command regex compiles"));

/// One macro invocation: `\name[opt]...{arg}...`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    pub name: String,
    pub optargs: Vec<String>,
    pub args: Vec<String>,
    pub span: Span,
}

impl Command {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn optarg(&self, index: usize) -> Option<&str> {
        self.optargs.get(index).map(String::as_str)
    }

    /// Offset just past the name and the optional groups, before any
    /// required group.
    pub fn optargs_end(&self) -> usize {
        let name_end = self.span.start + 1 + self.name.len();
        name_end + self.optargs.iter().map(|arg| arg.len() + 2).sum::<usize>()
    }
}

/// A `\begin{name}` ... `\end{name}` block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Environment {
    pub name: String,
    pub optargs: Vec<String>,
    pub args: Vec<String>,
    pub content: String,
    pub span: Span,
}

impl Environment {
    pub fn optarg(&self, index: usize) -> Option<&str> {
        self.optargs.get(index).map(String::as_str)
    }
}

/// Argument groups read after a command name.
#[derive(Debug, Default)]
pub struct Arguments {
    pub optargs: Vec<String>,
    pub args: Vec<String>,
    pub end: usize,
}

/// Reads `[...]` groups, then `{...}` groups, starting exactly at `pos`.
pub fn chomp_args(text: &str, pos: usize) -> Result<Arguments> {
    let mut out = Arguments {
        end: pos,
        ..Arguments::default()
    };
    while let Some(span) = match_group(text, out.end, b'[', b']', false)? {
        out.optargs.push(span.inner(text).to_string());
        out.end = span.end;
    }
    while let Some(span) = match_group(text, out.end, b'{', b'}', false)? {
        out.args.push(span.inner(text).to_string());
        out.end = span.end;
    }
    Ok(out)
}

/// Finds the next command at or after `pos`.
///
/// A backslash that is itself escaped (`\\name`) does not start a command.
pub fn next_command(text: &str, pos: usize) -> Result<Option<Command>> {
    let mut from = pos;
    while let Some(caps) = COMMAND_NAME.captures_at(text, from) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            return Ok(None);
        };
        if is_escaped(text.as_bytes(), whole.start()) {
            from = whole.start() + 1;
            continue;
        }
        let arguments = chomp_args(text, whole.end())?;
        return Ok(Some(Command {
            name: name.as_str().to_string(),
            optargs: arguments.optargs,
            args: arguments.args,
            span: Span::new(whole.start(), arguments.end),
        }));
    }
    Ok(None)
}

/// Builds the environment opened by `begin`, matching nested blocks of the
/// same name.
pub fn get_environment(text: &str, begin: &Command) -> Result<Environment> {
    let Some(name) = begin.args.first() else {
        return Err(Error::UnnamedEnvironment {
            context: context_around(text, begin.span.start),
        });
    };
    let more = chomp_args(text, begin.span.end)?;
    let mut args: Vec<String> = begin.args[1..].to_vec();
    args.extend(more.args);
    let content_start = more.end;

    let open_tag = format!("\\begin{{{name}}}");
    let close_tag = format!("\\end{{{name}}}");
    let mut depth = 1usize;
    let mut cursor = content_start;
    loop {
        let Some(close) = text[cursor..].find(&close_tag).map(|idx| cursor + idx) else {
            return Err(Error::UnmatchedEnvironment {
                name: name.clone(),
                context: context_around(text, begin.span.start),
            });
        };
        match text[cursor..].find(&open_tag).map(|idx| cursor + idx) {
            Some(open) if open < close => {
                depth += 1;
                cursor = open + open_tag.len();
            }
            _ => {
                depth -= 1;
                cursor = close + close_tag.len();
                if depth == 0 {
                    return Ok(Environment {
                        name: name.clone(),
                        optargs: more.optargs,
                        args,
                        content: text[content_start..close].to_string(),
                        span: Span::new(begin.span.start, cursor),
                    });
                }
            }
        }
    }
}

pub(crate) fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let run = bytes[..pos].iter().rev().take_while(|&&b| b == b'\\').count();
    run % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::{get_environment, next_command};
    use crate::error::Error;
    use crate::span::Span;

    #[test]
    fn reads_name_and_argument_groups() {
        let text = r"see \foo[a][b]{c}{d{e}} rest";
        let cmd = next_command(text, 0).unwrap().unwrap();
        assert_eq!(cmd.name, "foo");
        assert_eq!(cmd.optargs, vec!["a", "b"]);
        assert_eq!(cmd.args, vec!["c", "d{e}"]);
        assert_eq!(cmd.span.slice(text), r"\foo[a][b]{c}{d{e}}");
        assert_eq!(cmd.optargs_end(), 14);
    }

    #[test]
    fn argument_groups_stop_at_whitespace() {
        let text = r"\emph {x}";
        let cmd = next_command(text, 0).unwrap().unwrap();
        assert!(cmd.args.is_empty());
        assert_eq!(cmd.span, Span::new(0, 5));
    }

    #[test]
    fn optional_groups_must_come_first() {
        let text = r"\begin{thm}[Title]";
        let cmd = next_command(text, 0).unwrap().unwrap();
        assert_eq!(cmd.args, vec!["thm"]);
        assert!(cmd.optargs.is_empty());
    }

    #[test]
    fn starred_names_and_escaped_backslashes() {
        let text = r"a\\b \section*{X}";
        let cmd = next_command(text, 0).unwrap().unwrap();
        assert_eq!(cmd.name, "section*");
        assert_eq!(cmd.args, vec!["X"]);
    }

    #[test]
    fn no_command_is_none() {
        assert!(next_command("plain text", 0).unwrap().is_none());
        assert!(next_command(r"\emph{x}", 1).unwrap().is_none());
    }

    #[test]
    fn nested_environments_of_the_same_name() {
        let text = r"\begin{itemize}a\begin{itemize}b\end{itemize}c\end{itemize}d";
        let begin = next_command(text, 0).unwrap().unwrap();
        let env = get_environment(text, &begin).unwrap();
        assert_eq!(env.name, "itemize");
        assert_eq!(env.content, r"a\begin{itemize}b\end{itemize}c");
        assert_eq!(env.span.end, text.len() - 1);
    }

    #[test]
    fn proof_inside_theorem_matches_its_own_end() {
        let text = r"\begin{thm}[T]x\begin{proof}y\end{proof}z\end{thm}";
        let begin = next_command(text, 0).unwrap().unwrap();
        let thm = get_environment(text, &begin).unwrap();
        assert_eq!(thm.optargs, vec!["T"]);
        assert_eq!(thm.content, r"x\begin{proof}y\end{proof}z");

        let inner = &thm.content;
        let begin = next_command(inner, 1).unwrap().unwrap();
        let proof = get_environment(inner, &begin).unwrap();
        assert_eq!(proof.content, "y");
        assert_eq!(proof.span.slice(inner), r"\begin{proof}y\end{proof}");
    }

    #[test]
    fn environment_arguments_follow_the_name() {
        let text = r"\begin{tabular}{ll}a&b\end{tabular}";
        let begin = next_command(text, 0).unwrap().unwrap();
        let env = get_environment(text, &begin).unwrap();
        assert_eq!(env.args, vec!["ll"]);
        assert_eq!(env.content, "a&b");
    }

    #[test]
    fn unmatched_environment_is_fatal() {
        let text = r"\begin{thm}never closed";
        let begin = next_command(text, 0).unwrap().unwrap();
        let err = get_environment(text, &begin).unwrap_err();
        assert!(matches!(err, Error::UnmatchedEnvironment { ref name, .. } if name == "thm"));
    }
}
