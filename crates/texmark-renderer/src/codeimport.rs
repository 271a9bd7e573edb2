//! Java member extraction for `\codeimport`.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lru::LruCache;
use regex::Regex;
use texmark_core::CodeSource;
use tracing::{debug, warn};

const CACHE_FILES: usize = 32;

/// A directory of `.java` files; `Class` maps to `ROOT/Class.java` and
/// `pkg/Class` to `ROOT/pkg/Class.java`.
pub struct JavaTree {
    root: PathBuf,
    cache: LruCache<PathBuf, Option<Rc<str>>>,
}

impl JavaTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let capacity = NonZeroUsize::new(CACHE_FILES).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            cache: LruCache::new(capacity),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&mut self, class: &str) -> Option<Rc<str>> {
        let path = self.root.join(format!("{class}.java"));
        if let Some(cached) = self.cache.get(&path) {
            return cached.clone();
        }
        let source = match fs::read_to_string(&path) {
            Ok(text) => Some(Rc::from(text)),
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read class source");
                None
            }
        };
        self.cache.put(path, source.clone());
        source
    }
}

impl CodeSource for JavaTree {
    fn member(&mut self, class: &str, member: &str) -> Option<String> {
        let source = self.load(class)?;
        let found = find_member(&source, member);
        debug!(class, member, found = found.is_some(), "code member lookup");
        found
    }
}

/// Source text of `member` in `source`: a method given as `name(a,b)` with
/// its parameter names, or a field or nested type given by name.
pub fn find_member(source: &str, member: &str) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    match member.split_once('(') {
        Some((name, params)) => {
            let params: Vec<&str> = params
                .trim_end_matches(')')
                .split(',')
                .map(str::trim)
                .filter(|param| !param.is_empty())
                .collect();
            let decl = method_pattern(name.trim())?;
            let start = lines
                .iter()
                .position(|line| is_method_declaration(&decl, line, &params))?;
            Some(dedent(&lines[start..=block_end(&lines, start)]))
        }
        None => {
            let name = regex::escape(member.trim());
            let type_decl = Regex::new(&format!(r"\b(?:class|interface|enum)\s+{name}\b")).ok()?;
            if let Some(start) = lines.iter().position(|line| type_decl.is_match(line)) {
                return Some(dedent(&lines[start..=block_end(&lines, start)]));
            }
            let field = Regex::new(&format!(r"^\s*(?:[\w<>\[\],]+\s+)+{name}\s*(?:=|;)")).ok()?;
            let start = lines.iter().position(|line| field.is_match(line))?;
            let end = (start..lines.len())
                .find(|&idx| lines[idx].contains(';'))
                .unwrap_or(start);
            Some(dedent(&lines[start..=end]))
        }
    }
}

fn method_pattern(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"^(\s*[^=();]*?)\b{}\s*\(([^)]*)\)", regex::escape(name))).ok()
}

/// A declaration has something before the name (modifiers or a return type),
/// is not a statement, and its parameter names match `params`.
fn is_method_declaration(decl: &Regex, line: &str, params: &[&str]) -> bool {
    let Some(caps) = decl.captures(line) else {
        return false;
    };
    let before = caps.get(1).map_or("", |m| m.as_str()).trim();
    if before.is_empty() || before.starts_with("return") || before.contains('.') {
        return false;
    }
    if line.trim_end().ends_with(';') {
        return false;
    }
    let declared: Vec<&str> = caps
        .get(2)
        .map_or("", |m| m.as_str())
        .split(',')
        .filter_map(|param| param.split_whitespace().last())
        .collect();
    declared == params
}

/// Last line of the brace block opened on or after `start`. A declaration
/// that ends with `;` before any `{` is a single statement.
fn block_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                ';' if !opened => return idx,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return idx;
        }
    }
    lines.len().saturating_sub(1)
}

fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
