use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntectTheme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use texmark_core::escape_html;
use tracing::debug;

const PRE_TAG: &str = "<pre class=\"codeimport\">";

#[derive(Debug, Clone, Copy, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Syntax highlighting for imported source excerpts.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new(theme: Theme) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme,
        }
    }

    /// Rewrites every `<pre class="codeimport"><code class="language-X">`
    /// block with inline-styled spans. Other markup is copied unchanged.
    pub fn highlight_html(&self, html: &str) -> String {
        let theme = pick_theme(self.theme, &self.theme_set);
        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        let mut blocks = 0usize;

        while let Some(start) = rest.find(PRE_TAG) {
            out.push_str(&rest[..start]);
            let after_start = &rest[start..];
            let end = match after_start.find("</pre>") {
                Some(index) => index + "</pre>".len(),
                None => {
                    out.push_str(after_start);
                    return out;
                }
            };
            out.push_str(&self.highlight_block(&after_start[..end], theme));
            rest = &after_start[end..];
            blocks += 1;
        }

        out.push_str(rest);
        debug!(blocks, "highlighted code blocks");
        out
    }

    fn highlight_block(&self, block: &str, theme: &SyntectTheme) -> String {
        let Some(code_start) = block.find("<code") else {
            return block.to_string();
        };
        let Some(code_tag_end) = block[code_start..].find('>').map(|idx| code_start + idx) else {
            return block.to_string();
        };
        let code_tag = &block[code_start..=code_tag_end];
        let Some(code_close) = block[code_tag_end + 1..]
            .find("</code>")
            .map(|idx| code_tag_end + 1 + idx)
        else {
            return block.to_string();
        };
        let code = unescape_html_code(&block[code_tag_end + 1..code_close]);

        let syntax = extract_language(code_tag)
            .as_deref()
            .and_then(|token| self.syntax_set.find_syntax_by_token(token))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let highlighted = self.highlight_code(&code, syntax, theme);

        let mut out = String::with_capacity(block.len() + highlighted.len());
        out.push_str(&block[..=code_tag_end]);
        out.push_str(&highlighted);
        out.push_str(&block[code_close..]);
        out
    }

    fn highlight_code(&self, code: &str, syntax: &SyntaxReference, theme: &SyntectTheme) -> String {
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut out = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            let html = highlighter
                .highlight_line(line, &self.syntax_set)
                .ok()
                .and_then(|ranges| {
                    styled_line_to_highlighted_html(&ranges, IncludeBackground::No).ok()
                });
            match html {
                Some(html) => out.push_str(&strip_font_weight(&html)),
                None => out.push_str(&escape_html(line)),
            }
        }
        out
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

fn pick_theme(theme: Theme, theme_set: &ThemeSet) -> &SyntectTheme {
    let candidates = match theme {
        Theme::Dark => ["Monokai Extended Bright", "Monokai Extended", "base16-ocean.dark"],
        Theme::Light => ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"],
    };
    for name in candidates {
        if let Some(found) = theme_set.themes.get(name) {
            return found;
        }
    }
    theme_set
        .themes
        .values()
        .next()
        .expect("theme set has at least one theme")
}

fn extract_language(code_tag: &str) -> Option<String> {
    let class_attr = extract_attr(code_tag, "class")?;
    class_attr
        .split_whitespace()
        .filter_map(|class_name| class_name.strip_prefix("language-"))
        .find(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn extract_attr(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')?;
    Some(tag[start..start + end].to_string())
}

fn unescape_html_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let entities = [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"')];
        match entities
            .iter()
            .find_map(|(entity, ch)| tail.strip_prefix(entity).map(|stripped| (*ch, stripped)))
        {
            Some((ch, stripped)) => {
                out.push(ch);
                rest = stripped;
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_font_weight(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find("font-weight:") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + "font-weight:".len()..];
        match tail.find(';') {
            Some(index) => rest = &tail[index + 1..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}
