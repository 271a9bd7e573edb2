//! Label and numbering pass.
//!
//! Runs on preprocessed source before rendering. Headings and numbered
//! environments get their numbers and anchors written into the text, label
//! commands are consumed into the [`LabelTable`](crate::LabelTable), and
//! bibliography items are assigned citation numbers.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::context::{Context, TocEntry};
use crate::delim::match_group;
use crate::error::Result;
use crate::label::{LabelTarget, kind_title, label_key};
use crate::scan::{is_escaped, next_command};

const HEADINGS: [&str; 4] = ["chapter", "section", "subsection", "subsubsection"];
const NUMBERED_KINDS: [&str; 5] = ["thm", "lem", "exc", "figure", "equation"];
const THEOREM_LIKE: [&str; 3] = ["thm", "lem", "exc"];

/// Anchor recorded by labels that appear before any numbered item.
pub const TOP_ANCHOR: &str = "top";

static NUMBERED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\\(?:(?P<heading>chapter|section|subsection|subsubsection)\{|begin\{(?P<env>thm|lem|exc|figure|equation)\}|(?P<kind>[A-Za-z]+)label\{|(?P<caption>caption)\{|(?P<bare>label)\{|(?P<bibitem>bibitem)\{)",
    )
    .expect("numbering regex compiles")
});

/// Counters and "most recent item" state of the numbering pass.
///
/// Counters persist across the documents of a batch so chapters keep their
/// numbers when a book is split over several files. The most-recent state is
/// per document.
#[derive(Clone, Debug, Default)]
pub struct Numbering {
    sections: [u32; HEADINGS.len()],
    kinds: [u32; NUMBERED_KINDS.len()],
    citations: u32,
    last_anchor: Option<String>,
    last_number: String,
    last_kind: Option<&'static str>,
}

impl Numbering {
    pub fn begin_document(&mut self) {
        self.last_anchor = None;
        self.last_number.clear();
        self.last_kind = None;
    }

    /// Enters a heading at `level` and returns its dotted number.
    pub fn enter_heading(&mut self, level: usize) -> String {
        if level == 0 {
            self.kinds = [0; NUMBERED_KINDS.len()];
            self.last_kind = None;
        }
        self.sections[level] += 1;
        for deeper in &mut self.sections[level + 1..] {
            *deeper = 0;
        }
        let number = self.sections[..=level]
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        self.remember(format!("{}:{number}", HEADINGS[level]), &number);
        number
    }

    /// Enters a numbered environment and returns `CHAPTER.K`.
    pub fn enter_environment(&mut self, kind: &'static str) -> String {
        let idx = kind_index(kind);
        self.kinds[idx] += 1;
        let number = format!("{}.{}", self.sections[0], self.kinds[idx]);
        self.remember(format!("{kind}:{number}"), &number);
        self.last_kind = Some(kind);
        number
    }

    /// Number of the most recent numbered environment in this chapter, for
    /// its caption. With none, the caption opens a figure of its own and the
    /// flag is set so the caller writes that figure's anchor.
    pub fn caption(&mut self) -> (&'static str, String, bool) {
        let Some(kind) = self.last_kind else {
            let number = self.enter_environment("figure");
            return ("figure", number, true);
        };
        let number = format!("{}.{}", self.sections[0], self.kinds[kind_index(kind)]);
        self.remember(format!("{kind}:{number}"), &number);
        (kind, number, false)
    }

    pub fn next_citation(&mut self) -> u32 {
        self.citations += 1;
        self.citations
    }

    pub fn last_anchor(&self) -> &str {
        self.last_anchor.as_deref().unwrap_or(TOP_ANCHOR)
    }

    pub fn last_number(&self) -> &str {
        &self.last_number
    }

    fn remember(&mut self, anchor: String, number: &str) {
        self.last_anchor = Some(anchor);
        self.last_number = number.to_string();
    }
}

fn kind_index(kind: &str) -> usize {
    NUMBERED_KINDS
        .iter()
        .position(|known| *known == kind)
        .unwrap_or(NUMBERED_KINDS.len() - 1)
}

fn static_kind(kind: &str) -> &'static str {
    NUMBERED_KINDS[kind_index(kind)]
}

/// Numbers one document and consumes its label commands.
pub fn number_document(ctx: &mut Context, text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut cursor = 0;
    while let Some(caps) = NUMBERED.captures_at(text, cursor) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        out.push_str(&text[cursor..whole.start()]);
        if is_escaped(text.as_bytes(), whole.start()) {
            out.push_str(&text[whole.start()..whole.start() + 1]);
            cursor = whole.start() + 1;
            continue;
        }

        if let Some(name) = caps.name("heading") {
            let level = HEADINGS
                .iter()
                .position(|heading| *heading == name.as_str())
                .unwrap_or(0);
            cursor = heading(ctx, text, whole.end(), level, &mut out)?;
        } else if let Some(kind) = caps.name("env") {
            cursor = environment(ctx, text, whole.end(), static_kind(kind.as_str()), &mut out)?;
        } else if let Some(kind) = caps.name("kind") {
            cursor = label(ctx, text, whole.start(), kind.as_str())?;
        } else if caps.name("caption").is_some() {
            let (kind, number, opened) = ctx.numbering.caption();
            let title = kind_title(kind).unwrap_or_default();
            if opened {
                out.push_str(&format!("<a id='{kind}:{number}'></a>"));
            }
            out.push_str(&format!(
                "\\caption{{<span class=\"title\">{title}&nbsp;{number}</span>&emsp;"
            ));
            cursor = whole.end();
        } else if caps.name("bare").is_some() {
            cursor = bare_label(ctx, text, whole.start(), &mut out)?;
        } else {
            cursor = bibitem(ctx, text, whole.start(), &mut out)?;
        }
    }
    out.push_str(&text[cursor..]);
    debug!(
        file = %ctx.current_file().display(),
        labels = ctx.labels.len(),
        "numbered document"
    );
    Ok(out)
}

/// Writes the anchor and the numbered heading opener, then resumes scanning
/// inside the title so labels there are still seen.
fn heading(
    ctx: &mut Context,
    text: &str,
    title_start: usize,
    level: usize,
    out: &mut String,
) -> Result<usize> {
    let name = HEADINGS[level];
    let number = ctx.numbering.enter_heading(level);
    let anchor = format!("{name}:{number}");
    let title = match_group(text, title_start - 1, b'{', b'}', false)?
        .map(|span| span.inner(text).to_string())
        .unwrap_or_default();
    let file = ctx.current_file().to_path_buf();
    ctx.toc.push(TocEntry {
        level,
        number: number.clone(),
        title,
        file,
        anchor: anchor.clone(),
    });
    out.push_str(&format!("<a id='{anchor}'></a>\\{name}{{{number}&emsp;"));
    Ok(title_start)
}

fn environment(
    ctx: &mut Context,
    text: &str,
    begin_end: usize,
    kind: &'static str,
    out: &mut String,
) -> Result<usize> {
    let number = ctx.numbering.enter_environment(kind);
    out.push_str(&format!("<a id='{kind}:{number}'></a>\\begin{{{kind}}}"));
    if THEOREM_LIKE.contains(&kind) {
        let title = kind_title(kind).unwrap_or_default();
        return match match_group(text, begin_end, b'[', b']', false)? {
            Some(span) => {
                out.push_str(&format!(
                    "[{title}&nbsp;{number} ({})]",
                    span.inner(text)
                ));
                Ok(span.end)
            }
            None => {
                out.push_str(&format!("[{title}&nbsp;{number}]"));
                Ok(begin_end)
            }
        };
    }
    if kind == "equation" {
        out.push_str(&format!("\\tag{{{number}}}"));
    }
    Ok(begin_end)
}

/// `\Klabel{name}` points `K:name` at the most recent anchor.
fn label(ctx: &mut Context, text: &str, start: usize, kind: &str) -> Result<usize> {
    let Some(cmd) = next_command(text, start)? else {
        return Ok(start + 1);
    };
    let name = cmd.arg(0).unwrap_or_default().trim();
    let target = LabelTarget {
        file: ctx.current_file().to_path_buf(),
        anchor: ctx.numbering.last_anchor().to_string(),
        number: ctx.numbering.last_number().to_string(),
    };
    record(ctx, label_key(kind, name), target);
    Ok(cmd.span.end)
}

/// Bare `\label{name}` gets an anchor of its own at the label's position.
fn bare_label(ctx: &mut Context, text: &str, start: usize, out: &mut String) -> Result<usize> {
    let Some(cmd) = next_command(text, start)? else {
        return Ok(start + 1);
    };
    let name = cmd.arg(0).unwrap_or_default().trim();
    let anchor = ctx.anchors.next("label");
    out.push_str(&format!("<a id='{anchor}'></a>"));
    let target = LabelTarget {
        file: ctx.current_file().to_path_buf(),
        anchor,
        number: ctx.numbering.last_number().to_string(),
    };
    record(ctx, name.to_string(), target);
    Ok(cmd.span.end)
}

fn bibitem(ctx: &mut Context, text: &str, start: usize, out: &mut String) -> Result<usize> {
    let Some(cmd) = next_command(text, start)? else {
        return Ok(start + 1);
    };
    let key = cmd.arg(0).unwrap_or_default().trim();
    let n = ctx.numbering.next_citation();
    let anchor = format!("cite:{n}");
    out.push_str(&format!("\\bibitem[{anchor}]{{{n}}}"));
    let target = LabelTarget {
        file: ctx.current_file().to_path_buf(),
        anchor,
        number: n.to_string(),
    };
    record(ctx, label_key("cite", key), target);
    Ok(cmd.span.end)
}

fn record(ctx: &mut Context, key: String, target: LabelTarget) {
    if let Some(previous) = ctx.labels.insert(key.clone(), target) {
        ctx.diagnostics.duplicate_label(&key);
        warn!(
            label = %key,
            previous = %previous.file.display(),
            "label defined more than once, keeping the last definition"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::number_document;
    use crate::context::Context;

    fn numbered(ctx: &mut Context, text: &str) -> String {
        number_document(ctx, text).unwrap()
    }

    #[test]
    fn headings_are_numbered_hierarchically() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(
            &mut ctx,
            r"\chapter{Intro}\section{Basics}\subsection{Deep}\section{More}",
        );
        assert_eq!(
            out,
            "<a id='chapter:1'></a>\\chapter{1&emsp;Intro}\
             <a id='section:1.1'></a>\\section{1.1&emsp;Basics}\
             <a id='subsection:1.1.1'></a>\\subsection{1.1.1&emsp;Deep}\
             <a id='section:1.2'></a>\\section{1.2&emsp;More}"
        );
        let numbers: Vec<_> = ctx.toc.iter().map(|e| e.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "1.1", "1.1.1", "1.2"]);
        assert_eq!(ctx.toc[1].title, "Basics");
    }

    #[test]
    fn chapters_reset_environment_counters() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(
            &mut ctx,
            r"\chapter{A}\begin{thm}x\end{thm}\begin{thm}y\end{thm}\chapter{B}\begin{thm}z\end{thm}",
        );
        assert!(out.contains(r"<a id='thm:1.1'></a>\begin{thm}[Theorem&nbsp;1.1]x"));
        assert!(out.contains(r"<a id='thm:1.2'></a>\begin{thm}[Theorem&nbsp;1.2]y"));
        assert!(out.contains(r"<a id='thm:2.1'></a>\begin{thm}[Theorem&nbsp;2.1]z"));
    }

    #[test]
    fn theorem_user_titles_are_kept() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(&mut ctx, r"\chapter{A}\begin{lem}[Pumping]x\end{lem}");
        assert!(out.contains(r"\begin{lem}[Lemma&nbsp;1.1 (Pumping)]x\end{lem}"));
    }

    #[test]
    fn labels_point_at_the_most_recent_anchor() {
        let mut ctx = Context::default();
        ctx.begin_document("ch/a.html");
        let out = numbered(
            &mut ctx,
            r"\chaplabel{early}\chapter{A}\chaplabel{a}\begin{equation}\eqlabel{sum}x\end{equation}",
        );
        assert!(!out.contains("label{"));
        assert!(out.contains(r"\begin{equation}\tag{1.1}"));

        let early = ctx.labels.get("chap:early").unwrap();
        assert_eq!(early.anchor, "top");
        let chapter = ctx.labels.get("chap:a").unwrap();
        assert_eq!(chapter.anchor, "chapter:1");
        assert_eq!(chapter.number, "1");
        let eq = ctx.labels.get("eq:sum").unwrap();
        assert_eq!(eq.anchor, "equation:1.1");
        assert_eq!(eq.file.to_str(), Some("ch/a.html"));
    }

    #[test]
    fn captions_use_the_enclosing_kind() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(
            &mut ctx,
            r"\chapter{A}\begin{figure}\caption{Trees}\figlabel{t}\end{figure}",
        );
        assert!(out.contains(
            r#"\caption{<span class="title">Figure&nbsp;1.1</span>&emsp;Trees}"#
        ));
        assert_eq!(ctx.labels.get("fig:t").unwrap().anchor, "figure:1.1");
    }

    #[test]
    fn loose_captions_open_a_figure() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(
            &mut ctx,
            r"\chapter{A}\begin{thm}x\end{thm}\chapter{B}\caption{Loose}\figlabel{f}",
        );
        assert!(out.contains(
            r#"<a id='figure:2.1'></a>\caption{<span class="title">Figure&nbsp;2.1</span>&emsp;Loose}"#
        ));
        let target = ctx.labels.get("fig:f").unwrap();
        assert_eq!(target.anchor, "figure:2.1");
        assert_eq!(target.number, "2.1");
    }

    #[test]
    fn any_kind_prefix_makes_a_label() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(&mut ctx, r"\chapter{A}\begin{thm}\alglabel{x}y\end{thm}");
        assert!(!out.contains("alglabel"));
        let target = ctx.labels.get("alg:x").unwrap();
        assert_eq!(target.anchor, "thm:1.1");
        assert_eq!(target.number, "1.1");
        assert!(ctx.labels.get("x").is_none());
    }

    #[test]
    fn bare_labels_get_fresh_anchors() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(&mut ctx, r"\chapter{A}text\label{here} more");
        assert!(out.contains("text<a id='label:1'></a> more"));
        let target = ctx.labels.get("here").unwrap();
        assert_eq!(target.anchor, "label:1");
        assert_eq!(target.number, "1");
    }

    #[test]
    fn duplicate_labels_are_reported() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        numbered(
            &mut ctx,
            r"\chapter{A}\thmlabel{x}\section{B}\thmlabel{x}",
        );
        assert!(ctx.diagnostics.duplicate_labels().contains("thm:x"));
        assert_eq!(ctx.labels.get("thm:x").unwrap().anchor, "section:1.1");
    }

    #[test]
    fn bibliography_items_are_numbered() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(&mut ctx, r"\bibitem{knuth} TAOCP \bibitem{clrs} CLRS");
        assert_eq!(
            out,
            r"\bibitem[cite:1]{1} TAOCP \bibitem[cite:2]{2} CLRS"
        );
        assert_eq!(ctx.labels.get("cite:clrs").unwrap().number, "2");
    }

    #[test]
    fn counters_carry_over_between_documents() {
        let mut ctx = Context::default();
        ctx.begin_document("one.html");
        numbered(&mut ctx, r"\chapter{A}");
        ctx.begin_document("two.html");
        let out = numbered(&mut ctx, r"\thmlabel{orphan}\chapter{B}");
        assert!(out.contains(r"\chapter{2&emsp;B}"));
        assert_eq!(ctx.labels.get("thm:orphan").unwrap().anchor, "top");
    }

    #[test]
    fn escaped_backslashes_are_not_commands() {
        let mut ctx = Context::default();
        ctx.begin_document("a.html");
        let out = numbered(&mut ctx, r"a\\section{x}");
        assert_eq!(out, r"a\\section{x}");
        assert!(ctx.toc.is_empty());
    }
}
