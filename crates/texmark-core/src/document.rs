//! Batch pipeline: preprocess, number and render each document, then resolve
//! cross-references once the whole batch is known.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::context::{Context, ImageRequest, Mode};
use crate::diagnostic::Diagnostics;
use crate::error::Result;
use crate::numbering::number_document;
use crate::preprocess::preprocess;
use crate::render::{escape_html, process_recursively};
use crate::xref::{relative_href, resolve_references};

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex compiles"));

/// One rendered output file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedDocument {
    /// Output path, relative to the output root.
    pub path: PathBuf,
    /// Plain-text title taken from the first chapter heading.
    pub title: String,
    pub body: String,
    /// Contents list of this document's own headings.
    pub toc: String,
    pub footnotes: String,
}

/// A heading with its title rendered to HTML.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TocLine {
    pub level: usize,
    pub number: String,
    pub title: String,
    pub file: PathBuf,
    pub anchor: String,
}

/// Documents rendered so far and the context they share.
pub struct Batch {
    ctx: Context,
    documents: Vec<RenderedDocument>,
    toc: Vec<TocLine>,
}

impl Batch {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            documents: Vec::new(),
            toc: Vec::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// Renders `source`, to be written at `path`. References stay unresolved
    /// until [`finish`](Self::finish).
    pub fn add(&mut self, path: impl Into<PathBuf>, source: &str) -> Result<()> {
        self.add_document(path.into(), None, source)
    }

    /// Like [`add`](Self::add), for a source read from `source_path`. Images
    /// are looked up next to the source rather than next to the output.
    pub fn add_file(
        &mut self,
        path: impl Into<PathBuf>,
        source_path: &Path,
        source: &str,
    ) -> Result<()> {
        let source_dir = source_path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.add_document(path.into(), Some(source_dir), source)
    }

    fn add_document(
        &mut self,
        path: PathBuf,
        source_dir: Option<PathBuf>,
        source: &str,
    ) -> Result<()> {
        let ctx = &mut self.ctx;
        ctx.begin_document(path.clone());
        if let Some(dir) = source_dir {
            ctx.set_source_dir(dir);
        }
        let first_heading = ctx.toc.len();

        let text = preprocess(source);
        let text = number_document(ctx, &text)?;
        let body = process_recursively(ctx, &text, Mode::empty())?.concat();
        let footnotes = ctx.footnotes.take_html();

        let entries = ctx.toc[first_heading..].to_vec();
        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            let title = process_recursively(ctx, &entry.title, Mode::TOC)?.concat();
            lines.push(TocLine {
                level: entry.level,
                number: entry.number,
                title,
                file: entry.file,
                anchor: entry.anchor,
            });
        }
        let title = lines
            .iter()
            .find(|line| line.level == 0)
            .map(|line| plain_text(&line.title))
            .unwrap_or_default();

        debug!(file = %path.display(), headings = lines.len(), "rendered document");
        self.toc.extend(lines);
        self.documents.push(RenderedDocument {
            path,
            title,
            body,
            toc: String::new(),
            footnotes,
        });
        Ok(())
    }

    /// Resolves every cross-reference and hands back the finished batch.
    pub fn finish(self) -> Result<BatchOutput> {
        let Self {
            mut ctx,
            documents,
            mut toc,
        } = self;

        for line in &mut toc {
            line.title = resolve_references(&mut ctx, &line.file, &line.title);
        }
        let mut finished = Vec::with_capacity(documents.len());
        for mut doc in documents {
            doc.body = resolve_references(&mut ctx, &doc.path, &doc.body);
            doc.footnotes = resolve_references(&mut ctx, &doc.path, &doc.footnotes);
            let own: Vec<&TocLine> = toc.iter().filter(|line| line.file == doc.path).collect();
            doc.toc = toc_list(&doc.path, own);
            finished.push(doc);
        }

        Ok(BatchOutput {
            documents: finished,
            toc,
            diagnostics: ctx.diagnostics,
            images: ctx.images,
        })
    }
}

/// Everything a batch produced.
#[derive(Debug)]
pub struct BatchOutput {
    pub documents: Vec<RenderedDocument>,
    toc: Vec<TocLine>,
    diagnostics: Diagnostics,
    images: Vec<ImageRequest>,
}

impl BatchOutput {
    /// Contents list of the whole batch, with links relative to `from`.
    pub fn toc_html(&self, from: &Path) -> String {
        toc_list(from, self.toc.iter())
    }

    pub fn toc(&self) -> &[TocLine] {
        &self.toc
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn images(&self) -> &[ImageRequest] {
        &self.images
    }
}

fn toc_list<'a>(from: &Path, lines: impl IntoIterator<Item = &'a TocLine>) -> String {
    let mut out = String::from("<ul class=\"toc\">\n");
    for line in lines {
        let href = relative_href(from, &line.file, &line.anchor);
        out.push_str(&format!(
            "<li class=\"toc-level-{}\"><a href=\"{}\">{}&emsp;{}</a></li>\n",
            line.level,
            escape_html(&href),
            line.number,
            line.title
        ));
    }
    out.push_str("</ul>");
    out
}

fn plain_text(html: &str) -> String {
    TAG.replace_all(html, "").trim().to_string()
}
