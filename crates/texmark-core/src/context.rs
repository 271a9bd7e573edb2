use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::diagnostic::Diagnostics;
use crate::label::LabelTable;
use crate::numbering::Numbering;
use crate::registry::Registry;

bitflags! {
    /// Rendering mode carried down the recursion.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Mode: u8 {
        const MATH = 0b0000_0001;
        /// Rendering a heading title for a contents list; footnotes are
        /// dropped since the body already numbered them.
        const TOC = 0b0000_0010;
    }
}

/// Looks up source excerpts for `\codeimport`.
pub trait CodeSource {
    /// Source text of `member` (a method signature such as `add(i,x)`, a field
    /// or a nested class) in `class`, or `None` when it cannot be found.
    fn member(&mut self, class: &str, member: &str) -> Option<String>;
}

/// Strictly increasing anchor ids. Seeded the same way every run, so output
/// is reproducible.
#[derive(Clone, Debug, Default)]
pub struct AnchorIds {
    issued: u64,
}

impl AnchorIds {
    pub fn next(&mut self, prefix: &str) -> String {
        self.issued += 1;
        format!("{}:{}", prefix, self.issued)
    }
}

/// Footnotes of the document being rendered.
#[derive(Clone, Debug, Default)]
pub struct Footnotes {
    notes: Vec<String>,
}

impl Footnotes {
    /// Stores a rendered footnote body and returns its 1-based number.
    pub fn push(&mut self, body: String) -> usize {
        self.notes.push(body);
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Drains the footnotes into an `<ol>`; empty string when there are none.
    pub fn take_html(&mut self) -> String {
        if self.notes.is_empty() {
            return String::new();
        }
        let mut out = String::from("<ol class=\"footnotes\">\n");
        for (idx, body) in self.notes.drain(..).enumerate() {
            let n = idx + 1;
            out.push_str(&format!(
                "<li id=\"fn:{n}\">{body} <a href=\"#fnref:{n}\">&#8617;</a></li>\n"
            ));
        }
        out.push_str("</ol>");
        out
    }
}

/// A numbered heading, collected for the tables of contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TocEntry {
    /// 0 for chapters, 1 for sections and so on.
    pub level: usize,
    pub number: String,
    /// Heading argument as written in the source.
    pub title: String,
    pub file: PathBuf,
    pub anchor: String,
}

/// An image referenced by `\includegraphics`. `document` is the output page
/// that asked for it; `source_dir` is where that page's source lives.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ImageRequest {
    pub document: PathBuf,
    pub source_dir: PathBuf,
    pub name: String,
}

/// State shared by every pass over every document of one batch.
pub struct Context {
    pub registry: Registry,
    pub labels: LabelTable,
    pub numbering: Numbering,
    pub anchors: AnchorIds,
    pub diagnostics: Diagnostics,
    pub footnotes: Footnotes,
    pub toc: Vec<TocEntry>,
    pub images: Vec<ImageRequest>,
    current_file: PathBuf,
    source_dir: PathBuf,
    code_source: Option<Box<dyn CodeSource>>,
}

impl Context {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            labels: LabelTable::default(),
            numbering: Numbering::default(),
            anchors: AnchorIds::default(),
            diagnostics: Diagnostics::default(),
            footnotes: Footnotes::default(),
            toc: Vec::new(),
            images: Vec::new(),
            current_file: PathBuf::new(),
            source_dir: PathBuf::new(),
            code_source: None,
        }
    }

    pub fn with_code_source(mut self, source: impl CodeSource + 'static) -> Self {
        self.code_source = Some(Box::new(source));
        self
    }

    pub fn code_source_mut(&mut self) -> Option<&mut (dyn CodeSource + 'static)> {
        self.code_source.as_deref_mut()
    }

    pub fn current_file(&self) -> &Path {
        &self.current_file
    }

    /// Switches to a new output file. Section and environment counters carry
    /// over; the "most recent anchor" state does not. Images resolve next to
    /// the output file until [`Context::set_source_dir`] says otherwise.
    pub fn begin_document(&mut self, file: impl Into<PathBuf>) {
        self.current_file = file.into();
        self.source_dir = self
            .current_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.numbering.begin_document();
        self.footnotes = Footnotes::default();
    }

    pub fn set_source_dir(&mut self, dir: impl Into<PathBuf>) {
        self.source_dir = dir.into();
    }

    pub fn request_image(&mut self, name: &str) {
        let request = ImageRequest {
            document: self.current_file.clone(),
            source_dir: self.source_dir.clone(),
            name: name.to_string(),
        };
        if !self.images.contains(&request) {
            self.images.push(request);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Registry::standard())
    }
}
