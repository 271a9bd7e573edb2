use std::fs;
use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use texmark_core::{RenderedDocument, escape_html};

use crate::error::{Error, Result, io_error};

const SKELETON: &str = include_str!("../assets/skeleton.html");
const BASE_CSS: &str = include_str!("../assets/texmark.css");

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"TITLE|TOC|CONTENT|FOOTNOTES|ROOT").expect("token regex compiles"));

/// A page skeleton with `TITLE`, `TOC`, `CONTENT` and `FOOTNOTES` tokens.
/// `ROOT` becomes the relative path from the page to the output root, for
/// links to shared assets.
#[derive(Debug, Clone)]
pub struct Page {
    template: String,
}

impl Page {
    /// Fails when the template has no `CONTENT` token. The other tokens are
    /// optional.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("CONTENT") {
            return Err(Error::Template { token: "CONTENT" });
        }
        Ok(Self { template })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let template = fs::read_to_string(path).map_err(io_error("read", path))?;
        Self::new(template)
    }

    pub fn render(&self, doc: &RenderedDocument) -> String {
        let root = root_prefix(&doc.path);
        self.fill(&doc.title, &root, &doc.toc, &doc.body, &doc.footnotes)
    }

    /// The batch-wide contents page, written at `path` in the output root.
    pub fn render_toc(&self, path: &Path, title: &str, toc_html: &str) -> String {
        self.fill(title, &root_prefix(path), "", toc_html, "")
    }

    /// Tokens are replaced in the template only, never inside the
    /// substituted text.
    fn fill(&self, title: &str, root: &str, toc: &str, content: &str, footnotes: &str) -> String {
        let title = escape_html(title);
        TOKEN
            .replace_all(&self.template, |caps: &Captures<'_>| match &caps[0] {
                "TITLE" => title.clone(),
                "TOC" => toc.to_string(),
                "CONTENT" => content.to_string(),
                "ROOT" => root.to_string(),
                _ => footnotes.to_string(),
            })
            .into_owned()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            template: SKELETON.to_string(),
        }
    }
}

/// `ch/a.html` is one level below the root: `../`.
fn root_prefix(page: &Path) -> String {
    let depth = page
        .parent()
        .map(|dir| {
            dir.components()
                .filter(|part| matches!(part, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    "../".repeat(depth)
}

pub fn stylesheet() -> &'static str {
    BASE_CSS
}

/// Writes the stylesheet next to the rendered pages.
pub fn write_assets(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).map_err(io_error("create", out_dir))?;
    let css = out_dir.join("texmark.css");
    fs::write(&css, BASE_CSS).map_err(io_error("write", css))?;
    Ok(())
}
