//! Rasterizing `\includegraphics` sources to SVG with an external tool.
//!
//! The documents reference `name.svg`; the source drawings are Ipe files next
//! to the document. `name-N` selects page `N` of `name.ipe`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use texmark_core::ImageRequest;
use tracing::{debug, warn};

pub const DEFAULT_TOOL: &str = "iperender";
const SOURCE_EXTENSION: &str = "ipe";

#[derive(Debug, Clone)]
pub struct Rasterizer {
    tool: String,
}

/// Source file and page for one requested image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub path: PathBuf,
    pub page: u32,
}

impl Rasterizer {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Renders every requested image that has no SVG under `out_root` yet.
    /// Drawings are looked up in each request's source directory. Returns how
    /// many were written. Failures are logged and skipped.
    pub fn rasterize_missing(&self, images: &[ImageRequest], out_root: &Path) -> usize {
        let mut pending = Vec::new();
        for image in images {
            let page_dir = image.document.parent().unwrap_or(Path::new(""));
            let output = out_root.join(page_dir).join(format!("{}.svg", image.name));
            if output.exists() {
                continue;
            }
            match locate_source(&image.source_dir, &image.name) {
                Some(source) => pending.push((source, output)),
                None => warn!(
                    image = %image.name,
                    dir = %image.source_dir.display(),
                    "no drawing found for image"
                ),
            }
        }
        if pending.is_empty() {
            return 0;
        }

        let Some(executable) = find_tool(&self.tool) else {
            warn!(tool = %self.tool, "graphics tool not found, images left unrendered");
            return 0;
        };

        let mut written = 0;
        for (source, output) in pending {
            if let Some(parent) = output.parent() {
                if let Err(err) = fs::create_dir_all(parent) {
                    warn!(dir = %parent.display(), %err, "failed to create image directory");
                    continue;
                }
            }
            let mut cmd = Command::new(&executable);
            cmd.arg("-svg")
                .arg("-page")
                .arg(source.page.to_string())
                .arg(&source.path)
                .arg(&output);
            match run_tool(cmd, &self.tool) {
                Ok(()) => {
                    debug!(output = %output.display(), "rasterized image");
                    written += 1;
                }
                Err(message) => warn!(source = %source.path.display(), "{message}"),
            }
        }
        written
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

/// `name.ipe` if it exists, otherwise `base.ipe` page `N` for `base-N`.
pub fn locate_source(dir: &Path, name: &str) -> Option<ImageSource> {
    let whole = dir.join(format!("{name}.{SOURCE_EXTENSION}"));
    if whole.is_file() {
        return Some(ImageSource {
            path: whole,
            page: 1,
        });
    }
    let (base, page) = split_page(name)?;
    let path = dir.join(format!("{base}.{SOURCE_EXTENSION}"));
    path.is_file().then_some(ImageSource { path, page })
}

/// `tree-2` is page 2 of `tree`.
pub fn split_page(name: &str) -> Option<(&str, u32)> {
    let (base, page) = name.rsplit_once('-')?;
    if base.is_empty() || page.is_empty() || !page.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, page.parse().ok()?))
}

/// Runs one conversion; the error carries the exit status and the first
/// line the tool printed.
fn run_tool(mut cmd: Command, tool: &str) -> Result<(), String> {
    let output = cmd.output().map_err(|err| format!("could not start {tool}: {err}"))?;
    if output.status.success() {
        return Ok(());
    }
    let printed = [&output.stderr, &output.stdout]
        .into_iter()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .find_map(|text| {
            text.lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        });
    Err(match printed {
        Some(line) => format!("{tool} exited with {}: {line}", output.status),
        None => format!("{tool} exited with {}", output.status),
    })
}

/// A tool named with a path is used as given; a bare name is searched on
/// `PATH`.
fn find_tool(tool: &str) -> Option<PathBuf> {
    let given = Path::new(tool);
    if given.components().count() > 1 {
        return is_executable(given).then(|| given.to_path_buf());
    }
    env::split_paths(&env::var_os("PATH")?)
        .map(|dir| dir.join(tool))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
