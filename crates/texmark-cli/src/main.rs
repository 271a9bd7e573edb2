use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result, WrapErr};
use texmark_core::extensions::ods;
use texmark_core::{
    Batch, Context, Diagnostic, DiagnosticSeverity, Diagnostics, E_CONVERSION, Registry,
    RenderedDocument, sanitize_html,
};
use texmark_renderer::{DEFAULT_TOOL, Highlighter, JavaTree, Page, Rasterizer, Theme, write_assets};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(version, about = "Convert LaTeX textbook sources to HTML", long_about = None)]
struct Cli {
    /// `.tex` files; `dir/name.tex` is written to `OUT_DIR/dir/name.html`
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, default_value = "html")]
    out_dir: PathBuf,

    /// Page skeleton with TITLE, TOC, CONTENT, FOOTNOTES and ROOT tokens
    #[arg(long)]
    template: Option<PathBuf>,

    /// Contents page for the whole batch, relative to the output directory
    #[arg(long, default_value = "toc.html")]
    toc_file: PathBuf,

    /// Clean document bodies with an allow-list sanitizer
    #[arg(long)]
    sanitize: bool,

    /// Syntax-highlight imported code
    #[arg(long)]
    highlight: bool,

    #[arg(long, value_enum, default_value_t = ThemeArg::Light)]
    theme: ThemeArg,

    /// Directory of `.java` files for \codeimport
    #[arg(long)]
    java_root: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_TOOL)]
    graphics_tool: String,

    #[arg(long)]
    no_graphics: bool,

    /// Also print the end-of-run diagnostics to stderr in this format
    #[arg(long, value_enum)]
    diagnostics: Option<DiagnosticsMode>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DiagnosticsMode {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    init_miette();
    init_tracing();
    let cli = Cli::parse();
    run(&cli).inspect_err(|err| {
        if let Some(mode) = cli.diagnostics {
            emit(&[Diagnostic::error(E_CONVERSION, err.to_string())], mode);
        }
    })
}

fn run(cli: &Cli) -> Result<()> {
    let page = match &cli.template {
        Some(path) => Page::from_file(path).into_diagnostic()?,
        None => Page::default(),
    };

    let mut registry = Registry::standard();
    ods::install(&mut registry);
    let mut ctx = Context::new(registry);
    if let Some(root) = &cli.java_root {
        ctx = ctx.with_code_source(JavaTree::new(root));
    }

    let mut batch = Batch::new(ctx);
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    for input in &cli.inputs {
        let output = output_path(input);
        if output == cli.toc_file {
            miette::bail!(
                "{} would overwrite the contents page {}",
                input.display(),
                output.display()
            );
        }
        if let Some(earlier) = claimed.insert(output.clone(), input.as_path()) {
            miette::bail!(
                "{} and {} would both be written to {}",
                earlier.display(),
                input.display(),
                output.display()
            );
        }
        let source = fs::read_to_string(input)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", input.display()))?;
        info!(input = %input.display(), output = %output.display(), "converting");
        batch.add_file(output, input, &source)?;
    }
    let output = batch.finish()?;

    let highlighter = cli.highlight.then(|| Highlighter::new(cli.theme.into()));
    for doc in &output.documents {
        let doc = finish_body(doc, highlighter.as_ref(), cli.sanitize);
        write_page(&cli.out_dir.join(&doc.path), &page.render(&doc))?;
    }
    let toc = page.render_toc(&cli.toc_file, "Contents", &output.toc_html(&cli.toc_file));
    write_page(&cli.out_dir.join(&cli.toc_file), &toc)?;
    write_assets(&cli.out_dir).into_diagnostic()?;

    if !cli.no_graphics {
        let rasterizer = Rasterizer::new(cli.graphics_tool.as_str());
        let written = rasterizer.rasterize_missing(output.images(), &cli.out_dir);
        debug!(written, "rasterized images");
    }

    report(output.diagnostics(), cli.diagnostics);
    Ok(())
}

fn finish_body(
    doc: &RenderedDocument,
    highlighter: Option<&Highlighter>,
    sanitize: bool,
) -> RenderedDocument {
    let mut doc = doc.clone();
    if let Some(highlighter) = highlighter {
        doc.body = highlighter.highlight_html(&doc.body);
    }
    if sanitize {
        doc.body = sanitize_html(&doc.body);
        doc.footnotes = sanitize_html(&doc.footnotes);
    }
    doc
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, html)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

/// `dir/name.tex` becomes `dir/name.html`. Absolute inputs are taken relative
/// to the working directory when they are inside it, and otherwise keep only
/// their file name. Parent-directory components are dropped.
fn output_path(input: &Path) -> PathBuf {
    let relative = if input.is_absolute() {
        std::env::current_dir()
            .ok()
            .and_then(|cwd| input.strip_prefix(&cwd).ok().map(Path::to_path_buf))
            .or_else(|| input.file_name().map(PathBuf::from))
            .unwrap_or_else(|| input.to_path_buf())
    } else {
        input.to_path_buf()
    };
    let normal: PathBuf = relative
        .components()
        .filter(|part| matches!(part, Component::Normal(_)))
        .collect();
    normal.with_extension("html")
}

fn report(diagnostics: &Diagnostics, mode: Option<DiagnosticsMode>) {
    let summary = diagnostics.summary();
    for diagnostic in &summary {
        warn!(code = diagnostic.code, "{}", diagnostic.message);
    }
    if let Some(mode) = mode {
        emit(&summary, mode);
    }
}

fn emit(diagnostics: &[Diagnostic], mode: DiagnosticsMode) {
    match mode {
        DiagnosticsMode::Json => eprintln!("{}", diagnostics_to_json(diagnostics)),
        DiagnosticsMode::Pretty => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic_to_pretty(diagnostic));
            }
        }
    }
}

fn diagnostic_to_pretty(diagnostic: &Diagnostic) -> String {
    format!(
        "{} {} {}",
        severity_label(diagnostic.severity),
        diagnostic.code,
        diagnostic.message
    )
}

fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> String {
    let values: Vec<serde_json::Value> = diagnostics
        .iter()
        .map(|diag| {
            serde_json::json!({
                "code": diag.code,
                "severity": severity_label(diag.severity),
                "message": diag.message,
            })
        })
        .collect();
    serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string())
}

fn severity_label(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "texmark=info,texmark_core=info,texmark_renderer=info",
                )
            }),
        )
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(3)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
