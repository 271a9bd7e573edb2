mod catlist;
mod commands;
mod context;
mod delim;
mod diagnostic;
mod document;
mod environments;
mod error;
pub mod extensions;
mod label;
mod numbering;
mod preprocess;
mod registry;
mod render;
mod sanitize;
mod scan;
mod span;
mod xref;

pub use catlist::{CatList, Html};
pub use context::{AnchorIds, CodeSource, Context, Footnotes, ImageRequest, Mode, TocEntry};
pub use delim::match_group;
pub use diagnostic::{
    Diagnostic, DiagnosticSeverity, Diagnostics, E_CONVERSION, W_DEFAULTED_ENVIRONMENT,
    W_DUPLICATE_LABEL, W_UNDEFINED_LABEL, W_UNPROCESSED_COMMAND,
};
pub use document::{Batch, BatchOutput, RenderedDocument, TocLine};
pub use error::{Error, Result};
pub use label::{LabelTable, LabelTarget, kind_title, label_key, ref_kind};
pub use numbering::{Numbering, TOP_ANCHOR, number_document};
pub use preprocess::preprocess;
pub use registry::{CommandFn, CommandRule, EnvironmentFn, EnvironmentRule, LABEL_KINDS, Registry};
pub use render::{escape_html, process_recursively, render_str};
pub use sanitize::sanitize_html;
pub use scan::{Arguments, Command, Environment, chomp_args, get_environment, next_command};
pub use span::Span;
pub use xref::{placeholder, relative_href, resolve_references};
