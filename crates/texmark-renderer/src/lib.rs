//! Output side of texmark: page skeleton, stylesheet, code highlighting,
//! graphics rasterizing and the Java member extractor.

mod codeimport;
mod error;
mod graphics;
mod highlight;
mod page;

pub use codeimport::{JavaTree, find_member};
pub use error::{Error, Result};
pub use graphics::{DEFAULT_TOOL, ImageSource, Rasterizer, locate_source, split_page};
pub use highlight::{Highlighter, Theme};
pub use page::{Page, stylesheet, write_assets};
