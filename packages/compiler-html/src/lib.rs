//! Static HTML output for rendered genui documents.

mod compiler;

pub use compiler::{compile_to_html, style_to_css, CompileError, CompileOptions};
