//! Cleanup applied to method and effect sources before parsing.
//!
//! Sources are authored with light type annotations and often arrive with
//! quote escapes left over from JSON round-tripping. Only the forms below
//! are rewritten; anything else is handed to the parser unchanged.

use regex::Regex;
use std::sync::LazyLock;

/// `(value as Type)` becomes `value`
static TYPE_CAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\w+)\s+as\s+\w+\s*\)").unwrap());

/// `const name: Type =` becomes `const name =`
static TYPED_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(const|let|var)\s+(\w+)\s*:\s*[\w<>\[\]|&]+\s*=").unwrap()
});

/// Strip quote escapes and type annotations from a function source
pub fn sanitize_source(source: &str) -> String {
    let unescaped = source.replace("\\'", "'").replace("\\\"", "\"");
    let uncast = TYPE_CAST.replace_all(&unescaped, "$1");
    TYPED_DECLARATION.replace_all(&uncast, "$1 $2 =").into_owned()
}
