pub mod ast;
pub mod document;
pub mod error;
pub mod parser;
pub mod sanitize;
pub mod tokenizer;

#[cfg(test)]
mod tests_comprehensive;

pub use document::{
    apply_platform_override, has_interpolation, DslValue, EffectDef, ForDirective, JsonMap,
    LinkTarget, MethodDef, Platform, PlatformOverrides, QuerySpec, RefetchPolicy, Transform,
    UIComponent, UIElement,
};
pub use error::{format_error, ParseError, ParseResult, TokenSpan};
pub use parser::{parse_expression, parse_function, parse_program, Parser};
pub use sanitize::sanitize_source;
pub use tokenizer::{tokenize, Token};
