//! Turns any DSL value into a runtime value.

use crate::expression::ExpressionEvaluator;
use crate::path::resolve_path;
use crate::value::{ObjectMap, Value};
use genui_parser::{DslValue, JsonMap};
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// `${path}`: plain path lookup
static PATH_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").unwrap());

/// `{{expression}}`: evaluated, falling back to path lookup
static EXPRESSION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").unwrap());

#[derive(Default)]
pub struct DataResolver {
    evaluator: ExpressionEvaluator,
}

impl DataResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluator(&self) -> &ExpressionEvaluator {
        &self.evaluator
    }

    /// Resolve in order: `$exp`, `$bind`, interpolated string, literal
    pub fn resolve(&self, value: &JsonValue, context: &Value) -> Value {
        match DslValue::classify(value) {
            DslValue::Expression { source, .. } => self.evaluator.evaluate(source, context),
            DslValue::Binding { path, transforms } => {
                if !transforms.is_empty() {
                    let names: Vec<&str> = transforms.iter().map(|t| t.name.as_str()).collect();
                    debug!(path = %path, transforms = ?names, "Ignoring $transform steps");
                }
                resolve_path(path, context)
            }
            DslValue::Template(text) => Value::String(self.interpolate(text, context)),
            DslValue::Literal(literal) => Value::from_json(literal),
        }
    }

    pub fn resolve_map(&self, values: &JsonMap, context: &Value) -> ObjectMap {
        values
            .iter()
            .map(|(key, value)| (key.clone(), self.resolve(value, context)))
            .collect()
    }

    /// Substitute `${...}` then `{{...}}` markers; `undefined` becomes empty
    #[instrument(level = "trace", skip(self, context))]
    pub fn interpolate(&self, text: &str, context: &Value) -> String {
        let with_paths = replace_markers(&PATH_MARKER, text, |inner| {
            resolve_path(inner, context)
        });
        replace_markers(&EXPRESSION_MARKER, &with_paths, |inner| {
            match self.evaluator.try_evaluate(inner, context) {
                Ok(value) => value,
                Err(err) => {
                    debug!(expression = %inner, error = %err, "Falling back to path lookup");
                    resolve_path(inner, context)
                }
            }
        })
    }

    /// Path lookup without DSL classification (`for.key` strings)
    pub fn raw_value(&self, path: &str, context: &Value) -> Value {
        resolve_path(path, context)
    }
}

fn replace_markers(
    pattern: &Regex,
    text: &str,
    mut lookup: impl FnMut(&str) -> Value,
) -> String {
    pattern
        .replace_all(text, |caps: &Captures| {
            let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            match lookup(inner) {
                Value::Undefined => String::new(),
                value => value.to_display_string(),
            }
        })
        .into_owned()
}
