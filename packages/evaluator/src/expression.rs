//! `$exp` evaluation.
//!
//! An expression sees the render context flattened into plain variables:
//! top-level keys directly, and the keys of one-level-nested objects both
//! under their own name and as `parent_child`. The whole context is also
//! reachable as `data`.

use crate::builtins::{install_expression_globals, RESERVED_NAMES};
use crate::interpreter::{Interpreter, RuntimeError, Scope};
use crate::value::Value;
use genui_parser::ast::Expr;
use genui_parser::{parse_expression, ParseError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

/// Parsed expressions kept before the cache is dropped and refilled
const MAX_CACHED_EXPRESSIONS: usize = 4096;

#[derive(Error, Debug, Clone)]
pub enum ExpressionError {
    #[error("Failed to parse expression `{expression}`: {source}")]
    Parse {
        expression: String,
        source: ParseError,
    },

    #[error("Failed to evaluate expression `{expression}`: {source}")]
    Runtime {
        expression: String,
        source: RuntimeError,
    },
}

impl ExpressionError {
    pub fn expression(&self) -> &str {
        match self {
            ExpressionError::Parse { expression, .. } | ExpressionError::Runtime { expression, .. } => {
                expression
            }
        }
    }
}

pub struct ExpressionEvaluator {
    interpreter: Interpreter,
    globals: Scope,
    cache: RefCell<HashMap<String, Result<Rc<Expr>, ParseError>>>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        let globals = Scope::new();
        install_expression_globals(&globals);
        Self {
            interpreter: Interpreter::new(),
            globals,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Evaluate, logging and returning `undefined` on any failure
    pub fn evaluate(&self, expression: &str, context: &Value) -> Value {
        match self.try_evaluate(expression, context) {
            Ok(value) => value,
            Err(err) => {
                warn!(expression = %expression, error = %err, "Expression evaluation failed");
                Value::Undefined
            }
        }
    }

    pub fn try_evaluate(&self, expression: &str, context: &Value) -> Result<Value, ExpressionError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Value::Undefined);
        }
        let ast = self.parse(expression)?;
        let scope = self.globals.child();
        flatten_context(context, &scope);
        self.interpreter
            .evaluate(&ast, &scope)
            .map_err(|source| ExpressionError::Runtime {
                expression: expression.to_string(),
                source,
            })
    }

    fn parse(&self, expression: &str) -> Result<Rc<Expr>, ExpressionError> {
        if let Some(cached) = self.cache.borrow().get(expression) {
            return cached.clone().map_err(|source| ExpressionError::Parse {
                expression: expression.to_string(),
                source,
            });
        }

        let parsed = parse_expression(expression).map(Rc::new);
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= MAX_CACHED_EXPRESSIONS {
            debug!(entries = cache.len(), "Clearing expression cache");
            cache.clear();
        }
        cache.insert(expression.to_string(), parsed.clone());
        parsed.map_err(|source| ExpressionError::Parse {
            expression: expression.to_string(),
            source,
        })
    }

    pub fn cached_expressions(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Declare the variables an expression sees for `context`.
///
/// Top-level keys are declared first so they always win over a nested key
/// of the same name. Among nested objects the first one (in insertion
/// order) to declare a name keeps it.
pub fn flatten_context(context: &Value, scope: &Scope) {
    scope.declare("data", context.clone());

    let Value::Object(fields) = context else {
        return;
    };
    let fields = fields.borrow();

    for (key, value) in fields.iter() {
        if !is_reserved(key) {
            scope.declare(key.clone(), value.clone());
        }
    }

    for (parent, value) in fields.iter() {
        if is_reserved(parent) {
            continue;
        }
        let Value::Object(nested) = value else {
            continue;
        };
        for (key, nested_value) in nested.borrow().iter() {
            scope.declare(format!("{}_{}", parent, key), nested_value.clone());
            if !is_reserved(key) && !scope.has_own(key) {
                scope.declare(key.clone(), nested_value.clone());
            }
        }
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}
