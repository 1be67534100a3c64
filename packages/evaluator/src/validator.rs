//! Element validation.
//!
//! [`validate`] is the per-node gate the renderer applies before rendering a
//! node. [`DocumentValidator`] is the whole-document pass used by tooling:
//! it reports problems that only show up across nodes.

use crate::methods::compile_function;
use crate::vdom::VNode;
use genui_common::{walk_component, walk_element, JsonObject, NodePath, Visitor};
use genui_parser::UIElement;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Element is not an object")]
    NotAnObject,

    #[error("Element {} is missing required `{field}`", display_id(.node_id))]
    MissingField {
        node_id: Option<String>,
        field: &'static str,
    },

    #[error("Element {} has an empty loop variable (`for.as`)", display_id(.node_id))]
    EmptyLoopVariable { node_id: Option<String> },

    #[error("Element {} is malformed: {message}", display_id(.node_id))]
    Malformed {
        node_id: Option<String>,
        message: String,
    },
}

impl ValidationError {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::MissingField { node_id, .. }
            | ValidationError::EmptyLoopVariable { node_id }
            | ValidationError::Malformed { node_id, .. } => node_id.as_deref(),
        }
    }
}

fn display_id(node_id: &Option<String>) -> String {
    match node_id {
        Some(id) => format!("`{}`", id),
        None => "<no id>".to_string(),
    }
}

/// Check a raw node's shape and deserialize it
pub fn validate(node: &JsonValue) -> Result<UIElement, ValidationError> {
    let JsonValue::Object(fields) = node else {
        return Err(ValidationError::NotAnObject);
    };
    let node_id = fields
        .get("id")
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    if node_id.is_none() {
        return Err(ValidationError::MissingField {
            node_id: None,
            field: "id",
        });
    }
    let has_type = fields
        .get("type")
        .and_then(JsonValue::as_str)
        .is_some_and(|element_type| !element_type.is_empty());
    if !has_type {
        return Err(ValidationError::MissingField {
            node_id,
            field: "type",
        });
    }

    let element = UIElement::from_json(node).map_err(|err| ValidationError::Malformed {
        node_id: node_id.clone(),
        message: err.to_string(),
    })?;
    if let Some(directive) = &element.for_directive {
        if directive.item.trim().is_empty() {
            return Err(ValidationError::EmptyLoopVariable { node_id });
        }
    }
    Ok(element)
}

/// Validation warning level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    /// Worth fixing; rendering still works
    Warning,
    /// Part of the document will not render or run
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
    /// Ids from the root to the offending node
    pub path: Option<String>,
}

impl ValidationWarning {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Warning,
            message: message.into(),
            path: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Error,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: &NodePath) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == ValidationLevel::Error
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            ValidationLevel::Warning => "warning",
            ValidationLevel::Error => "error",
        };
        match &self.path {
            Some(path) if !path.is_empty() => write!(f, "{} [{}]: {}", level, path, self.message),
            _ => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Whole-document checks
#[derive(Default)]
pub struct DocumentValidator {
    warnings: Vec<ValidationWarning>,
    /// Element id -> first path it appeared at
    seen_ids: HashMap<String, String>,
    /// Names bound by enclosing components and loops
    scopes: Vec<Vec<String>>,
}

impl DocumentValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a component (or bare element) document
    pub fn validate(&mut self, document: &JsonValue) -> Vec<ValidationWarning> {
        self.warnings.clear();
        self.seen_ids.clear();
        self.scopes.clear();
        self.visit_node(document, &NodePath::root());
        std::mem::take(&mut self.warnings)
    }

    /// Duplicate keys among siblings of a rendered tree
    pub fn check_rendered_keys(&mut self, nodes: &[VNode]) -> Vec<ValidationWarning> {
        self.warnings.clear();
        self.check_sibling_keys(nodes, &NodePath::root());
        std::mem::take(&mut self.warnings)
    }

    fn check_sibling_keys(&mut self, nodes: &[VNode], path: &NodePath) {
        let mut keys = HashSet::new();
        for node in nodes {
            if let Some(key) = node.key() {
                if !keys.insert(key) {
                    self.warnings.push(
                        ValidationWarning::warning(format!("Duplicate sibling key `{}`", key))
                            .with_path(path),
                    );
                }
            }
        }
        for node in nodes {
            let segment = node.id().or(node.key()).or(node.tag()).unwrap_or("#");
            self.check_sibling_keys(node.children(), &path.child(segment));
        }
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scopes.iter().flatten().any(|bound| bound == name)
    }

    fn check_loop_names(&mut self, element: &JsonObject, path: &NodePath) -> Vec<String> {
        let Some(JsonValue::Object(directive)) = element.get("for") else {
            return Vec::new();
        };
        let mut bound = Vec::new();
        for key in ["as", "index"] {
            let Some(name) = directive.get(key).and_then(JsonValue::as_str) else {
                continue;
            };
            if self.in_scope(name) {
                self.warnings.push(
                    ValidationWarning::warning(format!(
                        "Loop variable `{}` shadows a name from an enclosing scope",
                        name
                    ))
                    .with_path(path),
                );
            }
            bound.push(name.to_string());
        }
        bound
    }
}

impl Visitor for DocumentValidator {
    fn visit_component(&mut self, component: &JsonObject, path: &NodePath) {
        let component_id = component
            .get("id")
            .and_then(JsonValue::as_str)
            .unwrap_or("<component>");

        if let Some(JsonValue::Object(methods)) = component.get("methods") {
            for (name, def) in methods {
                let Some(source) = def.get("fn").and_then(JsonValue::as_str) else {
                    self.warnings.push(
                        ValidationWarning::error(format!("Method `{}` has no `fn` source", name))
                            .with_path(path),
                    );
                    continue;
                };
                if let Err(err) = compile_function(name, source) {
                    self.warnings.push(
                        ValidationWarning::error(format!("{} in component `{}`", err, component_id))
                            .with_path(path),
                    );
                }
            }
        }
        if let Some(JsonValue::Array(effects)) = component.get("effects") {
            for (index, effect) in effects.iter().enumerate() {
                let source = effect.get("fn").and_then(JsonValue::as_str).unwrap_or_default();
                if let Err(err) = compile_function(&format!("effect[{}]", index), source) {
                    self.warnings.push(
                        ValidationWarning::error(format!("{} in component `{}`", err, component_id))
                            .with_path(path),
                    );
                }
            }
        }

        let mut names = vec!["props".to_string(), "states".to_string()];
        for key in ["data", "states"] {
            if let Some(JsonValue::Object(values)) = component.get(key) {
                names.extend(values.keys().cloned());
            }
        }
        self.scopes.push(names);
        walk_component(self, component, path);
        self.scopes.pop();
    }

    fn visit_element(&mut self, element: &JsonObject, path: &NodePath) {
        let node = JsonValue::Object(element.clone());
        if let Err(err) = validate(&node) {
            self.warnings
                .push(ValidationWarning::error(err.to_string()).with_path(path));
        }

        if let Some(id) = element.get("id").and_then(JsonValue::as_str) {
            let here = path.to_string();
            match self.seen_ids.get(id) {
                Some(first) => self.warnings.push(
                    ValidationWarning::warning(format!(
                        "Duplicate element id `{}` (first used at {})",
                        id, first
                    ))
                    .with_path(path),
                ),
                None => {
                    self.seen_ids.insert(id.to_string(), here);
                }
            }
        }

        let bound = self.check_loop_names(element, path);
        self.scopes.push(bound);
        walk_element(self, element, path);
        self.scopes.pop();
    }
}
