//! Walking raw DSL trees.
//!
//! Documents are visited as JSON rather than typed elements so that a
//! malformed node (missing `id`, wrong field types) is still reachable and
//! can be reported by the visitor instead of failing the whole walk.

use serde_json::{Map, Value as JsonValue};

pub type JsonObject = Map<String, JsonValue>;

/// Where a node sits in the tree: the ids (or indices) from the root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// How a node should be treated when walking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Component,
    Element,
    /// `$exp` / `$bind` object or any other non-element value
    Value,
    Text,
}

pub fn node_kind(node: &JsonValue) -> NodeKind {
    match node {
        JsonValue::String(_) => NodeKind::Text,
        JsonValue::Object(fields) if fields.contains_key("render") => NodeKind::Component,
        JsonValue::Object(fields)
            if fields.contains_key("$exp") || fields.contains_key("$bind") =>
        {
            NodeKind::Value
        }
        JsonValue::Object(fields) if fields.contains_key("type") || fields.contains_key("id") => {
            NodeKind::Element
        }
        _ => NodeKind::Value,
    }
}

/// Path segment for an object node: its id when present
pub fn path_segment(node: &JsonObject, index: usize) -> String {
    node.get("id")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("[{}]", index))
}

/// Visitor over raw component/element JSON.
///
/// The default implementations walk the entire tree. Override specific
/// `visit_*` methods and call the matching `walk_*` function to keep
/// descending.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &JsonValue, path: &NodePath) {
        walk_node(self, node, path);
    }

    fn visit_component(&mut self, component: &JsonObject, path: &NodePath) {
        walk_component(self, component, path);
    }

    fn visit_element(&mut self, element: &JsonObject, path: &NodePath) {
        walk_element(self, element, path);
    }

    fn visit_value(&mut self, _value: &JsonValue, _path: &NodePath) {
        // Leaf
    }

    fn visit_text(&mut self, _text: &str, _path: &NodePath) {
        // Leaf
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &JsonValue, path: &NodePath) {
    match node {
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let child_path = match item {
                    JsonValue::Object(fields) => path.child(path_segment(fields, index)),
                    _ => path.clone(),
                };
                visitor.visit_node(item, &child_path);
            }
        }
        JsonValue::String(text) => visitor.visit_text(text, path),
        JsonValue::Object(fields) => match node_kind(node) {
            NodeKind::Component => visitor.visit_component(fields, path),
            NodeKind::Element => visitor.visit_element(fields, path),
            _ => visitor.visit_value(node, path),
        },
        other => visitor.visit_value(other, path),
    }
}

pub fn walk_component<V: Visitor>(visitor: &mut V, component: &JsonObject, path: &NodePath) {
    for key in ["props", "states", "data"] {
        if let Some(JsonValue::Object(values)) = component.get(key) {
            for value in values.values() {
                visitor.visit_value(value, path);
            }
        }
    }

    if let Some(render) = component.get("render") {
        let render_path = match render {
            JsonValue::Object(fields) => path.child(path_segment(fields, 0)),
            _ => path.clone(),
        };
        visitor.visit_node(render, &render_path);
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, element: &JsonObject, path: &NodePath) {
    if let Some(JsonValue::Object(props)) = element.get("props") {
        for value in props.values() {
            visitor.visit_value(value, path);
        }
    }

    for key in ["if", "elseIf", "key", "link-to"] {
        if let Some(value) = element.get(key) {
            visitor.visit_value(value, path);
        }
    }

    if let Some(JsonValue::Object(directive)) = element.get("for") {
        for key in ["in", "key"] {
            if let Some(value) = directive.get(key) {
                visitor.visit_value(value, path);
            }
        }
    }

    if let Some(children) = element.get("children") {
        match children {
            JsonValue::Object(fields) if node_kind(children) != NodeKind::Value => {
                visitor.visit_node(children, &path.child(path_segment(fields, 0)));
            }
            _ => visitor.visit_node(children, path),
        }
    }

    if let Some(JsonValue::Object(else_branch)) = element.get("else") {
        let else_node = JsonValue::Object(else_branch.clone());
        visitor.visit_node(&else_node, &path.child(path_segment(else_branch, 0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Collector {
        elements: Vec<String>,
        texts: Vec<String>,
        values: usize,
        components: usize,
    }

    impl Visitor for Collector {
        fn visit_component(&mut self, component: &JsonObject, path: &NodePath) {
            self.components += 1;
            walk_component(self, component, path);
        }

        fn visit_element(&mut self, element: &JsonObject, path: &NodePath) {
            self.elements.push(path.to_string());
            walk_element(self, element, path);
        }

        fn visit_value(&mut self, _value: &JsonValue, _path: &NodePath) {
            self.values += 1;
        }

        fn visit_text(&mut self, text: &str, _path: &NodePath) {
            self.texts.push(text.to_string());
        }
    }

    #[test]
    fn test_walks_children_else_and_components() {
        let doc = json!({
            "id": "app",
            "states": { "open": false },
            "render": {
                "id": "root",
                "type": "view",
                "children": [
                    "Hello",
                    { "id": "flag", "type": "text", "if": { "$bind": "open" }, "else": { "id": "closed", "type": "text" } },
                    { "id": "nested", "render": { "id": "inner", "type": "view", "children": { "$bind": "x" } } }
                ]
            }
        });

        let mut collector = Collector::default();
        collector.visit_node(&doc, &NodePath::root());

        assert_eq!(collector.components, 2);
        assert_eq!(
            collector.elements,
            vec!["root", "root/flag", "root/flag/closed", "root/nested/inner"]
        );
        assert_eq!(collector.texts, vec!["Hello"]);
        // states.open, if, children binding
        assert_eq!(collector.values, 3);
    }

    #[test]
    fn test_node_kind() {
        assert_eq!(node_kind(&json!("hi")), NodeKind::Text);
        assert_eq!(node_kind(&json!({ "$exp": "1" })), NodeKind::Value);
        assert_eq!(node_kind(&json!({ "type": "view" })), NodeKind::Element);
        assert_eq!(node_kind(&json!({ "render": {} })), NodeKind::Component);
        assert_eq!(node_kind(&json!(3)), NodeKind::Value);
    }
}
