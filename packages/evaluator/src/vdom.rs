use crate::value::{ObjectMap, Value};
use indexmap::IndexMap;
use serde::Serialize;

/// What firing an event does
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventHandler {
    /// Compiled method of the component instance `instance`
    Method { instance: String, method: String },
    /// Handler supplied by the host application
    Host { name: String },
    /// `link-to` navigation, running the element's previous click handler first
    Navigate {
        target: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<ObjectMap>,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<Box<EventBinding>>,
    },
    /// Name that matched nothing; logs a warning when fired
    Missing { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    pub handler: EventHandler,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub prevent_default: bool,
}

impl EventBinding {
    pub fn new(handler: EventHandler) -> Self {
        Self {
            handler,
            prevent_default: false,
        }
    }

    pub fn preventing_default(mut self) -> Self {
        self.prevent_default = true;
        self
    }
}

/// Layout animation applied in development mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationHint {
    pub layout_id: String,
    pub damping: f64,
    pub stiffness: f64,
    pub duration: f64,
}

impl AnimationHint {
    pub fn for_key(key: &str) -> Self {
        Self {
            layout_id: format!("element-{}", key),
            damping: 25.0,
            stiffness: 400.0,
            duration: 0.3,
        }
    }
}

/// Virtual DOM node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VNode {
    Element {
        tag: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        attributes: ObjectMap,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        events: IndexMap<String, EventBinding>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<VNode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        animation: Option<AnimationHint>,
    },

    Text { content: String },

    /// Native leaf component with no registered renderer
    Native {
        component: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        props: ObjectMap,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<VNode>,
    },

    /// Error node (development only; shows the failure in place of the node)
    Error {
        message: String,
        #[serde(rename = "nodeId", skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element {
            tag: tag.into(),
            id: None,
            key: None,
            attributes: ObjectMap::new(),
            events: IndexMap::new(),
            children: Vec::new(),
            animation: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text {
            content: content.into(),
        }
    }

    pub fn native(component: impl Into<String>, props: ObjectMap) -> Self {
        VNode::Native {
            component: component.into(),
            id: None,
            key: None,
            props,
            children: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>, node_id: Option<String>) -> Self {
        VNode::Error {
            message: message.into(),
            node_id,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let VNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_attributes(mut self, values: ObjectMap) -> Self {
        if let VNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.extend(values);
        }
        self
    }

    pub fn with_event(mut self, name: impl Into<String>, binding: EventBinding) -> Self {
        if let VNode::Element { ref mut events, .. } = self {
            events.insert(name.into(), binding);
        }
        self
    }

    pub fn with_child(mut self, child: VNode) -> Self {
        match self {
            VNode::Element {
                ref mut children, ..
            }
            | VNode::Native {
                ref mut children, ..
            } => children.push(child),
            _ => {}
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<VNode>) -> Self {
        match self {
            VNode::Element {
                ref mut children, ..
            }
            | VNode::Native {
                ref mut children, ..
            } => children.extend(new_children),
            _ => {}
        }
        self
    }

    pub fn with_id(mut self, new_id: impl Into<String>) -> Self {
        match self {
            VNode::Element { ref mut id, .. } | VNode::Native { ref mut id, .. } => {
                *id = Some(new_id.into())
            }
            _ => {}
        }
        self
    }

    pub fn with_key(mut self, new_key: impl Into<String>) -> Self {
        match self {
            VNode::Element { ref mut key, .. } | VNode::Native { ref mut key, .. } => {
                *key = Some(new_key.into())
            }
            _ => {}
        }
        self
    }

    pub fn with_animation(mut self, hint: AnimationHint) -> Self {
        if let VNode::Element {
            ref mut animation, ..
        } = self
        {
            *animation = Some(hint);
        }
        self
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            VNode::Element { id, .. } | VNode::Native { id, .. } => id.as_deref(),
            VNode::Error { node_id, .. } => node_id.as_deref(),
            VNode::Text { .. } => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element { key, .. } | VNode::Native { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self {
            VNode::Element { attributes, .. } => attributes.get(name),
            VNode::Native { props, .. } => props.get(name),
            _ => None,
        }
    }

    pub fn event(&self, name: &str) -> Option<&EventBinding> {
        match self {
            VNode::Element { events, .. } => events.get(name),
            _ => None,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } | VNode::Native { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, VNode::Error { .. })
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        match self {
            VNode::Text { content } => content.clone(),
            VNode::Error { .. } => String::new(),
            _ => self.children().iter().map(VNode::text_content).collect(),
        }
    }

    /// First node (pre-order) matching `predicate`
    pub fn find(&self, predicate: &dyn Fn(&VNode) -> bool) -> Option<&VNode> {
        if predicate(self) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(predicate))
    }
}

/// Rendered output of a mounted component
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualDomDocument {
    pub nodes: Vec<VNode>,
}

impl VirtualDomDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: VNode) {
        self.nodes.push(node);
    }

    pub fn text_content(&self) -> String {
        self.nodes.iter().map(VNode::text_content).collect()
    }

    pub fn find(&self, predicate: &dyn Fn(&VNode) -> bool) -> Option<&VNode> {
        self.nodes.iter().find_map(|node| node.find(predicate))
    }

    /// Element addressed by key, falling back to id
    pub fn find_target(&self, target: &str) -> Option<&VNode> {
        self.find(&|node| node.key() == Some(target))
            .or_else(|| self.find(&|node| node.id() == Some(target)))
    }

    /// Every node (pre-order) matching `predicate`
    pub fn find_all(&self, predicate: &dyn Fn(&VNode) -> bool) -> Vec<&VNode> {
        fn collect<'a>(node: &'a VNode, predicate: &dyn Fn(&VNode) -> bool, out: &mut Vec<&'a VNode>) {
            if predicate(node) {
                out.push(node);
            }
            for child in node.children() {
                collect(child, predicate, out);
            }
        }
        let mut out = Vec::new();
        for node in &self.nodes {
            collect(node, predicate, &mut out);
        }
        out
    }
}
