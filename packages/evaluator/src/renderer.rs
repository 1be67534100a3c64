//! # Tree renderer
//!
//! Turns a mounted component's DSL tree into a [`VirtualDomDocument`].
//!
//! ## Per-node order
//!
//! 1. strings are interpolated into text
//! 2. nested components get (or reuse) an instance and extend the context
//! 3. the `platform.web` override is merged, then the node is validated
//! 4. `if` / `elseIf` / `else`
//! 5. `for`: the node itself is repeated, one copy per item
//! 6. props, event bindings, `link-to`, selection decoration
//! 7. children, then the tag (or native component) is emitted
//!
//! ## Isolation
//!
//! A node that fails to render is logged with its id and replaced by a
//! [`VNode::Error`] in development mode, or by nothing in production.
//! Siblings and ancestors are unaffected; [`MountedComponent::render`] never
//! fails.
//!
//! ## Determinism
//!
//! Rendering is a function of the document, state, props and external data.
//! Maps keep insertion order, loop keys derive from `for.key` or the index,
//! and nested instance keys derive from the component id and tree path.

use crate::effects::{run_effects, EffectReport};
use crate::interpreter::RuntimeError;
use crate::methods::{compile_methods, MethodTable, ScriptContext, SharedData};
use crate::registry::ComponentRegistry;
use crate::resolver::DataResolver;
use crate::state::{init_state, StateHandle, StateMap};
use crate::validator::{validate, ValidationError};
use crate::value::{ObjectMap, Value};
use crate::vdom::{AnimationHint, EventBinding, EventHandler, VNode, VirtualDomDocument};
use genui_parser::{apply_platform_override, DslValue, LinkTarget, Platform, UIComponent, UIElement};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Props wired to handlers when their value is a handler name
pub const EVENT_PROPS: &[&str] = &[
    "onClick", "onChange", "onSubmit", "onBlur", "onFocus", "onKeyDown", "onKeyUp", "onKeyPress",
];

pub const DEFAULT_NATIVE_PREFIX: &str = "COMP_";

/// Check if a name is a known HTML tag
fn is_html_tag(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr" | "address" | "article" | "aside" | "audio" |
        "b" | "blockquote" | "br" | "button" |
        "canvas" | "caption" | "code" | "col" | "colgroup" |
        "dd" | "del" | "details" | "dialog" | "div" | "dl" | "dt" |
        "em" | "embed" |
        "fieldset" | "figcaption" | "figure" | "footer" | "form" |
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "header" | "hr" |
        "i" | "iframe" | "img" | "input" | "ins" |
        "kbd" |
        "label" | "legend" | "li" |
        "main" | "mark" | "menu" | "meter" |
        "nav" |
        "ol" | "optgroup" | "option" | "output" |
        "p" | "picture" | "pre" | "progress" |
        "q" |
        "s" | "section" | "select" | "small" | "source" | "span" | "strong" | "sub" | "summary" | "sup" | "svg" |
        "table" | "tbody" | "td" | "textarea" | "tfoot" | "th" | "thead" | "time" | "tr" | "track" |
        "u" | "ul" |
        "video" |
        "wbr" |
        // SVG content
        "g" | "path" | "circle" | "rect" | "line" | "polygon" | "polyline" | "ellipse"
    )
}

/// Elements that never render children
fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "col" | "embed" | "hr" | "img" | "input" | "source" | "track" | "wbr" |
        "path" | "circle" | "rect" | "line" | "polygon" | "polyline" | "ellipse"
    )
}

/// Output tag for a DSL `type`: `view` is a `div`, `text` a `span`, and
/// anything unknown falls back to `div`
pub fn html_tag(element_type: &str) -> String {
    let lower = element_type.to_ascii_lowercase();
    match lower.as_str() {
        "view" => "div".to_string(),
        "text" => "span".to_string(),
        tag if is_html_tag(tag) => lower,
        _ => "div".to_string(),
    }
}

/// Elements users can rearrange; these get layout animation hints
fn is_animatable(element_type: &str) -> bool {
    let lower = element_type.to_ascii_lowercase();
    let listed = matches!(
        lower.as_str(),
        "view" | "div" | "span" | "text" | "button" | "input" | "select" | "option" |
        "h1" | "h2" | "h3" | "p" | "ul" | "li" | "img" | "a" | "form" |
        "table" | "tbody" | "tr" | "td" | "section" | "header" | "footer"
    );
    listed || element_type.chars().next().is_some_and(char::is_uppercase)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Development,
    Production,
}

/// A node as the editor addresses it: owning id plus tree path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: String,
    pub path: Vec<usize>,
}

impl NodeRef {
    pub fn new(id: impl Into<String>, path: Vec<usize>) -> Self {
        Self { id: id.into(), path }
    }
}

/// Editor selection used to decorate rendered nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<NodeRef>,
    pub hovered: Option<NodeRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SelectionFeedback {
    selected: bool,
    hovered: bool,
    /// Direct parent of the selected node
    parent: bool,
}

impl SelectionState {
    fn feedback(&self, id: &str, path: &[usize]) -> SelectionFeedback {
        let is = |node: &Option<NodeRef>| {
            node.as_ref()
                .is_some_and(|node| node.id == id && node.path == path)
        };
        SelectionFeedback {
            selected: is(&self.selected),
            hovered: is(&self.hovered),
            parent: self.selected.as_ref().is_some_and(|node| {
                node.path.len() == path.len() + 1 && node.path.starts_with(path)
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub mode: RenderMode,
    pub platform: Platform,
    /// Type prefix marking native leaf components
    pub native_prefix: String,
    pub selection: Option<SelectionState>,
    /// Layout animation hints (development mode only)
    pub animations: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::Development,
            platform: Platform::Web,
            native_prefix: DEFAULT_NATIVE_PREFIX.to_string(),
            selection: None,
            animations: true,
        }
    }
}

impl RenderOptions {
    pub fn production() -> Self {
        Self {
            mode: RenderMode::Production,
            ..Self::default()
        }
    }

    pub fn is_development(&self) -> bool {
        self.mode == RenderMode::Development
    }
}

pub type HostHandler = Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>;
pub type HostHandlers = IndexMap<String, HostHandler>;
pub type NavigateFn = Rc<dyn Fn(&str, Option<&ObjectMap>)>;

#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Component `{component}` is malformed: {message}")]
    InvalidComponent { component: String, message: String },

    #[error("Native component `{component}` failed: {message}")]
    Native { component: String, message: String },
}

impl RenderError {
    pub fn native(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Native {
            component: component.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("No element `{target}` in the last render")]
    UnknownTarget { target: String },

    #[error("Element `{target}` has no `{event}` binding")]
    NoBinding { target: String, event: String },

    #[error("Component instance `{instance}` is not mounted")]
    UnknownInstance { instance: String },

    #[error("No host handler named `{name}`")]
    UnknownHandler { name: String },

    #[error("Handler `{name}` failed: {source}")]
    Handler { name: String, source: RuntimeError },
}

/// A mounted component: its state, compiled methods and effect outcome
struct ComponentInstance {
    key: String,
    component: UIComponent,
    methods: MethodTable,
    effects: EffectReport,
}

impl ComponentInstance {
    fn create(
        key: String,
        component: UIComponent,
        resolver: &Rc<DataResolver>,
        external: &SharedData,
    ) -> Rc<Self> {
        let state = StateHandle::new(init_state(&component, resolver));
        let context = ScriptContext::new(&component, state, Rc::clone(resolver), Rc::clone(external));
        let methods = compile_methods(&component, context);
        let effects = run_effects(&component, &methods);
        // Effects run before the first render; their writes are part of it
        methods.context().state.take_dirty();
        debug!(instance = %key, methods = methods.len(), effects = effects.executed, "Mounted component instance");
        Rc::new(Self {
            key,
            component,
            methods,
            effects,
        })
    }

    fn state(&self) -> &StateHandle {
        &self.methods.context().state
    }
}

fn instance_key(id: &str, path: &[usize]) -> String {
    let path: Vec<String> = path.iter().map(usize::to_string).collect();
    format!("{}@{}", id, path.join("."))
}

fn child_path(path: &[usize], index: usize) -> Vec<usize> {
    let mut child = path.to_vec();
    child.push(index);
    child
}

fn node_id(node: &JsonValue) -> Option<String> {
    node.get("id").and_then(JsonValue::as_str).map(str::to_string)
}

/// Shared renderer configuration: options, resolver, native registry and
/// host callbacks. Cheap to clone.
#[derive(Clone)]
pub struct Runtime {
    options: RenderOptions,
    resolver: Rc<DataResolver>,
    registry: Rc<ComponentRegistry>,
    handlers: HostHandlers,
    navigate: Option<NavigateFn>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl Runtime {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            resolver: Rc::new(DataResolver::new()),
            registry: Rc::new(ComponentRegistry::new()),
            handlers: HostHandlers::new(),
            navigate: None,
        }
    }

    pub fn with_registry(mut self, registry: Rc<ComponentRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_handler(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }

    pub fn with_navigation(mut self, navigate: impl Fn(&str, Option<&ObjectMap>) + 'static) -> Self {
        self.navigate = Some(Rc::new(navigate));
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn resolver(&self) -> &DataResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Create state, compile methods and run effects once
    #[instrument(skip_all, fields(component = %component.id))]
    pub fn mount(&self, component: UIComponent, external_data: ObjectMap) -> MountedComponent {
        let external: SharedData = Rc::new(RefCell::new(external_data));
        let root = ComponentInstance::create(
            component.id.clone(),
            component,
            &self.resolver,
            &external,
        );
        info!(
            methods = root.methods.len(),
            effects = root.effects.executed,
            failed_effects = root.effects.failed.len(),
            "Mounted component"
        );
        MountedComponent {
            runtime: self.clone(),
            root,
            external,
            external_dirty: Cell::new(false),
            instances: RefCell::new(HashMap::new()),
            last_render: RefCell::new(VirtualDomDocument::new()),
        }
    }

    pub fn mount_json(
        &self,
        document: &JsonValue,
        external_data: ObjectMap,
    ) -> Result<MountedComponent, RenderError> {
        let component = UIComponent::from_json(document).map_err(|err| RenderError::InvalidComponent {
            component: node_id(document).unwrap_or_default(),
            message: err.to_string(),
        })?;
        Ok(self.mount(component, external_data))
    }
}

pub struct MountedComponent {
    runtime: Runtime,
    root: Rc<ComponentInstance>,
    external: SharedData,
    external_dirty: Cell<bool>,
    /// Nested component instances by id and tree path
    instances: RefCell<HashMap<String, Rc<ComponentInstance>>>,
    last_render: RefCell<VirtualDomDocument>,
}

impl MountedComponent {
    pub fn id(&self) -> &str {
        &self.root.component.id
    }

    pub fn component(&self) -> &UIComponent {
        &self.root.component
    }

    pub fn methods(&self) -> &MethodTable {
        &self.root.methods
    }

    pub fn effects(&self) -> &EffectReport {
        &self.root.effects
    }

    pub fn state(&self) -> StateMap {
        self.root.state().snapshot()
    }

    pub fn state_handle(&self) -> &StateHandle {
        self.root.state()
    }

    /// State of a nested instance, keyed `{id}@{path}`
    pub fn instance_state(&self, key: &str) -> Option<StateMap> {
        self.instance(key).map(|instance| instance.state().snapshot())
    }

    pub fn instance_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.instances.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Whether state or external data changed since the last render
    pub fn needs_render(&self) -> bool {
        self.external_dirty.get()
            || self.root.state().is_dirty()
            || self
                .instances
                .borrow()
                .values()
                .any(|instance| instance.state().is_dirty())
    }

    #[instrument(skip_all, fields(component = %self.root.key))]
    pub fn render(&self) -> VirtualDomDocument {
        self.external_dirty.set(false);
        self.root.state().take_dirty();
        for instance in self.instances.borrow().values() {
            instance.state().take_dirty();
        }

        let pass = RenderPass::new(self);
        let nodes = pass.render_root();

        let visited = pass.visited.into_inner();
        self.instances.borrow_mut().retain(|key, _| {
            let keep = visited.contains(key);
            if !keep {
                debug!(instance = %key, "Unmounting component instance");
            }
            keep
        });

        let document = VirtualDomDocument { nodes };
        debug!(nodes = document.nodes.len(), "Rendered");
        *self.last_render.borrow_mut() = document.clone();
        document
    }

    /// Render an arbitrary node against `context` using the root's methods
    pub fn render_subtree(&self, node: &JsonValue, context: &Value, path: &[usize]) -> Vec<VNode> {
        let pass = RenderPass::new(self);
        let chain = vec![Rc::clone(&self.root)];
        pass.render_node(node, context, path, &chain)
    }

    pub fn last_render(&self) -> VirtualDomDocument {
        self.last_render.borrow().clone()
    }

    pub fn set_external_data(&self, data: ObjectMap) {
        *self.external.borrow_mut() = data;
        self.external_dirty.set(true);
    }

    /// Call a root method directly
    pub fn trigger(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let result = self
            .root
            .methods
            .invoke(method, args)
            .map_err(|source| DispatchError::Handler {
                name: method.to_string(),
                source,
            });
        self.refresh();
        result
    }

    /// Fire `event` on the element with key (or id) `target` in the last render
    pub fn dispatch(&self, target: &str, event: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let binding = {
            let document = self.last_render.borrow();
            let node = document
                .find_target(target)
                .ok_or_else(|| DispatchError::UnknownTarget {
                    target: target.to_string(),
                })?;
            let binding = node.event(event).cloned();
            binding.ok_or_else(|| DispatchError::NoBinding {
                target: target.to_string(),
                event: event.to_string(),
            })?
        };
        debug!(target = %target, event = %event, "Dispatching event");
        let result = self.fire(&binding, args);
        self.refresh();
        result
    }

    /// Run a binding. Does not re-render.
    pub fn fire(&self, binding: &EventBinding, args: &[Value]) -> Result<Value, DispatchError> {
        match &binding.handler {
            EventHandler::Method { instance, method } => {
                let instance = self
                    .instance(instance)
                    .ok_or_else(|| DispatchError::UnknownInstance {
                        instance: instance.clone(),
                    })?;
                instance
                    .methods
                    .invoke(method, args)
                    .map_err(|source| DispatchError::Handler {
                        name: method.clone(),
                        source,
                    })
            }
            EventHandler::Host { name } => {
                let handler = self
                    .runtime
                    .handlers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DispatchError::UnknownHandler { name: name.clone() })?;
                handler(args).map_err(|source| DispatchError::Handler {
                    name: name.clone(),
                    source,
                })
            }
            EventHandler::Navigate {
                target,
                params,
                previous,
            } => {
                if let Some(previous) = previous {
                    self.fire(previous, args)?;
                }
                if let Some(navigate) = &self.runtime.navigate {
                    debug!(target = %target, "Navigating");
                    navigate(target, params.as_ref());
                }
                Ok(Value::Undefined)
            }
            EventHandler::Missing { name } => {
                warn!(handler = %name, "Missing handler");
                Ok(Value::Undefined)
            }
        }
    }

    fn instance(&self, key: &str) -> Option<Rc<ComponentInstance>> {
        if key == self.root.key {
            return Some(Rc::clone(&self.root));
        }
        self.instances.borrow().get(key).cloned()
    }

    fn nested_instance(&self, key: &str, component: UIComponent) -> Rc<ComponentInstance> {
        if let Some(existing) = self.instances.borrow().get(key) {
            return Rc::clone(existing);
        }
        let instance = ComponentInstance::create(
            key.to_string(),
            component,
            &self.runtime.resolver,
            &self.external,
        );
        self.instances
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&instance));
        instance
    }

    fn refresh(&self) {
        if self.needs_render() {
            self.render();
        }
    }
}

impl std::fmt::Debug for MountedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedComponent")
            .field("id", &self.root.key)
            .field("state", self.root.state())
            .field("instances", &self.instance_keys())
            .finish()
    }
}

/// One walk over the tree
struct RenderPass<'a> {
    mounted: &'a MountedComponent,
    visited: RefCell<HashSet<String>>,
}

type Chain = [Rc<ComponentInstance>];

impl<'a> RenderPass<'a> {
    fn new(mounted: &'a MountedComponent) -> Self {
        let mut visited = HashSet::new();
        visited.insert(mounted.root.key.clone());
        Self {
            mounted,
            visited: RefCell::new(visited),
        }
    }

    fn options(&self) -> &RenderOptions {
        &self.mounted.runtime.options
    }

    fn resolver(&self) -> &DataResolver {
        &self.mounted.runtime.resolver
    }

    fn render_root(&self) -> Vec<VNode> {
        let root = &self.mounted.root;
        let external = Value::object(self.mounted.external.borrow().clone());
        let context = root.methods.context().render_context(&external);
        let chain = vec![Rc::clone(root)];
        self.render_component_body(root, &context, &[], &chain)
    }

    fn render_node(&self, node: &JsonValue, context: &Value, path: &[usize], chain: &Chain) -> Vec<VNode> {
        self.try_render_node(node, context, path, chain)
            .unwrap_or_else(|err| self.recover(err, node_id(node)))
    }

    fn recover(&self, err: RenderError, node_id: Option<String>) -> Vec<VNode> {
        error!(
            node_id = node_id.as_deref().unwrap_or("<none>"),
            error = %err,
            "Failed to render node"
        );
        if self.options().is_development() {
            vec![VNode::error(err.to_string(), node_id)]
        } else {
            Vec::new()
        }
    }

    fn try_render_node(
        &self,
        node: &JsonValue,
        context: &Value,
        path: &[usize],
        chain: &Chain,
    ) -> Result<Vec<VNode>, RenderError> {
        match node {
            JsonValue::String(text) => Ok(self.text(self.resolver().interpolate(text, context))),
            JsonValue::Object(_) if UIComponent::is_component(node) => {
                self.render_component(node, context, path, chain)
            }
            JsonValue::Object(_) => self.render_element(node, context, path, chain, None),
            _ => Ok(Vec::new()),
        }
    }

    fn text(&self, content: String) -> Vec<VNode> {
        if content.is_empty() {
            Vec::new()
        } else {
            vec![VNode::text(content)]
        }
    }

    fn render_component(
        &self,
        node: &JsonValue,
        context: &Value,
        path: &[usize],
        chain: &Chain,
    ) -> Result<Vec<VNode>, RenderError> {
        let component = UIComponent::from_json(node).map_err(|err| RenderError::InvalidComponent {
            component: node_id(node).unwrap_or_default(),
            message: err.to_string(),
        })?;
        let key = instance_key(&component.id, path);
        let instance = self.mounted.nested_instance(&key, component);
        self.visited.borrow_mut().insert(key);

        let context = instance.methods.context().render_context(context);
        let mut chain = chain.to_vec();
        chain.push(Rc::clone(&instance));
        Ok(self.render_component_body(&instance, &context, path, &chain))
    }

    /// The `render` tree of a component; its root element is selected by the
    /// component's id
    fn render_component_body(
        &self,
        instance: &ComponentInstance,
        context: &Value,
        path: &[usize],
        chain: &Chain,
    ) -> Vec<VNode> {
        let render = &instance.component.render;
        if UIComponent::is_component(render) {
            return self.render_node(render, context, path, chain);
        }
        self.render_element(render, context, path, chain, Some(&instance.component.id))
            .unwrap_or_else(|err| self.recover(err, node_id(render)))
    }

    fn render_element(
        &self,
        node: &JsonValue,
        context: &Value,
        path: &[usize],
        chain: &Chain,
        owner: Option<&str>,
    ) -> Result<Vec<VNode>, RenderError> {
        let merged = apply_platform_override(node, self.options().platform);
        let node = merged.as_ref().unwrap_or(node);

        let element = match validate(node) {
            Ok(element) => element,
            Err(err) => {
                warn!(node_id = err.node_id().unwrap_or("<none>"), error = %err, "Skipping invalid element");
                return Ok(Vec::new());
            }
        };

        if let Some(condition) = element.if_condition.as_ref().filter(|c| !c.is_null()) {
            if !self.resolver().resolve(condition, context).is_truthy() {
                let else_if_holds = element
                    .else_if_condition
                    .as_ref()
                    .filter(|c| !c.is_null())
                    .is_some_and(|c| self.resolver().resolve(c, context).is_truthy());
                if !else_if_holds {
                    return Ok(match &element.else_branch {
                        Some(branch) if !branch.is_null() => self.render_node(branch, context, path, chain),
                        _ => Vec::new(),
                    });
                }
            }
        }

        if element.for_directive.is_some() {
            return Ok(self.render_loop(&element, context, path, chain));
        }
        self.render_single(&element, context, path, chain, owner, None)
    }

    fn render_loop(&self, element: &UIElement, context: &Value, path: &[usize], chain: &Chain) -> Vec<VNode> {
        let Some(directive) = &element.for_directive else {
            return Vec::new();
        };
        let source = self.resolver().resolve(&directive.source, context);
        let items = match &source {
            Value::Array(items) => items.borrow().clone(),
            other => {
                debug!(node_id = %element.id, found = other.type_of(), "Loop source is not an array");
                return Vec::new();
            }
        };
        let base = match context {
            Value::Object(fields) => fields.borrow().clone(),
            _ => ObjectMap::new(),
        };

        let mut template = element.clone();
        template.for_directive = None;
        template.key = None;
        template.if_condition = None;
        template.else_if_condition = None;
        template.else_branch = None;

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let mut fields = base.clone();
            fields.insert(directive.item.clone(), item);
            if let Some(index_name) = &directive.index {
                fields.insert(index_name.clone(), Value::Number(index as f64));
            }
            let item_context = Value::object(fields);

            let mut key = self.loop_key(element, &item_context, index);
            if !seen.insert(key.clone()) {
                let unique = format!("{}-{}", key, index);
                warn!(node_id = %element.id, key = %key, replacement = %unique, "Duplicate loop key");
                seen.insert(unique.clone());
                key = unique;
            }

            template.id = format!("{}-{}", element.id, index);
            let item_path = child_path(path, index);
            match self.render_single(&template, &item_context, &item_path, chain, None, Some(key)) {
                Ok(rendered) => nodes.extend(rendered),
                Err(err) => nodes.extend(self.recover(err, Some(template.id.clone()))),
            }
        }
        nodes
    }

    /// `for.key` as a path (string form) or DSL value; falls back to `{id}-{index}`
    fn loop_key(&self, element: &UIElement, item_context: &Value, index: usize) -> String {
        let resolved = match element.for_directive.as_ref().and_then(|d| d.key.as_ref()) {
            Some(JsonValue::String(path)) => self.resolver().raw_value(path, item_context),
            Some(value) => self.resolver().resolve(value, item_context),
            None => Value::Undefined,
        };
        if resolved.is_truthy() {
            resolved.to_display_string()
        } else {
            format!("{}-{}", element.id, index)
        }
    }

    fn render_single(
        &self,
        element: &UIElement,
        context: &Value,
        path: &[usize],
        chain: &Chain,
        owner: Option<&str>,
        loop_key: Option<String>,
    ) -> Result<Vec<VNode>, RenderError> {
        let mut attributes = self.resolver().resolve_map(&element.props, context);
        let mut events = IndexMap::new();
        self.wire_events(&mut attributes, &mut events, chain);
        self.wire_navigation(element, context, &mut attributes, &mut events);
        self.decorate_selection(owner.unwrap_or(&element.id), path, &mut attributes);

        let key = loop_key.or_else(|| {
            element
                .key
                .as_ref()
                .map(|key| self.resolver().resolve(key, context))
                .filter(|key| !key.is_nullish())
                .map(|key| key.to_display_string())
        });
        let children = self.render_children(element.children.as_ref(), context, path, chain);

        if element.element_type.starts_with(self.options().native_prefix.as_str()) {
            return self.render_native(element, attributes, children, key);
        }

        let tag = html_tag(&element.element_type);
        let mut node = VNode::element(tag.clone())
            .with_id(element.id.clone())
            .with_attributes(attributes);
        for (name, binding) in events {
            node = node.with_event(name, binding);
        }
        if is_void_tag(&tag) {
            if !children.is_empty() {
                debug!(node_id = %element.id, tag = %tag, "Dropping children of void element");
            }
        } else {
            node = node.with_children(children);
        }
        if tag == "img" && node.attr("alt").is_none() {
            node = node.with_attr("alt", "");
        }
        if self.options().is_development()
            && self.options().animations
            && is_animatable(&element.element_type)
        {
            node = node.with_animation(AnimationHint::for_key(key.as_deref().unwrap_or(&element.id)));
        }
        if let Some(key) = key {
            node = node.with_key(key);
        }
        Ok(vec![node])
    }

    fn render_native(
        &self,
        element: &UIElement,
        props: ObjectMap,
        children: Vec<VNode>,
        key: Option<String>,
    ) -> Result<Vec<VNode>, RenderError> {
        if let Some(component) = self.mounted.runtime.registry.resolve(&element.element_type) {
            return component.render(&props, children);
        }
        debug!(node_id = %element.id, component = %element.element_type, "No native renderer; emitting placeholder");
        let mut node = VNode::native(element.element_type.clone(), props)
            .with_id(element.id.clone())
            .with_children(children);
        if let Some(key) = key {
            node = node.with_key(key);
        }
        Ok(vec![node])
    }

    /// Handler-name props become bindings: innermost component method, then
    /// host handler, then a binding that warns when fired
    fn wire_events(
        &self,
        attributes: &mut ObjectMap,
        events: &mut IndexMap<String, EventBinding>,
        chain: &Chain,
    ) {
        for &event in EVENT_PROPS {
            let Some(Value::String(name)) = attributes.get(event).cloned() else {
                continue;
            };
            attributes.shift_remove(event);

            let handler = if let Some(instance) = chain.iter().rev().find(|i| i.methods.contains(&name)) {
                EventHandler::Method {
                    instance: instance.key.clone(),
                    method: name,
                }
            } else if self.mounted.runtime.handlers.contains_key(&name) {
                EventHandler::Host { name }
            } else {
                debug!(event, handler = %name, "No handler found");
                EventHandler::Missing { name }
            };

            let found = !matches!(handler, EventHandler::Missing { .. });
            let mut binding = EventBinding::new(handler);
            if event == "onSubmit" && found {
                binding = binding.preventing_default();
            }
            events.insert(event.to_string(), binding);
        }
    }

    fn wire_navigation(
        &self,
        element: &UIElement,
        context: &Value,
        attributes: &mut ObjectMap,
        events: &mut IndexMap<String, EventBinding>,
    ) {
        if self.mounted.runtime.navigate.is_none() {
            return;
        }
        let Some(link) = element.link_to.as_ref().and_then(LinkTarget::from_json) else {
            return;
        };

        let (target, params) = match link {
            LinkTarget::Direct(value) => {
                let target = self.resolver().resolve(&value, context);
                if !target.is_truthy() {
                    return;
                }
                (target.to_display_string(), None)
            }
            LinkTarget::Detailed { ui, params } => {
                let target = self.resolver().resolve(&ui, context).to_display_string();
                let params = params.map(|params| self.link_params(&params, context));
                (target, params)
            }
        };

        let previous = events.shift_remove("onClick").map(Box::new);
        events.insert(
            "onClick".to_string(),
            EventBinding::new(EventHandler::Navigate {
                target: target.clone(),
                params: params.clone(),
                previous,
            })
            .preventing_default(),
        );
        events.insert(
            "onTouchEnd".to_string(),
            EventBinding::new(EventHandler::Navigate {
                target,
                params,
                previous: None,
            })
            .preventing_default(),
        );
        merge_style(attributes, &[("cursor", "pointer")]);
    }

    /// Params resolve one level deep: a plain object param has each of its
    /// entries resolved
    fn link_params(&self, params: &genui_parser::JsonMap, context: &Value) -> ObjectMap {
        params
            .iter()
            .map(|(key, value)| {
                let resolved = match value {
                    JsonValue::Object(nested) if !DslValue::classify(value).is_dynamic() => Value::object(
                        nested
                            .iter()
                            .map(|(k, v)| (k.clone(), self.resolver().resolve(v, context)))
                            .collect(),
                    ),
                    other => self.resolver().resolve(other, context),
                };
                (key.clone(), resolved)
            })
            .collect()
    }

    fn decorate_selection(&self, id: &str, path: &[usize], attributes: &mut ObjectMap) {
        let Some(selection) = &self.options().selection else {
            return;
        };
        let feedback = selection.feedback(id, path);
        let path_json: Vec<String> = path.iter().map(usize::to_string).collect();

        attributes.insert("data-component-id".to_string(), Value::string(id));
        attributes.insert(
            "data-component-path".to_string(),
            Value::String(format!("[{}]", path_json.join(","))),
        );

        let outline = if feedback.selected {
            "2px solid #3b82f6"
        } else if feedback.hovered {
            "1px solid #93c5fd"
        } else if feedback.parent {
            "1px dotted #9ca3af"
        } else {
            "none"
        };
        let will_change = if feedback.selected || feedback.hovered || feedback.parent {
            "outline"
        } else {
            "auto"
        };
        merge_style(
            attributes,
            &[
                ("outlineOffset", "0px"),
                ("willChange", will_change),
                ("outline", outline),
                ("transition", "outline 0.2s ease, background-color 0.2s ease"),
            ],
        );

        let mut classes: Vec<String> = match attributes.get("className") {
            Some(Value::String(existing)) if !existing.is_empty() => vec![existing.clone()],
            _ => Vec::new(),
        };
        if feedback.selected {
            classes.push("dsl-selected".to_string());
        }
        if feedback.hovered {
            classes.push("dsl-hovered".to_string());
        }
        if feedback.selected || feedback.hovered {
            classes.push("dsl-outlined".to_string());
        }
        attributes.insert("className".to_string(), Value::String(classes.join(" ")));
    }

    fn render_children(
        &self,
        children: Option<&JsonValue>,
        context: &Value,
        path: &[usize],
        chain: &Chain,
    ) -> Vec<VNode> {
        match children {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .enumerate()
                .flat_map(|(index, child)| self.render_child(child, context, &child_path(path, index), chain))
                .collect(),
            Some(child @ JsonValue::Object(_)) => {
                self.render_child(child, context, &child_path(path, 0), chain)
            }
            Some(child) => self.render_child(child, context, path, chain),
        }
    }

    fn render_child(&self, child: &JsonValue, context: &Value, path: &[usize], chain: &Chain) -> Vec<VNode> {
        match child {
            JsonValue::Null => Vec::new(),
            JsonValue::String(text) => self.text(self.resolver().interpolate(text, context)),
            JsonValue::Bool(_) | JsonValue::Number(_) => {
                self.text(Value::from_json(child).to_display_string())
            }
            JsonValue::Array(_) => self.render_children(Some(child), context, path, chain),
            JsonValue::Object(_) if DslValue::classify(child).is_dynamic() => {
                match self.resolver().resolve(child, context) {
                    Value::Undefined => Vec::new(),
                    value => self.text(value.to_display_string()),
                }
            }
            JsonValue::Object(_) => self.render_node(child, context, path, chain),
        }
    }
}

/// Overlay `entries` on the `style` attribute, copying it first
fn merge_style(attributes: &mut ObjectMap, entries: &[(&str, &str)]) {
    let mut style = match attributes.get("style") {
        Some(Value::Object(fields)) => fields.borrow().clone(),
        _ => ObjectMap::new(),
    };
    for (key, value) in entries {
        style.insert(key.to_string(), Value::string(*value));
    }
    attributes.insert("style".to_string(), Value::object(style));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_tag_mapping() {
        assert_eq!(html_tag("view"), "div");
        assert_eq!(html_tag("Text"), "span");
        assert_eq!(html_tag("UL"), "ul");
        assert_eq!(html_tag("carousel"), "div");
        assert!(is_void_tag("input"));
        assert!(!is_void_tag("div"));
    }

    #[test]
    fn test_animatable() {
        assert!(is_animatable("li"));
        assert!(is_animatable("Card"));
        assert!(!is_animatable("textarea"));
    }

    #[test]
    fn test_selection_feedback() {
        let selection = SelectionState {
            selected: Some(NodeRef::new("btn", vec![0, 1])),
            hovered: Some(NodeRef::new("root", vec![])),
        };
        let selected = selection.feedback("btn", &[0, 1]);
        assert!(selected.selected && !selected.hovered);
        let parent = selection.feedback("row", &[0]);
        assert!(parent.parent && !parent.selected);
        assert!(selection.feedback("root", &[]).hovered);
    }

    #[test]
    fn test_instance_keys() {
        assert_eq!(instance_key("card", &[0, 2]), "card@0.2");
        assert_eq!(instance_key("card", &[]), "card@");
    }
}
