//! Native leaf components (charts, maps, grids, ...).
//!
//! The renderer never knows what these are. It hands resolved props and
//! rendered children to whatever is registered under the element type.

use crate::renderer::RenderError;
use crate::value::ObjectMap;
use crate::vdom::VNode;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, warn};

pub trait NativeComponent {
    fn render(&self, props: &ObjectMap, children: Vec<VNode>) -> Result<Vec<VNode>, RenderError>;
}

impl<F> NativeComponent for F
where
    F: Fn(&ObjectMap, Vec<VNode>) -> Result<Vec<VNode>, RenderError>,
{
    fn render(&self, props: &ObjectMap, children: Vec<VNode>) -> Result<Vec<VNode>, RenderError> {
        self(props, children)
    }
}

/// Produces a component the first time its type is rendered
pub type ComponentLoader = Box<dyn Fn(&str) -> Option<Rc<dyn NativeComponent>>>;

/// Cache of native components, filled on first use.
///
/// A type the loader could not provide is remembered and not retried until
/// [`ComponentRegistry::reset_failed`].
#[derive(Default)]
pub struct ComponentRegistry {
    components: RefCell<HashMap<String, Rc<dyn NativeComponent>>>,
    failed: RefCell<HashSet<String>>,
    loader: Option<ComponentLoader>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: ComponentLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn register(&self, name: impl Into<String>, component: Rc<dyn NativeComponent>) {
        let name = name.into();
        self.failed.borrow_mut().remove(&name);
        self.components.borrow_mut().insert(name, component);
    }

    pub fn resolve(&self, name: &str) -> Option<Rc<dyn NativeComponent>> {
        if let Some(component) = self.components.borrow().get(name) {
            return Some(Rc::clone(component));
        }
        if self.failed.borrow().contains(name) {
            return None;
        }

        let loader = self.loader.as_ref()?;
        match loader(name) {
            Some(component) => {
                debug!(component = %name, "Loaded native component");
                self.components
                    .borrow_mut()
                    .insert(name.to_string(), Rc::clone(&component));
                Some(component)
            }
            None => {
                warn!(component = %name, "Native component could not be loaded");
                self.failed.borrow_mut().insert(name.to_string());
                None
            }
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.components.borrow().contains_key(name)
    }

    pub fn has_failed(&self, name: &str) -> bool {
        self.failed.borrow().contains(name)
    }

    pub fn reset_failed(&self) {
        self.failed.borrow_mut().clear();
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.components.borrow().keys().collect::<Vec<_>>())
            .field("failed", &self.failed.borrow())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}
