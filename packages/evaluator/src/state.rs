//! Component state.
//!
//! State lives in one shared cell per component instance. Compiled methods
//! never capture a copy of it: every read goes through the cell, so a
//! handler compiled at mount always sees the latest values.

use crate::builtins::arg;
use crate::resolver::DataResolver;
use crate::value::{ObjectMap, Value};
use genui_parser::UIComponent;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

pub type StateMap = ObjectMap;

#[derive(Default)]
struct StateCell {
    values: RefCell<StateMap>,
    revision: Cell<u64>,
    dirty: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct StateHandle {
    cell: Rc<StateCell>,
}

impl StateHandle {
    pub fn new(initial: StateMap) -> Self {
        Self {
            cell: Rc::new(StateCell {
                values: RefCell::new(initial),
                revision: Cell::new(0),
                dirty: Cell::new(false),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Value {
        self.cell.values.borrow().get(key).cloned().unwrap_or_default()
    }

    /// Shallow copy of the current values; arrays and objects stay shared
    pub fn snapshot(&self) -> StateMap {
        self.cell.values.borrow().clone()
    }

    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug!(key = %key, revision = self.cell.revision.get() + 1, "setState");
        self.cell.values.borrow_mut().insert(key, value);
        self.cell.revision.set(self.cell.revision.get() + 1);
        self.cell.dirty.set(true);
    }

    /// Merge several keys as one update
    pub fn merge(&self, values: StateMap) {
        if values.is_empty() {
            return;
        }
        self.cell.values.borrow_mut().extend(values);
        self.cell.revision.set(self.cell.revision.get() + 1);
        self.cell.dirty.set(true);
    }

    pub fn revision(&self) -> u64 {
        self.cell.revision.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.cell.dirty.get()
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&self) -> bool {
        self.cell.dirty.replace(false)
    }

    /// `setState(key, value)` or `setState({ key: value, .. })` for scripts.
    ///
    /// Holds the cell weakly: a script closure stored in state must not keep
    /// its own state alive.
    pub fn setter(&self) -> Value {
        let cell: Weak<StateCell> = Rc::downgrade(&self.cell);
        Value::native("setState", move |_, _, args| {
            let Some(cell) = cell.upgrade() else {
                warn!("setState called after the component was unmounted");
                return Ok(Value::Undefined);
            };
            let handle = StateHandle { cell };
            match (arg(args, 0), args.len()) {
                (Value::Object(fields), 1) => handle.merge(fields.borrow().clone()),
                (key, _) => handle.set_state(key.to_display_string(), arg(args, 1)),
            }
            Ok(Value::Undefined)
        })
    }
}

impl std::fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle")
            .field("values", &*self.cell.values.borrow())
            .field("revision", &self.cell.revision.get())
            .finish()
    }
}

/// Resolve declared initial values against `{ ...data, props }`.
///
/// States do not see each other while they are initialized.
pub fn init_state(component: &UIComponent, resolver: &DataResolver) -> StateMap {
    let mut context = ObjectMap::new();
    for (key, value) in &component.data {
        context.insert(key.clone(), Value::from_json(value));
    }
    context.insert("props".to_string(), props_value(component));
    let context = Value::object(context);

    component
        .states
        .iter()
        .map(|(key, initial)| (key.clone(), resolver.resolve(initial, &context)))
        .collect()
}

pub(crate) fn props_value(component: &UIComponent) -> Value {
    Value::object(
        component
            .props
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_json(value)))
            .collect(),
    )
}
