//! Compiling `methods` into callable handlers.
//!
//! A handler's scope is rebuilt on every call from the component's shared
//! state cell, so handlers compiled once at mount never read stale state.
//! The table itself is immutable after compilation.

use crate::builtins::install_method_globals;
use crate::interpreter::{closure, Interpreter, RuntimeError, Scope};
use crate::resolver::DataResolver;
use crate::state::{props_value, StateHandle, StateMap};
use crate::value::{ObjectMap, Value};
use genui_parser::ast::FunctionDecl;
use genui_parser::{parse_function, sanitize_source, JsonMap, ParseError, UIComponent};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Runtime data supplied by the host, shared by every instance of a mount
pub type SharedData = Rc<RefCell<ObjectMap>>;

#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("`{name}` failed to compile: {source}")]
    Parse {
        name: String,
        /// Source after sanitizing, as handed to the parser
        code: String,
        source: ParseError,
    },
}

impl CompileError {
    pub fn name(&self) -> &str {
        match self {
            CompileError::Parse { name, .. } => name,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            CompileError::Parse { code, .. } => code,
        }
    }

    pub fn parse_error(&self) -> &ParseError {
        match self {
            CompileError::Parse { source, .. } => source,
        }
    }
}

/// Sanitize and parse a method or effect body
pub fn compile_function(name: &str, source: &str) -> Result<Rc<FunctionDecl>, CompileError> {
    let code = sanitize_source(source);
    parse_function(&code).map_err(|source| CompileError::Parse {
        name: name.to_string(),
        code,
        source,
    })
}

/// What the scripts of one component instance read at call time
#[derive(Clone)]
pub struct ScriptContext {
    pub component_id: String,
    pub data: Rc<JsonMap>,
    pub props: Value,
    pub state: StateHandle,
    pub external: SharedData,
    pub resolver: Rc<DataResolver>,
}

impl ScriptContext {
    pub fn new(
        component: &UIComponent,
        state: StateHandle,
        resolver: Rc<DataResolver>,
        external: SharedData,
    ) -> Self {
        Self {
            component_id: component.id.clone(),
            data: Rc::new(component.data.clone()),
            props: props_value(component),
            state,
            external,
            resolver,
        }
    }

    /// Component `data` resolved against the current state
    pub fn resolved_data(&self) -> ObjectMap {
        self.resolved_data_with(&self.state.snapshot())
    }

    fn resolved_data_with(&self, state: &StateMap) -> ObjectMap {
        let mut fields = self.external.borrow().clone();
        fields.extend(state.iter().map(|(key, value)| (key.clone(), value.clone())));
        fields.insert("states".to_string(), Value::object(state.clone()));
        fields.insert("props".to_string(), self.props.clone());
        self.resolver.resolve_map(&self.data, &Value::object(fields))
    }

    /// `{ ...base, ...data, ...state, states, props }`
    pub fn render_context(&self, base: &Value) -> Value {
        let state = self.state.snapshot();
        let mut fields = match base {
            Value::Object(base) => base.borrow().clone(),
            _ => ObjectMap::new(),
        };
        fields.extend(self.resolved_data_with(&state));
        fields.extend(state.iter().map(|(key, value)| (key.clone(), value.clone())));
        fields.insert("states".to_string(), Value::object(state));
        fields.insert("props".to_string(), self.props.clone());
        Value::object(fields)
    }
}

struct CompiledMethod {
    code: String,
    function: Rc<FunctionDecl>,
}

struct TableInner {
    context: ScriptContext,
    methods: IndexMap<String, CompiledMethod>,
    errors: Vec<CompileError>,
    globals: Scope,
    interpreter: Interpreter,
}

/// Compiled handlers of one component instance
#[derive(Clone)]
pub struct MethodTable {
    inner: Rc<TableInner>,
}

/// Compile every declared method; one that fails is logged and left out
#[instrument(skip_all, fields(component = %component.id, methods = component.methods.len()))]
pub fn compile_methods(component: &UIComponent, context: ScriptContext) -> MethodTable {
    let mut methods = IndexMap::new();
    let mut errors = Vec::new();

    for (name, def) in &component.methods {
        match compile_function(name, &def.source) {
            Ok(function) => {
                debug!(method = %name, "Compiled method");
                methods.insert(
                    name.clone(),
                    CompiledMethod {
                        code: sanitize_source(&def.source),
                        function,
                    },
                );
            }
            Err(err) => {
                error!(method = %name, source = %def.source, error = %err, "Failed to compile method");
                errors.push(err);
            }
        }
    }

    let globals = Scope::new();
    install_method_globals(&globals);

    MethodTable {
        inner: Rc::new(TableInner {
            context,
            methods,
            errors,
            globals,
            interpreter: Interpreter::new(),
        }),
    }
}

impl MethodTable {
    pub fn contains(&self, name: &str) -> bool {
        self.inner.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.methods.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.inner.errors
    }

    pub fn context(&self) -> &ScriptContext {
        &self.inner.context
    }

    /// Call a method with positional arguments. Runtime errors are logged
    /// and returned to the caller.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        invoke(&self.inner, &self.inner.interpreter, name, args)
    }

    /// The scope a handler body runs in, as of now
    pub fn script_scope(&self) -> Scope {
        build_scope(&self.inner)
    }

    /// Invoke a parsed function with no arguments in the script scope
    pub(crate) fn run_thunk(&self, function: &Rc<FunctionDecl>) -> Result<Value, RuntimeError> {
        let scope = build_scope(&self.inner);
        self.inner
            .interpreter
            .call(&closure(function, &scope), &Value::Undefined, &[])
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("component", &self.inner.context.component_id)
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .field("errors", &self.inner.errors.len())
            .finish()
    }
}

fn invoke(
    inner: &Rc<TableInner>,
    interpreter: &Interpreter,
    name: &str,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let Some(method) = inner.methods.get(name) else {
        return Err(RuntimeError::type_error(format!(
            "{} is not a method of {}",
            name, inner.context.component_id
        )));
    };

    let scope = build_scope(inner);
    scope.declare("args", Value::array(args.to_vec()));
    interpreter
        .call(&closure(&method.function, &scope), &Value::Undefined, args)
        .map_err(|err| {
            error!(
                method = %name,
                component = %inner.context.component_id,
                source = %method.code,
                error = %err,
                "Method failed"
            );
            err
        })
}

/// External data, resolved data, state, `states`, `props`, `setState` and
/// sibling methods, in increasing precedence. Globals always win.
fn build_scope(inner: &Rc<TableInner>) -> Scope {
    let scope = inner.globals.child();
    let context = &inner.context;
    let state = context.state.snapshot();

    let declare = |name: &str, value: Value| {
        if !inner.globals.has_own(name) {
            scope.declare(name, value);
        }
    };

    for (key, value) in context.external.borrow().iter() {
        declare(key, value.clone());
    }
    for (key, value) in context.resolved_data_with(&state) {
        declare(&key, value);
    }
    for (key, value) in &state {
        declare(key, value.clone());
    }
    declare("states", Value::object(state));
    declare("props", context.props.clone());
    declare("setState", context.state.setter());

    let table = Rc::downgrade(inner);
    for name in inner.methods.keys() {
        declare(name, sibling(table.clone(), name.clone()));
    }
    scope
}

/// Sibling handle; weak so a closure kept in state does not pin the table
fn sibling(table: Weak<TableInner>, name: String) -> Value {
    Value::native(name.clone(), move |interpreter, _, args| {
        let Some(inner) = table.upgrade() else {
            return Err(RuntimeError::type_error(format!("{} is no longer available", name)));
        };
        invoke(&inner, interpreter, &name, args)
    })
}
