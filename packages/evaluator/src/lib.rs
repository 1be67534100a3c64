pub mod builtins;
pub mod effects;
pub mod expression;
pub mod interpreter;
pub mod methods;
pub mod path;
pub mod registry;
pub mod renderer;
pub mod resolver;
pub mod state;
pub mod validator;
pub mod value;
pub mod vdom;

#[cfg(test)]
mod tests_expressions;

#[cfg(test)]
mod tests_rendering;

#[cfg(test)]
mod tests_error_recovery;

#[cfg(test)]
mod tests_integration;

pub use effects::{run_effects, EffectFailure, EffectReport};
pub use expression::{flatten_context, ExpressionError, ExpressionEvaluator};
pub use interpreter::{Interpreter, RuntimeError, Scope};
pub use methods::{compile_function, compile_methods, CompileError, MethodTable, ScriptContext, SharedData};
pub use path::resolve_path;
pub use registry::{ComponentLoader, ComponentRegistry, NativeComponent};
pub use renderer::{
    html_tag, DispatchError, HostHandler, HostHandlers, MountedComponent, NavigateFn, NodeRef,
    RenderError, RenderMode, RenderOptions, Runtime, SelectionState, EVENT_PROPS,
};
pub use resolver::DataResolver;
pub use state::{init_state, StateHandle, StateMap};
pub use validator::{validate, DocumentValidator, ValidationError, ValidationLevel, ValidationWarning};
pub use value::{ObjectMap, Value};
pub use vdom::{AnimationHint, EventBinding, EventHandler, VNode, VirtualDomDocument};
