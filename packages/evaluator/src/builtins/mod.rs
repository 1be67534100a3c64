//! Whitelisted globals visible to scripts.
//!
//! Expressions get [`install_expression_globals`]; method and effect bodies
//! additionally see `console`, `window` and `Error` through
//! [`install_method_globals`]. Nothing else from the host is reachable.

pub mod array;
pub mod console;
pub mod date;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

use crate::interpreter::{Interpreter, RuntimeError, Scope};
use crate::value::{Function, NativeFn, ObjectMap, Value};
use std::rc::Rc;

/// Names available to `$exp` expressions besides the flattened context
pub const EXPRESSION_GLOBALS: &[&str] = &[
    "Math", "Date", "String", "Number", "Boolean", "Array", "Object", "JSON", "parseInt",
    "parseFloat", "isNaN", "isFinite", "filter", "map", "reduce", "find", "some", "every", "sort",
    "slice",
];

/// Context keys that never become variables when a context is flattened
pub const RESERVED_NAMES: &[&str] = &[
    "Math", "Date", "String", "Number", "Boolean", "Array", "Object", "JSON", "filter", "map",
    "reduce", "find", "some", "every", "sort", "slice", "parseInt", "parseFloat", "isNaN",
    "isFinite", "console", "window", "setState", "data",
];

/// Array helpers exposed as free functions taking the array first
const ARRAY_HELPERS: &[&str] = &["filter", "map", "reduce", "find", "some", "every", "sort", "slice"];

pub fn install_expression_globals(scope: &Scope) {
    scope.declare_const("Math", math::math_object());
    scope.declare_const("Date", date::date_constructor());
    scope.declare_const("String", string::string_constructor());
    scope.declare_const("Number", number::number_constructor());
    scope.declare_const("Boolean", boolean_constructor());
    scope.declare_const("Array", array::array_constructor());
    scope.declare_const("Object", object::object_constructor());
    scope.declare_const("JSON", json::json_object());
    scope.declare_const("parseInt", Value::native("parseInt", number::parse_int));
    scope.declare_const("parseFloat", Value::native("parseFloat", number::parse_float));
    scope.declare_const("isNaN", Value::native("isNaN", |_, _, args| {
        Ok(Value::Boolean(arg(args, 0).to_number().is_nan()))
    }));
    scope.declare_const("isFinite", Value::native("isFinite", |_, _, args| {
        Ok(Value::Boolean(arg(args, 0).to_number().is_finite()))
    }));
    for &name in ARRAY_HELPERS {
        scope.declare_const(name, array_helper(name));
    }
}

pub fn install_method_globals(scope: &Scope) {
    install_expression_globals(scope);
    scope.declare_const("console", console::console_object());
    scope.declare_const("window", console::window_object());
    scope.declare_const(
        "Error",
        native_constructor(
            "Error",
            ObjectMap::new(),
            native_fn(|_, _, args| Ok(error_object("Error", &message_arg(args)))),
        ),
    );
}

/// Built-in method looked up on a value that has no own property `key`
pub fn prototype_method(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Array(_) => array::method(key),
        Value::String(_) => string::method(key),
        Value::Number(_) => number::method(key),
        Value::Date(_) => date::method(key),
        Value::Object(_) => object::method(key),
        Value::Boolean(_) if key == "toString" => Some(Value::native("toString", |_, this, _| {
            Ok(Value::String(this.to_display_string()))
        })),
        _ => None,
    }
}

/// `{ name, message }` as thrown by failing built-ins and `new Error(..)`
pub fn error_object(name: &str, message: &str) -> Value {
    let mut fields = ObjectMap::new();
    fields.insert("name".to_string(), Value::string(name));
    fields.insert("message".to_string(), Value::string(message));
    Value::object(fields)
}

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn message_arg(args: &[Value]) -> String {
    match args.first() {
        Some(Value::Undefined) | None => String::new(),
        Some(value) => value.to_display_string(),
    }
}

/// Function value that also behaves under `new` and carries statics
pub(crate) fn native_constructor(name: &str, statics: ObjectMap, call: NativeFn) -> Value {
    Value::Function(Rc::new(Function::Native {
        name: name.to_string(),
        construct: Some(Rc::clone(&call)),
        call,
        statics,
    }))
}

pub(crate) fn native_fn(
    call: impl Fn(&Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError> + 'static,
) -> NativeFn {
    Rc::new(call)
}

pub(crate) fn statics(entries: Vec<(&str, Value)>) -> ObjectMap {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn boolean_constructor() -> Value {
    native_constructor(
        "Boolean",
        ObjectMap::new(),
        native_fn(|_, _, args| Ok(Value::Boolean(arg(args, 0).is_truthy()))),
    )
}

fn array_helper(name: &'static str) -> Value {
    Value::native(name, move |interp, _, args| {
        let Some((target, rest)) = args.split_first() else {
            return Err(RuntimeError::type_error(format!("{} expects an array", name)));
        };
        array::call_method(interp, name, target, rest)
    })
}
