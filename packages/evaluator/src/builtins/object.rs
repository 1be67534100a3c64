use super::{arg, native_constructor, native_fn, statics};
use crate::interpreter::{iterate, Interpreter, RuntimeError};
use crate::value::{ObjectMap, Value};

pub fn method(key: &str) -> Option<Value> {
    match key {
        "hasOwnProperty" => Some(Value::native("hasOwnProperty", |_, this, args| {
            let key = arg(args, 0).to_display_string();
            Ok(Value::Boolean(match this {
                Value::Object(fields) => fields.borrow().contains_key(&key),
                _ => false,
            }))
        })),
        "toString" => Some(Value::native("toString", |_, this, _| {
            Ok(Value::String(this.to_display_string()))
        })),
        _ => None,
    }
}

/// Own enumerable entries: object fields, array or string indices
fn entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(fields) => fields
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item.clone()))
            .collect(),
        Value::String(text) => text
            .chars()
            .enumerate()
            .map(|(index, c)| (index.to_string(), Value::String(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn require_object(value: &Value, name: &str) -> Result<(), RuntimeError> {
    if value.is_nullish() {
        return Err(RuntimeError::type_error(format!(
            "Cannot convert undefined or null to object (in Object.{})",
            name
        )));
    }
    Ok(())
}

fn keys(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = arg(args, 0);
    require_object(&target, "keys")?;
    Ok(Value::array(
        entries(&target).into_iter().map(|(key, _)| Value::String(key)).collect(),
    ))
}

fn values(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = arg(args, 0);
    require_object(&target, "values")?;
    Ok(Value::array(
        entries(&target).into_iter().map(|(_, value)| value).collect(),
    ))
}

fn entries_of(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = arg(args, 0);
    require_object(&target, "entries")?;
    Ok(Value::array(
        entries(&target)
            .into_iter()
            .map(|(key, value)| Value::array(vec![Value::String(key), value]))
            .collect(),
    ))
}

fn assign(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = arg(args, 0);
    let Value::Object(fields) = &target else {
        return Err(RuntimeError::type_error("Object.assign target must be an object"));
    };
    for source in args.iter().skip(1) {
        // Collect first: a source may be the target itself
        let copied = entries(source);
        let mut fields = fields.borrow_mut();
        for (key, value) in copied {
            fields.insert(key, value);
        }
    }
    Ok(target)
}

fn from_entries(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut fields = ObjectMap::new();
    for entry in iterate(&arg(args, 0))? {
        let pair = iterate(&entry)?;
        let key = pair.first().cloned().unwrap_or_default().to_display_string();
        let value = pair.get(1).cloned().unwrap_or_default();
        fields.insert(key, value);
    }
    Ok(Value::object(fields))
}

pub fn object_constructor() -> Value {
    native_constructor(
        "Object",
        statics(vec![
            ("keys", Value::native("keys", keys)),
            ("values", Value::native("values", values)),
            ("entries", Value::native("entries", entries_of)),
            ("assign", Value::native("assign", assign)),
            ("fromEntries", Value::native("fromEntries", from_entries)),
            // Values are not frozen; the call only returns its argument
            (
                "freeze",
                Value::native("freeze", |_, _, args| Ok(arg(args, 0))),
            ),
        ]),
        native_fn(|_, _, args| match arg(args, 0) {
            Value::Undefined | Value::Null => Ok(Value::object(ObjectMap::new())),
            other => Ok(other),
        }),
    )
}
