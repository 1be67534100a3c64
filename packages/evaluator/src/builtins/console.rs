//! `console` and `window` for method bodies. Output goes to `tracing`
//! under the `genui::console` target.

use crate::value::{ObjectMap, Value};
use tracing::{debug, error, info, warn};

/// Space-joined message the way `console.log` prints its arguments
pub fn format_args(args: &[Value]) -> String {
    args.iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            Value::Array(_) | Value::Object(_) => value.to_json().to_string(),
            other => other.to_display_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn console_object() -> Value {
    let mut fields = ObjectMap::new();
    for name in ["log", "info"] {
        fields.insert(
            name.into(),
            Value::native(name, |_, _, args| {
                info!(target: "genui::console", "{}", format_args(args));
                Ok(Value::Undefined)
            }),
        );
    }
    fields.insert(
        "debug".into(),
        Value::native("debug", |_, _, args| {
            debug!(target: "genui::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    fields.insert(
        "warn".into(),
        Value::native("warn", |_, _, args| {
            warn!(target: "genui::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    fields.insert(
        "error".into(),
        Value::native("error", |_, _, args| {
            error!(target: "genui::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    Value::object(fields)
}

/// Only `alert` is provided; it is logged rather than shown
pub fn window_object() -> Value {
    let mut fields = ObjectMap::new();
    fields.insert(
        "alert".into(),
        Value::native("alert", |_, _, args| {
            warn!(target: "genui::console", alert = %format_args(args), "window.alert");
            Ok(Value::Undefined)
        }),
    );
    Value::object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_args() {
        let object = Value::from_json(&serde_json::json!({ "a": 1 }));
        let message = format_args(&[Value::string("count"), Value::Number(2.0), object, Value::Undefined]);
        assert_eq!(message, r#"count 2 {"a":1} undefined"#);
    }

    #[test]
    fn test_window_has_no_location() {
        let window = window_object();
        assert!(window.get_own("location").is_undefined());
        assert!(window.get_own("alert").is_function());
    }
}
