//! Dotted-path lookup for `$bind` and `${...}`.

use crate::value::Value;

/// Resolve `a.b.0.c` against `context`.
///
/// Numeric segments index arrays and strings, `length` works on both, and
/// anything unreachable is `undefined`.
pub fn resolve_path(path: &str, context: &Value) -> Value {
    let path = path.trim();
    if path.is_empty() {
        return Value::Undefined;
    }

    let mut current = context.clone();
    for segment in path.split('.') {
        if current.is_primitive() && !matches!(current, Value::String(_)) {
            return Value::Undefined;
        }
        current = current.get_own(segment.trim());
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Value {
        Value::from_json(&json!({
            "user": { "name": "Ada", "tags": ["a", "b"] },
            "items": [{ "title": "first" }, { "title": "second" }],
            "empty": null
        }))
    }

    #[test]
    fn test_nested_paths() {
        assert_eq!(resolve_path("user.name", &ctx()), Value::string("Ada"));
        assert_eq!(resolve_path("items.1.title", &ctx()), Value::string("second"));
        assert_eq!(resolve_path("user.tags.length", &ctx()), Value::Number(2.0));
        assert_eq!(resolve_path("user.name.0", &ctx()), Value::string("A"));
    }

    #[test]
    fn test_unreachable_is_undefined() {
        assert!(resolve_path("missing.deeper", &ctx()).is_undefined());
        assert!(resolve_path("empty.value", &ctx()).is_undefined());
        assert!(resolve_path("items.5.title", &ctx()).is_undefined());
        assert!(resolve_path("user.tags.length.x", &ctx()).is_undefined());
        assert!(resolve_path("", &ctx()).is_undefined());
    }

    #[test]
    fn test_same_input_same_output() {
        let context = ctx();
        assert_eq!(
            resolve_path("items.0.title", &context),
            resolve_path("items.0.title", &context)
        );
    }
}
