use super::{arg, error_object};
use crate::interpreter::{Interpreter, RuntimeError};
use crate::value::{ObjectMap, Value};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

pub fn json_object() -> Value {
    let mut fields = ObjectMap::new();
    fields.insert("stringify".into(), Value::native("stringify", stringify));
    fields.insert("parse".into(), Value::native("parse", parse));
    Value::object(fields)
}

/// `JSON.stringify(value, replacer?, indent?)`; replacers are ignored
fn stringify(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let value = arg(args, 0);
    if matches!(value, Value::Undefined | Value::Function(_)) {
        return Ok(Value::Undefined);
    }
    let json = value.to_json();

    let indent = match arg(args, 2) {
        Value::Number(n) if n >= 1.0 => " ".repeat((n as usize).min(10)),
        Value::String(text) => text.chars().take(10).collect(),
        _ => String::new(),
    };

    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let written = {
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut out, formatter);
            json.serialize(&mut serializer)
        };
        written.map(|_| String::from_utf8_lossy(&out).into_owned())
    };

    text.map(Value::String)
        .map_err(|err| RuntimeError::type_error(err.to_string()))
}

fn parse(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = arg(args, 0).to_display_string();
    serde_json::from_str::<serde_json::Value>(&text)
        .map(|json| Value::from_json(&json))
        .map_err(|err| RuntimeError::Thrown(error_object("SyntaxError", &err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: fn(&Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError>, args: &[Value]) -> Result<Value, RuntimeError> {
        f(&Interpreter::new(), &Value::Undefined, args)
    }

    #[test]
    fn test_stringify_compact_and_pretty() {
        let value = Value::from_json(&serde_json::json!({ "a": [1, 2], "b": "x" }));
        assert_eq!(
            call(stringify, &[value.clone()]).unwrap(),
            Value::string(r#"{"a":[1,2],"b":"x"}"#)
        );
        let pretty = call(stringify, &[value, Value::Null, Value::Number(2.0)]).unwrap();
        assert!(pretty.as_str().unwrap().contains("\n  \"a\""));
    }

    #[test]
    fn test_stringify_undefined() {
        assert!(call(stringify, &[Value::Undefined]).unwrap().is_undefined());
    }

    #[test]
    fn test_parse() {
        let parsed = call(parse, &[Value::string(r#"{"n": 1.5, "list": [true]}"#)]).unwrap();
        assert_eq!(parsed.get_own("n"), Value::Number(1.5));
        let err = call(parse, &[Value::string("{oops")]).unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }
}
