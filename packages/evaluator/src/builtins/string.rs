//! String built-ins. Indices count `char`s, not UTF-16 code units.

use super::{arg, native_constructor, native_fn, statics};
use crate::interpreter::{Interpreter, RuntimeError};
use crate::value::Value;

const METHODS: &[&str] = &[
    "toUpperCase", "toLowerCase", "trim", "trimStart", "trimEnd", "split", "slice", "substring",
    "substr", "indexOf", "lastIndexOf", "includes", "startsWith", "endsWith", "replace",
    "replaceAll", "charAt", "charCodeAt", "padStart", "padEnd", "repeat", "concat", "at",
    "toString", "localeCompare",
];

pub fn method(key: &str) -> Option<Value> {
    let name = *METHODS.iter().find(|name| **name == key)?;
    Some(Value::native(name, move |interp, this, args| {
        call_method(interp, name, this, args)
    }))
}

pub fn string_constructor() -> Value {
    native_constructor(
        "String",
        statics(vec![(
            "fromCharCode",
            Value::native("fromCharCode", |_, _, args| {
                let text: String = args
                    .iter()
                    .filter_map(|code| char::from_u32(code.to_number() as u32))
                    .collect();
                Ok(Value::String(text))
            }),
        )]),
        native_fn(|_, _, args| {
            Ok(Value::String(match args.first() {
                None => String::new(),
                Some(value) => value.to_display_string(),
            }))
        }),
    )
}

fn clamp_index(value: &Value, length: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() || n < 0.0 {
        0
    } else {
        (n as usize).min(length)
    }
}

fn relative_index(value: &Value, length: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    if n < 0.0 {
        (length as f64 + n.trunc()).max(0.0) as usize
    } else {
        (n as usize).min(length)
    }
}

fn char_slice(chars: &[char], start: usize, end: usize) -> String {
    if start >= end {
        String::new()
    } else {
        chars[start..end].iter().collect()
    }
}

fn char_position(chars: &[char], needle: &[char], from: usize, reverse: bool) -> Option<usize> {
    if needle.is_empty() {
        return Some(if reverse { chars.len() } else { from.min(chars.len()) });
    }
    if needle.len() > chars.len() {
        return None;
    }
    let last_start = chars.len() - needle.len();
    if reverse {
        (0..=last_start.min(from)).rev().find(|&i| chars[i..i + needle.len()] == *needle)
    } else {
        (from..=last_start).find(|&i| chars[i..i + needle.len()] == *needle)
    }
}

fn pad(text: &str, args: &[Value], at_start: bool) -> String {
    let target = arg(args, 0).to_number();
    let filler = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        other => other.to_display_string(),
    };
    let current = text.chars().count();
    if !target.is_finite() || target as usize <= current || filler.is_empty() {
        return text.to_string();
    }
    let padding: String = filler.chars().cycle().take(target as usize - current).collect();
    if at_start {
        padding + text
    } else {
        text.to_string() + &padding
    }
}

fn replace(
    interp: &Interpreter,
    text: &str,
    args: &[Value],
    all: bool,
) -> Result<Value, RuntimeError> {
    let pattern = arg(args, 0).to_display_string();
    let replacement = arg(args, 1);
    let mut out = String::new();
    let mut rest = text;
    let mut offset = 0;

    loop {
        let found = if pattern.is_empty() && offset > 0 {
            None
        } else {
            rest.find(&pattern)
        };
        let Some(position) = found else {
            break;
        };
        out.push_str(&rest[..position]);
        let substitute = if replacement.is_function() {
            let index = text[..offset + position].chars().count();
            interp
                .call(
                    &replacement,
                    &Value::Undefined,
                    &[Value::string(pattern.as_str()), Value::from(index as i64)],
                )?
                .to_display_string()
        } else {
            replacement.to_display_string()
        };
        out.push_str(&substitute);
        rest = &rest[position + pattern.len()..];
        offset += position + pattern.len();
        if !all || pattern.is_empty() {
            break;
        }
    }
    out.push_str(rest);
    Ok(Value::String(out))
}

pub fn call_method(
    interp: &Interpreter,
    name: &str,
    target: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let Value::String(text) = target else {
        return Err(RuntimeError::type_error(format!(
            "String.prototype.{} called on {}",
            name,
            target.to_display_string()
        )));
    };
    let chars: Vec<char> = text.chars().collect();
    let length = chars.len();

    let value = match name {
        "toUpperCase" => Value::String(text.to_uppercase()),
        "toLowerCase" => Value::String(text.to_lowercase()),
        "trim" => Value::string(text.trim()),
        "trimStart" => Value::string(text.trim_start()),
        "trimEnd" => Value::string(text.trim_end()),
        "toString" => target.clone(),
        "split" => {
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => vec![target.clone()],
                separator => {
                    let separator = separator.to_display_string();
                    if separator.is_empty() {
                        chars.iter().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        text.split(separator.as_str()).map(Value::string).collect()
                    }
                }
            };
            let limit = match arg(args, 1) {
                Value::Undefined => parts.len(),
                other => other.to_number().max(0.0) as usize,
            };
            Value::array(parts.into_iter().take(limit).collect())
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), length, 0);
            let end = relative_index(&arg(args, 1), length, length);
            Value::String(char_slice(&chars, start, end))
        }
        "substring" => {
            let start = clamp_index(&arg(args, 0), length, 0);
            let end = clamp_index(&arg(args, 1), length, length);
            Value::String(char_slice(&chars, start.min(end), start.max(end)))
        }
        "substr" => {
            let start = relative_index(&arg(args, 0), length, 0);
            let count = match arg(args, 1) {
                Value::Undefined => length,
                other => other.to_number().max(0.0) as usize,
            };
            Value::String(char_slice(&chars, start, (start + count).min(length)))
        }
        "indexOf" | "includes" => {
            let needle: Vec<char> = arg(args, 0).to_display_string().chars().collect();
            let from = clamp_index(&arg(args, 1), length, 0);
            let position = char_position(&chars, &needle, from, false);
            if name == "includes" {
                Value::Boolean(position.is_some())
            } else {
                Value::Number(position.map(|p| p as f64).unwrap_or(-1.0))
            }
        }
        "lastIndexOf" => {
            let needle: Vec<char> = arg(args, 0).to_display_string().chars().collect();
            let from = clamp_index(&arg(args, 1), length, length);
            let position = char_position(&chars, &needle, from, true);
            Value::Number(position.map(|p| p as f64).unwrap_or(-1.0))
        }
        "startsWith" => {
            let prefix = arg(args, 0).to_display_string();
            let from = clamp_index(&arg(args, 1), length, 0);
            Value::Boolean(char_slice(&chars, from, length).starts_with(&prefix))
        }
        "endsWith" => {
            let suffix = arg(args, 0).to_display_string();
            let end = clamp_index(&arg(args, 1), length, length);
            Value::Boolean(char_slice(&chars, 0, end).ends_with(&suffix))
        }
        "replace" => return replace(interp, text, args, false),
        "replaceAll" => return replace(interp, text, args, true),
        "charAt" | "at" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index.trunc() };
            let resolved = if name == "at" && index < 0.0 {
                length as f64 + index
            } else {
                index
            };
            let found = if resolved >= 0.0 {
                chars.get(resolved as usize)
            } else {
                None
            };
            match (found, name) {
                (Some(c), _) => Value::String(c.to_string()),
                (None, "at") => Value::Undefined,
                (None, _) => Value::string(""),
            }
        }
        "charCodeAt" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index };
            if index < 0.0 {
                Value::Number(f64::NAN)
            } else {
                chars
                    .get(index as usize)
                    .map(|c| Value::Number(*c as u32 as f64))
                    .unwrap_or(Value::Number(f64::NAN))
            }
        }
        "padStart" => Value::String(pad(text, args, true)),
        "padEnd" => Value::String(pad(text, args, false)),
        "repeat" => {
            let count = arg(args, 0).to_number();
            if count < 0.0 || !count.is_finite() {
                return Err(RuntimeError::type_error(format!("Invalid count value: {}", count)));
            }
            Value::String(text.repeat(count as usize))
        }
        "concat" => {
            let mut out = text.clone();
            for value in args {
                out.push_str(&value.to_display_string());
            }
            Value::String(out)
        }
        "localeCompare" => {
            let other = arg(args, 0).to_display_string();
            Value::Number(match text.as_str().cmp(other.as_str()) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            })
        }
        other => {
            return Err(RuntimeError::type_error(format!(
                "String.prototype.{} is not supported",
                other
            )))
        }
    };
    Ok(value)
}
