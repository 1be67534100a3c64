use super::{arg, native_constructor, native_fn, statics};
use crate::interpreter::{Interpreter, RuntimeError};
use crate::value::{format_number, Value};
use regex::Regex;
use std::sync::LazyLock;

/// Longest leading decimal literal, as `parseFloat` accepts it
static FLOAT_PREFIX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(Infinity|[0-9]+\.?[0-9]*([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?)").ok()
});

const METHODS: &[&str] = &["toFixed", "toString", "toLocaleString", "toPrecision", "valueOf"];

pub fn method(key: &str) -> Option<Value> {
    let name = *METHODS.iter().find(|name| **name == key)?;
    Some(Value::native(name, move |_, this, args| call_method(name, this, args)))
}

pub fn number_constructor() -> Value {
    native_constructor(
        "Number",
        statics(vec![
            (
                "isInteger",
                Value::native("isInteger", |_, _, args| {
                    Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_finite() && n.fract() == 0.0)))
                }),
            ),
            (
                "isFinite",
                Value::native("isFinite", |_, _, args| {
                    Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
                }),
            ),
            (
                "isNaN",
                Value::native("isNaN", |_, _, args| {
                    Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
                }),
            ),
            ("parseFloat", Value::native("parseFloat", parse_float)),
            ("parseInt", Value::native("parseInt", parse_int)),
            ("MAX_SAFE_INTEGER", Value::Number(9_007_199_254_740_991.0)),
            ("MIN_SAFE_INTEGER", Value::Number(-9_007_199_254_740_991.0)),
            ("EPSILON", Value::Number(f64::EPSILON)),
            ("MAX_VALUE", Value::Number(f64::MAX)),
            ("POSITIVE_INFINITY", Value::Number(f64::INFINITY)),
            ("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY)),
            ("NaN", Value::Number(f64::NAN)),
        ]),
        native_fn(|_, _, args| {
            Ok(Value::Number(match args.first() {
                None => 0.0,
                Some(value) => value.to_number(),
            }))
        }),
    )
}

pub fn parse_float(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = arg(args, 0).to_display_string();
    let trimmed = text.trim_start();
    let parsed = FLOAT_PREFIX
        .as_ref()
        .and_then(|regex| regex.find(trimmed))
        .map(|found| {
            let literal = found.as_str();
            match literal.trim_start_matches('+') {
                "Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                number => number.parse::<f64>().unwrap_or(f64::NAN),
            }
        })
        .unwrap_or(f64::NAN);
    Ok(Value::Number(parsed))
}

pub fn parse_int(_: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = arg(args, 0).to_display_string();
    let mut rest = text.trim_start();
    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut radix = match arg(args, 1) {
        Value::Undefined => 0,
        other => other.to_number() as u32,
    };
    if radix != 0 && !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }
    if radix == 0 || radix == 16 {
        if let Some(stripped) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = stripped;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }

    let digits: Vec<u32> = rest.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return Ok(Value::Number(f64::NAN));
    }
    let value = digits
        .iter()
        .fold(0.0, |acc, digit| acc * radix as f64 + *digit as f64);
    Ok(Value::Number(sign * value))
}

/// `toLocaleString` for the en-US locale: grouping, at most 3 decimals
pub fn locale_string(n: f64) -> String {
    if !n.is_finite() {
        return format_number(n);
    }
    let rounded = format!("{:.3}", n.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::new();
    for (index, c) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if n < 0.0 && (whole != "0" || !fraction.is_empty()) {
        "-"
    } else {
        ""
    };
    if fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, fraction)
    }
}

fn call_method(name: &str, target: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Number(n) = target else {
        return Err(RuntimeError::type_error(format!(
            "Number.prototype.{} called on {}",
            name,
            target.to_display_string()
        )));
    };
    let n = *n;

    let value = match name {
        "valueOf" => Value::Number(n),
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits };
            if !(0.0..=100.0).contains(&digits) {
                return Err(RuntimeError::type_error("toFixed() digits argument must be between 0 and 100"));
            }
            if !n.is_finite() {
                Value::String(format_number(n))
            } else {
                Value::String(format!("{:.*}", digits as usize, n))
            }
        }
        "toPrecision" => match arg(args, 0) {
            Value::Undefined => Value::String(format_number(n)),
            precision => {
                let precision = precision.to_number().clamp(1.0, 100.0) as usize;
                if n == 0.0 || !n.is_finite() {
                    Value::String(format_number(n))
                } else {
                    let magnitude = n.abs().log10().floor() as i64;
                    let decimals = (precision as i64 - 1 - magnitude).max(0) as usize;
                    Value::String(format!("{:.*}", decimals, n))
                }
            }
        },
        "toLocaleString" => Value::String(locale_string(n)),
        "toString" => match arg(args, 0) {
            Value::Undefined => Value::String(format_number(n)),
            radix => {
                let radix = radix.to_number() as u32;
                if !(2..=36).contains(&radix) {
                    return Err(RuntimeError::type_error("toString() radix must be between 2 and 36"));
                }
                Value::String(integer_to_radix(n, radix))
            }
        },
        other => {
            return Err(RuntimeError::type_error(format!(
                "Number.prototype.{} is not supported",
                other
            )))
        }
    };
    Ok(value)
}

/// Integer part of `n` in `radix`; fractions are dropped
fn integer_to_radix(n: f64, radix: u32) -> String {
    if !n.is_finite() {
        return format_number(n);
    }
    let mut whole = n.abs().trunc() as u64;
    if whole == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while whole > 0 {
        let digit = (whole % radix as u64) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        whole /= radix as u64;
    }
    if n < 0.0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}
