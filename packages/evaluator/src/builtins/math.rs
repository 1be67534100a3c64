use super::arg;
use crate::value::{ObjectMap, Value};
use std::cell::Cell;
use std::f64::consts;
use std::time::{SystemTime, UNIX_EPOCH};

thread_local! {
    static RANDOM_STATE: Cell<u64> = Cell::new(seed());
}

fn seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0x2545_f491_4f6c_dd1d);
    nanos | 1
}

/// xorshift64*; not for anything security related
fn next_random() -> f64 {
    RANDOM_STATE.with(|state| {
        let mut x = state.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        state.set(x);
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    })
}

fn unary(name: &'static str, op: fn(f64) -> f64) -> (String, Value) {
    (
        name.to_string(),
        Value::native(name, move |_, _, args| Ok(Value::Number(op(arg(args, 0).to_number())))),
    )
}

/// JavaScript rounds halves toward +Infinity
fn round(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    (n + 0.5).floor()
}

fn sign(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        n
    } else {
        n.signum()
    }
}

fn extremum(args: &[Value], initial: f64, pick: fn(f64, f64) -> f64) -> Value {
    let mut result = initial;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Value::Number(f64::NAN);
        }
        result = pick(result, n);
    }
    Value::Number(result)
}

pub fn math_object() -> Value {
    let mut fields: ObjectMap = [
        unary("abs", f64::abs),
        unary("ceil", f64::ceil),
        unary("floor", f64::floor),
        unary("round", round),
        unary("trunc", f64::trunc),
        unary("sign", sign),
        unary("sqrt", f64::sqrt),
        unary("cbrt", f64::cbrt),
        unary("exp", f64::exp),
        unary("log", f64::ln),
        unary("log10", f64::log10),
        unary("log2", f64::log2),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        unary("tan", f64::tan),
        unary("atan", f64::atan),
    ]
    .into_iter()
    .collect();

    fields.insert(
        "pow".into(),
        Value::native("pow", |_, _, args| {
            Ok(Value::Number(arg(args, 0).to_number().powf(arg(args, 1).to_number())))
        }),
    );
    fields.insert(
        "atan2".into(),
        Value::native("atan2", |_, _, args| {
            Ok(Value::Number(arg(args, 0).to_number().atan2(arg(args, 1).to_number())))
        }),
    );
    fields.insert(
        "hypot".into(),
        Value::native("hypot", |_, _, args| {
            let sum: f64 = args.iter().map(|v| v.to_number().powi(2)).sum();
            Ok(Value::Number(sum.sqrt()))
        }),
    );
    fields.insert(
        "min".into(),
        Value::native("min", |_, _, args| Ok(extremum(args, f64::INFINITY, f64::min))),
    );
    fields.insert(
        "max".into(),
        Value::native("max", |_, _, args| {
            Ok(extremum(args, f64::NEG_INFINITY, f64::max))
        }),
    );
    fields.insert(
        "random".into(),
        Value::native("random", |_, _, _| Ok(Value::Number(next_random()))),
    );

    for (name, constant) in [
        ("PI", consts::PI),
        ("E", consts::E),
        ("LN2", consts::LN_2),
        ("LN10", consts::LN_10),
        ("LOG2E", consts::LOG2_E),
        ("LOG10E", consts::LOG10_E),
        ("SQRT2", consts::SQRT_2),
    ] {
        fields.insert(name.into(), Value::Number(constant));
    }

    Value::object(fields)
}
