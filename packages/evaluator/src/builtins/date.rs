//! `Date` backed by chrono. All calendar fields are UTC; rendering must not
//! depend on the host time zone.

use super::{arg, error_object, native_fn, statics};
use crate::interpreter::RuntimeError;
use crate::value::{date_time, iso_string, Function, Value};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::rc::Rc;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Largest absolute time value a date can hold
const MAX_TIME: f64 = 8.64e15;

const METHODS: &[&str] = &[
    "getTime", "valueOf", "getFullYear", "getMonth", "getDate", "getDay", "getHours",
    "getMinutes", "getSeconds", "getMilliseconds", "getUTCFullYear", "getUTCMonth", "getUTCDate",
    "getUTCDay", "getUTCHours", "getUTCMinutes", "getUTCSeconds", "getTimezoneOffset",
    "toISOString", "toJSON", "toString", "toDateString", "toTimeString", "toUTCString",
    "toLocaleDateString", "toLocaleTimeString", "toLocaleString", "setTime", "setFullYear",
    "setMonth", "setDate", "setHours", "setMinutes", "setSeconds", "setMilliseconds",
];

pub fn method(key: &str) -> Option<Value> {
    let name = *METHODS.iter().find(|name| **name == key)?;
    Some(Value::native(name, move |_, this, args| call_method(name, this, args)))
}

pub fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}

pub fn date_constructor() -> Value {
    Value::Function(Rc::new(Function::Native {
        name: "Date".to_string(),
        // Called without `new`, Date returns the current time as a string
        call: native_fn(|_, _, _| {
            Ok(Value::String(Value::date(now_millis()).to_display_string()))
        }),
        construct: Some(native_fn(|_, _, args| Ok(Value::date(time_from_args(args))))),
        statics: statics(vec![
            (
                "now",
                Value::native("now", |_, _, _| Ok(Value::Number(now_millis()))),
            ),
            (
                "parse",
                Value::native("parse", |_, _, args| {
                    Ok(Value::Number(parse_date(&arg(args, 0).to_display_string())))
                }),
            ),
            (
                "UTC",
                Value::native("UTC", |_, _, args| Ok(Value::Number(time_from_fields(args)))),
            ),
        ]),
    }))
}

fn time_from_args(args: &[Value]) -> f64 {
    match args {
        [] => now_millis(),
        [Value::Date(millis)] => millis.get(),
        [Value::String(text)] => parse_date(text),
        [single] => time_clip(single.to_number()),
        fields => time_from_fields(fields),
    }
}

/// `(year, month0, day = 1, hours = 0, minutes = 0, seconds = 0, ms = 0)`
fn time_from_fields(args: &[Value]) -> f64 {
    let field = |index: usize, default: f64| match args.get(index) {
        None | Some(Value::Undefined) => default,
        Some(value) => value.to_number(),
    };
    let mut year = field(0, f64::NAN);
    if (0.0..=99.0).contains(&year) && year.fract() == 0.0 {
        year += 1900.0;
    }
    make_time(
        year,
        field(1, 0.0),
        field(2, 1.0),
        field(3, 0.0),
        field(4, 0.0),
        field(5, 0.0),
        field(6, 0.0),
    )
}

fn time_clip(millis: f64) -> f64 {
    if !millis.is_finite() || millis.abs() > MAX_TIME {
        f64::NAN
    } else {
        millis.trunc()
    }
}

/// Days from 1970-01-01 to the given civil date (proleptic Gregorian)
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month_index = (month + 9) % 12;
    let day_of_year = (153 * month_index + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Build a time value; out-of-range fields carry over like `Date.UTC` does
fn make_time(year: f64, month: f64, day: f64, hours: f64, minutes: f64, seconds: f64, millis: f64) -> f64 {
    let fields = [year, month, day, hours, minutes, seconds, millis];
    if fields.iter().any(|field| !field.is_finite()) {
        return f64::NAN;
    }
    let month = month.trunc();
    let year = year.trunc() + (month / 12.0).floor();
    let month = month.rem_euclid(12.0);
    let days = days_from_civil(year as i64, month as i64 + 1, 1) as f64 + day.trunc() - 1.0;
    let time = hours.trunc() * 3_600_000.0 + minutes.trunc() * 60_000.0 + seconds.trunc() * 1000.0 + millis.trunc();
    time_clip(days * MILLIS_PER_DAY + time)
}

pub fn parse_date(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return time.timestamp_millis() as f64;
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(time) = NaiveDateTime::parse_from_str(text, format) {
            return time.and_utc().timestamp_millis() as f64;
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|time| time.and_utc().timestamp_millis() as f64)
            .unwrap_or(f64::NAN);
    }
    if let Ok(time) = DateTime::parse_from_rfc2822(text) {
        return time.timestamp_millis() as f64;
    }
    f64::NAN
}

/// `[year, month0, day, hours, minutes, seconds, millis]`
fn fields_of(time: &DateTime<Utc>) -> [f64; 7] {
    [
        time.year() as f64,
        time.month0() as f64,
        time.day() as f64,
        time.hour() as f64,
        time.minute() as f64,
        time.second() as f64,
        time.timestamp_subsec_millis() as f64,
    ]
}

/// Setter writing `args` into the fields starting at `first`
fn set_fields(cell: &std::cell::Cell<f64>, first: usize, args: &[Value]) -> Value {
    let Some(time) = date_time(cell.get()) else {
        return Value::Number(f64::NAN);
    };
    let mut fields = fields_of(&time);
    let count = args.len().clamp(1, fields.len() - first);
    for offset in 0..count {
        fields[first + offset] = arg(args, offset).to_number();
    }
    let [year, month, day, hours, minutes, seconds, millis] = fields;
    let updated = make_time(year, month, day, hours, minutes, seconds, millis);
    cell.set(updated);
    Value::Number(updated)
}

fn format(time: Option<DateTime<Utc>>, pattern: &str) -> Value {
    match time {
        Some(time) => Value::String(time.format(pattern).to_string()),
        None => Value::string("Invalid Date"),
    }
}

fn call_method(name: &str, target: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Date(cell) = target else {
        return Err(RuntimeError::type_error(format!(
            "Date.prototype.{} called on {}",
            name,
            target.to_display_string()
        )));
    };
    let millis = cell.get();
    let time = date_time(millis);
    let field = |index: usize| {
        Value::Number(time.as_ref().map(|t| fields_of(t)[index]).unwrap_or(f64::NAN))
    };

    let value = match name {
        "getTime" | "valueOf" => Value::Number(millis),
        "getFullYear" | "getUTCFullYear" => field(0),
        "getMonth" | "getUTCMonth" => field(1),
        "getDate" | "getUTCDate" => field(2),
        "getHours" | "getUTCHours" => field(3),
        "getMinutes" | "getUTCMinutes" => field(4),
        "getSeconds" | "getUTCSeconds" => field(5),
        "getMilliseconds" => field(6),
        "getDay" | "getUTCDay" => Value::Number(
            time.map(|t| t.weekday().num_days_from_sunday() as f64)
                .unwrap_or(f64::NAN),
        ),
        "getTimezoneOffset" => Value::Number(0.0),
        "toISOString" => match time {
            Some(time) => Value::String(iso_string(&time)),
            None => {
                return Err(RuntimeError::Thrown(error_object(
                    "RangeError",
                    "Invalid time value",
                )))
            }
        },
        "toJSON" => time
            .map(|time| Value::String(iso_string(&time)))
            .unwrap_or(Value::Null),
        "toString" => Value::String(target.to_display_string()),
        "toDateString" => format(time, "%a %b %d %Y"),
        "toTimeString" => format(time, "%H:%M:%S GMT+0000 (Coordinated Universal Time)"),
        "toUTCString" => format(time, "%a, %d %b %Y %H:%M:%S GMT"),
        "toLocaleDateString" => format(time, "%-m/%-d/%Y"),
        "toLocaleTimeString" => format(time, "%-I:%M:%S %p"),
        "toLocaleString" => format(time, "%-m/%-d/%Y, %-I:%M:%S %p"),
        "setTime" => {
            let updated = time_clip(arg(args, 0).to_number());
            cell.set(updated);
            Value::Number(updated)
        }
        "setFullYear" => set_fields(cell, 0, args),
        "setMonth" => set_fields(cell, 1, args),
        "setDate" => set_fields(cell, 2, args),
        "setHours" => set_fields(cell, 3, args),
        "setMinutes" => set_fields(cell, 4, args),
        "setSeconds" => set_fields(cell, 5, args),
        "setMilliseconds" => set_fields(cell, 6, args),
        other => {
            return Err(RuntimeError::type_error(format!(
                "Date.prototype.{} is not supported",
                other
            )))
        }
    };
    Ok(value)
}
