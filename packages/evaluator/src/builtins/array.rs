use super::{arg, native_constructor, native_fn, statics};
use crate::interpreter::{array_length, iterate, Interpreter, RuntimeError};
use crate::value::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

const METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "slice", "splice", "concat", "join", "reverse", "indexOf",
    "lastIndexOf", "includes", "map", "filter", "reduce", "forEach", "find", "findIndex", "some",
    "every", "sort", "flat", "flatMap", "fill", "at", "toString",
];

pub fn method(key: &str) -> Option<Value> {
    let name = *METHODS.iter().find(|name| **name == key)?;
    Some(Value::native(name, move |interp, this, args| {
        call_method(interp, name, this, args)
    }))
}

pub fn array_constructor() -> Value {
    let create = native_fn(|_, _, args| match args {
        [Value::Number(length)] => Ok(Value::array(vec![Value::Undefined; array_length(*length)?])),
        items => Ok(Value::array(items.to_vec())),
    });

    native_constructor(
        "Array",
        statics(vec![
            (
                "isArray",
                Value::native("isArray", |_, _, args| {
                    Ok(Value::Boolean(matches!(arg(args, 0), Value::Array(_))))
                }),
            ),
            (
                "of",
                Value::native("of", |_, _, args| Ok(Value::array(args.to_vec()))),
            ),
            ("from", Value::native("from", array_from)),
        ]),
        create,
    )
}

/// `Array.from(iterable | { length }, mapFn?)`
fn array_from(interp: &Interpreter, _: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let source = arg(args, 0);
    let items = match &source {
        Value::Object(fields) => {
            let length = fields
                .borrow()
                .get("length")
                .map(Value::to_number)
                .unwrap_or(0.0);
            let length = if length > 0.0 {
                array_length(length.trunc())?
            } else {
                0
            };
            (0..length)
                .map(|index| source.get_own(&index.to_string()))
                .collect()
        }
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error("Array.from requires an array-like"))
        }
        other => iterate(other)?,
    };

    match args.get(1) {
        Some(mapper) if mapper.is_function() => {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                mapped.push(interp.call(mapper, &Value::Undefined, &[item, Value::from(index as i64)])?);
            }
            Ok(Value::array(mapped))
        }
        _ => Ok(Value::array(items)),
    }
}

/// Resolve a relative index argument against `length`
fn relative_index(value: &Value, length: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (length as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(length)
    }
}

fn callback(args: &[Value], name: &str) -> Result<Value, RuntimeError> {
    let callback = arg(args, 0);
    if !callback.is_function() {
        return Err(RuntimeError::type_error(format!(
            "{} is not a function (in Array.{})",
            callback.to_display_string(),
            name
        )));
    }
    Ok(callback)
}

/// Run an array method with `this` bound to `target`
pub fn call_method(
    interp: &Interpreter,
    name: &str,
    target: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let Value::Array(items) = target else {
        return Err(RuntimeError::type_error(format!(
            "Array.prototype.{} called on {}",
            name,
            target.to_display_string()
        )));
    };

    match name {
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Ok(Value::from(items.len() as i64))
        }
        "pop" => Ok(items.borrow_mut().pop().unwrap_or_default()),
        "shift" => {
            let mut items = items.borrow_mut();
            if items.is_empty() {
                Ok(Value::Undefined)
            } else {
                Ok(items.remove(0))
            }
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            for (offset, value) in args.iter().enumerate() {
                items.insert(offset, value.clone());
            }
            Ok(Value::from(items.len() as i64))
        }
        "slice" => {
            let items = items.borrow();
            let start = relative_index(&arg(args, 0), items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len());
            Ok(Value::array(if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }
        "splice" => {
            let mut items = items.borrow_mut();
            let length = items.len();
            let start = relative_index(&arg(args, 0), length, 0);
            let delete_count = match args.get(1) {
                None => length - start,
                Some(count) => {
                    let count = count.to_number();
                    if count.is_nan() || count < 0.0 {
                        0
                    } else {
                        (count as usize).min(length - start)
                    }
                }
            };
            let inserted = args.iter().skip(2).cloned();
            let removed: Vec<Value> = items.splice(start..start + delete_count, inserted).collect();
            Ok(Value::array(removed))
        }
        "concat" => {
            let mut result = items.borrow().clone();
            for value in args {
                match value {
                    Value::Array(other) => result.extend(other.borrow().iter().cloned()),
                    other => result.push(other.clone()),
                }
            }
            Ok(Value::array(result))
        }
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_display_string(),
            };
            Ok(Value::String(Value::join(items, &separator)))
        }
        "toString" => Ok(Value::String(target.to_display_string())),
        "reverse" => {
            items.borrow_mut().reverse();
            Ok(target.clone())
        }
        "indexOf" | "lastIndexOf" | "includes" => {
            let needle = arg(args, 0);
            let items = items.borrow();
            let position = if name == "lastIndexOf" {
                items.iter().rposition(|item| item.strict_equals(&needle))
            } else if name == "includes" {
                // includes finds NaN
                items.iter().position(|item| {
                    item.strict_equals(&needle)
                        || matches!((item, &needle), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
                })
            } else {
                items.iter().position(|item| item.strict_equals(&needle))
            };
            if name == "includes" {
                Ok(Value::Boolean(position.is_some()))
            } else {
                Ok(Value::Number(position.map(|p| p as f64).unwrap_or(-1.0)))
            }
        }
        "at" => {
            let items = items.borrow();
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index.trunc() };
            let resolved = if index < 0.0 {
                items.len() as f64 + index
            } else {
                index
            };
            if resolved < 0.0 {
                return Ok(Value::Undefined);
            }
            Ok(items.get(resolved as usize).cloned().unwrap_or_default())
        }
        "fill" => {
            let mut items = items.borrow_mut();
            let length = items.len();
            let start = relative_index(&arg(args, 1), length, 0);
            let end = relative_index(&arg(args, 2), length, length);
            for slot in items.iter_mut().take(end).skip(start) {
                *slot = arg(args, 0);
            }
            Ok(target.clone())
        }
        "flat" => {
            let depth = match arg(args, 0) {
                Value::Undefined => 1.0,
                other => other.to_number(),
            };
            Ok(Value::array(flatten(items, depth, &mut Vec::new())?))
        }
        "sort" => {
            let comparator = arg(args, 0);
            let mut snapshot = items.borrow().clone();
            sort_values(interp, &mut snapshot, &comparator)?;
            *items.borrow_mut() = snapshot;
            Ok(target.clone())
        }
        _ => iterate_with_callback(interp, name, target, items, args),
    }
}

/// Methods that call back into script code. The array is snapshotted first
/// so callbacks can mutate it freely.
fn iterate_with_callback(
    interp: &Interpreter,
    name: &str,
    target: &Value,
    items: &Rc<RefCell<Vec<Value>>>,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let snapshot = items.borrow().clone();
    let call = |f: &Value, item: &Value, index: usize| {
        interp.call(
            f,
            &Value::Undefined,
            &[item.clone(), Value::from(index as i64), target.clone()],
        )
    };

    match name {
        "map" => {
            let f = callback(args, name)?;
            let mut mapped = Vec::with_capacity(snapshot.len());
            for (index, item) in snapshot.iter().enumerate() {
                mapped.push(call(&f, item, index)?);
            }
            Ok(Value::array(mapped))
        }
        "flatMap" => {
            let f = callback(args, name)?;
            let mut mapped = Vec::with_capacity(snapshot.len());
            for (index, item) in snapshot.iter().enumerate() {
                mapped.push(call(&f, item, index)?);
            }
            let mapped = Rc::new(RefCell::new(mapped));
            Ok(Value::array(flatten(&mapped, 1.0, &mut Vec::new())?))
        }
        "filter" => {
            let f = callback(args, name)?;
            let mut kept = Vec::new();
            for (index, item) in snapshot.iter().enumerate() {
                if call(&f, item, index)?.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Ok(Value::array(kept))
        }
        "forEach" => {
            let f = callback(args, name)?;
            for (index, item) in snapshot.iter().enumerate() {
                call(&f, item, index)?;
            }
            Ok(Value::Undefined)
        }
        "find" | "findIndex" => {
            let f = callback(args, name)?;
            for (index, item) in snapshot.iter().enumerate() {
                if call(&f, item, index)?.is_truthy() {
                    return Ok(if name == "find" {
                        item.clone()
                    } else {
                        Value::from(index as i64)
                    });
                }
            }
            Ok(if name == "find" {
                Value::Undefined
            } else {
                Value::Number(-1.0)
            })
        }
        "some" => {
            let f = callback(args, name)?;
            for (index, item) in snapshot.iter().enumerate() {
                if call(&f, item, index)?.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
            }
            Ok(Value::Boolean(false))
        }
        "every" => {
            let f = callback(args, name)?;
            for (index, item) in snapshot.iter().enumerate() {
                if !call(&f, item, index)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
            }
            Ok(Value::Boolean(true))
        }
        "reduce" => {
            let f = callback(args, name)?;
            let mut entries = snapshot.iter().enumerate();
            let mut accumulator = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match entries.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(RuntimeError::type_error(
                            "Reduce of empty array with no initial value",
                        ))
                    }
                },
            };
            for (index, item) in entries {
                accumulator = interp.call(
                    &f,
                    &Value::Undefined,
                    &[accumulator, item.clone(), Value::from(index as i64), target.clone()],
                )?;
            }
            Ok(accumulator)
        }
        other => Err(RuntimeError::type_error(format!(
            "Array.prototype.{} is not supported",
            other
        ))),
    }
}

/// Arrays on `visiting` are being flattened further up; reaching one again is a cycle
fn flatten(
    items: &Rc<RefCell<Vec<Value>>>,
    depth: f64,
    visiting: &mut Vec<*const RefCell<Vec<Value>>>,
) -> Result<Vec<Value>, RuntimeError> {
    let ptr = Rc::as_ptr(items);
    if visiting.contains(&ptr) {
        return Err(RuntimeError::range("Cannot flatten a cyclic array"));
    }
    visiting.push(ptr);
    let mut out = Vec::new();
    for item in items.borrow().iter() {
        match item {
            Value::Array(inner) if depth >= 1.0 => {
                out.extend(flatten(inner, depth - 1.0, visiting)?);
            }
            other => out.push(other.clone()),
        }
    }
    visiting.pop();
    Ok(out)
}

/// Stable sort; `undefined` always sorts last. Without a comparator values
/// compare as strings.
fn sort_values(interp: &Interpreter, values: &mut Vec<Value>, comparator: &Value) -> Result<(), RuntimeError> {
    let undefined_count = values.iter().filter(|v| v.is_undefined()).count();
    values.retain(|v| !v.is_undefined());

    let mut failure: Option<RuntimeError> = None;
    if comparator.is_function() {
        values.sort_by(|a, b| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            match interp.call(comparator, &Value::Undefined, &[a.clone(), b.clone()]) {
                Ok(result) => {
                    let n = result.to_number();
                    if n < 0.0 {
                        Ordering::Less
                    } else if n > 0.0 {
                        Ordering::Greater
                    } else {
                        Ordering::Equal
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    Ordering::Equal
                }
            }
        });
    } else {
        values.sort_by_key(|v| v.to_display_string());
    }

    if let Some(err) = failure {
        return Err(err);
    }
    values.extend(std::iter::repeat(Value::Undefined).take(undefined_count));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::builtins::install_method_globals;
    use crate::interpreter::{Completion, Interpreter, Scope};
    use crate::value::Value;
    use genui_parser::parse_program;

    fn run(source: &str) -> Value {
        let scope = Scope::new();
        install_method_globals(&scope);
        let program = parse_program(source).unwrap();
        match Interpreter::new().execute_block(&program, &scope).unwrap() {
            Completion::Return(value) => value,
            _ => Value::Undefined,
        }
    }

    #[test]
    fn test_map_filter_reduce_chain() {
        let value = run(
            "const items = [{ price: 5, qty: 2 }, { price: 1, qty: 0 }, { price: 3, qty: 1 }];
             return items.filter(i => i.qty > 0).map(i => i.price * i.qty).reduce((a, b) => a + b, 0);",
        );
        assert_eq!(value, Value::Number(13.0));
    }

    #[test]
    fn test_default_sort_is_lexicographic() {
        let value = run("return [10, 9, 1, undefined, 2].sort().join(',');");
        assert_eq!(value, Value::string("1,10,2,9,"));
    }

    #[test]
    fn test_sort_with_comparator_mutates_in_place() {
        let value = run("const a = [3, 1, 2]; a.sort((x, y) => y - x); return a.join('');");
        assert_eq!(value, Value::string("321"));
    }

    #[test]
    fn test_splice_and_slice() {
        let value = run(
            "const a = [1, 2, 3, 4, 5];
             const removed = a.splice(1, 2, 'x');
             return a.join('') + '|' + removed.join('') + '|' + a.slice(-2).join('');",
        );
        assert_eq!(value, Value::string("1x45|23|45"));
    }

    #[test]
    fn test_find_some_every_includes() {
        let value = run(
            "const a = [1, 2, 3];
             return [a.find(n => n > 1), a.findIndex(n => n > 5), a.some(n => n === 3), a.every(n => n > 0), a.includes(2), a.indexOf(9)].join(',');",
        );
        assert_eq!(value, Value::string("2,-1,true,true,true,-1"));
    }

    #[test]
    fn test_array_statics() {
        let value = run(
            "return [Array.isArray([]), Array.from({ length: 3 }, (_, i) => i * 2).join(''), Array.of(7).length, new Array(2).length].join(',');",
        );
        assert_eq!(value, Value::string("true,024,1,2"));
    }

    #[test]
    fn test_reduce_empty_without_initial_fails() {
        let scope = Scope::new();
        install_method_globals(&scope);
        let program = parse_program("[].reduce((a, b) => a + b);").unwrap();
        assert!(Interpreter::new().execute_block(&program, &scope).is_err());
    }

    #[test]
    fn test_flat_and_flat_map() {
        let value = run("return [[1, [2]], 3].flat().length + [1, 2].flatMap(n => [n, n]).length;");
        assert_eq!(value, Value::Number(7.0));
    }

    #[test]
    fn test_cyclic_arrays_stringify_and_refuse_to_flatten() {
        let value = run(
            "const a = [1, [2]]; a.push(a); a[1].push(a);
             let flat = 'ok';
             try { a.flat(1 / 0); } catch (e) { flat = e.name; }
             return [String(a), a.join('-'), flat].join('|');",
        );
        assert_eq!(value, Value::string("1,2,,|1-2,-|RangeError"));
    }

    #[test]
    fn test_array_lengths_are_bounded() {
        let value = run(
            "const names = [];
             const attempt = (f) => { try { f(); names.push('ok'); } catch (e) { names.push(e.name); } };
             attempt(() => new Array(5e9));
             attempt(() => new Array(-1));
             attempt(() => Array.from({ length: 1e12 }));
             attempt(() => { const a = []; a[9000000000] = 1; });
             attempt(() => { const a = [1]; a.length = 2 ** 40; });
             attempt(() => { const a = []; a[3] = 1; a.length = 1; });
             return names.join(',');",
        );
        assert_eq!(
            value,
            Value::string("RangeError,RangeError,RangeError,RangeError,RangeError,ok")
        );
    }
}
