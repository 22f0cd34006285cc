/*
 * methods.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Built-in methods on template values (`name.upcase`, `list.join(", ")`, ...).

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::value::TemplateValue;

/// Outcome of a built-in method call. `Ok(None)` means the receiver has no
/// method of that name; `Err` carries a message for a type or arity error.
pub(crate) type MethodResult = Result<Option<TemplateValue>, String>;

pub(crate) fn call_method(
    receiver: &TemplateValue,
    name: &str,
    args: &[TemplateValue],
) -> MethodResult {
    // Map entries read like attributes: `insn.name`
    if let TemplateValue::Map(map) = receiver {
        if args.is_empty() {
            if let Some(value) = map.get(name) {
                return Ok(Some(value.clone()));
            }
        }
    }

    let value = match (receiver, name) {
        (_, "nil?") => predicate(name, args, matches!(receiver, TemplateValue::Nil))?,
        (_, "to_s") => {
            arity(name, args, 0, 0)?;
            TemplateValue::String(receiver.render())
        }
        (_, "inspect") => {
            arity(name, args, 0, 0)?;
            TemplateValue::String(receiver.inspect())
        }
        (TemplateValue::String(s), _) => return string_method(s, name, args),
        (TemplateValue::List(items), _) => return list_method(items, name, args),
        (TemplateValue::Map(map), _) => return map_method(map, name, args),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn string_method(s: &str, name: &str, args: &[TemplateValue]) -> MethodResult {
    let value = match name {
        "size" | "length" => {
            arity(name, args, 0, 0)?;
            count(s.chars().count())
        }
        "empty?" => predicate(name, args, s.is_empty())?,
        "upcase" => {
            arity(name, args, 0, 0)?;
            TemplateValue::String(s.to_uppercase())
        }
        "downcase" => {
            arity(name, args, 0, 0)?;
            TemplateValue::String(s.to_lowercase())
        }
        "include?" | "start_with?" | "end_with?" => {
            arity(name, args, 1, 1)?;
            let needle = string_arg(name, &args[0])?;
            TemplateValue::Bool(match name {
                "include?" => s.contains(needle),
                "start_with?" => s.starts_with(needle),
                _ => s.ends_with(needle),
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn list_method(items: &[TemplateValue], name: &str, args: &[TemplateValue]) -> MethodResult {
    let value = match name {
        "size" | "length" => {
            arity(name, args, 0, 0)?;
            count(items.len())
        }
        "empty?" => predicate(name, args, items.is_empty())?,
        "first" => {
            arity(name, args, 0, 0)?;
            items.first().cloned().unwrap_or_default()
        }
        "last" => {
            arity(name, args, 0, 0)?;
            items.last().cloned().unwrap_or_default()
        }
        "include?" => {
            arity(name, args, 1, 1)?;
            TemplateValue::Bool(items.contains(&args[0]))
        }
        "join" => {
            arity(name, args, 0, 1)?;
            let sep = match args.first() {
                Some(sep) => string_arg(name, sep)?,
                None => "",
            };
            let rendered: Vec<String> = items.iter().map(TemplateValue::render).collect();
            TemplateValue::String(rendered.join(sep))
        }
        "sort" => {
            arity(name, args, 0, 0)?;
            TemplateValue::List(sorted(items)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn map_method(
    map: &IndexMap<String, TemplateValue>,
    name: &str,
    args: &[TemplateValue],
) -> MethodResult {
    let value = match name {
        "size" | "length" => {
            arity(name, args, 0, 0)?;
            count(map.len())
        }
        "empty?" => predicate(name, args, map.is_empty())?,
        "keys" => {
            arity(name, args, 0, 0)?;
            TemplateValue::List(map.keys().cloned().map(TemplateValue::String).collect())
        }
        "values" => {
            arity(name, args, 0, 0)?;
            TemplateValue::List(map.values().cloned().collect())
        }
        "key?" | "has_key?" | "include?" => {
            arity(name, args, 1, 1)?;
            TemplateValue::Bool(map.contains_key(&args[0].render()))
        }
        "fetch" => {
            arity(name, args, 1, 2)?;
            match (map.get(&args[0].render()), args.get(1)) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) => return Err(format!("key not found: {}", args[0].inspect())),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Sorted copy of `items`. Only lists of integers or of strings sort; the
/// first element of another type than the head is reported.
fn sorted(items: &[TemplateValue]) -> Result<Vec<TemplateValue>, String> {
    let [head, _, ..] = items else {
        return Ok(items.to_vec());
    };
    if let Some(other) = items.iter().find(|item| compare(head, item).is_err()) {
        return Err(comparison_failed(head, other));
    }
    let mut sorted = items.to_vec();
    match head {
        TemplateValue::Integer(_) => sorted.sort_by_key(|item| item.as_integer()),
        _ => sorted.sort_by(|a, b| a.as_str().cmp(&b.as_str())),
    }
    Ok(sorted)
}

/// Element at `index`, counting from the end when negative.
pub(crate) fn list_index(items: &[TemplateValue], index: i64) -> Option<&TemplateValue> {
    let len = i64::try_from(items.len()).ok()?;
    let index = if index < 0 { index + len } else { index };
    usize::try_from(index).ok().and_then(|i| items.get(i))
}

/// Ordering used by comparison operators and `sort`.
pub(crate) fn compare(a: &TemplateValue, b: &TemplateValue) -> Result<Ordering, String> {
    match (a, b) {
        (TemplateValue::Integer(x), TemplateValue::Integer(y)) => Ok(x.cmp(y)),
        (TemplateValue::String(x), TemplateValue::String(y)) => Ok(x.cmp(y)),
        _ => Err(comparison_failed(a, b)),
    }
}

fn comparison_failed(a: &TemplateValue, b: &TemplateValue) -> String {
    format!(
        "comparison of {} with {} failed",
        a.type_name(),
        b.type_name()
    )
}

fn arity(name: &str, args: &[TemplateValue], min: usize, max: usize) -> Result<(), String> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{}..{}", min, max)
    };
    Err(format!(
        "wrong number of arguments for `{}` (given {}, expected {})",
        name,
        args.len(),
        expected
    ))
}

fn predicate(name: &str, args: &[TemplateValue], value: bool) -> Result<TemplateValue, String> {
    arity(name, args, 0, 0)?;
    Ok(TemplateValue::Bool(value))
}

fn string_arg<'v>(name: &str, arg: &'v TemplateValue) -> Result<&'v str, String> {
    arg.as_str().ok_or_else(|| {
        format!(
            "no implicit conversion of {} into string (in `{}`)",
            arg.type_name(),
            name
        )
    })
}

fn count(n: usize) -> TemplateValue {
    TemplateValue::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}
