/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template values.
//!
//! [`TemplateValue`] is the dynamic value type flowing through template
//! evaluation: locals supplied by the caller, literals written in the template
//! and the results of helper functions all share it.

use indexmap::IndexMap;

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateValue {
    /// The absent value.
    #[default]
    Nil,

    /// A boolean value.
    Bool(bool),

    /// A signed integer.
    Integer(i64),

    /// A string value. Symbols in templates (`:name`) are strings too.
    String(String),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// An insertion-ordered map of string keys to values.
    Map(IndexMap<String, TemplateValue>),
}

impl TemplateValue {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Only `nil` and `false` are falsy; empty strings, zero and empty
    /// collections are all truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, TemplateValue::Nil | TemplateValue::Bool(false))
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateValue::Nil => "nil",
            TemplateValue::Bool(_) => "bool",
            TemplateValue::Integer(_) => "integer",
            TemplateValue::String(_) => "string",
            TemplateValue::List(_) => "list",
            TemplateValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TemplateValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TemplateValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TemplateValue]> {
        match self {
            TemplateValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, TemplateValue>> {
        match self {
            TemplateValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get a nested field by path.
    ///
    /// For example, `get_path(&["insn", "name"])` on a Map containing
    /// `{"insn": {"name": "nop"}}` returns the name value.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };

        match self {
            TemplateValue::Map(m) => m.get(*first).and_then(|v| v.get_path(rest)),
            _ => None,
        }
    }

    /// Render this value as output text (what `<%= %>` emits).
    ///
    /// - Nil: ""
    /// - Bool: "true" / "false"
    /// - Integer: decimal digits
    /// - String: returned as-is
    /// - List, Map: their [`inspect`](Self::inspect) form
    pub fn render(&self) -> String {
        match self {
            TemplateValue::Nil => String::new(),
            TemplateValue::Bool(b) => b.to_string(),
            TemplateValue::Integer(i) => i.to_string(),
            TemplateValue::String(s) => s.clone(),
            TemplateValue::List(_) | TemplateValue::Map(_) => self.inspect(),
        }
    }

    /// Debug-style rendering: strings quoted, collections bracketed.
    pub fn inspect(&self) -> String {
        match self {
            TemplateValue::Nil => "nil".to_string(),
            TemplateValue::String(s) => inspect_string(s),
            TemplateValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.inspect()).collect();
                format!("[{}]", inner.join(", "))
            }
            TemplateValue::Map(m) => {
                if m.is_empty() {
                    return "{}".to_string();
                }
                let inner: Vec<String> = m
                    .iter()
                    .map(|(k, v)| format!("{} => {}", inspect_string(k), v.inspect()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            other => other.render(),
        }
    }
}

fn inspect_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl From<i64> for TemplateValue {
    fn from(i: i64) -> Self {
        TemplateValue::Integer(i)
    }
}

impl From<i32> for TemplateValue {
    fn from(i: i32) -> Self {
        TemplateValue::Integer(i64::from(i))
    }
}

impl<T: Into<TemplateValue>> From<Vec<T>> for TemplateValue {
    fn from(items: Vec<T>) -> Self {
        TemplateValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<TemplateValue>> From<Option<T>> for TemplateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(TemplateValue::Nil, Into::into)
    }
}

impl From<IndexMap<String, TemplateValue>> for TemplateValue {
    fn from(m: IndexMap<String, TemplateValue>) -> Self {
        TemplateValue::Map(m)
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Nil,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => TemplateValue::Integer(i),
                None => TemplateValue::String(n.to_string()),
            },
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(fields) => TemplateValue::Map(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}
