use serde_json::{Map, Number, Value};

use crate::relaxed;

/// A typed argument value.
///
/// Mirrors JSON plus `Undefined`, which has no JSON form of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    String(String),
    Number(Number),
    Boolean(bool),
    Null,
    Undefined,
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

impl CoercedValue {
    pub fn is_number(&self) -> bool {
        matches!(self, CoercedValue::Number(_))
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            CoercedValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Convert into a JSON value. `Undefined` becomes `null`; callers that
    /// treat undefined as "absent" check for it first.
    pub fn into_json(self) -> Value {
        match self {
            CoercedValue::String(s) => Value::String(s),
            CoercedValue::Number(n) => Value::Number(n),
            CoercedValue::Boolean(b) => Value::Bool(b),
            CoercedValue::Null | CoercedValue::Undefined => Value::Null,
            CoercedValue::Object(map) => Value::Object(map),
            CoercedValue::Array(items) => Value::Array(items),
        }
    }

    /// String conversion used when a value is turned into an object key:
    /// `1` -> `"1"`, `true` -> `"true"`, arrays join their elements with
    /// commas.
    pub fn to_key_string(&self) -> String {
        match self {
            CoercedValue::String(s) => s.clone(),
            CoercedValue::Number(n) => number_to_key(n),
            CoercedValue::Boolean(b) => b.to_string(),
            CoercedValue::Null => "null".to_string(),
            CoercedValue::Undefined => "undefined".to_string(),
            CoercedValue::Object(_) => "[object Object]".to_string(),
            CoercedValue::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => CoercedValue::from(other.clone()).to_key_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn number_to_key(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < (1u64 << 53) as f64 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

impl From<Value> for CoercedValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => CoercedValue::String(s),
            Value::Number(n) => CoercedValue::Number(n),
            Value::Bool(b) => CoercedValue::Boolean(b),
            Value::Null => CoercedValue::Null,
            Value::Object(map) => CoercedValue::Object(map),
            Value::Array(items) => CoercedValue::Array(items),
        }
    }
}

/// Turn one raw argument into a typed value.
///
/// Stages, first success wins: the bare keywords `true`, `false`, `null`,
/// `undefined`; strict JSON; the relaxed literal grammar for text wrapped
/// in `{}` or `[]`; finally the text itself with one layer of matching
/// quotes removed. Never fails.
pub fn coerce(raw: &str) -> CoercedValue {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return CoercedValue::Boolean(true),
        "false" => return CoercedValue::Boolean(false),
        "null" => return CoercedValue::Null,
        "undefined" => return CoercedValue::Undefined,
        _ => {}
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value.into();
    }

    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if bracketed {
        if let Ok(value) = relaxed::parse(trimmed) {
            return value.into();
        }
    }

    CoercedValue::String(unquote(trimmed).to_string())
}

/// Trim, then strip one layer of matching `'`, `"` or backtick quotes.
pub fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && matches!(first, '\'' | '"' | '`') => {
            &trimmed[1..trimmed.len() - 1]
        }
        _ => trimmed,
    }
}
