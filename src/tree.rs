use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::CommandError;

/// A parsed path: a sequence of string keys.
///
/// `a.b[0]["c.d"]` becomes `["a", "b", "0", "c.d"]`. A key addresses an
/// array element when the container it is applied to is an array and the
/// key is a non-negative integer.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    raw: String,
    segments: Vec<String>,
}

fn segment_pattern() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    SEGMENT.get_or_init(|| {
        Regex::new(r#"[^.\[\]]+|\[(?:(-?\d+(?:\.\d+)?)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')\]"#)
            .expect("path segment regex is valid")
    })
}

impl Path {
    pub fn parse(raw: &str) -> Result<Path, CommandError> {
        let mut segments = Vec::new();
        for caps in segment_pattern().captures_iter(raw) {
            let segment = if let Some(m) = caps.get(1) {
                m.as_str().to_string()
            } else if let Some(m) = caps.get(2).or_else(|| caps.get(3)) {
                unescape_key(m.as_str())
            } else {
                caps[0].to_string()
            };
            segments.push(segment);
        }
        if segments.is_empty() {
            return Err(CommandError::InvalidPath(raw.to_string()));
        }
        Ok(Path {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn conflict(&self, segment: &str) -> CommandError {
        CommandError::PathConflict {
            path: self.raw.clone(),
            segment: segment.to_string(),
        }
    }
}

fn unescape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// How far past the end of an array a write may land; the gap is padded
/// with `null`.
pub const MAX_ARRAY_GAP: usize = 1024;

fn as_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// True for the `[innerArray, "description"]` pairing used throughout the
/// state tree to keep a list and its label under one key.
pub fn is_tuple(value: &Value) -> bool {
    match value.as_array().map(Vec::as_slice) {
        Some([Value::Array(_), Value::String(_)]) => true,
        _ => false,
    }
}

/// Read the value at `path`, or `None` if anything along the way is missing
/// or not a container.
pub fn get<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = root;
    for key in path.segments() {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(as_index(key)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable counterpart of [`get`]; never creates anything.
pub fn get_mut<'a>(root: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = root;
    for key in path.segments() {
        current = match current {
            Value::Object(map) => map.get_mut(key)?,
            Value::Array(items) => items.get_mut(as_index(key)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// A missing intermediate becomes an array when the next key is an index
/// and an object otherwise; a primitive in the way is replaced the same
/// way. Writing past the end of an array pads it with `null`, up to
/// [`MAX_ARRAY_GAP`] new slots.
pub fn set(root: &mut Value, path: &Path, value: Value) -> Result<(), CommandError> {
    let segments = path.segments();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Err(CommandError::InvalidPath(path.as_str().to_string())),
    };

    let mut current = root;
    for (i, key) in parents.iter().enumerate() {
        let next_key = &segments[i + 1];
        let slot = child_slot(current, key, path)?;
        if !slot.is_object() && !slot.is_array() {
            *slot = if as_index(next_key).is_some() {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
        }
        current = slot;
    }

    *child_slot(current, last, path)? = value;
    Ok(())
}

/// Get or create the slot for `key` inside `container`, which must already
/// be an object or array.
fn child_slot<'a>(
    container: &'a mut Value,
    key: &str,
    path: &Path,
) -> Result<&'a mut Value, CommandError> {
    if !container.is_object() && !container.is_array() {
        *container = Value::Object(Map::new());
    }
    match container {
        Value::Object(map) => Ok(map.entry(key.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let idx = as_index(key).ok_or_else(|| path.conflict(key))?;
            if idx >= items.len() {
                let new_len = idx
                    .checked_add(1)
                    .filter(|len| len - items.len() <= MAX_ARRAY_GAP)
                    .ok_or_else(|| CommandError::IndexOutOfRange {
                        path: path.as_str().to_string(),
                        index: idx,
                    })?;
                items.resize(new_len, Value::Null);
            }
            Ok(&mut items[idx])
        }
        _ => unreachable!("container was normalized to an object"),
    }
}

/// Delete whatever is at `path`. Object keys are removed; array elements
/// are replaced by `null` so later indices keep their meaning. Returns
/// whether anything was there.
pub fn unset(root: &mut Value, path: &Path) -> bool {
    let Some((last, parents)) = path.segments().split_last() else {
        return false;
    };

    let mut current = root;
    for key in parents {
        current = match current {
            Value::Object(map) => match map.get_mut(key) {
                Some(child) => child,
                None => return false,
            },
            Value::Array(items) => match as_index(key).and_then(|i| items.get_mut(i)) {
                Some(child) => child,
                None => return false,
            },
            _ => return false,
        };
    }

    match current {
        Value::Object(map) => map.shift_remove(last).is_some(),
        Value::Array(items) => match as_index(last).and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = Value::Null;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Deep-merge `source` into `target`: nested objects merge key by key,
/// anything else in `source` replaces what `target` had.
pub fn merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
