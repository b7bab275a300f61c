use log::{debug, warn};
use serde_json::{Map, Number, Value};

use crate::ast::{Command, Verb};
use crate::coerce::{coerce, unquote, CoercedValue};
use crate::error::CommandError;
use crate::parser::extract;
use crate::tree::{self, Path};

/// Interpreter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Key of the wrapper field that all paths are resolved against.
    pub root_key: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            root_key: "statData".to_string(),
        }
    }
}

/// Result of applying a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A fresh copy of the wrapper with every mutation applied.
    Changed(Value),
    /// No command changed anything; keep the existing state.
    NoChange,
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Changed(v) => Some(v),
            Outcome::NoChange => None,
        }
    }
}

/// What happened to one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandStatus {
    /// The working copy was marked modified.
    Applied,
    /// The command ran but left nothing to persist.
    NoOp,
    /// The command was skipped.
    Failed(CommandError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub command: Command,
    pub status: CommandStatus,
}

/// Applies mutation scripts to a state wrapper.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    options: Options,
}

impl Interpreter {
    pub fn new(options: Options) -> Self {
        Interpreter { options }
    }

    /// Shorthand for an interpreter targeting a different wrapper key.
    pub fn with_root(root_key: impl Into<String>) -> Self {
        Interpreter::new(Options {
            root_key: root_key.into(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Apply every command in `script` to a copy of `state`.
    pub fn apply(&self, script: &str, state: &Value) -> Outcome {
        self.apply_with_report(script, state).0
    }

    /// Like [`Interpreter::apply`], also returning one report per extracted
    /// command, in order.
    pub fn apply_with_report(&self, script: &str, state: &Value) -> (Outcome, Vec<CommandReport>) {
        let commands = extract(script);
        let (outcome, reports) = self.execute(&commands, state);
        (outcome, reports)
    }

    /// Apply already-extracted commands to a copy of `state`.
    pub fn execute(&self, commands: &[Command], state: &Value) -> (Outcome, Vec<CommandReport>) {
        let mut new_state = state.clone();
        let mut modified = false;
        let mut reports = Vec::with_capacity(commands.len());

        for command in commands {
            let status = match self.execute_command(command, &mut new_state) {
                Ok(true) => {
                    debug!("applied _.{}({})", command.verb, command.raw_args.join(", "));
                    modified = true;
                    CommandStatus::Applied
                }
                Ok(false) => {
                    debug!("no-op _.{}({})", command.verb, command.raw_args.join(", "));
                    CommandStatus::NoOp
                }
                Err(err) => {
                    warn!("skipping _.{}(): {}", command.verb, err);
                    CommandStatus::Failed(err)
                }
            };
            reports.push(CommandReport {
                command: command.clone(),
                status,
            });
        }

        let outcome = if modified {
            Outcome::Changed(new_state)
        } else {
            Outcome::NoChange
        };
        (outcome, reports)
    }

    /// Returns whether the working copy should be considered modified.
    fn execute_command(&self, command: &Command, state: &mut Value) -> Result<bool, CommandError> {
        let args = &command.raw_args;
        let Some(raw_path) = args.first() else {
            return Err(missing(command.verb, 1, 0));
        };
        let path = Path::parse(unquote(raw_path))?;
        let root = self.stat_data(state)?;

        match command.verb {
            Verb::Set => {
                let raw = args.get(1).ok_or_else(|| missing(Verb::Set, 2, args.len()))?;
                execute_set(root, &path, coerce(raw))
            }
            Verb::Add => {
                let raw = args.get(1).ok_or_else(|| missing(Verb::Add, 2, args.len()))?;
                execute_add(root, &path, coerce(raw))
            }
            Verb::Remove => match args.get(1) {
                None => {
                    tree::unset(root, &path);
                    Ok(true)
                }
                Some(raw) => execute_remove_entry(root, &path, coerce(raw)),
            },
            Verb::Assign | Verb::Insert => match args.len() {
                0 | 1 => Err(missing(command.verb, 2, args.len())),
                2 => execute_assign(root, &path, coerce(&args[1])),
                _ => execute_assign_keyed(root, &path, coerce(&args[1]), coerce(&args[2])),
            },
        }
    }

    /// The mutable sub-tree inside the wrapper, created empty if absent.
    fn stat_data<'a>(&self, state: &'a mut Value) -> Result<&'a mut Value, CommandError> {
        match state {
            Value::Object(map) => Ok(map
                .entry(self.options.root_key.clone())
                .or_insert_with(|| Value::Object(Map::new()))),
            _ => Err(CommandError::RootNotObject),
        }
    }
}

fn missing(verb: Verb, expected: usize, found: usize) -> CommandError {
    CommandError::MissingArguments {
        verb,
        expected,
        found,
    }
}

/// `_.set(path, value)`: an undefined value deletes the slot.
fn execute_set(root: &mut Value, path: &Path, value: CoercedValue) -> Result<bool, CommandError> {
    if matches!(value, CoercedValue::Undefined) {
        tree::unset(root, path);
    } else {
        tree::set(root, path, value.into_json())?;
    }
    Ok(true)
}

/// `_.add(path, delta)`: only numbers add to numbers.
fn execute_add(root: &mut Value, path: &Path, delta: CoercedValue) -> Result<bool, CommandError> {
    let current = match tree::get(root, path) {
        Some(Value::Number(n)) => n.clone(),
        _ => return Ok(false),
    };
    let Some(delta) = delta.as_number() else {
        return Ok(false);
    };
    let sum = add_numbers(&current, delta)
        .ok_or_else(|| CommandError::NumericOverflow(path.as_str().to_string()))?;
    tree::set(root, path, Value::Number(sum))?;
    Ok(true)
}

fn add_numbers(a: &Number, b: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(Number::from(sum));
        }
    }
    Number::from_f64(a.as_f64()? + b.as_f64()?)
}

/// Append one value, or every element of an array value.
fn append_flattened(items: &mut Vec<Value>, value: CoercedValue) {
    match value {
        CoercedValue::Array(values) => items.extend(values),
        other => items.push(other.into_json()),
    }
}

/// Shape of whatever sits at a path, read before a write so the write can
/// re-resolve the path mutably.
enum Shape {
    Tuple,
    Array,
    Object,
    Other,
}

fn shape_at(root: &Value, path: &Path) -> Shape {
    match tree::get(root, path) {
        Some(v) if tree::is_tuple(v) => Shape::Tuple,
        Some(Value::Array(_)) => Shape::Array,
        Some(Value::Object(_)) => Shape::Object,
        _ => Shape::Other,
    }
}

/// The array a list operation works on: the inner list of a tuple, or the
/// array itself.
fn list_at<'a>(root: &'a mut Value, path: &Path, shape: &Shape) -> Option<&'a mut Vec<Value>> {
    let collection = tree::get_mut(root, path)?;
    match shape {
        Shape::Tuple => collection.get_mut(0)?.as_array_mut(),
        Shape::Array => collection.as_array_mut(),
        _ => None,
    }
}

fn object_at<'a>(root: &'a mut Value, path: &Path) -> Option<&'a mut Map<String, Value>> {
    tree::get_mut(root, path)?.as_object_mut()
}

/// `_.assign(path, value)` / `_.insert(path, value)`.
fn execute_assign(root: &mut Value, path: &Path, value: CoercedValue) -> Result<bool, CommandError> {
    match shape_at(root, path) {
        shape @ (Shape::Tuple | Shape::Array) => {
            if let Some(items) = list_at(root, path, &shape) {
                append_flattened(items, value);
            }
        }
        // Only objects merge; any other value leaves the map as it was.
        Shape::Object => {
            if let (CoercedValue::Object(incoming), Some(map)) = (value, object_at(root, path)) {
                tree::merge(map, incoming);
            }
        }
        Shape::Other => tree::set(root, path, value.into_json())?,
    }
    Ok(true)
}

/// `_.assign(path, keyOrIndex, value)` / `_.insert(...)` with three
/// arguments. Arrays get an insertion, never an overwrite.
fn execute_assign_keyed(
    root: &mut Value,
    path: &Path,
    key: CoercedValue,
    value: CoercedValue,
) -> Result<bool, CommandError> {
    let is_array = matches!(tree::get(root, path), Some(Value::Array(_)));
    let is_object = matches!(tree::get(root, path), Some(Value::Object(_)));

    if is_array && key.is_number() {
        if let Some(Value::Array(items)) = tree::get_mut(root, path) {
            let at = splice_index(key.as_number(), items.len());
            items.insert(at, value.into_json());
        }
    } else if is_object {
        if let Some(map) = object_at(root, path) {
            map.insert(key.to_key_string(), value.into_json());
        }
    } else {
        let mut map = Map::new();
        map.insert(key.to_key_string(), value.into_json());
        tree::set(root, path, Value::Object(map))?;
    }
    Ok(true)
}

/// Clamp an index the way array splicing does: negative counts from the
/// end, fractions truncate, anything out of range pins to an end.
fn splice_index(index: Option<&Number>, len: usize) -> usize {
    let Some(raw) = index.and_then(Number::as_f64) else {
        return len;
    };
    let raw = raw.trunc();
    if raw < 0.0 {
        let from_end = len as f64 + raw;
        if from_end < 0.0 {
            0
        } else {
            from_end as usize
        }
    } else if raw >= len as f64 {
        len
    } else {
        raw as usize
    }
}

/// `_.remove(path, keyOrIndex)`: drop one entry from the collection at
/// `path`. Always reports modified, like the single-argument form.
fn execute_remove_entry(
    root: &mut Value,
    path: &Path,
    target: CoercedValue,
) -> Result<bool, CommandError> {
    match shape_at(root, path) {
        shape @ (Shape::Tuple | Shape::Array) => {
            if let Some(items) = list_at(root, path, &shape) {
                remove_from_list(items, target);
            }
        }
        Shape::Object => {
            if let Some(map) = object_at(root, path) {
                map.shift_remove(&target.to_key_string());
            }
        }
        Shape::Other => {}
    }
    Ok(true)
}

/// A number removes by position; anything else removes the first equal
/// element.
fn remove_from_list(items: &mut Vec<Value>, target: CoercedValue) {
    if let CoercedValue::Number(n) = &target {
        if items.is_empty() {
            return;
        }
        let at = splice_index(Some(n), items.len());
        if at < items.len() {
            items.remove(at);
        }
        return;
    }
    let target = target.into_json();
    if let Some(at) = items.iter().position(|item| *item == target) {
        items.remove(at);
    }
}
