//! Intermediate representation produced by the command extractor.

use std::fmt;

/// The mutation keyword of one embedded call.
///
/// `assign` and `insert` are two spellings of the same operation; they only
/// differ at the parsing boundary and share one handler in the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Set,
    Add,
    Remove,
    Assign,
    Insert,
}

impl Verb {
    /// Map a call name (`set`, `add`, ...) to its verb.
    pub fn from_name(name: &str) -> Option<Verb> {
        match name {
            "set" => Some(Verb::Set),
            "add" => Some(Verb::Add),
            "remove" => Some(Verb::Remove),
            "assign" => Some(Verb::Assign),
            "insert" => Some(Verb::Insert),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Verb::Set => "set",
            Verb::Add => "add",
            Verb::Remove => "remove",
            Verb::Assign => "assign",
            Verb::Insert => "insert",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One well-formed `_.<verb>(...);` call, with its arguments still as
/// trimmed source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub verb: Verb,
    pub raw_args: Vec<String>,
}

impl Command {
    pub fn new(verb: Verb, raw_args: Vec<String>) -> Self {
        Command { verb, raw_args }
    }
}
