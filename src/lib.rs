pub mod ast;
pub mod coerce;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod relaxed;
pub mod splitter;
pub mod tree;

use serde_json::Value;

pub use ast::{Command, Verb};
pub use coerce::{coerce, CoercedValue};
pub use error::{CommandError, SkippedCall};
pub use interpreter::{CommandReport, CommandStatus, Interpreter, Options, Outcome};
pub use parser::{extract, extract_with_diagnostics, Extraction};

// ── Core API ───────────────────────────────────────────────────────

/// Scan `script` for embedded `_.<verb>(...);` calls and apply them, in
/// order, to a copy of `state`'s `statData` sub-tree.
///
/// Returns the mutated copy of the whole wrapper, or `Outcome::NoChange`
/// when no command modified anything. Never fails: malformed calls are
/// ignored and failing commands are logged and skipped.
pub fn apply(script: &str, state: &Value) -> Outcome {
    Interpreter::default().apply(script, state)
}

#[cfg(test)]
mod tests;
