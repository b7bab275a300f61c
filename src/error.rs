use std::fmt;

use thiserror::Error;

use crate::ast::Verb;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (character offset within the line)
    pub column: usize,
    /// 0-based absolute byte offset from the start of input
    pub offset: usize,
}

impl Position {
    /// Compute the position of byte `offset` within `input`.
    pub fn locate(input: &str, offset: usize) -> Self {
        let consumed = &input[..offset];
        let line = consumed.matches('\n').count();
        let last_newline = consumed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = input[last_newline..offset].chars().count();
        Position {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Why a call-looking site produced no command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The opening parenthesis is never balanced before the end of input.
    Unterminated,
    /// The balancing `)` is not immediately followed by `;`.
    MissingSemicolon,
    /// The arguments leave a quote, bracket or brace open.
    Unbalanced,
}

impl SkipReason {
    pub fn code(self) -> &'static str {
        match self {
            SkipReason::Unterminated => "unterminated-call",
            SkipReason::MissingSemicolon => "missing-semicolon",
            SkipReason::Unbalanced => "unbalanced-arguments",
        }
    }
}

/// A call site the extractor abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCall {
    pub verb: Verb,
    pub reason: SkipReason,
    /// Start of the `_.` prefix
    pub begin: Position,
}

impl fmt::Display for SkippedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: skipped _.{}(...) ({})",
            self.begin,
            self.verb,
            self.reason.code()
        )
    }
}

/// A failure while applying one command. These never escape the
/// interpreter; the command is skipped and the rest of the script runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("_.{verb}() needs at least {expected} argument(s), got {found}")]
    MissingArguments {
        verb: Verb,
        expected: usize,
        found: usize,
    },
    #[error("invalid path \"{0}\"")]
    InvalidPath(String),
    #[error("path \"{path}\": cannot address key \"{segment}\" inside an array")]
    PathConflict { path: String, segment: String },
    #[error("state wrapper is not an object")]
    RootNotObject,
    #[error("path \"{path}\": index {index} is too far past the end of the array")]
    IndexOutOfRange { path: String, index: usize },
    #[error("path \"{0}\": numeric result is not representable")]
    NumericOverflow(String),
}
