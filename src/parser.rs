use std::sync::OnceLock;

use log::trace;
use regex::Regex;

use crate::ast::{Command, Verb};
use crate::error::{Position, SkipReason, SkippedCall};
use crate::splitter::split_balanced;

/// Commands found in a text block, plus the call sites that were dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub commands: Vec<Command>,
    pub skipped: Vec<SkippedCall>,
}

fn call_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"_\.(set|assign|remove|add|insert)\(").expect("call prefix regex is valid")
    })
}

/// Extract every well-formed `_.<verb>(...);` call from free-form text, in
/// source order. Malformed calls are dropped silently.
pub fn extract(input: &str) -> Vec<Command> {
    extract_with_diagnostics(input).commands
}

/// Like [`extract`], but also report each abandoned call site.
pub fn extract_with_diagnostics(input: &str) -> Extraction {
    let mut scanner = Scanner { input, pos: 0 };
    let mut out = Extraction::default();

    while let Some(site) = scanner.next_call_site() {
        match scanner.find_close(site.open_paren) {
            None => {
                // Resume inside the call so progress is guaranteed.
                scanner.pos = site.open_paren;
                out.skipped.push(scanner.skip(site, SkipReason::Unterminated));
            }
            Some(close) => {
                let after = close + 1;
                if !scanner.input[after..].starts_with(';') {
                    scanner.pos = after;
                    out.skipped.push(scanner.skip(site, SkipReason::MissingSemicolon));
                    continue;
                }
                let body = &scanner.input[site.open_paren..close];
                match split_balanced(body) {
                    Some(args) => {
                        out.commands.push(Command::new(site.verb, args));
                        scanner.pos = after + 1;
                    }
                    None => {
                        scanner.pos = after + 1;
                        out.skipped.push(scanner.skip(site, SkipReason::Unbalanced));
                    }
                }
            }
        }
    }

    out
}

/// A located `_.<verb>(` prefix.
struct CallSite {
    verb: Verb,
    start: usize,
    /// Byte offset just past the call's `(`
    open_paren: usize,
}

/// Scanner state: tracks the resume position in the input string.
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn next_call_site(&self) -> Option<CallSite> {
        let caps = call_prefix().captures_at(self.input, self.pos)?;
        let whole = caps.get(0)?;
        let verb = Verb::from_name(caps.get(1)?.as_str())?;
        Some(CallSite {
            verb,
            start: whole.start(),
            open_paren: whole.end(),
        })
    }

    /// Find the `)` that balances the call's own opening paren.
    ///
    /// Any of the three quote characters toggles a single shared in-string
    /// flag unless the character right before it is a backslash.
    /// Parentheses inside a string do not count.
    fn find_close(&self, open_paren: usize) -> Option<usize> {
        let mut depth = 1usize;
        let mut in_quote = false;
        let mut prev: Option<char> = None;

        for (offset, ch) in self.input[open_paren..].char_indices() {
            match ch {
                '"' | '\'' | '`' if prev != Some('\\') => in_quote = !in_quote,
                '(' if !in_quote => depth += 1,
                ')' if !in_quote => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open_paren + offset);
                    }
                }
                _ => {}
            }
            prev = Some(ch);
        }
        None
    }

    fn skip(&self, site: CallSite, reason: SkipReason) -> SkippedCall {
        let skipped = SkippedCall {
            verb: site.verb,
            reason,
            begin: Position::locate(self.input, site.start),
        };
        trace!("{}", skipped);
        skipped
    }
}
