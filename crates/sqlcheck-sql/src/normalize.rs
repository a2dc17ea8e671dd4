//! Syntax error normalization
//!
//! Parser diagnostics are free text and vary between grammar versions. This
//! module pulls line, column and expected-token fragments out of a message
//! and builds a stable [`SyntaxError`]. Missing fragments are left as `None`.

use std::sync::LazyLock;

use regex::Regex;
use sqlcheck_core::SyntaxError;

use crate::parser::UNKNOWN_SYNTAX_ERROR;

// Accepts both "line 3" and sqlparser's "Line: 3".
static LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bline:?\s+(\d+)").unwrap());

static COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcolumn:?\s+(\d+)").unwrap());

static EXPECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bexpected:?\s+(.+)").unwrap());

// sqlparser appends ", found: <token> at Line: .." after the expected list.
static FOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),?\s*\bfound:?\s").unwrap());

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),\s*or\s+|,\s*").unwrap());

/// Build a [`SyntaxError`] from a raw parser message
///
/// A blank message is replaced with a generic one so the result always
/// carries text.
pub fn normalize_error(message: &str) -> SyntaxError {
    let message = message.trim();
    if message.is_empty() {
        return SyntaxError::new(UNKNOWN_SYNTAX_ERROR);
    }

    SyntaxError {
        message: message.to_string(),
        line: extract_line(message),
        column: extract_column(message),
        expected: extract_expected(message),
    }
}

/// First "line N" in the message
pub fn extract_line(message: &str) -> Option<usize> {
    first_number(&LINE, message)
}

/// First "column N" in the message
pub fn extract_column(message: &str) -> Option<usize> {
    first_number(&COLUMN, message)
}

/// Tokens listed after "Expected"
///
/// The list stops at `found`, which sqlparser appends after the expected
/// tokens along with the offending token and its position.
pub fn extract_expected(message: &str) -> Option<Vec<String>> {
    let tail = EXPECTED.captures(message)?.get(1)?.as_str();
    let tail = match FOUND.find(tail) {
        Some(found) => &tail[..found.start()],
        None => tail,
    };

    let tokens: Vec<String> = SEPARATOR
        .split(tail)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

fn first_number(pattern: &Regex, message: &str) -> Option<usize> {
    pattern
        .captures(message)?
        .get(1)?
        .as_str()
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 1)
}
