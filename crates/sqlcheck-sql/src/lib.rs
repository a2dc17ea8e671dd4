//! SQL validation pipeline
//!
//! This crate handles:
//! - Parsing SQL per dialect using datafusion-sqlparser-rs
//! - Normalizing parser error messages into located syntax errors
//! - Running the logic rule engine over raw SQL text
//! - Combining both into a single check
//! - Extracting table and column references for callers outside the check path

pub mod parser;
pub mod normalize;
pub mod rules;
pub mod checker;
pub mod references;

pub use parser::{SqlParser, SyntaxCheckResult, parse_syntax};
pub use normalize::normalize_error;
pub use rules::{LogicRule, Matcher, RuleSet, analyze_logic};
pub use checker::{Checker, SqlCheck, check_immediate};
pub use references::ReferenceCollector;
