//! Check orchestration
//!
//! Combines the parser adapter and the rule engine into one synchronous call.
//! Logic rules assume roughly well-formed SQL, so they only run when the
//! query parsed or when syntax checking was switched off.

use std::sync::{Arc, LazyLock};

use sqlcheck_core::{CheckOptions, CheckerResult, Config};

use crate::parser::SqlParser;
use crate::rules::RuleSet;

/// Something that can check SQL text
///
/// [`Checker`] is the real implementation; the seam lets the live checker
/// be driven by a recording implementation in tests.
pub trait SqlCheck: Send + Sync {
    fn check(&self, sql: &str, options: &CheckOptions) -> CheckerResult;
}

/// Syntax and logic checker
///
/// Holds an immutable rule table shared by every clone. Each call is computed
/// from its arguments alone.
#[derive(Debug, Clone)]
pub struct Checker {
    rules: Arc<RuleSet>,
}

impl Checker {
    /// Create a checker with the built-in rule table
    pub fn new() -> Self {
        Self::with_rules(RuleSet::baseline())
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Create a checker with the rule adjustments from a config
    pub fn from_config(config: &Config) -> Self {
        Self::with_rules(RuleSet::from_config(&config.rules))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Check `sql`
    ///
    /// Empty or whitespace-only input is valid with no warnings and runs
    /// neither component.
    pub fn check(&self, sql: &str, options: &CheckOptions) -> CheckerResult {
        if sql.trim().is_empty() {
            return CheckerResult::empty();
        }

        let mut result = CheckerResult::empty();

        if options.run_syntax_check {
            let parser = SqlParser::from_dialect(options.dialect);
            if let Some(error) = parser.parse_syntax(sql).into_error() {
                result.is_valid = false;
                result.syntax_error = Some(error);
            }
        }

        if options.run_logic_analysis && (result.is_valid || !options.run_syntax_check) {
            result.warnings = self.rules.analyze(sql);
        }

        tracing::debug!(
            dialect = %options.dialect,
            len = sql.len(),
            valid = result.is_valid,
            warnings = result.warnings.len(),
            "checked SQL"
        );

        result
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCheck for Checker {
    fn check(&self, sql: &str, options: &CheckOptions) -> CheckerResult {
        Checker::check(self, sql, options)
    }
}

static DEFAULT_CHECKER: LazyLock<Checker> = LazyLock::new(Checker::new);

/// One-shot check with the built-in rule table (e.g. before submitting)
pub fn check_immediate(sql: &str, options: &CheckOptions) -> CheckerResult {
    DEFAULT_CHECKER.check(sql, options)
}
