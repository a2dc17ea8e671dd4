//! Warnings, syntax errors and check results
//!
//! IMPORTANT: Rule codes are versioned and stable.
//! NEVER rename or remove codes - consumers key UI and suppression on them.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Rule code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCode {
    /// Aggregate call without GROUP BY
    AggregateWithoutGroupBy,

    /// Unqualified JOIN (implicitly INNER)
    BareJoinPreferOuter,

    /// LIMIT without ORDER BY
    LimitWithoutOrderBy,

    /// SELECT *
    SelectStar,

    /// DELETE/UPDATE without WHERE
    DestructiveWithoutWhere,

    /// Comparison operator applied to a NULL literal
    NullEquality,

    /// OR inside a filtered query
    OrInWhere,

    /// SELECT DISTINCT
    DistinctUsed,

    /// `= (SELECT ...)` in a WHERE clause
    AmbiguousEqualitySubquery,

    /// Several tables referenced without aliases
    MissingTableAlias,

    /// `!=` instead of `<>`
    NonStandardNotEqual,

    /// LIKE pattern without `%` or `_`
    LikeWithoutWildcard,

    /// ORDER BY column ordinal
    OrdinalOrderBy,

    /// Comma-separated FROM list with no join condition
    ImplicitCartesianProduct,
}

impl RuleCode {
    /// Every code, in baseline registration order
    pub const ALL: [RuleCode; 14] = [
        Self::AggregateWithoutGroupBy,
        Self::BareJoinPreferOuter,
        Self::LimitWithoutOrderBy,
        Self::SelectStar,
        Self::DestructiveWithoutWhere,
        Self::NullEquality,
        Self::OrInWhere,
        Self::DistinctUsed,
        Self::AmbiguousEqualitySubquery,
        Self::MissingTableAlias,
        Self::NonStandardNotEqual,
        Self::LikeWithoutWildcard,
        Self::OrdinalOrderBy,
        Self::ImplicitCartesianProduct,
    ];

    /// Get the rule code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AggregateWithoutGroupBy => "aggregate-without-group-by",
            Self::BareJoinPreferOuter => "bare-join-prefer-outer",
            Self::LimitWithoutOrderBy => "limit-without-order-by",
            Self::SelectStar => "select-star",
            Self::DestructiveWithoutWhere => "destructive-without-where",
            Self::NullEquality => "null-equality",
            Self::OrInWhere => "or-in-where",
            Self::DistinctUsed => "distinct-used",
            Self::AmbiguousEqualitySubquery => "ambiguous-equality-subquery",
            Self::MissingTableAlias => "missing-table-alias",
            Self::NonStandardNotEqual => "non-standard-not-equal",
            Self::LikeWithoutWildcard => "like-without-wildcard",
            Self::OrdinalOrderBy => "ordinal-order-by",
            Self::ImplicitCartesianProduct => "implicit-cartesian-product",
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown rule code '{}'", s))
    }
}

/// Warning category
///
/// This is a category for display, not a failure severity: an `Error`
/// warning never makes the query invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    /// Informational hint
    Info,

    /// Likely logic mistake
    Warning,

    /// Almost certainly wrong or dangerous
    Error,

    /// Performance suggestion
    Optimization,
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Optimization => "optimization",
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A logic or style warning emitted by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Category
    pub kind: WarningKind,

    /// Stable rule code
    pub code: RuleCode,

    /// Human-readable message
    pub message: String,

    /// Suggested fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Line number (1-indexed), reserved for per-line rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Warning {
    pub fn new(code: RuleCode, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            suggestion: None,
            line: None,
        }
    }

    /// Set the suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Set the line number
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// A normalized syntax error
///
/// Built fresh for every failed parse; never merged across attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Human-readable message (never empty)
    pub message: String,

    /// Line number (1-indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Column number (1-indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    /// Tokens the parser would have accepted, in parser order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<String>>,
}

impl SyntaxError {
    /// Create an error with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
            expected: None,
        }
    }

    /// Compute the editor range to highlight for this error in `sql`
    ///
    /// The range covers the error line from the reported column to the end
    /// of that line. Missing positions default to 1; the line is clamped to
    /// the last line of the text.
    pub fn marker_range(&self, sql: &str) -> MarkerRange {
        let lines: Vec<&str> = sql.split('\n').collect();
        let line = self.line.unwrap_or(1).clamp(1, lines.len());
        let column = self.column.unwrap_or(1).max(1);
        let content = lines[line - 1].trim_end_matches('\r');

        MarkerRange {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: content.chars().count() + 1,
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}: {}", line, column, self.message),
            (Some(line), None) => write!(f, "{}: {}", line, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Editor range for inline diagnostics (1-indexed, end column exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRange {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// Combined result of one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerResult {
    /// Whether the query parsed (always true when syntax checking is off)
    pub is_valid: bool,

    /// Syntax error, present only when `is_valid` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_error: Option<SyntaxError>,

    /// Logic warnings in rule order
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl CheckerResult {
    /// A valid result with no warnings (nothing to report)
    pub fn empty() -> Self {
        Self {
            is_valid: true,
            syntax_error: None,
            warnings: Vec::new(),
        }
    }

    /// Check if the result should block submission
    pub fn has_errors(&self) -> bool {
        !self.is_valid || self.warnings.iter().any(|w| w.kind == WarningKind::Error)
    }

    /// Count warnings of a given kind
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Check if a rule fired
    pub fn has_warning(&self, code: RuleCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

impl Default for CheckerResult {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_code_stability() {
        assert_eq!(RuleCode::AggregateWithoutGroupBy.as_str(), "aggregate-without-group-by");
        assert_eq!(RuleCode::ImplicitCartesianProduct.as_str(), "implicit-cartesian-product");

        // serde names must agree with as_str
        for code in RuleCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
            assert_eq!(code.as_str().parse::<RuleCode>().unwrap(), code);
        }
    }

    #[test]
    fn unknown_rule_code() {
        assert!("no-such-rule".parse::<RuleCode>().is_err());
    }

    #[test]
    fn warning_serialization() {
        let warning = Warning::new(RuleCode::SelectStar, WarningKind::Optimization, "SELECT *")
            .with_suggestion("List the columns");

        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"select-star\""));
        assert!(json.contains("\"optimization\""));
        assert!(!json.contains("\"line\""));
    }

    #[test]
    fn marker_range_uses_position() {
        let sql = "SELECT id\nFROM users\nWHER id = 1";
        let mut error = SyntaxError::new("boom");
        error.line = Some(3);
        error.column = Some(6);

        assert_eq!(
            error.marker_range(sql),
            MarkerRange { start_line: 3, start_column: 6, end_line: 3, end_column: 12 }
        );
    }

    #[test]
    fn marker_range_defaults_and_clamps() {
        let sql = "SELEC 1";
        let error = SyntaxError::new("boom");
        assert_eq!(
            error.marker_range(sql),
            MarkerRange { start_line: 1, start_column: 1, end_line: 1, end_column: 8 }
        );

        let mut far = SyntaxError::new("boom");
        far.line = Some(40);
        assert_eq!(far.marker_range(sql).start_line, 1);
    }

    #[test]
    fn result_error_detection() {
        let mut result = CheckerResult::empty();
        assert!(!result.has_errors());

        result.warnings.push(Warning::new(RuleCode::DistinctUsed, WarningKind::Info, "distinct"));
        assert!(!result.has_errors());
        assert_eq!(result.count(WarningKind::Info), 1);

        result.warnings.push(Warning::new(
            RuleCode::DestructiveWithoutWhere,
            WarningKind::Error,
            "no where",
        ));
        assert!(result.has_errors());
        assert!(result.has_warning(RuleCode::DestructiveWithoutWhere));
    }
}
