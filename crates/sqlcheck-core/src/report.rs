//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{CheckerResult, WarningKind};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of inputs checked
    pub inputs_checked: usize,

    /// Number of inputs that failed to parse
    pub syntax_errors: usize,

    /// Number of error-kind warnings
    pub errors: usize,

    /// Number of warning-kind warnings
    pub warnings: usize,

    /// Number of info warnings
    pub info: usize,

    /// Number of optimization warnings
    pub optimizations: usize,
}

impl ReportSummary {
    fn record(&mut self, result: &CheckerResult) {
        self.inputs_checked += 1;
        if !result.is_valid {
            self.syntax_errors += 1;
        }
        self.errors += result.count(WarningKind::Error);
        self.warnings += result.count(WarningKind::Warning);
        self.info += result.count(WarningKind::Info);
        self.optimizations += result.count(WarningKind::Optimization);
    }
}

/// Check result for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    /// File path, or `<stdin>`
    pub source: String,

    /// Check outcome
    pub result: CheckerResult,
}

/// Check report (report.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Per-input results
    pub files: Vec<FileReport>,

    /// Metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            files: Vec::new(),
            metadata: None,
        }
    }

    /// Add a result to the report
    pub fn add_result(&mut self, source: impl Into<String>, result: CheckerResult) {
        self.summary.record(&result);
        self.files.push(FileReport {
            source: source.into(),
            result,
        });
    }

    /// Check if any input has a syntax error or an error-kind warning
    pub fn has_errors(&self) -> bool {
        self.summary.syntax_errors > 0 || self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{RuleCode, SyntaxError, Warning};

    #[test]
    fn empty_report() {
        let report = Report::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.inputs_checked, 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn report_with_results() {
        let mut report = Report::new();

        let mut clean = CheckerResult::empty();
        clean.warnings.push(Warning::new(RuleCode::DistinctUsed, WarningKind::Info, "distinct"));
        report.add_result("a.sql", clean);

        report.add_result(
            "b.sql",
            CheckerResult {
                is_valid: false,
                syntax_error: Some(SyntaxError::new("Expected: an SQL statement")),
                warnings: Vec::new(),
            },
        );

        assert_eq!(report.summary.inputs_checked, 2);
        assert_eq!(report.summary.syntax_errors, 1);
        assert_eq!(report.summary.info, 1);
        assert!(report.has_errors());
    }

    #[test]
    fn error_warning_fails_report() {
        let mut report = Report::new();
        let mut result = CheckerResult::empty();
        result.warnings.push(Warning::new(
            RuleCode::DestructiveWithoutWhere,
            WarningKind::Error,
            "no where",
        ));
        report.add_result("<stdin>", result);

        assert_eq!(report.summary.errors, 1);
        assert!(report.has_errors());
    }

    #[test]
    fn report_serialization() {
        let report = Report::new();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"files\""));
    }
}
