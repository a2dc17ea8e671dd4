//! sqlcheck Core
//!
//! Core domain model with stable, versioned types.
//! Never rename rule codes - they are part of the public API.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{
    CheckerResult, MarkerRange, RuleCode, SyntaxError, Warning, WarningKind,
};
pub use report::{FileReport, Report, ReportSummary, ReportVersion};
pub use config::{CheckOptions, Config, ConfigError, Dialect, LiveOptions, RulesConfig};
