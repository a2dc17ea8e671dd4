//! Configuration schema (sqlcheck.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::diagnostic::{RuleCode, WarningKind};

/// SQL dialect
///
/// Closed set of grammars the parser adapter supports. `MySql` is the
/// default and stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Dialect {
    /// MySQL
    MySql,

    /// MariaDB (parsed with the MySQL grammar)
    MariaDb,

    /// PostgreSQL
    Postgres,

    /// SQLite
    Sqlite,

    /// Microsoft SQL Server (T-SQL)
    TransactSql,

    /// BigQuery standard SQL
    BigQuery,

    /// Generic ANSI SQL
    Ansi,
}

impl Dialect {
    /// Every supported dialect
    pub const ALL: [Dialect; 7] = [
        Self::MySql,
        Self::MariaDb,
        Self::Postgres,
        Self::Sqlite,
        Self::TransactSql,
        Self::BigQuery,
        Self::Ansi,
    ];

    /// Display name as the platform spells it
    pub fn name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
            Self::TransactSql => "TransactSQL",
            Self::BigQuery => "BigQuery",
            Self::Ansi => "ANSI",
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::MySql
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match tag.as_str() {
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            "transactsql" | "tsql" | "mssql" | "sqlserver" => Ok(Self::TransactSql),
            "bigquery" => Ok(Self::BigQuery),
            "ansi" | "generic" => Ok(Self::Ansi),
            _ => Err(ConfigError::UnknownDialect(s.to_string())),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Options for a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Grammar used for syntax checking
    #[serde(default)]
    pub dialect: Dialect,

    /// Run the parser adapter
    #[serde(default = "default_true")]
    pub run_syntax_check: bool,

    /// Run the logic rule engine
    #[serde(default = "default_true")]
    pub run_logic_analysis: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            run_syntax_check: true,
            run_logic_analysis: true,
        }
    }
}

impl CheckOptions {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn syntax_only(mut self) -> Self {
        self.run_logic_analysis = false;
        self
    }

    pub fn logic_only(mut self) -> Self {
        self.run_syntax_check = false;
        self
    }
}

/// Default debounce delay in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Options for a live (debounced) checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOptions {
    /// Quiet period before a scheduled check fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Options used by each dispatched check
    #[serde(flatten)]
    pub check: CheckOptions,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            check: CheckOptions::default(),
        }
    }
}

impl LiveOptions {
    /// Set debounce duration
    pub fn with_debounce(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_check(mut self, check: CheckOptions) -> Self {
        self.check = check;
        self
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

/// Rule table adjustments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rules that never run
    #[serde(default)]
    pub disabled: Vec<RuleCode>,

    /// Map of rule code to kind override
    #[serde(default)]
    pub kind: BTreeMap<RuleCode, WarningKind>,
}

impl RulesConfig {
    /// Check if a rule is disabled
    pub fn is_disabled(&self, code: RuleCode) -> bool {
        self.disabled.contains(&code)
    }

    /// Get kind for a rule, or default
    pub fn get_kind(&self, code: RuleCode, default: WarningKind) -> WarningKind {
        self.kind.get(&code).copied().unwrap_or(default)
    }

    /// Set kind override for a rule
    pub fn set_override(&mut self, code: RuleCode, kind: WarningKind) {
        self.kind.insert(code, kind);
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: Dialect,

    /// Run syntax checking
    #[serde(default = "default_true")]
    pub run_syntax_check: bool,

    /// Run logic analysis
    #[serde(default = "default_true")]
    pub run_logic_analysis: bool,

    /// Debounce delay for live checking
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Rule adjustments
    #[serde(default)]
    pub rules: RulesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            run_syntax_check: true,
            run_logic_analysis: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            rules: RulesConfig::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Options for one-shot checks
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            dialect: self.dialect,
            run_syntax_check: self.run_syntax_check,
            run_logic_analysis: self.run_logic_analysis,
        }
    }

    /// Options for live checking
    pub fn live_options(&self) -> LiveOptions {
        LiveOptions {
            debounce_ms: self.debounce_ms,
            check: self.check_options(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Unknown SQL dialect '{0}'")]
    UnknownDialect(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.debounce_ms, 300);
        assert!(config.run_syntax_check);
        assert!(config.run_logic_analysis);
    }

    #[test]
    fn dialect_spellings() {
        assert_eq!("MySQL".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("TransactSQL".parse::<Dialect>().unwrap(), Dialect::TransactSql);
        assert_eq!("big-query".parse::<Dialect>().unwrap(), Dialect::BigQuery);

        for dialect in Dialect::ALL {
            assert_eq!(dialect.name().parse::<Dialect>().unwrap(), dialect);
        }
    }

    #[test]
    fn unknown_dialect_is_config_error() {
        let err = "oracle".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDialect(ref d) if d == "oracle"));

        let err = Config::from_toml("dialect = \"oracle\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            dialect = "PostgreSQL"
            run_logic_analysis = false

            [rules]
            disabled = ["select-star"]

            [rules.kind]
            or-in-where = "info"
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect, Dialect::Postgres);
        assert!(config.run_syntax_check);
        assert!(!config.run_logic_analysis);
        assert_eq!(config.debounce_ms, 300);
        assert!(config.rules.is_disabled(RuleCode::SelectStar));
        assert_eq!(
            config.rules.get_kind(RuleCode::OrInWhere, WarningKind::Optimization),
            WarningKind::Info
        );
    }

    #[test]
    fn unknown_rule_code_rejected() {
        let result = Config::from_toml("[rules]\ndisabled = [\"no-such-rule\"]");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn kind_override() {
        let mut rules = RulesConfig::default();
        rules.set_override(RuleCode::SelectStar, WarningKind::Warning);

        assert_eq!(
            rules.get_kind(RuleCode::SelectStar, WarningKind::Optimization),
            WarningKind::Warning
        );
        assert_eq!(
            rules.get_kind(RuleCode::DistinctUsed, WarningKind::Info),
            WarningKind::Info
        );
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = Config::default();
        config.dialect = Dialect::Sqlite;
        config.rules.disabled.push(RuleCode::DistinctUsed);

        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn live_options_from_config() {
        let mut config = Config::default();
        config.debounce_ms = 50;
        config.run_syntax_check = false;

        let live = config.live_options();
        assert_eq!(live.debounce_ms, 50);
        assert!(!live.check.run_syntax_check);
        assert_eq!(live.debounce(), std::time::Duration::from_millis(50));
    }
}
