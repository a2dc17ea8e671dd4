//! SQL parsing using datafusion-sqlparser-rs
//!
//! Parses SQL into an AST for one dialect and turns every parser failure
//! into a normalized [`SyntaxError`]. Nothing raised by the grammar escapes
//! this module.

use std::panic::{self, AssertUnwindSafe};

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, Dialect as Grammar, GenericDialect, MsSqlDialect, MySqlDialect,
    PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::{Parser, ParserError};
use sqlcheck_core::{Dialect, SyntaxError};

use crate::normalize::normalize_error;
use crate::references::ReferenceCollector;

/// Message for empty or whitespace-only input
pub const EMPTY_QUERY: &str = "empty query";

/// Message used when the grammar fails without a usable diagnostic
pub const UNKNOWN_SYNTAX_ERROR: &str = "unknown syntax error";

/// Outcome of a syntax check
///
/// Exactly one of AST or error exists, tied to validity.
#[derive(Debug, Clone)]
pub enum SyntaxCheckResult {
    /// Parsed statements
    Valid(Vec<Statement>),

    /// Normalized parse failure
    Invalid(SyntaxError),
}

impl SyntaxCheckResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Get the error if parsing failed
    pub fn error(&self) -> Option<&SyntaxError> {
        match self {
            Self::Invalid(error) => Some(error),
            Self::Valid(_) => None,
        }
    }

    /// Get the statements if parsing succeeded
    pub fn ast(&self) -> Option<&[Statement]> {
        match self {
            Self::Valid(statements) => Some(statements),
            Self::Invalid(_) => None,
        }
    }

    /// Take the error, dropping the statements of a valid result
    pub fn into_error(self) -> Option<SyntaxError> {
        match self {
            Self::Invalid(error) => Some(error),
            Self::Valid(_) => None,
        }
    }
}

/// SQL parser bound to one dialect
pub struct SqlParser {
    dialect: Dialect,
    grammar: Box<dyn Grammar + Send + Sync>,
}

impl SqlParser {
    /// Create a new SQL parser with the default dialect (MySQL)
    pub fn new() -> Self {
        Self::from_dialect(Dialect::default())
    }

    /// Create a parser for a dialect
    pub fn from_dialect(dialect: Dialect) -> Self {
        let grammar: Box<dyn Grammar + Send + Sync> = match dialect {
            Dialect::MySql | Dialect::MariaDb => Box::new(MySqlDialect {}),
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::Sqlite => Box::new(SQLiteDialect {}),
            Dialect::TransactSql => Box::new(MsSqlDialect {}),
            Dialect::BigQuery => Box::new(BigQueryDialect {}),
            Dialect::Ansi => Box::new(GenericDialect {}),
        };

        Self { dialect, grammar }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Check whether `sql` parses
    ///
    /// Empty or whitespace-only input is invalid with [`EMPTY_QUERY`].
    /// Input made only of comments or separators parses to no statements
    /// and is reported the same way.
    pub fn parse_syntax(&self, sql: &str) -> SyntaxCheckResult {
        if sql.trim().is_empty() {
            return SyntaxCheckResult::Invalid(SyntaxError::new(EMPTY_QUERY));
        }

        guarded_parse(self.dialect, || Parser::parse_sql(self.grammar.as_ref(), sql))
    }

    /// Get the AST if `sql` is valid
    pub fn get_ast(&self, sql: &str) -> Option<Vec<Statement>> {
        match self.parse_syntax(sql) {
            SyntaxCheckResult::Valid(statements) => Some(statements),
            SyntaxCheckResult::Invalid(_) => None,
        }
    }

    /// Render statements back to SQL
    ///
    /// Statements are joined with `"; "`. An empty slice renders as an
    /// empty string.
    pub fn ast_to_sql(&self, ast: &[Statement]) -> String {
        ast.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Table names referenced by `sql`, in first-seen order
    ///
    /// Qualified names keep only their last part; CTE names are excluded.
    /// Returns an empty list if `sql` does not parse.
    pub fn extract_table_names(&self, sql: &str) -> Vec<String> {
        match self.get_ast(sql) {
            Some(statements) => ReferenceCollector::collect(&statements).into_tables(),
            None => Vec::new(),
        }
    }

    /// Column identifiers referenced by `sql`, in first-seen order
    ///
    /// Returns an empty list if `sql` does not parse.
    pub fn extract_column_references(&self, sql: &str) -> Vec<String> {
        match self.get_ast(sql) {
            Some(statements) => ReferenceCollector::collect(&statements).into_columns(),
            None => Vec::new(),
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a grammar call and classify its outcome
///
/// A panic inside the grammar is reported as [`UNKNOWN_SYNTAX_ERROR`].
fn guarded_parse<F>(dialect: Dialect, parse: F) -> SyntaxCheckResult
where
    F: FnOnce() -> Result<Vec<Statement>, ParserError>,
{
    match panic::catch_unwind(AssertUnwindSafe(parse)) {
        Ok(Ok(statements)) if statements.is_empty() => {
            SyntaxCheckResult::Invalid(SyntaxError::new(EMPTY_QUERY))
        }
        Ok(Ok(statements)) => SyntaxCheckResult::Valid(statements),
        Ok(Err(e)) => SyntaxCheckResult::Invalid(normalize_error(&e.to_string())),
        Err(_) => {
            tracing::warn!(dialect = %dialect, "SQL grammar panicked while parsing");
            SyntaxCheckResult::Invalid(SyntaxError::new(UNKNOWN_SYNTAX_ERROR))
        }
    }
}

/// Check whether `sql` parses for `dialect`
pub fn parse_syntax(sql: &str, dialect: Dialect) -> SyntaxCheckResult {
    SqlParser::from_dialect(dialect).parse_syntax(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_select() {
        let parser = SqlParser::new();
        let result = parser.parse_syntax("SELECT * FROM users");

        assert!(result.is_valid());
        assert!(result.error().is_none());
        assert_eq!(result.ast().unwrap().len(), 1);
    }

    #[test]
    fn parse_misspelled_keyword() {
        let result = parse_syntax("SELEC * FROM users", Dialect::MySql);

        assert!(!result.is_valid());
        assert!(result.ast().is_none());

        let error = result.error().unwrap();
        assert!(!error.message.is_empty());
        assert_eq!(error.line, Some(1));
        assert_eq!(error.column, Some(1));
    }

    #[test]
    fn empty_input_is_invalid() {
        for sql in ["", "   ", "\n\t"] {
            let result = parse_syntax(sql, Dialect::MySql);
            let error = result.error().unwrap();
            assert_eq!(error.message, EMPTY_QUERY);
            assert_eq!(error.line, None);
            assert_eq!(error.column, None);
        }
    }

    #[test]
    fn comment_only_input_is_invalid() {
        let result = parse_syntax("-- nothing here", Dialect::Ansi);
        assert_eq!(result.error().unwrap().message, EMPTY_QUERY);
    }

    #[test]
    fn error_position_on_later_line() {
        let sql = "SELECT id\nFROM users\nWHERE id = = 1";
        let result = parse_syntax(sql, Dialect::Postgres);

        let error = result.error().unwrap();
        assert_eq!(error.line, Some(3));
        assert!(error.column.is_some());
    }

    #[test]
    fn grammar_panic_becomes_unknown_error() {
        let result = guarded_parse(Dialect::MySql, || panic!("grammar bug"));

        let error = result.into_error().unwrap();
        assert_eq!(error.message, UNKNOWN_SYNTAX_ERROR);
        assert_eq!(error.line, None);
        assert_eq!(error.expected, None);
    }

    #[test]
    fn parser_error_is_normalized() {
        let result = guarded_parse(Dialect::Postgres, || {
            Err(ParserError::ParserError(
                "Expected: end of statement, found: x at Line: 2, Column: 5".to_string(),
            ))
        });

        let error = result.error().unwrap();
        assert_eq!(error.line, Some(2));
        assert_eq!(error.column, Some(5));
    }

    #[test]
    fn into_error_of_valid_result_is_none() {
        assert!(parse_syntax("SELECT 1", Dialect::Sqlite).into_error().is_none());
    }

    #[test]
    fn different_dialects() {
        let sql = "SELECT id FROM users";

        for dialect in Dialect::ALL {
            assert!(parse_syntax(sql, dialect).is_valid(), "{} rejected simple SQL", dialect);
        }
    }

    #[test]
    fn get_ast_and_render() {
        let parser = SqlParser::new();
        let ast = parser.get_ast("select id from users where id = 1").unwrap();

        assert_eq!(parser.ast_to_sql(&ast), "SELECT id FROM users WHERE id = 1");
        assert_eq!(parser.ast_to_sql(&[]), "");
        assert!(parser.get_ast("SELEC").is_none());
    }

    #[test]
    fn extraction_degrades_on_invalid_sql() {
        let parser = SqlParser::new();

        assert!(parser.extract_table_names("SELEC * FROM users").is_empty());
        assert!(parser.extract_column_references("").is_empty());
    }
}
