//! Logic rule engine
//!
//! A fixed, ordered table of independent heuristics over raw SQL text. Each
//! rule that matches emits one [`Warning`] built from its static fields.
//!
//! Rules read the text, not the AST, so they still apply to statements the
//! parser would reject and do not depend on one grammar's tree shape. They
//! are heuristics: false positives on unusual input are accepted as long as
//! the same input always gives the same warnings.

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::Regex;
use sqlcheck_core::{RuleCode, RulesConfig, Warning, WarningKind};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).unwrap());
    };
}

pattern!(SELECT, r"(?i)\bselect\b");
pattern!(AGGREGATE_CALL, r"(?i)\b(count|sum|avg|max|min)\s*\(");
pattern!(GROUP_BY, r"(?i)\bgroup\s+by\b");
pattern!(JOIN, r"(?i)\bjoin\b");
pattern!(QUALIFIED_JOIN, r"(?i)\b(left|right|full|cross|inner)\s+(outer\s+)?join\b");
pattern!(LIMIT, r"(?i)\blimit\b");
pattern!(ORDER_BY, r"(?i)\border\s+by\b");
pattern!(WHERE, r"(?i)\bwhere\b");
pattern!(OR, r"(?i)\bor\b");
pattern!(DESTRUCTIVE, r"(?i)(?:^|;)\s*(?:delete\s+from|update)\b");
pattern!(LIKE_LITERAL, r#"(?i)\blike\s+['"]([^'"]+)['"]"#);
pattern!(FROM_LIST, r"(?i)\bfrom\s+[\w.]+(?:\s+(?:as\s+)?\w+)?\s*,\s*[\w.]+");
pattern!(TABLE_INTRO, r"(?i)\b(?:from|join)\b|,");
pattern!(ALIASED_TABLE, r"(?i)^\s*[\w.]+\s+(?:as\s+)?(\w+)");

/// Words that can follow a table name without being its alias
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "join", "inner", "left", "right", "full", "cross", "outer", "natural", "on",
    "using", "group", "order", "having", "limit", "offset", "fetch", "union", "except",
    "intersect", "window", "set", "values", "select", "from", "into", "and", "or", "as",
    "straight_join", "lateral", "for", "returning",
];

/// How a rule decides whether it applies
pub enum Matcher {
    /// Precompiled pattern, matches when found anywhere in the text
    Pattern(Regex),

    /// Arbitrary pure predicate over the text
    Predicate(fn(&str) -> bool),
}

impl Matcher {
    pub fn matches(&self, sql: &str) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(sql),
            Self::Predicate(predicate) => predicate(sql),
        }
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// A single logic rule
#[derive(Debug)]
pub struct LogicRule {
    pub code: RuleCode,
    pub kind: WarningKind,
    pub message: &'static str,
    pub suggestion: Option<&'static str>,
    matcher: Matcher,
}

impl LogicRule {
    pub fn new(
        code: RuleCode,
        kind: WarningKind,
        message: &'static str,
        suggestion: Option<&'static str>,
        matcher: Matcher,
    ) -> Self {
        Self {
            code,
            kind,
            message,
            suggestion,
            matcher,
        }
    }

    /// Rule backed by a regular expression
    ///
    /// Panics if `pattern` is not a valid expression; rule tables are
    /// static data.
    pub fn pattern(
        code: RuleCode,
        kind: WarningKind,
        message: &'static str,
        suggestion: Option<&'static str>,
        pattern: &str,
    ) -> Self {
        let regex = Regex::new(pattern).unwrap_or_else(|e| panic!("rule {}: {}", code, e));
        Self::new(code, kind, message, suggestion, Matcher::Pattern(regex))
    }

    /// Rule backed by a predicate
    pub fn predicate(
        code: RuleCode,
        kind: WarningKind,
        message: &'static str,
        suggestion: Option<&'static str>,
        predicate: fn(&str) -> bool,
    ) -> Self {
        Self::new(code, kind, message, suggestion, Matcher::Predicate(predicate))
    }

    pub fn matches(&self, sql: &str) -> bool {
        self.matcher.matches(sql)
    }

    /// Build the warning this rule emits
    pub fn warning(&self) -> Warning {
        let warning = Warning::new(self.code, self.kind, self.message);
        match self.suggestion {
            Some(suggestion) => warning.with_suggestion(suggestion),
            None => warning,
        }
    }
}

/// Ordered, immutable rule table
///
/// Registration order is warning order.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<LogicRule>,
}

impl RuleSet {
    /// Create a rule set from rules in evaluation order
    pub fn new(rules: Vec<LogicRule>) -> Self {
        Self { rules }
    }

    /// The built-in rule table
    pub fn baseline() -> Self {
        use RuleCode::*;

        Self::new(vec![
            LogicRule::predicate(
                AggregateWithoutGroupBy,
                WarningKind::Warning,
                "Aggregate function (COUNT, SUM, AVG, MAX, MIN) used without GROUP BY",
                Some("Add GROUP BY for the non-aggregated columns"),
                aggregate_without_group_by,
            ),
            LogicRule::predicate(
                BareJoinPreferOuter,
                WarningKind::Info,
                "Plain JOIN is an INNER JOIN and drops rows without a match",
                Some("Use LEFT JOIN if every row from the left table must be kept"),
                bare_join,
            ),
            LogicRule::predicate(
                LimitWithoutOrderBy,
                WarningKind::Warning,
                "LIMIT used without ORDER BY",
                Some("Add ORDER BY so the returned rows are deterministic"),
                limit_without_order_by,
            ),
            LogicRule::pattern(
                SelectStar,
                WarningKind::Optimization,
                "SELECT * is discouraged in production queries",
                Some("List only the columns you need"),
                r"(?i)\bselect\s+\*",
            ),
            LogicRule::predicate(
                DestructiveWithoutWhere,
                WarningKind::Error,
                "DELETE/UPDATE without WHERE affects every row in the table",
                Some("Add a WHERE clause to limit the affected rows"),
                destructive_without_where,
            ),
            LogicRule::pattern(
                NullEquality,
                WarningKind::Warning,
                "Comparing with NULL using = or != never matches",
                Some("Use IS NULL or IS NOT NULL"),
                r"(?i)(?:=|!=|<>)\s*null\b",
            ),
            LogicRule::predicate(
                OrInWhere,
                WarningKind::Optimization,
                "OR in WHERE may prevent efficient index use",
                Some("Consider UNION or IN (...) instead"),
                or_in_where,
            ),
            LogicRule::pattern(
                DistinctUsed,
                WarningKind::Info,
                "DISTINCT can be expensive",
                Some("Check whether the query can avoid producing duplicates"),
                r"(?i)\bselect\s+distinct\b",
            ),
            LogicRule::pattern(
                AmbiguousEqualitySubquery,
                WarningKind::Warning,
                "Subquery compared with = fails if it returns more than one row",
                Some("Use IN or EXISTS when the subquery can return several rows"),
                r"(?is)\bwhere\b.*=\s*\(\s*select\b",
            ),
            LogicRule::predicate(
                MissingTableAlias,
                WarningKind::Info,
                "Several tables are used without aliases",
                Some("Give each table a short alias (AS) to keep the query readable"),
                missing_table_alias,
            ),
            LogicRule::pattern(
                NonStandardNotEqual,
                WarningKind::Info,
                "!= is not standard SQL",
                Some("Use <> for portability across databases"),
                r"!=",
            ),
            LogicRule::predicate(
                LikeWithoutWildcard,
                WarningKind::Warning,
                "LIKE used without a wildcard (% or _)",
                Some("Use = when no pattern matching is needed"),
                like_without_wildcard,
            ),
            LogicRule::pattern(
                OrdinalOrderBy,
                WarningKind::Info,
                "ORDER BY uses a column position instead of a column name",
                Some("Order by column name to keep the query maintainable"),
                r"(?i)\border\s+by\s+\d+\b",
            ),
            LogicRule::predicate(
                ImplicitCartesianProduct,
                WarningKind::Error,
                "Cartesian product: several tables listed in FROM without a join condition",
                Some("Add a WHERE or ON condition that relates the tables"),
                implicit_cartesian_product,
            ),
        ])
    }

    /// The built-in table with disabled rules removed and kind overrides applied
    pub fn from_config(config: &RulesConfig) -> Self {
        let rules = Self::baseline()
            .rules
            .into_iter()
            .filter(|rule| !config.is_disabled(rule.code))
            .map(|mut rule| {
                rule.kind = config.get_kind(rule.code, rule.kind);
                rule
            })
            .collect();

        Self::new(rules)
    }

    pub fn rules(&self) -> &[LogicRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `sql` in order
    ///
    /// Empty input yields no warnings. A rule that panics is skipped and
    /// logged; the remaining rules still run.
    pub fn analyze(&self, sql: &str) -> Vec<Warning> {
        if sql.trim().is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .filter(|rule| evaluate(rule, sql))
            .map(LogicRule::warning)
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::baseline()
    }
}

static BASELINE: LazyLock<RuleSet> = LazyLock::new(RuleSet::baseline);

/// Run the built-in rule table against `sql`
pub fn analyze_logic(sql: &str) -> Vec<Warning> {
    BASELINE.analyze(sql)
}

fn evaluate(rule: &LogicRule, sql: &str) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.matches(sql))) {
        Ok(matched) => matched,
        Err(_) => {
            tracing::warn!(rule = %rule.code, "logic rule panicked, skipping it");
            false
        }
    }
}

fn aggregate_without_group_by(sql: &str) -> bool {
    SELECT.is_match(sql) && AGGREGATE_CALL.is_match(sql) && !GROUP_BY.is_match(sql)
}

fn bare_join(sql: &str) -> bool {
    JOIN.is_match(sql) && !QUALIFIED_JOIN.is_match(sql)
}

fn limit_without_order_by(sql: &str) -> bool {
    LIMIT.is_match(sql) && !ORDER_BY.is_match(sql)
}

fn destructive_without_where(sql: &str) -> bool {
    DESTRUCTIVE.is_match(sql) && !WHERE.is_match(sql)
}

fn or_in_where(sql: &str) -> bool {
    WHERE.is_match(sql) && OR.is_match(sql)
}

fn missing_table_alias(sql: &str) -> bool {
    let multiple_tables = JOIN.is_match(sql) || FROM_LIST.is_match(sql);
    if !multiple_tables {
        return false;
    }

    let has_alias = TABLE_INTRO.find_iter(sql).any(|intro| {
        ALIASED_TABLE
            .captures(&sql[intro.end()..])
            .is_some_and(|caps| !CLAUSE_KEYWORDS.contains(&caps[1].to_ascii_lowercase().as_str()))
    });

    !has_alias
}

fn like_without_wildcard(sql: &str) -> bool {
    LIKE_LITERAL
        .captures_iter(sql)
        .any(|caps| !caps[1].contains('%') && !caps[1].contains('_'))
}

fn implicit_cartesian_product(sql: &str) -> bool {
    FROM_LIST.is_match(sql) && !WHERE.is_match(sql) && !JOIN.is_match(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn codes(sql: &str) -> Vec<RuleCode> {
        analyze_logic(sql).into_iter().map(|w| w.code).collect()
    }

    #[test]
    fn baseline_order_matches_registry() {
        let baseline = RuleSet::baseline();
        let order: Vec<RuleCode> = baseline.rules().iter().map(|r| r.code).collect();
        assert_eq!(order, RuleCode::ALL.to_vec());
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(analyze_logic("").is_empty());
        assert!(analyze_logic("  \n ").is_empty());
    }

    #[test]
    fn delete_without_where() {
        let warnings = analyze_logic("DELETE FROM users");
        let warning = warnings
            .iter()
            .find(|w| w.code == RuleCode::DestructiveWithoutWhere)
            .unwrap();

        assert_eq!(warning.kind, WarningKind::Error);
        assert!(warning.suggestion.is_some());
        assert_eq!(warning.line, None);
    }

    #[test]
    fn update_without_where() {
        assert!(codes("UPDATE users SET active = 0").contains(&RuleCode::DestructiveWithoutWhere));
        assert!(!codes("UPDATE users SET active = 0 WHERE id = 3")
            .contains(&RuleCode::DestructiveWithoutWhere));
        assert!(!codes("SELECT * FROM users FOR UPDATE").contains(&RuleCode::DestructiveWithoutWhere));
    }

    #[test]
    fn select_star_with_where() {
        let found = codes("SELECT * FROM users WHERE id = 1");
        assert!(found.contains(&RuleCode::SelectStar));
        assert!(!found.contains(&RuleCode::DestructiveWithoutWhere));
    }

    #[test]
    fn aggregate_rules() {
        assert!(codes("SELECT COUNT(*) FROM orders").contains(&RuleCode::AggregateWithoutGroupBy));
        assert!(!codes("SELECT user_id, COUNT(*) FROM orders GROUP BY user_id")
            .contains(&RuleCode::AggregateWithoutGroupBy));
    }

    #[test]
    fn join_qualification() {
        assert!(codes("SELECT a.id FROM a JOIN b ON a.id = b.a_id").contains(&RuleCode::BareJoinPreferOuter));
        assert!(!codes("SELECT a.id FROM a LEFT OUTER JOIN b ON a.id = b.a_id")
            .contains(&RuleCode::BareJoinPreferOuter));
        assert!(!codes("SELECT a.id FROM a INNER JOIN b ON a.id = b.a_id")
            .contains(&RuleCode::BareJoinPreferOuter));
    }

    #[test]
    fn limit_and_ordinals() {
        assert!(codes("SELECT id FROM t LIMIT 5").contains(&RuleCode::LimitWithoutOrderBy));

        let found = codes("SELECT id, name FROM t ORDER BY 2 LIMIT 5");
        assert!(!found.contains(&RuleCode::LimitWithoutOrderBy));
        assert!(found.contains(&RuleCode::OrdinalOrderBy));
    }

    #[test]
    fn null_comparisons() {
        assert!(codes("SELECT id FROM t WHERE a = NULL").contains(&RuleCode::NullEquality));
        assert!(codes("SELECT id FROM t WHERE a <> null").contains(&RuleCode::NullEquality));
        assert!(!codes("SELECT id FROM t WHERE a IS NULL").contains(&RuleCode::NullEquality));
    }

    #[test]
    fn not_equal_operator() {
        let found = codes("SELECT id FROM t WHERE a != 1");
        assert!(found.contains(&RuleCode::NonStandardNotEqual));
        assert!(!codes("SELECT id FROM t WHERE a <> 1").contains(&RuleCode::NonStandardNotEqual));
    }

    #[test]
    fn or_and_distinct() {
        assert!(codes("SELECT id FROM t WHERE a = 1 OR b = 2").contains(&RuleCode::OrInWhere));
        assert!(!codes("SELECT id FROM t ORDER BY id").contains(&RuleCode::OrInWhere));
        assert!(codes("SELECT DISTINCT city FROM t").contains(&RuleCode::DistinctUsed));
    }

    #[test]
    fn equality_subquery_across_lines() {
        let sql = "SELECT name FROM users\nWHERE id =\n  (SELECT user_id FROM orders)";
        assert!(codes(sql).contains(&RuleCode::AmbiguousEqualitySubquery));
        assert!(!codes("SELECT name FROM users WHERE id IN (SELECT user_id FROM orders)")
            .contains(&RuleCode::AmbiguousEqualitySubquery));
    }

    #[test]
    fn like_patterns() {
        assert!(codes("SELECT id FROM t WHERE name LIKE 'bob'").contains(&RuleCode::LikeWithoutWildcard));
        assert!(!codes("SELECT id FROM t WHERE name LIKE 'bo%'").contains(&RuleCode::LikeWithoutWildcard));
        assert!(!codes("SELECT id FROM t WHERE name LIKE 'b_b'").contains(&RuleCode::LikeWithoutWildcard));
    }

    #[test]
    fn table_aliases() {
        assert!(codes("SELECT users.id FROM users JOIN orders ON users.id = orders.user_id")
            .contains(&RuleCode::MissingTableAlias));
        assert!(!codes("SELECT u.id FROM users u JOIN orders AS o ON u.id = o.user_id")
            .contains(&RuleCode::MissingTableAlias));
        assert!(!codes("SELECT id, name FROM users WHERE id = 1").contains(&RuleCode::MissingTableAlias));
    }

    #[test]
    fn cartesian_product() {
        let found = codes("SELECT * FROM users, orders");
        assert!(found.contains(&RuleCode::ImplicitCartesianProduct));
        assert!(found.contains(&RuleCode::MissingTableAlias));

        assert!(codes("SELECT * FROM users u, orders o").contains(&RuleCode::ImplicitCartesianProduct));
        assert!(!codes("SELECT * FROM users u, orders o WHERE u.id = o.user_id")
            .contains(&RuleCode::ImplicitCartesianProduct));
    }

    #[test]
    fn many_rules_in_registration_order() {
        let found = codes("SELECT DISTINCT * FROM t WHERE a != NULL OR b = 1 LIMIT 3");
        assert_eq!(
            found,
            vec![
                RuleCode::LimitWithoutOrderBy,
                RuleCode::NullEquality,
                RuleCode::OrInWhere,
                RuleCode::DistinctUsed,
                RuleCode::NonStandardNotEqual,
            ]
        );
    }

    #[test]
    fn deterministic() {
        let sql = "SELECT * FROM a, b LIMIT 1";
        assert_eq!(analyze_logic(sql), analyze_logic(sql));
    }

    #[test]
    fn config_disables_and_overrides() {
        let mut config = RulesConfig::default();
        config.disabled.push(RuleCode::SelectStar);
        config.set_override(RuleCode::LimitWithoutOrderBy, WarningKind::Error);

        let rules = RuleSet::from_config(&config);
        assert_eq!(rules.len(), RuleCode::ALL.len() - 1);

        let warnings = rules.analyze("SELECT * FROM t LIMIT 1");
        assert!(!warnings.iter().any(|w| w.code == RuleCode::SelectStar));
        let limit = warnings
            .iter()
            .find(|w| w.code == RuleCode::LimitWithoutOrderBy)
            .unwrap();
        assert_eq!(limit.kind, WarningKind::Error);
    }

    #[test]
    fn panicking_rule_is_isolated() {
        fn explode(_: &str) -> bool {
            panic!("broken rule")
        }

        let rules = RuleSet::new(vec![
            LogicRule::predicate(RuleCode::DistinctUsed, WarningKind::Info, "boom", None, explode),
            LogicRule::pattern(
                RuleCode::SelectStar,
                WarningKind::Optimization,
                "star",
                None,
                r"(?i)select\s+\*",
            ),
        ]);

        let warnings = rules.analyze("SELECT * FROM t");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, RuleCode::SelectStar);
        assert_eq!(warnings[0].suggestion, None);
    }
}
