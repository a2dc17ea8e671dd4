//! Table and column reference extraction
//!
//! Walks parsed statements and collects the tables and column identifiers
//! they mention. Used by callers outside the check path (exercise tooling,
//! the `tables` CLI command); the validity pipeline never needs it.

use std::collections::HashSet;
use std::ops::ControlFlow;

use sqlparser::ast::{Expr, ObjectName, Query, Statement, Visit, Visitor};

/// Collects table and column references from an AST
#[derive(Debug, Default)]
pub struct ReferenceCollector {
    /// CTE names (lowercased), excluded from the table list
    ctes: HashSet<String>,

    /// Table names in first-seen order
    tables: Vec<String>,

    /// Column identifiers in first-seen order
    columns: Vec<String>,
}

impl ReferenceCollector {
    /// Walk every statement
    pub fn collect(statements: &[Statement]) -> Self {
        let mut collector = Self::default();

        for statement in statements {
            // The collector never breaks out of the walk.
            let _ = statement.visit(&mut collector);
        }

        collector
    }

    /// Table names, CTE names removed
    pub fn into_tables(self) -> Vec<String> {
        let ctes = self.ctes;
        self.tables
            .into_iter()
            .filter(|table| !ctes.contains(&table.to_lowercase()))
            .collect()
    }

    /// Column identifiers, dotted when qualified
    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }

    /// Check if a name was defined as a CTE
    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.contains(&name.to_lowercase())
    }
}

impl Visitor for ReferenceCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.to_lowercase());
            }
        }

        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if let Some(ident) = relation.0.last() {
            push_unique(&mut self.tables, ident.value.clone());
        }

        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        match expr {
            Expr::Identifier(ident) => push_unique(&mut self.columns, ident.value.clone()),
            Expr::CompoundIdentifier(idents) => {
                let name = idents
                    .iter()
                    .map(|ident| ident.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                push_unique(&mut self.columns, name);
            }
            _ => {}
        }

        ControlFlow::Continue(())
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
