//! Query model: a small, typed `SELECT` builder rendered per dialect.
//!
//! # Module Structure
//! - `expr`: table references and the expression tree
//! - `render`: SQL text generation with bound parameters
//!
//! Query builders assemble a [`QuerySpec`] from catalog handles, optionally
//! narrow it with [`QuerySpec::project`], and hand it to the catalog for
//! execution. Every user-supplied value travels as a bound parameter.

pub mod expr;
pub mod render;

pub use expr::{Expr, TableRef, and, count_all, label, or};
pub use render::Statement;

use crate::{OmopError, Result};

/// SQL flavor a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Double-quotes an identifier, doubling embedded quotes.
    pub fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Placeholder for the `index`-th (1-based) bound parameter.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${}", index),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = OmopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(OmopError::configuration(format!(
                "Unknown SQL dialect '{}'",
                other
            ))),
        }
    }
}

/// One output column of a select.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: String,
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// A joined table and its condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
}

/// Sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub descending: bool,
}

/// A single `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
}

impl Select {
    /// Starts a select over `table` with no output columns yet.
    pub fn from(table: &TableRef) -> Self {
        Self {
            distinct: false,
            items: Vec::new(),
            from: table.clone(),
            joins: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Sets the output columns.
    pub fn columns(mut self, items: impl IntoIterator<Item = SelectItem>) -> Self {
        self.items = items.into_iter().collect();
        self
    }

    /// Adds an inner join.
    pub fn join(mut self, table: &TableRef, on: Expr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: table.clone(),
            on,
        });
        self
    }

    /// Adds a left outer join.
    pub fn left_join(mut self, table: &TableRef, on: Expr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table: table.clone(),
            on,
        });
        self
    }

    /// Sets the `WHERE` clause.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Adds `WHERE` conditions, keeping any existing ones.
    pub fn and_filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(Expr::And(mut parts)) => {
                parts.push(expr);
                Expr::And(parts)
            }
            Some(existing) => and([existing, expr]),
            None => expr,
        });
        self
    }

    /// Sets the grouping keys.
    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.group_by = exprs.into_iter().collect();
        self
    }

    /// Appends an ascending sort key.
    pub fn order_by(mut self, expr: Expr) -> Self {
        self.order_by.push(OrderBy {
            expr,
            descending: false,
        });
        self
    }

    /// Appends a descending sort key.
    pub fn order_by_desc(mut self, expr: Expr) -> Self {
        self.order_by.push(OrderBy {
            expr,
            descending: true,
        });
        self
    }

    /// Removes duplicate rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    fn column_names(&self) -> Vec<String> {
        self.items.iter().map(|i| i.alias.clone()).collect()
    }

    fn retain_columns(&mut self, keep: &[&str]) {
        self.items.retain(|item| keep.contains(&item.alias.as_str()));
    }
}

/// A complete query: one select, or several concatenated with `UNION ALL`.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    Select(Select),
    UnionAll(Vec<Select>),
}

impl From<Select> for QuerySpec {
    fn from(select: Select) -> Self {
        QuerySpec::Select(select)
    }
}

impl QuerySpec {
    /// Output column names in projection order.
    pub fn columns(&self) -> Vec<String> {
        match self {
            QuerySpec::Select(select) => select.column_names(),
            QuerySpec::UnionAll(selects) => selects
                .first()
                .map(Select::column_names)
                .unwrap_or_default(),
        }
    }

    /// Narrows the projection to `return_columns`.
    ///
    /// Default column order is kept and unknown names are ignored. `None`
    /// leaves the query unchanged.
    ///
    /// # Errors
    /// Returns `InvalidQuery` if none of the requested names is an output
    /// column of this query.
    pub fn project(mut self, return_columns: Option<&[&str]>) -> Result<Self> {
        let Some(keep) = return_columns else {
            return Ok(self);
        };

        match &mut self {
            QuerySpec::Select(select) => select.retain_columns(keep),
            QuerySpec::UnionAll(selects) => {
                for select in selects.iter_mut() {
                    select.retain_columns(keep);
                }
            }
        }

        if self.columns().is_empty() {
            return Err(OmopError::invalid_query(format!(
                "none of the requested columns [{}] are returned by this query",
                keep.join(", ")
            )));
        }

        tracing::debug!("Projected query to columns: {:?}", self.columns());
        Ok(self)
    }

    /// Renders the query for a dialect.
    pub fn render(&self, dialect: Dialect) -> Statement {
        render::render(self, dialect)
    }
}
