//! Expression tree for filters, projections and join conditions.

use super::{Select, SelectItem};
use crate::models::{TableHandle, Value};
use crate::{OmopError, Result};
use std::sync::Arc;

/// A table taking part in a query, under an alias.
///
/// Column references are resolved through [`TableRef::col`], which checks
/// the column against the discovered table so that a misspelled or absent
/// column fails before any SQL reaches the database.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    handle: Arc<TableHandle>,
    alias: String,
}

impl TableRef {
    /// Wraps a discovered table under an alias.
    pub fn new(handle: Arc<TableHandle>, alias: impl Into<String>) -> Self {
        Self {
            handle,
            alias: alias.into(),
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.handle.name
    }

    /// Schema the table was discovered in.
    pub fn schema(&self) -> Option<&str> {
        self.handle.schema.as_deref()
    }

    /// Alias used inside the statement.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Underlying table handle.
    pub fn handle(&self) -> &TableHandle {
        &self.handle
    }

    /// Column reference, checked against the discovered columns.
    ///
    /// # Errors
    /// Returns `NotFound` if the table has no such column.
    pub fn col(&self, name: &str) -> Result<Expr> {
        if !self.handle.has_column(name) {
            return Err(OmopError::not_found(
                format!("column '{}'", name),
                format!("table '{}'", self.handle.name),
            ));
        }
        Ok(Expr::Column {
            table: self.alias.clone(),
            column: name.to_string(),
        })
    }
}

/// SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `alias.column`
    Column { table: String, column: String },
    /// Bound parameter
    Param(Value),
    /// Inline string literal, used for constant output labels
    Label(String),
    /// `LOWER(expr)`
    Lower(Box<Expr>),
    /// `COUNT(*)`
    CountAll,
    /// `COUNT(DISTINCT expr)`
    CountDistinct(Box<Expr>),
    /// `lhs = rhs`
    Eq(Box<Expr>, Box<Expr>),
    /// `lhs <> rhs`
    NotEq(Box<Expr>, Box<Expr>),
    /// `expr IN (?, ?, ...)`
    InList(Box<Expr>, Vec<Value>),
    /// `expr IN (SELECT ...)`
    InSubquery(Box<Expr>, Box<Select>),
    /// Case-insensitive substring match
    Contains(Box<Expr>, String),
    /// `expr IS NOT NULL`
    IsNotNull(Box<Expr>),
    /// Conjunction; empty renders as true
    And(Vec<Expr>),
    /// Disjunction; empty renders as false
    Or(Vec<Expr>),
}

impl Expr {
    /// `self = other`
    pub fn equals(self, other: Expr) -> Expr {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    /// `self = ?` with a bound value
    pub fn equals_value(self, value: impl Into<Value>) -> Expr {
        self.equals(Expr::Param(value.into()))
    }

    /// `self <> other`
    pub fn not_equals(self, other: Expr) -> Expr {
        Expr::NotEq(Box::new(self), Box::new(other))
    }

    /// `self IN (...)` over bound values
    pub fn in_list<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::InList(
            Box::new(self),
            values.into_iter().map(Into::into).collect(),
        )
    }

    /// `self IN (SELECT ...)`
    pub fn in_subquery(self, select: Select) -> Expr {
        Expr::InSubquery(Box::new(self), Box::new(select))
    }

    /// Case-insensitive substring match against `keyword`
    pub fn contains(self, keyword: impl Into<String>) -> Expr {
        Expr::Contains(Box::new(self), keyword.into())
    }

    /// `LOWER(self)`
    pub fn lower(self) -> Expr {
        Expr::Lower(Box::new(self))
    }

    /// `self IS NOT NULL`
    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    /// Projects this expression under an output name.
    pub fn alias(self, name: impl Into<String>) -> SelectItem {
        SelectItem {
            expr: self,
            alias: name.into(),
        }
    }

    /// Projects a column under its own name.
    ///
    /// Non-column expressions fall back to `expr` as the output name.
    pub fn named(self) -> SelectItem {
        let alias = match &self {
            Expr::Column { column, .. } => column.clone(),
            _ => "expr".to_string(),
        };
        SelectItem { expr: self, alias }
    }
}

/// Conjunction of all expressions.
pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::And(exprs.into_iter().collect())
}

/// Disjunction of all expressions.
pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Or(exprs.into_iter().collect())
}

/// Constant text output.
pub fn label(text: impl Into<String>) -> Expr {
    Expr::Label(text.into())
}

/// `COUNT(*)`
pub fn count_all() -> Expr {
    Expr::CountAll
}

/// Escapes `LIKE` metacharacters and wraps the keyword in `%`.
///
/// Case is left alone; the rendered SQL lowers both sides.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive `REGEXP` pattern matching the keyword literally.
pub(crate) fn regexp_pattern(keyword: &str) -> String {
    format!("(?i){}", regex::escape(keyword))
}
