//! SQL text generation.

use super::{Dialect, Expr, JoinKind, QuerySpec, Select, TableRef};
use crate::models::Value;

/// Rendered SQL and its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// A statement with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

struct Renderer {
    dialect: Dialect,
    sql: String,
    params: Vec<Value>,
}

pub(super) fn render(query: &QuerySpec, dialect: Dialect) -> Statement {
    let mut r = Renderer {
        dialect,
        sql: String::new(),
        params: Vec::new(),
    };

    match query {
        QuerySpec::Select(select) => r.select(select),
        QuerySpec::UnionAll(selects) => {
            for (i, select) in selects.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(" UNION ALL ");
                }
                r.select(select);
            }
        }
    }

    Statement {
        sql: r.sql,
        params: r.params,
    }
}

impl Renderer {
    fn ident(&mut self, ident: &str) {
        let quoted = self.dialect.quote_ident(ident);
        self.sql.push_str(&quoted);
    }

    fn param(&mut self, value: &Value) {
        self.params.push(value.clone());
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn table(&mut self, table: &TableRef) {
        if let Some(schema) = table.schema() {
            self.ident(schema);
            self.sql.push('.');
        }
        self.ident(table.name());
        self.sql.push_str(" AS ");
        self.ident(table.alias());
    }

    fn list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.expr(expr);
        }
    }

    fn select(&mut self, select: &Select) {
        self.sql.push_str("SELECT ");
        if select.distinct {
            self.sql.push_str("DISTINCT ");
        }
        for (i, item) in select.items.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.expr(&item.expr);
            self.sql.push_str(" AS ");
            self.ident(&item.alias);
        }

        self.sql.push_str(" FROM ");
        self.table(&select.from);

        for join in &select.joins {
            self.sql.push_str(match join.kind {
                JoinKind::Inner => " JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            self.table(&join.table);
            self.sql.push_str(" ON ");
            self.expr(&join.on);
        }

        if let Some(filter) = &select.filter {
            self.sql.push_str(" WHERE ");
            self.expr(filter);
        }

        if !select.group_by.is_empty() {
            self.sql.push_str(" GROUP BY ");
            self.list(&select.group_by);
        }

        if !select.order_by.is_empty() {
            self.sql.push_str(" ORDER BY ");
            for (i, key) in select.order_by.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.expr(&key.expr);
                if key.descending {
                    self.sql.push_str(" DESC");
                }
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column { table, column } => {
                self.ident(table);
                self.sql.push('.');
                self.ident(column);
            }
            Expr::Param(value) => self.param(value),
            Expr::Label(text) => {
                self.sql.push('\'');
                self.sql.push_str(&text.replace('\'', "''"));
                self.sql.push('\'');
            }
            Expr::Lower(inner) => {
                self.sql.push_str("LOWER(");
                self.expr(inner);
                self.sql.push(')');
            }
            Expr::CountAll => self.sql.push_str("COUNT(*)"),
            Expr::CountDistinct(inner) => {
                self.sql.push_str("COUNT(DISTINCT ");
                self.expr(inner);
                self.sql.push(')');
            }
            Expr::Eq(lhs, rhs) => self.binary(lhs, " = ", rhs),
            Expr::NotEq(lhs, rhs) => self.binary(lhs, " <> ", rhs),
            Expr::InList(lhs, values) => {
                // An empty IN list is a syntax error on both backends.
                if values.is_empty() {
                    self.sql.push_str("1 = 0");
                    return;
                }
                self.expr(lhs);
                self.sql.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.param(value);
                }
                self.sql.push(')');
            }
            Expr::InSubquery(lhs, select) => {
                self.expr(lhs);
                self.sql.push_str(" IN (");
                self.select(select);
                self.sql.push(')');
            }
            // SQLite's LOWER and LIKE only fold ASCII letters
            Expr::Contains(inner, keyword) => match self.dialect {
                Dialect::Sqlite => {
                    self.expr(inner);
                    self.sql.push_str(" REGEXP ");
                    self.param(&Value::Text(super::expr::regexp_pattern(keyword)));
                }
                Dialect::Postgres => {
                    self.sql.push_str("LOWER(");
                    self.expr(inner);
                    self.sql.push_str(") LIKE LOWER(");
                    self.param(&Value::Text(super::expr::like_pattern(keyword)));
                    self.sql.push_str(") ESCAPE '\\'");
                }
            },
            Expr::IsNotNull(inner) => {
                self.expr(inner);
                self.sql.push_str(" IS NOT NULL");
            }
            Expr::And(parts) => self.connective(parts, " AND ", "1 = 1"),
            Expr::Or(parts) => self.connective(parts, " OR ", "1 = 0"),
        }
    }

    fn binary(&mut self, lhs: &Expr, op: &str, rhs: &Expr) {
        self.expr(lhs);
        self.sql.push_str(op);
        self.expr(rhs);
    }

    fn connective(&mut self, parts: &[Expr], op: &str, empty: &str) {
        match parts {
            [] => self.sql.push_str(empty),
            [single] => self.expr(single),
            _ => {
                self.sql.push('(');
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(op);
                    }
                    self.expr(part);
                }
                self.sql.push(')');
            }
        }
    }
}
