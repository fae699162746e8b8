//! Column-major in-memory table.

use crate::models::{Row, Value};
use crate::{OmopError, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Materialized query result.
///
/// Serializes as a list of records (`[{"col": value, ...}, ...]`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table from row-major data.
    ///
    /// Short rows are padded with nulls; extra cells are dropped.
    pub fn from_rows(names: Vec<String>, rows: Vec<Row>) -> Self {
        let mut columns: Vec<Vec<Value>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in &mut columns {
                column.push(cells.next().unwrap_or(Value::Null));
            }
        }

        Self { names, columns }
    }

    /// Column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> Option<&mut Vec<Value>> {
        self.columns.get_mut(index)
    }

    /// One cell.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|values| values.get(row))
    }

    /// Copies out one row.
    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[index].clone()).collect())
    }

    /// Iterates rows, copying cells.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.num_rows()).filter_map(|i| self.row(i))
    }

    /// Pretty JSON records.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| OmopError::Serialization {
            context: "Failed to serialize result table".to_string(),
            source: e,
        })
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.num_rows()))?;
        for i in 0..self.num_rows() {
            seq.serialize_element(&Record { table: self, row: i })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    table: &'a Table,
    row: usize,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.names.len()))?;
        for (name, column) in self.table.names.iter().zip(&self.table.columns) {
            map.serialize_entry(name, &column[self.row])?;
        }
        map.end()
    }
}

/// Aligned plain-text rendering with a header row.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.iter().map(ToString::to_string).collect())
            .collect();

        let widths: Vec<usize> = self
            .names
            .iter()
            .zip(&cells)
            .map(|(name, values)| {
                values
                    .iter()
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |f: &mut fmt::Formatter<'_>, values: Vec<&str>| -> fmt::Result {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect();
            writeln!(f, "{}", padded.join("  ").trim_end())
        };

        line(f, self.names.iter().map(String::as_str).collect())?;
        writeln!(
            f,
            "{}",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  ")
        )?;
        for i in 0..self.num_rows() {
            line(f, cells.iter().map(|c| c[i].as_str()).collect())?;
        }
        Ok(())
    }
}
