//! Canned OMOP queries, grouped by clinical domain.
//!
//! # Module Structure
//! - `general`: concept lookups, hierarchy navigation, relationships, source code mapping
//! - `condition`, `drug`, `procedure`, `observation`: domain concept searches and
//!   per-person event listings
//! - `care_site`, `person`, `payer_plan`: population counts
//!
//! Every builder takes the [`Catalog`] first, then its parameters, then an
//! optional `return_columns` allowlist that narrows the default output
//! columns (see [`QuerySpec::project`]). Tables and columns are resolved
//! through the catalog, so a database lacking a required table fails with
//! `MissingTable` before anything is executed.

pub mod care_site;
pub mod condition;
pub mod drug;
pub mod general;
pub mod observation;
pub mod payer_plan;
pub mod person;
pub mod procedure;

use crate::catalog::Catalog;
use crate::query::{Expr, QuerySpec, SelectItem, TableRef, or};
use crate::results::ResultHandle;
use crate::{OmopError, Result};

/// Relationship linking a source concept to its standard concept
pub(crate) const MAPS_TO: &str = "Maps to";

/// Narrows and executes a built query.
pub(crate) async fn run(
    catalog: &Catalog,
    query: impl Into<QuerySpec>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let query = query.into().project(return_columns)?;
    catalog.execute(&query).await
}

/// Rejects an empty id or code list.
pub(crate) fn require_values<T>(values: &[T], what: &str) -> Result<()> {
    if values.is_empty() {
        return Err(OmopError::invalid_query(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// `person_id IN (...)` when ids are given.
pub(crate) fn person_filter(table: &TableRef, person_ids: Option<&[i64]>) -> Result<Option<Expr>> {
    match person_ids {
        None => Ok(None),
        Some(ids) => {
            require_values(ids, "person_ids")?;
            Ok(Some(table.col("person_id")?.in_list(ids.iter().copied())))
        }
    }
}

/// Concept name or any synonym contains `keyword`, ignoring case.
pub(crate) fn name_or_synonym_matches(
    concept: &TableRef,
    synonym: &TableRef,
    keyword: &str,
) -> Result<Expr> {
    Ok(or([
        concept.col("concept_name")?.contains(keyword),
        synonym.col("concept_synonym_name")?.contains(keyword),
    ]))
}

/// Projects concept columns under `{prefix}_{column}` names.
///
/// `columns` pairs a concept column with its output suffix, e.g.
/// `("concept_name", "name")` becomes `{prefix}_name`.
pub(crate) fn prefixed(
    concept: &TableRef,
    prefix: &str,
    columns: &[(&str, &str)],
) -> Result<Vec<SelectItem>> {
    columns
        .iter()
        .map(|(column, suffix)| -> Result<SelectItem> {
            Ok(concept
                .col(column)?
                .alias(format!("{}_{}", prefix, suffix)))
        })
        .collect()
}

/// Projects columns under their own names.
pub(crate) fn named(table: &TableRef, columns: &[&str]) -> Result<Vec<SelectItem>> {
    columns
        .iter()
        .map(|column| -> Result<SelectItem> { Ok(table.col(column)?.named()) })
        .collect()
}

/// Standard concept output columns used by the keyword searches.
pub(crate) const CONCEPT_SUMMARY: &[&str] = &[
    "concept_id",
    "concept_name",
    "concept_code",
    "concept_class_id",
    "vocabulary_id",
];

/// Concept columns projected under a role prefix, e.g. `parent_concept_id`.
pub(crate) const RELATIVE_COLUMNS: &[(&str, &str)] = &[
    ("concept_id", "concept_id"),
    ("concept_name", "concept_name"),
    ("concept_code", "concept_code"),
    ("concept_class_id", "concept_class_id"),
    ("vocabulary_id", "vocabulary_id"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_values() {
        assert!(require_values(&[1_i64], "concept_ids").is_ok());
        let err = require_values::<i64>(&[], "concept_ids").unwrap_err();
        assert!(matches!(err, OmopError::InvalidQuery { .. }));
        assert!(err.to_string().contains("concept_ids"));
    }
}
