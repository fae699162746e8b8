//! Observation concepts and recorded observations.

use super::{CONCEPT_SUMMARY, named, require_values, run};
use crate::catalog::Catalog;
use crate::query::{Select, and};
use crate::results::ResultHandle;
use crate::Result;

const OBSERVATION_VOCABULARIES: [&str; 2] = ["LOINC", "UCUM"];

/// Standard LOINC and UCUM concepts whose name contains `keyword`.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `vocabulary_id`, `vocabulary_name`
pub async fn observation_concepts_for_keyword(
    catalog: &Catalog,
    keyword: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let c = catalog.table_ref("concept", "c").await?;
    let v = catalog.table_ref("vocabulary", "v").await?;

    let mut columns = named(&c, CONCEPT_SUMMARY)?;
    columns.push(v.col("vocabulary_name")?.named());

    let select = Select::from(&c)
        .columns(columns)
        .join(&v, v.col("vocabulary_id")?.equals(c.col("vocabulary_id")?))
        .filter(and([
            c.col("vocabulary_id")?.in_list(OBSERVATION_VOCABULARIES),
            c.col("concept_class_id")?.is_not_null(),
            c.col("standard_concept")?.equals_value("S"),
            c.col("concept_name")?.contains(keyword),
        ]))
        .order_by(c.col("concept_id")?);

    run(catalog, select, return_columns).await
}

/// Observations recorded for the given persons.
///
/// Columns: `observation_id`, `person_id`, `observation_concept_id`,
/// `observation_concept_name`, `observation_date`, `value_as_number`,
/// `value_as_string`, `unit_concept_id`
pub async fn observations_for_person_ids(
    catalog: &Catalog,
    person_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(person_ids, "person_ids")?;
    let o = catalog.table_ref("observation", "o").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let mut columns = named(&o, &["observation_id", "person_id", "observation_concept_id"])?;
    columns.push(c.col("concept_name")?.alias("observation_concept_name"));
    columns.extend(named(
        &o,
        &[
            "observation_date",
            "value_as_number",
            "value_as_string",
            "unit_concept_id",
        ],
    )?);

    let select = Select::from(&o)
        .columns(columns)
        .left_join(&c, c.col("concept_id")?.equals(o.col("observation_concept_id")?))
        .filter(o.col("person_id")?.in_list(person_ids.iter().copied()))
        .order_by(o.col("person_id")?)
        .order_by(o.col("observation_date")?);

    run(catalog, select, return_columns).await
}
