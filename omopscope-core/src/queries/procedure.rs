//! Procedure concepts and procedure occurrences.

use super::{CONCEPT_SUMMARY, name_or_synonym_matches, named, require_values, run};
use crate::catalog::Catalog;
use crate::query::{Select, and};
use crate::results::ResultHandle;
use crate::Result;

const PROCEDURE_VOCABULARIES: [&str; 5] = ["SNOMED", "ICD9Proc", "ICD10PCS", "CPT4", "HCPCS"];

/// Standard Procedure-domain concepts whose name or a synonym contains
/// `keyword`.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `vocabulary_id`, `vocabulary_name`
pub async fn procedure_concepts_for_keyword(
    catalog: &Catalog,
    keyword: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let c = catalog.table_ref("concept", "c").await?;
    let v = catalog.table_ref("vocabulary", "v").await?;
    let s = catalog.table_ref("concept_synonym", "s").await?;

    let mut columns = named(&c, CONCEPT_SUMMARY)?;
    columns.push(v.col("vocabulary_name")?.named());

    let select = Select::from(&c)
        .columns(columns)
        .join(&v, v.col("vocabulary_id")?.equals(c.col("vocabulary_id")?))
        .left_join(&s, s.col("concept_id")?.equals(c.col("concept_id")?))
        .filter(and([
            c.col("vocabulary_id")?.in_list(PROCEDURE_VOCABULARIES),
            c.col("concept_class_id")?.is_not_null(),
            c.col("domain_id")?.equals_value("Procedure"),
            c.col("standard_concept")?.equals_value("S"),
            name_or_synonym_matches(&c, &s, keyword)?,
        ]))
        .distinct();

    run(catalog, select, return_columns).await
}

/// Procedure occurrences of the given persons.
///
/// Columns: `procedure_occurrence_id`, `person_id`, `procedure_concept_id`,
/// `procedure_concept_name`, `procedure_date`, `procedure_type_concept_id`,
/// `quantity`, `visit_occurrence_id`
pub async fn procedure_occurrences_for_person_ids(
    catalog: &Catalog,
    person_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(person_ids, "person_ids")?;
    let po = catalog.table_ref("procedure_occurrence", "po").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let mut columns = named(&po, &["procedure_occurrence_id", "person_id", "procedure_concept_id"])?;
    columns.push(c.col("concept_name")?.alias("procedure_concept_name"));
    columns.extend(named(
        &po,
        &[
            "procedure_date",
            "procedure_type_concept_id",
            "quantity",
            "visit_occurrence_id",
        ],
    )?);

    let select = Select::from(&po)
        .columns(columns)
        .left_join(&c, c.col("concept_id")?.equals(po.col("procedure_concept_id")?))
        .filter(po.col("person_id")?.in_list(person_ids.iter().copied()))
        .order_by(po.col("person_id")?)
        .order_by(po.col("procedure_date")?);

    run(catalog, select, return_columns).await
}
