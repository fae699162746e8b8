//! Condition concepts, pathogens and condition occurrences.

use super::general::source_to_standard;
use super::{
    CONCEPT_SUMMARY, RELATIVE_COLUMNS, name_or_synonym_matches, named, prefixed,
    require_values, run,
};
use crate::catalog::Catalog;
use crate::query::{Select, and, or};
use crate::results::ResultHandle;
use crate::Result;

const CONDITION_VOCABULARIES: [&str; 2] = ["SNOMED", "MedDRA"];
const CLINICAL_FINDING: &str = "clinical finding";
const ORGANISM: &str = "Organism";
const HAS_CAUSATIVE_AGENT: &str = "Has causative agent";

/// Condition concepts whose name or a synonym contains `keyword`.
///
/// Candidates are SNOMED or MedDRA concepts, or any concept of the
/// clinical finding class, with a concept class set.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `vocabulary_id`
pub async fn condition_concepts_for_keyword(
    catalog: &Catalog,
    keyword: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let c = catalog.table_ref("concept", "c").await?;
    let v = catalog.table_ref("vocabulary", "v").await?;
    let s = catalog.table_ref("concept_synonym", "s").await?;

    let select = Select::from(&c)
        .columns(named(&c, CONCEPT_SUMMARY)?)
        .join(&v, v.col("vocabulary_id")?.equals(c.col("vocabulary_id")?))
        .left_join(&s, s.col("concept_id")?.equals(c.col("concept_id")?))
        .filter(and([
            or([
                c.col("vocabulary_id")?.in_list(CONDITION_VOCABULARIES),
                c.col("concept_class_id")?
                    .lower()
                    .equals_value(CLINICAL_FINDING),
            ]),
            c.col("concept_class_id")?.is_not_null(),
            name_or_synonym_matches(&c, &s, keyword)?,
        ]))
        .distinct();

    run(catalog, select, return_columns).await
}

/// Standard Condition-domain concepts that source codes map to.
///
/// Columns: `source_code`, `source_vocabulary_id`, `source_concept_name`,
/// `relationship_id`, `target_concept_id`, `target_concept_name`,
/// `target_vocabulary_id`, `target_domain_id`
pub async fn condition_concepts_for_source_codes(
    catalog: &Catalog,
    source_codes: &[&str],
    source_vocabulary_id: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let select =
        source_to_standard(catalog, source_codes, source_vocabulary_id, Some("Condition")).await?;
    run(catalog, select, return_columns).await
}

/// Organism concepts whose name or a synonym contains `keyword`.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `vocabulary_id`
pub async fn pathogen_concepts_for_keyword(
    catalog: &Catalog,
    keyword: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let c = catalog.table_ref("concept", "c").await?;
    let s = catalog.table_ref("concept_synonym", "s").await?;

    let select = Select::from(&c)
        .columns(named(&c, CONCEPT_SUMMARY)?)
        .left_join(&s, s.col("concept_id")?.equals(c.col("concept_id")?))
        .filter(and([
            c.col("concept_class_id")?.equals_value(ORGANISM),
            name_or_synonym_matches(&c, &s, keyword)?,
        ]))
        .distinct();

    run(catalog, select, return_columns).await
}

/// Disorders caused by a pathogen.
///
/// Follows `Has causative agent` from the disorder to the pathogen.
///
/// Columns: `pathogen_concept_id`, `condition_concept_id`,
/// `condition_concept_name`, `condition_concept_code`,
/// `condition_concept_class_id`, `condition_vocabulary_id`
pub async fn disorders_for_pathogen_concept_id(
    catalog: &Catalog,
    pathogen_concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let cr = catalog.table_ref("concept_relationship", "cr").await?;
    let d = catalog.table_ref("concept", "d").await?;

    let mut columns = vec![cr.col("concept_id_2")?.alias("pathogen_concept_id")];
    columns.extend(prefixed(&d, "condition", RELATIVE_COLUMNS)?);

    let select = Select::from(&cr)
        .columns(columns)
        .join(&d, d.col("concept_id")?.equals(cr.col("concept_id_1")?))
        .filter(and([
            cr.col("concept_id_2")?.equals_value(pathogen_concept_id),
            cr.col("relationship_id")?.equals_value(HAS_CAUSATIVE_AGENT),
        ]))
        .order_by(d.col("concept_name")?);

    run(catalog, select, return_columns).await
}

/// Condition occurrences of the given persons.
///
/// Columns: `condition_occurrence_id`, `person_id`, `condition_concept_id`,
/// `condition_concept_name`, `condition_start_date`, `condition_end_date`,
/// `condition_type_concept_id`, `visit_occurrence_id`
pub async fn condition_occurrences_for_person_ids(
    catalog: &Catalog,
    person_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(person_ids, "person_ids")?;
    let co = catalog.table_ref("condition_occurrence", "co").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let select = Select::from(&co)
        .columns([
            co.col("condition_occurrence_id")?.named(),
            co.col("person_id")?.named(),
            co.col("condition_concept_id")?.named(),
            c.col("concept_name")?.alias("condition_concept_name"),
            co.col("condition_start_date")?.named(),
            co.col("condition_end_date")?.named(),
            co.col("condition_type_concept_id")?.named(),
            co.col("visit_occurrence_id")?.named(),
        ])
        .left_join(&c, c.col("concept_id")?.equals(co.col("condition_concept_id")?))
        .filter(co.col("person_id")?.in_list(person_ids.iter().copied()))
        .order_by(co.col("person_id")?)
        .order_by(co.col("condition_start_date")?);

    run(catalog, select, return_columns).await
}
