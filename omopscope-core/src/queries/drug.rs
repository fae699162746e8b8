//! Drug concepts, ingredients, strengths, classes and exposures.

use super::{CONCEPT_SUMMARY, name_or_synonym_matches, named, require_values, run};
use crate::catalog::Catalog;
use crate::query::{Select, and};
use crate::results::ResultHandle;
use crate::Result;

const INGREDIENT: &str = "Ingredient";
const ATC: &str = "ATC";

/// Every drug below an ingredient in the hierarchy.
///
/// The ingredient's own 0-hop row is kept, so the ingredient itself appears
/// among the drugs.
///
/// Columns: `ingredient_concept_id`, `ingredient_name`,
/// `ingredient_concept_code`, `ingredient_concept_class_id`,
/// `drug_concept_id`, `drug_name`, `drug_concept_code`,
/// `drug_concept_class_id`
pub async fn drugs_for_ingredient_concept_id(
    catalog: &Catalog,
    ingredient_concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let ca = catalog.table_ref("concept_ancestor", "ca").await?;
    let a = catalog.table_ref("concept", "a").await?;
    let d = catalog.table_ref("concept", "d").await?;

    let select = Select::from(&ca)
        .columns([
            a.col("concept_id")?.alias("ingredient_concept_id"),
            a.col("concept_name")?.alias("ingredient_name"),
            a.col("concept_code")?.alias("ingredient_concept_code"),
            a.col("concept_class_id")?.alias("ingredient_concept_class_id"),
            d.col("concept_id")?.alias("drug_concept_id"),
            d.col("concept_name")?.alias("drug_name"),
            d.col("concept_code")?.alias("drug_concept_code"),
            d.col("concept_class_id")?.alias("drug_concept_class_id"),
        ])
        .join(&a, a.col("concept_id")?.equals(ca.col("ancestor_concept_id")?))
        .join(&d, d.col("concept_id")?.equals(ca.col("descendant_concept_id")?))
        .filter(ca.col("ancestor_concept_id")?.equals_value(ingredient_concept_id))
        .order_by(d.col("concept_id")?);

    run(catalog, select, return_columns).await
}

/// Ingredients of the given drugs.
///
/// Columns: `drug_concept_id`, `drug_name`, `ingredient_concept_id`,
/// `ingredient_name`, `ingredient_concept_code`, `ingredient_vocabulary_id`
pub async fn ingredients_for_drug_concept_ids(
    catalog: &Catalog,
    drug_concept_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(drug_concept_ids, "drug_concept_ids")?;
    let ca = catalog.table_ref("concept_ancestor", "ca").await?;
    let d = catalog.table_ref("concept", "d").await?;
    let a = catalog.table_ref("concept", "a").await?;

    let select = Select::from(&ca)
        .columns([
            d.col("concept_id")?.alias("drug_concept_id"),
            d.col("concept_name")?.alias("drug_name"),
            a.col("concept_id")?.alias("ingredient_concept_id"),
            a.col("concept_name")?.alias("ingredient_name"),
            a.col("concept_code")?.alias("ingredient_concept_code"),
            a.col("vocabulary_id")?.alias("ingredient_vocabulary_id"),
        ])
        .join(&d, d.col("concept_id")?.equals(ca.col("descendant_concept_id")?))
        .join(&a, a.col("concept_id")?.equals(ca.col("ancestor_concept_id")?))
        .filter(and([
            ca.col("descendant_concept_id")?.in_list(drug_concept_ids.iter().copied()),
            a.col("concept_class_id")?.equals_value(INGREDIENT),
        ]))
        .order_by(d.col("concept_id")?)
        .order_by(a.col("concept_name")?);

    run(catalog, select, return_columns).await
}

/// Standard Drug-domain concepts whose name or a synonym contains `keyword`.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `vocabulary_id`
pub async fn drug_concepts_for_keyword(
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
            c.col("domain_id")?.equals_value("Drug"),
            c.col("standard_concept")?.equals_value("S"),
            name_or_synonym_matches(&c, &s, keyword)?,
        ]))
        .distinct();

    run(catalog, select, return_columns).await
}

/// Ingredient strengths of the given drugs.
///
/// # Errors
/// Returns `MissingTable` when the database has no `drug_strength` table,
/// which is optional in many vocabulary exports.
///
/// Columns: `drug_concept_id`, `drug_name`, `ingredient_concept_id`,
/// `ingredient_name`, `amount_value`, `amount_unit_concept_id`,
/// `numerator_value`, `numerator_unit_concept_id`, `denominator_value`,
/// `denominator_unit_concept_id`, `box_size`
pub async fn drug_strength_for_drug_concept_ids(
    catalog: &Catalog,
    drug_concept_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let ds = catalog.table_ref("drug_strength", "ds").await?;
    require_values(drug_concept_ids, "drug_concept_ids")?;
    let d = catalog.table_ref("concept", "d").await?;
    let i = catalog.table_ref("concept", "i").await?;

    let mut columns = vec![
        ds.col("drug_concept_id")?.named(),
        d.col("concept_name")?.alias("drug_name"),
        ds.col("ingredient_concept_id")?.named(),
        i.col("concept_name")?.alias("ingredient_name"),
    ];
    columns.extend(named(
        &ds,
        &[
            "amount_value",
            "amount_unit_concept_id",
            "numerator_value",
            "numerator_unit_concept_id",
            "denominator_value",
            "denominator_unit_concept_id",
            "box_size",
        ],
    )?);

    let select = Select::from(&ds)
        .columns(columns)
        .join(&d, d.col("concept_id")?.equals(ds.col("drug_concept_id")?))
        .join(&i, i.col("concept_id")?.equals(ds.col("ingredient_concept_id")?))
        .filter(ds.col("drug_concept_id")?.in_list(drug_concept_ids.iter().copied()))
        .order_by(ds.col("drug_concept_id")?)
        .order_by(ds.col("ingredient_concept_id")?);

    run(catalog, select, return_columns).await
}

/// ATC classes above a drug, closest first.
///
/// Columns: `class_concept_id`, `class_name`, `class_code`,
/// `class_concept_class_id`, `min_levels_of_separation`
pub async fn drug_classes_for_drug_concept_id(
    catalog: &Catalog,
    drug_concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let ca = catalog.table_ref("concept_ancestor", "ca").await?;
    let k = catalog.table_ref("concept", "k").await?;

    let select = Select::from(&ca)
        .columns([
            k.col("concept_id")?.alias("class_concept_id"),
            k.col("concept_name")?.alias("class_name"),
            k.col("concept_code")?.alias("class_code"),
            k.col("concept_class_id")?.alias("class_concept_class_id"),
            ca.col("min_levels_of_separation")?.named(),
        ])
        .join(&k, k.col("concept_id")?.equals(ca.col("ancestor_concept_id")?))
        .filter(and([
            ca.col("descendant_concept_id")?.equals_value(drug_concept_id),
            ca.col("ancestor_concept_id")?
                .not_equals(ca.col("descendant_concept_id")?),
            k.col("vocabulary_id")?.equals_value(ATC),
        ]))
        .order_by(ca.col("min_levels_of_separation")?)
        .order_by(k.col("concept_code")?);

    run(catalog, select, return_columns).await
}

/// Drug exposures of the given persons.
///
/// Columns: `drug_exposure_id`, `person_id`, `drug_concept_id`,
/// `drug_concept_name`, `drug_exposure_start_date`, `drug_exposure_end_date`,
/// `quantity`, `days_supply`, `drug_type_concept_id`
pub async fn drug_exposures_for_person_ids(
    catalog: &Catalog,
    person_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(person_ids, "person_ids")?;
    let de = catalog.table_ref("drug_exposure", "de").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let mut columns = named(&de, &["drug_exposure_id", "person_id", "drug_concept_id"])?;
    columns.push(c.col("concept_name")?.alias("drug_concept_name"));
    columns.extend(named(
        &de,
        &[
            "drug_exposure_start_date",
            "drug_exposure_end_date",
            "quantity",
            "days_supply",
            "drug_type_concept_id",
        ],
    )?);

    let select = Select::from(&de)
        .columns(columns)
        .left_join(&c, c.col("concept_id")?.equals(de.col("drug_concept_id")?))
        .filter(de.col("person_id")?.in_list(person_ids.iter().copied()))
        .order_by(de.col("person_id")?)
        .order_by(de.col("drug_exposure_start_date")?);

    run(catalog, select, return_columns).await
}
