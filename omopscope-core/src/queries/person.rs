//! Population counts over the `person` table and cohort membership.
//!
//! Every count accepts an optional `person_ids` restriction; `None` counts
//! the whole population.

use super::{person_filter, run};
use crate::catalog::Catalog;
use crate::query::{Expr, Select, count_all};
use crate::results::ResultHandle;
use crate::Result;

fn restricted(select: Select, filter: Option<Expr>) -> Select {
    match filter {
        Some(expr) => select.filter(expr),
        None => select,
    }
}

/// Persons per gender.
///
/// Columns: `gender_concept_id`, `gender`, `count`
pub async fn patient_counts_by_gender(
    catalog: &Catalog,
    person_ids: Option<&[i64]>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let p = catalog.table_ref("person", "p").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let select = Select::from(&p)
        .columns([
            p.col("gender_concept_id")?.named(),
            c.col("concept_name")?.alias("gender"),
            count_all().alias("count"),
        ])
        .join(&c, c.col("concept_id")?.equals(p.col("gender_concept_id")?))
        .group_by([p.col("gender_concept_id")?, c.col("concept_name")?])
        .order_by(p.col("gender_concept_id")?);

    let select = restricted(select, person_filter(&p, person_ids)?);
    run(catalog, select, return_columns).await
}

/// Persons per year of birth.
///
/// Columns: `year_of_birth`, `count`
pub async fn patient_counts_by_year_of_birth(
    catalog: &Catalog,
    person_ids: Option<&[i64]>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let p = catalog.table_ref("person", "p").await?;

    let select = Select::from(&p)
        .columns([
            p.col("year_of_birth")?.named(),
            count_all().alias("count"),
        ])
        .group_by([p.col("year_of_birth")?])
        .order_by(p.col("year_of_birth")?);

    let select = restricted(select, person_filter(&p, person_ids)?);
    run(catalog, select, return_columns).await
}

/// Persons per state of residence.
///
/// Persons without a location are not counted.
///
/// Columns: `state`, `count`
pub async fn patient_counts_by_residence_state(
    catalog: &Catalog,
    person_ids: Option<&[i64]>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let p = catalog.table_ref("person", "p").await?;
    let l = catalog.table_ref("location", "l").await?;

    let select = Select::from(&p)
        .columns([l.col("state")?.named(), count_all().alias("count")])
        .join(&l, l.col("location_id")?.equals(p.col("location_id")?))
        .group_by([l.col("state")?])
        .order_by(l.col("state")?);

    let select = restricted(select, person_filter(&p, person_ids)?);
    run(catalog, select, return_columns).await
}

/// Persons per (state, zip code).
///
/// Columns: `state`, `zip`, `count`
pub async fn patient_counts_by_zip_code(
    catalog: &Catalog,
    person_ids: Option<&[i64]>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let p = catalog.table_ref("person", "p").await?;
    let l = catalog.table_ref("location", "l").await?;

    let select = Select::from(&p)
        .columns([
            l.col("state")?.named(),
            l.col("zip")?.named(),
            count_all().alias("count"),
        ])
        .join(&l, l.col("location_id")?.equals(p.col("location_id")?))
        .group_by([l.col("state")?, l.col("zip")?])
        .order_by(l.col("state")?)
        .order_by(l.col("zip")?);

    let select = restricted(select, person_filter(&p, person_ids)?);
    run(catalog, select, return_columns).await
}

/// Persons per (gender, year of birth).
///
/// Columns: `gender_concept_id`, `gender`, `year_of_birth`, `count`
pub async fn patient_counts_by_year_of_birth_and_gender(
    catalog: &Catalog,
    person_ids: Option<&[i64]>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let p = catalog.table_ref("person", "p").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let select = Select::from(&p)
        .columns([
            p.col("gender_concept_id")?.named(),
            c.col("concept_name")?.alias("gender"),
            p.col("year_of_birth")?.named(),
            count_all().alias("count"),
        ])
        .join(&c, c.col("concept_id")?.equals(p.col("gender_concept_id")?))
        .group_by([
            p.col("gender_concept_id")?,
            c.col("concept_name")?,
            p.col("year_of_birth")?,
        ])
        .order_by(p.col("gender_concept_id")?)
        .order_by(p.col("year_of_birth")?);

    let select = restricted(select, person_filter(&p, person_ids)?);
    run(catalog, select, return_columns).await
}

/// Members of a cohort with their demographics.
///
/// Columns: `subject_id`, `cohort_start_date`, `cohort_end_date`,
/// `gender_concept_id`, `year_of_birth`
pub async fn cohort_members_for_cohort_definition_id(
    catalog: &Catalog,
    cohort_definition_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let co = catalog.table_ref("cohort", "co").await?;
    let p = catalog.table_ref("person", "p").await?;

    let select = Select::from(&co)
        .columns([
            co.col("subject_id")?.named(),
            co.col("cohort_start_date")?.named(),
            co.col("cohort_end_date")?.named(),
            p.col("gender_concept_id")?.named(),
            p.col("year_of_birth")?.named(),
        ])
        .join(&p, p.col("person_id")?.equals(co.col("subject_id")?))
        .filter(co.col("cohort_definition_id")?.equals_value(cohort_definition_id))
        .order_by(co.col("subject_id")?)
        .order_by(co.col("cohort_start_date")?);

    run(catalog, select, return_columns).await
}
