//! Care site counts by place of service.

use super::run;
use crate::catalog::Catalog;
use crate::query::{Select, count_all};
use crate::results::ResultHandle;
use crate::Result;

/// Number of care sites per place of service.
///
/// Columns: `place_of_service`, `place_of_service_concept_id`,
/// `facility_count`
pub async fn facility_counts_by_type(
    catalog: &Catalog,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let cs = catalog.table_ref("care_site", "cs").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let select = Select::from(&cs)
        .columns([
            c.col("concept_name")?.alias("place_of_service"),
            cs.col("place_of_service_concept_id")?.named(),
            count_all().alias("facility_count"),
        ])
        .join(&c, c.col("concept_id")?.equals(cs.col("place_of_service_concept_id")?))
        .group_by([
            cs.col("place_of_service_concept_id")?,
            c.col("concept_name")?,
        ])
        .order_by(cs.col("place_of_service_concept_id")?);

    run(catalog, select, return_columns).await
}

/// Number of persons per place of service of their care site.
///
/// Columns: `place_of_service`, `place_of_service_concept_id`,
/// `patient_count`
pub async fn patient_counts_by_care_site_type(
    catalog: &Catalog,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let p = catalog.table_ref("person", "p").await?;
    let cs = catalog.table_ref("care_site", "cs").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let select = Select::from(&p)
        .columns([
            c.col("concept_name")?.alias("place_of_service"),
            cs.col("place_of_service_concept_id")?.named(),
            count_all().alias("patient_count"),
        ])
        .join(&cs, cs.col("care_site_id")?.equals(p.col("care_site_id")?))
        .join(&c, c.col("concept_id")?.equals(cs.col("place_of_service_concept_id")?))
        .group_by([
            cs.col("place_of_service_concept_id")?,
            c.col("concept_name")?,
        ])
        .order_by(cs.col("place_of_service_concept_id")?);

    run(catalog, select, return_columns).await
}
