//! Payer plan distributions.

use super::run;
use crate::catalog::Catalog;
use crate::models::Value;
use crate::query::{Select, count_all};
use crate::results::{ResultHandle, Table};
use crate::Result;
use std::collections::BTreeMap;

const DAYS_PER_YEAR: f64 = 365.25;

/// Plan periods per plan.
///
/// Columns: `plan_source_value`, `count`
pub async fn patient_distribution_by_plan_type(
    catalog: &Catalog,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let pp = catalog.table_ref("payer_plan_period", "pp").await?;

    let select = Select::from(&pp)
        .columns([
            pp.col("plan_source_value")?.named(),
            count_all().alias("count"),
        ])
        .group_by([pp.col("plan_source_value")?])
        .order_by(pp.col("plan_source_value")?);

    run(catalog, select, return_columns).await
}

/// Plan periods per whole number of covered years.
///
/// The length of each period is `floor(days / 365.25)`; periods missing a
/// start or end date are skipped. Rows are ordered by `coverage_years`.
///
/// Columns: `coverage_years`, `count`
pub async fn counts_by_years_of_coverage(catalog: &Catalog) -> Result<Table> {
    let pp = catalog.table_ref("payer_plan_period", "pp").await?;

    let select = Select::from(&pp).columns([
        pp.col("payer_plan_period_start_date")?.named(),
        pp.col("payer_plan_period_end_date")?.named(),
    ]);
    let periods = run(catalog, select, None).await?.materialize_table().await?;

    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    let mut skipped = 0_usize;
    for row in periods.rows() {
        match (row[0].as_date(), row[1].as_date()) {
            (Some(start), Some(end)) => {
                *counts.entry(coverage_years((end - start).num_days())).or_default() += 1;
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("Skipped {} payer plan periods without both dates", skipped);
    }

    let rows = counts
        .into_iter()
        .map(|(years, count)| vec![Value::Integer(years), Value::Integer(count)])
        .collect();
    Ok(Table::from_rows(
        vec!["coverage_years".to_string(), "count".to_string()],
        rows,
    ))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn coverage_years(days: i64) -> i64 {
    (days as f64 / DAYS_PER_YEAR).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_years_floors_partial_years() {
        assert_eq!(coverage_years(0), 0);
        assert_eq!(coverage_years(365), 0);
        assert_eq!(coverage_years(366), 1);
        assert_eq!(coverage_years(730), 1);
        assert_eq!(coverage_years(731), 2);
        assert_eq!(coverage_years(-1), -1);
    }
}
