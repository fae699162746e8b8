//! Shared fixtures for integration tests.
//!
//! Every fixture is an in-memory SQLite database created from the CDM
//! registry DDL, wrapped in a [`Catalog`]. The pool has one connection, so
//! a test drains or drops each handle before its next query.
//!
//! Seeded vocabulary (concept ids):
//! - 10 Disorder of glucose metabolism > 11 Diabetes mellitus > {12 Type 2, 13 Type 1}
//! - 14 ICD9CM 250.0, mapped to 11
//! - 15 Streptococcus pneumoniae (Organism), causative agent of 16 Pneumococcal pneumonia
//! - 20 Metformin (Ingredient) > 21 Metformin 500 MG Oral Tablet; ATC 23 > 22 > {20, 21}
//! - 30 HbA1c (CPT4 procedure), 31 Glucose in Blood (LOINC)
//! - 40 FEMALE, 41 MALE, 50 Inpatient Hospital, 51 Office
//!
//! Seeded population: persons 1 to 5 with locations, care sites, events,
//! payer plan periods and two cohorts.

#![allow(dead_code)]

use omopscope_core::catalog::sqlite::{SqliteBackend, memory_options};
use omopscope_core::query::Dialect;
use omopscope_core::{Catalog, ResultHandle, cdm};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Opens a single-connection in-memory database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(memory_options())
        .await
        .expect("in-memory SQLite should open")
}

/// Executes each statement in order.
pub async fn exec(pool: &SqlitePool, statements: &[&str]) {
    for sql in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("fixture statement failed: {}\n{}", e, sql));
    }
}

/// Pool with every CDM table created and empty.
pub async fn empty_cdm_pool() -> SqlitePool {
    let pool = memory_pool().await;
    for sql in cdm::create_schema_sql(Dialect::Sqlite) {
        exec(&pool, &[sql.as_str()]).await;
    }
    pool
}

/// Catalog over an empty CDM schema.
pub async fn empty_cdm() -> Catalog {
    Catalog::from_backend(Box::new(SqliteBackend::from_pool(empty_cdm_pool().await)))
}

/// Catalog over an arbitrary pool.
pub fn catalog_for(pool: SqlitePool) -> Catalog {
    Catalog::from_backend(Box::new(SqliteBackend::from_pool(pool)))
}

/// Catalog over the fully seeded fixture.
pub async fn seeded_cdm() -> Catalog {
    let pool = empty_cdm_pool().await;
    exec(&pool, VOCABULARY).await;
    exec(&pool, CLINICAL).await;
    catalog_for(pool)
}

/// Integer values of one column of a materialized result.
pub async fn ids(mut handle: ResultHandle, column: &str) -> Vec<i64> {
    let table = handle
        .materialize_table()
        .await
        .expect("result should materialize");
    table
        .column(column)
        .unwrap_or_else(|| panic!("result has no column '{}'", column))
        .iter()
        .map(|v| v.as_i64().unwrap_or_else(|| panic!("non-integer id: {:?}", v)))
        .collect()
}

/// True when the result has no rows. Consumes the handle.
pub async fn is_empty(mut handle: ResultHandle) -> bool {
    handle
        .fetch_one()
        .await
        .expect("result should be readable")
        .is_none()
}

const VOCABULARY: &[&str] = &[
    "INSERT INTO vocabulary (vocabulary_id, vocabulary_name) VALUES
        ('SNOMED', 'Systematic Nomenclature of Medicine - Clinical Terms'),
        ('MedDRA', 'Medical Dictionary for Regulatory Activities'),
        ('ICD9CM', 'International Classification of Diseases, Ninth Revision, Clinical Modification'),
        ('RxNorm', 'RxNorm'),
        ('ATC', 'WHO Anatomic Therapeutic Chemical Classification'),
        ('CPT4', 'Current Procedural Terminology version 4'),
        ('LOINC', 'Logical Observation Identifiers Names and Codes'),
        ('Gender', 'OMOP Gender'),
        ('Place of Service', 'Place of Service Codes for Professional Claims')",
    "INSERT INTO concept (concept_id, concept_name, domain_id, vocabulary_id, concept_class_id,
                          standard_concept, concept_code, valid_start_date, valid_end_date) VALUES
        (10, 'Disorder of glucose metabolism', 'Condition', 'SNOMED', 'Clinical Finding', 'S', '126877002', '1970-01-01', '2099-12-31'),
        (11, 'Diabetes mellitus', 'Condition', 'SNOMED', 'Clinical Finding', 'S', '73211009', '1970-01-01', '2099-12-31'),
        (12, 'Type 2 diabetes mellitus', 'Condition', 'SNOMED', 'Clinical Finding', 'S', '44054006', '1970-01-01', '2099-12-31'),
        (13, 'Type 1 diabetes mellitus', 'Condition', 'SNOMED', 'Clinical Finding', 'S', '46635009', '1970-01-01', '2099-12-31'),
        (14, 'Diabetes mellitus without mention of complication', 'Condition', 'ICD9CM', '4-dig nonbill code', NULL, '250.0', '1970-01-01', '2099-12-31'),
        (15, 'Streptococcus pneumoniae', 'Observation', 'SNOMED', 'Organism', 'S', '9861002', '1970-01-01', '2099-12-31'),
        (16, 'Pneumococcal pneumonia', 'Condition', 'SNOMED', 'Clinical Finding', 'S', '233607000', '1970-01-01', '2099-12-31'),
        (20, 'Metformin', 'Drug', 'RxNorm', 'Ingredient', 'S', '6809', '1970-01-01', '2099-12-31'),
        (21, 'Metformin 500 MG Oral Tablet', 'Drug', 'RxNorm', 'Clinical Drug', 'S', '861007', '1970-01-01', '2099-12-31'),
        (22, 'Biguanides', 'Drug', 'ATC', 'ATC 4th', 'C', 'A10BA', '1970-01-01', '2099-12-31'),
        (23, 'Blood glucose lowering drugs, excl. insulins', 'Drug', 'ATC', 'ATC 3rd', 'C', 'A10B', '1970-01-01', '2099-12-31'),
        (30, 'Hemoglobin A1c measurement', 'Procedure', 'CPT4', 'CPT4', 'S', '83036', '1970-01-01', '2099-12-31'),
        (31, 'Glucose [Mass/volume] in Blood', 'Measurement', 'LOINC', 'Lab Test', 'S', '2339-0', '1970-01-01', '2099-12-31'),
        (40, 'FEMALE', 'Gender', 'Gender', 'Gender', 'S', 'F', '1970-01-01', '2099-12-31'),
        (41, 'MALE', 'Gender', 'Gender', 'Gender', 'S', 'M', '1970-01-01', '2099-12-31'),
        (50, 'Inpatient Hospital', 'Visit', 'Place of Service', 'Place of Service', 'S', '21', '1970-01-01', '2099-12-31'),
        (51, 'Office', 'Visit', 'Place of Service', 'Place of Service', 'S', '11', '1970-01-01', '2099-12-31')",
    "INSERT INTO concept_synonym (concept_id, concept_synonym_name, language_concept_id) VALUES
        (12, 'Type II diabetes mellitus', 4180186),
        (12, 'T2DM', 4180186),
        (16, 'Pneumonia due to pneumococcus', 4180186)",
    "INSERT INTO concept_ancestor (ancestor_concept_id, descendant_concept_id,
                                   min_levels_of_separation, max_levels_of_separation) VALUES
        (10, 10, 0, 0), (11, 11, 0, 0), (12, 12, 0, 0), (13, 13, 0, 0),
        (10, 11, 1, 1), (10, 12, 2, 2), (10, 13, 2, 2),
        (11, 12, 1, 1), (11, 13, 1, 1),
        (20, 20, 0, 0), (21, 21, 0, 0), (22, 22, 0, 0), (23, 23, 0, 0),
        (20, 21, 1, 1),
        (22, 20, 1, 1), (22, 21, 1, 1), (23, 22, 1, 1),
        (23, 20, 2, 2), (23, 21, 2, 2)",
    "INSERT INTO relationship (relationship_id, relationship_name, is_hierarchical,
                               defines_ancestry, reverse_relationship_id) VALUES
        ('Maps to', 'Non-standard to Standard map (OMOP)', '0', '0', 'Mapped from'),
        ('Mapped from', 'Standard to Non-standard map (OMOP)', '0', '0', 'Maps to'),
        ('Is a', 'Is a', '1', '1', 'Subsumes'),
        ('Subsumes', 'Subsumes', '1', '1', 'Is a'),
        ('Has causative agent', 'Has causative agent (SNOMED)', '0', '0', 'Causative agent of'),
        ('Causative agent of', 'Causative agent of (SNOMED)', '0', '0', 'Has causative agent')",
    "INSERT INTO concept_relationship (concept_id_1, concept_id_2, relationship_id,
                                       valid_start_date, valid_end_date) VALUES
        (14, 11, 'Maps to', '1970-01-01', '2099-12-31'),
        (11, 14, 'Mapped from', '1970-01-01', '2099-12-31'),
        (11, 11, 'Maps to', '1970-01-01', '2099-12-31'),
        (12, 11, 'Is a', '1970-01-01', '2099-12-31'),
        (11, 12, 'Subsumes', '1970-01-01', '2099-12-31'),
        (16, 15, 'Has causative agent', '1970-01-01', '2099-12-31'),
        (15, 16, 'Causative agent of', '1970-01-01', '2099-12-31')",
    "INSERT INTO drug_strength (drug_concept_id, ingredient_concept_id, amount_value,
                                amount_unit_concept_id, box_size) VALUES
        (21, 20, 500.0, 8576, NULL)",
];

const CLINICAL: &[&str] = &[
    "INSERT INTO location (location_id, state, zip) VALUES
        (1, 'MA', '02139'), (2, 'MA', '02140'), (3, 'NY', '10001')",
    "INSERT INTO care_site (care_site_id, care_site_name, place_of_service_concept_id) VALUES
        (1, 'General Hospital', 50), (2, 'Main Street Clinic', 51), (3, 'North Clinic', 51)",
    "INSERT INTO person (person_id, gender_concept_id, year_of_birth, location_id, care_site_id) VALUES
        (1, 40, 1950, 1, 1),
        (2, 41, 1950, 2, 2),
        (3, 40, 1962, 3, 2),
        (4, 41, 1975, 1, 3),
        (5, 40, 1980, NULL, NULL)",
    "INSERT INTO condition_occurrence (condition_occurrence_id, person_id, condition_concept_id,
                                       condition_start_date, condition_end_date,
                                       condition_type_concept_id) VALUES
        (1, 1, 12, '2010-01-01', '2010-02-01', 32020),
        (2, 1, 16, '2011-05-05', NULL, 32020),
        (3, 2, 13, '2012-03-03', NULL, 32020)",
    "INSERT INTO drug_exposure (drug_exposure_id, person_id, drug_concept_id,
                                drug_exposure_start_date, drug_exposure_end_date,
                                drug_type_concept_id, quantity, days_supply) VALUES
        (1, 1, 21, '2010-01-15', '2010-04-15', 38000177, 90.0, 90)",
    "INSERT INTO procedure_occurrence (procedure_occurrence_id, person_id, procedure_concept_id,
                                       procedure_date, procedure_type_concept_id, quantity) VALUES
        (1, 2, 30, '2012-03-03', 38000275, 1)",
    "INSERT INTO observation (observation_id, person_id, observation_concept_id, observation_date,
                              observation_type_concept_id, value_as_number) VALUES
        (1, 3, 31, '2013-07-07', 38000280, 5.4)",
    "INSERT INTO payer_plan_period (payer_plan_period_id, person_id, payer_plan_period_start_date,
                                    payer_plan_period_end_date, plan_source_value) VALUES
        (1, 1, '2010-01-01', '2012-12-31', 'PPO'),
        (2, 2, '2011-01-01', '2011-06-30', 'HMO'),
        (3, 3, '2010-01-01', '2011-01-01', 'PPO'),
        (4, 4, '2009-01-01', NULL, 'HMO')",
    "INSERT INTO cohort_definition (cohort_definition_id, cohort_definition_name) VALUES
        (1, 'Diabetics'), (2, 'Lab tested')",
    "INSERT INTO cohort (cohort_definition_id, subject_id, cohort_start_date, cohort_end_date) VALUES
        (1, 1, '2010-01-01', '2012-12-31'),
        (1, 2, '2012-03-03', '2012-12-31'),
        (2, 3, '2013-07-07', '2013-07-07')",
];
