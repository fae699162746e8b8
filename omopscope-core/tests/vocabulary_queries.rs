//! Vocabulary query integration tests.
//!
//! This test suite covers:
//! - Concept lookup by id, code and keyword
//! - Hierarchy navigation over `concept_ancestor`
//! - Relationship listing in both directions
//! - Source code to standard concept mapping, both ways
//! - Condition, drug, procedure and observation concept searches
//!
//! Note: every test runs against an in-memory SQLite fixture.

#![cfg(feature = "sqlite")]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

mod common;

use common::{catalog_for, exec, ids, is_empty, memory_pool, seeded_cdm};
use omopscope_core::queries::{condition, drug, general, observation, procedure};
use omopscope_core::{OmopError, Result, Value};

// =============================================================================
// Minimal Hierarchy
// =============================================================================

async fn minimal_diabetes_pool() -> sqlx::SqlitePool {
    let pool = memory_pool().await;
    exec(
        &pool,
        &[
            "CREATE TABLE concept (concept_id INTEGER PRIMARY KEY, concept_name VARCHAR(255),
                                   domain_id VARCHAR(20), vocabulary_id VARCHAR(20),
                                   concept_class_id VARCHAR(20), standard_concept VARCHAR(1),
                                   concept_code VARCHAR(50))",
            "CREATE TABLE concept_ancestor (ancestor_concept_id INTEGER, descendant_concept_id INTEGER,
                                            min_levels_of_separation INTEGER,
                                            max_levels_of_separation INTEGER,
                                            PRIMARY KEY (ancestor_concept_id, descendant_concept_id))",
            "CREATE TABLE concept_synonym (concept_id INTEGER, concept_synonym_name VARCHAR(1000),
                                           language_concept_id INTEGER)",
            "INSERT INTO concept (concept_id, concept_name, vocabulary_id) VALUES
                (1, 'Diabetes', 'SNOMED'), (2, 'Type 2 Diabetes', 'SNOMED')",
            "INSERT INTO concept_ancestor VALUES (1, 2, 1, 1)",
        ],
    )
    .await;
    pool
}

async fn minimal_diabetes_catalog() -> omopscope_core::Catalog {
    catalog_for(minimal_diabetes_pool().await)
}

#[tokio::test]
async fn test_children_and_ancestors_of_minimal_hierarchy() -> Result<()> {
    let catalog = minimal_diabetes_catalog().await;

    let children = general::children_for_concept_id(&catalog, 1, None).await?;
    assert_eq!(ids(children, "child_concept_id").await, vec![2]);

    let ancestors = general::ancestors_for_concept_id(&catalog, 2, None).await?;
    assert_eq!(ids(ancestors, "ancestor_concept_id").await, vec![1]);
    Ok(())
}

#[tokio::test]
async fn test_keyword_search_ignores_case() -> Result<()> {
    let catalog = minimal_diabetes_catalog().await;

    for keyword in ["diabetes", "DIABETES", "Diabetes"] {
        let found = general::concepts_for_keyword(&catalog, keyword, None).await?;
        let mut found = ids(found, "concept_id").await;
        found.sort_unstable();
        assert_eq!(found, vec![1, 2], "keyword {:?}", keyword);
    }
    Ok(())
}

#[tokio::test]
async fn test_keyword_search_folds_non_ascii_case() -> Result<()> {
    let pool = minimal_diabetes_pool().await;
    exec(
        &pool,
        &["INSERT INTO concept (concept_id, concept_name, vocabulary_id) VALUES
            (3, 'Échographie', 'CCAM')"],
    )
    .await;
    let catalog = catalog_for(pool);

    for keyword in ["Échographie", "échographie", "ÉCHOGRAPHIE"] {
        let found = general::concepts_for_keyword(&catalog, keyword, None).await?;
        assert_eq!(ids(found, "concept_id").await, vec![3], "keyword {:?}", keyword);
    }
    Ok(())
}

// =============================================================================
// Concept Lookup
// =============================================================================

#[tokio::test]
async fn test_concepts_for_concept_ids() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::concepts_for_concept_ids(&catalog, &[12, 11], None).await?;
    assert_eq!(
        handle.columns(),
        [
            "concept_id",
            "concept_name",
            "concept_code",
            "concept_class_id",
            "standard_concept",
            "vocabulary_id",
            "vocabulary_name",
        ]
    );

    let table = handle.materialize_table().await?;
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.get(0, "concept_id"), Some(&Value::Integer(11)));
    assert_eq!(
        table.get(0, "vocabulary_name"),
        Some(&Value::from("Systematic Nomenclature of Medicine - Clinical Terms"))
    );
    Ok(())
}

#[tokio::test]
async fn test_return_columns_narrow_output() -> Result<()> {
    let catalog = seeded_cdm().await;

    let handle = general::concepts_for_concept_ids(
        &catalog,
        &[11],
        Some(&["concept_name", "no_such_column", "concept_id"]),
    )
    .await?;
    assert_eq!(handle.columns(), ["concept_id", "concept_name"]);
    drop(handle);

    let err = general::concepts_for_concept_ids(&catalog, &[11], Some(&["nothing"]))
        .await
        .unwrap_err();
    assert!(matches!(err, OmopError::InvalidQuery { .. }));
    Ok(())
}

#[tokio::test]
async fn test_empty_id_list_is_rejected() {
    let catalog = seeded_cdm().await;

    let err = general::concepts_for_concept_ids(&catalog, &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, OmopError::InvalidQuery { .. }));
    assert!(err.to_string().contains("concept_ids"));
}

#[tokio::test]
async fn test_concepts_for_source_codes_needs_vocabulary() -> Result<()> {
    let catalog = seeded_cdm().await;

    let found = general::concepts_for_source_codes(&catalog, &["250.0"], "ICD9CM", None).await?;
    assert_eq!(ids(found, "concept_id").await, vec![14]);

    let other_vocabulary =
        general::concepts_for_source_codes(&catalog, &["250.0"], "SNOMED", None).await?;
    assert!(is_empty(other_vocabulary).await);
    Ok(())
}

#[tokio::test]
async fn test_keyword_matches_synonyms_once() -> Result<()> {
    let catalog = seeded_cdm().await;

    let by_synonym = general::concepts_for_keyword(&catalog, "t2dm", None).await?;
    assert_eq!(ids(by_synonym, "concept_id").await, vec![12]);

    // 12 matches by name and by two synonyms
    let diabetes = general::concepts_for_keyword(&catalog, "diabetes", None).await?;
    let mut found = ids(diabetes, "concept_id").await;
    found.sort_unstable();
    assert_eq!(found, vec![11, 12, 13, 14]);
    Ok(())
}

#[tokio::test]
async fn test_keyword_wildcards_are_literal() -> Result<()> {
    let catalog = seeded_cdm().await;

    let handle = general::concepts_for_keyword(&catalog, "%", None).await?;
    assert!(is_empty(handle).await);

    let handle = general::concepts_for_keyword(&catalog, "mass/volume", None).await?;
    assert_eq!(ids(handle, "concept_id").await, vec![31]);
    Ok(())
}

#[tokio::test]
async fn test_synonyms_for_concept_ids() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::synonyms_for_concept_ids(&catalog, &[12, 16], None).await?;
    let table = handle.materialize_table().await?;
    assert_eq!(table.num_rows(), 3);
    assert_eq!(
        table.column_names(),
        ["concept_id".to_string(), "concept_synonym_name".to_string()]
    );
    Ok(())
}

// =============================================================================
// Hierarchy
// =============================================================================

#[tokio::test]
async fn test_ancestors_exclude_self_and_order_by_distance() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::ancestors_for_concept_id(&catalog, 12, None).await?;
    let table = handle.materialize_table().await?;

    let ancestors: Vec<_> = table
        .column("ancestor_concept_id")
        .unwrap()
        .iter()
        .filter_map(Value::as_i64)
        .collect();
    assert_eq!(ancestors, vec![11, 10]);
    assert_eq!(
        table.column("min_levels_of_separation").unwrap(),
        [Value::Integer(1), Value::Integer(2)]
    );
    Ok(())
}

#[tokio::test]
async fn test_ancestors_order_by_vocabulary_first() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::ancestors_for_concept_id(&catalog, 21, None).await?;
    let table = handle.materialize_table().await?;

    let vocabularies: Vec<_> = table
        .column("vocabulary_id")
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    assert_eq!(vocabularies, vec!["ATC", "ATC", "RxNorm"]);
    assert_eq!(
        table.column("ancestor_concept_id").unwrap(),
        [Value::Integer(22), Value::Integer(23), Value::Integer(20)]
    );
    Ok(())
}

#[tokio::test]
async fn test_descendants() -> Result<()> {
    let catalog = seeded_cdm().await;

    let handle = general::descendants_for_concept_id(&catalog, 10, None).await?;
    let mut found = ids(handle, "descendant_concept_id").await;
    assert_eq!(found[0], 11, "closest descendant first");
    found.sort_unstable();
    assert_eq!(found, vec![11, 12, 13]);
    Ok(())
}

#[tokio::test]
async fn test_parents_and_children_are_one_hop() -> Result<()> {
    let catalog = seeded_cdm().await;

    let parents = general::parents_for_concept_id(&catalog, 12, None).await?;
    assert_eq!(ids(parents, "parent_concept_id").await, vec![11]);

    let mut children = general::children_for_concept_id(&catalog, 11, None).await?;
    assert_eq!(
        children.columns(),
        [
            "child_concept_id",
            "child_concept_name",
            "child_concept_code",
            "child_concept_class_id",
            "child_vocabulary_id",
        ]
    );
    let table = children.materialize_table().await?;
    assert_eq!(
        table.column("child_concept_id").unwrap(),
        [Value::Integer(12), Value::Integer(13)]
    );
    Ok(())
}

#[tokio::test]
async fn test_siblings_exclude_the_concept() -> Result<()> {
    let catalog = seeded_cdm().await;

    let siblings = general::siblings_for_concept_id(&catalog, 12, None).await?;
    assert_eq!(ids(siblings, "sibling_concept_id").await, vec![13]);

    let none = general::siblings_for_concept_id(&catalog, 10, None).await?;
    assert!(is_empty(none).await);
    Ok(())
}

// =============================================================================
// Relationships and Mapping
// =============================================================================

#[tokio::test]
async fn test_related_concepts_keep_both_directions() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::related_concepts_for_concept_id(&catalog, 11, None).await?;
    let table = handle.materialize_table().await?;

    // 3 rows with 11 as origin, 3 with 11 as target; the self map appears in both
    assert_eq!(table.num_rows(), 6);
    let polarity = table.column("relationship_polarity").unwrap();
    let outgoing = polarity.iter().filter(|v| v.as_str() == Some("Relates to")).count();
    let incoming = polarity.iter().filter(|v| v.as_str() == Some("Is related by")).count();
    assert_eq!((outgoing, incoming), (3, 3));

    let names = table.column("relationship_name").unwrap();
    assert!(names.iter().all(|v| !v.is_null()));
    Ok(())
}

#[tokio::test]
async fn test_related_concepts_projection_applies_to_both_halves() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::related_concepts_for_concept_id(
        &catalog,
        11,
        Some(&["relationship_id", "concept_id"]),
    )
    .await?;
    assert_eq!(handle.columns(), ["relationship_id", "concept_id"]);
    assert_eq!(handle.materialize_table().await?.num_rows(), 6);
    Ok(())
}

#[tokio::test]
async fn test_standard_concepts_for_source_codes() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle =
        general::standard_concepts_for_source_codes(&catalog, &["250.0"], "ICD9CM", None).await?;
    let table = handle.materialize_table().await?;
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.get(0, "source_code"), Some(&Value::from("250.0")));
    assert_eq!(table.get(0, "target_concept_id"), Some(&Value::Integer(11)));
    assert_eq!(table.get(0, "relationship_id"), Some(&Value::from("Maps to")));
    assert_eq!(table.get(0, "target_domain_id"), Some(&Value::from("Condition")));
    Ok(())
}

#[tokio::test]
async fn test_source_codes_skip_self_maps() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = general::source_codes_for_concept_ids(&catalog, &[11], None, None).await?;
    let table = handle.materialize_table().await?;
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.get(0, "source_code"), Some(&Value::from("250.0")));
    assert_eq!(table.get(0, "source_vocabulary_id"), Some(&Value::from("ICD9CM")));

    let filtered =
        general::source_codes_for_concept_ids(&catalog, &[11], Some(&["SNOMED"]), None).await?;
    assert!(is_empty(filtered).await);
    Ok(())
}

// =============================================================================
// Domain Searches
// =============================================================================

#[tokio::test]
async fn test_condition_concepts_for_keyword() -> Result<()> {
    let catalog = seeded_cdm().await;

    // 14 is ICD9CM and not a clinical finding
    let handle = condition::condition_concepts_for_keyword(&catalog, "Diabetes", None).await?;
    let mut found = ids(handle, "concept_id").await;
    found.sort_unstable();
    assert_eq!(found, vec![11, 12, 13]);
    Ok(())
}

#[tokio::test]
async fn test_condition_concepts_for_source_codes_restrict_domain() -> Result<()> {
    let catalog = seeded_cdm().await;

    let handle =
        condition::condition_concepts_for_source_codes(&catalog, &["250.0"], "ICD9CM", None)
            .await?;
    assert_eq!(ids(handle, "target_concept_id").await, vec![11]);
    Ok(())
}

#[tokio::test]
async fn test_pathogens_and_disorders() -> Result<()> {
    let catalog = seeded_cdm().await;

    let pathogens = condition::pathogen_concepts_for_keyword(&catalog, "strepto", None).await?;
    assert_eq!(ids(pathogens, "concept_id").await, vec![15]);

    let mut disorders = condition::disorders_for_pathogen_concept_id(&catalog, 15, None).await?;
    let table = disorders.materialize_table().await?;
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.get(0, "pathogen_concept_id"), Some(&Value::Integer(15)));
    assert_eq!(table.get(0, "condition_concept_id"), Some(&Value::Integer(16)));
    assert_eq!(
        table.get(0, "condition_concept_name"),
        Some(&Value::from("Pneumococcal pneumonia"))
    );
    Ok(())
}

#[tokio::test]
async fn test_drugs_for_ingredient_include_the_ingredient() -> Result<()> {
    let catalog = seeded_cdm().await;

    let handle = drug::drugs_for_ingredient_concept_id(&catalog, 20, None).await?;
    assert_eq!(ids(handle, "drug_concept_id").await, vec![20, 21]);
    Ok(())
}

#[tokio::test]
async fn test_ingredients_for_drug_concept_ids() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = drug::ingredients_for_drug_concept_ids(&catalog, &[21], None).await?;
    let table = handle.materialize_table().await?;
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.get(0, "ingredient_concept_id"), Some(&Value::Integer(20)));
    assert_eq!(table.get(0, "ingredient_name"), Some(&Value::from("Metformin")));
    Ok(())
}

#[tokio::test]
async fn test_drug_concepts_for_keyword_only_standard() -> Result<()> {
    let catalog = seeded_cdm().await;

    let handle = drug::drug_concepts_for_keyword(&catalog, "METFORMIN", None).await?;
    let mut found = ids(handle, "concept_id").await;
    found.sort_unstable();
    assert_eq!(found, vec![20, 21]);

    let classes = drug::drug_concepts_for_keyword(&catalog, "biguanides", None).await?;
    assert!(is_empty(classes).await);
    Ok(())
}

#[tokio::test]
async fn test_drug_strength() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = drug::drug_strength_for_drug_concept_ids(&catalog, &[21], None).await?;
    let table = handle.materialize_table().await?;
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.get(0, "amount_value"), Some(&Value::Real(500.0)));
    assert_eq!(table.get(0, "box_size"), Some(&Value::Null));
    assert_eq!(table.get(0, "ingredient_name"), Some(&Value::from("Metformin")));
    Ok(())
}

#[tokio::test]
async fn test_drug_classes_closest_first() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut handle = drug::drug_classes_for_drug_concept_id(&catalog, 21, None).await?;
    let table = handle.materialize_table().await?;
    assert_eq!(
        table.column("class_code").unwrap(),
        [Value::from("A10BA"), Value::from("A10B")]
    );
    Ok(())
}

#[tokio::test]
async fn test_procedure_and_observation_concepts() -> Result<()> {
    let catalog = seeded_cdm().await;

    let mut procedures = procedure::procedure_concepts_for_keyword(&catalog, "a1c", None).await?;
    let table = procedures.materialize_table().await?;
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.get(0, "concept_id"), Some(&Value::Integer(30)));
    assert_eq!(
        table.get(0, "vocabulary_name"),
        Some(&Value::from("Current Procedural Terminology version 4"))
    );

    // "Disorder of glucose metabolism" is SNOMED, so only the LOINC test matches
    let observations =
        observation::observation_concepts_for_keyword(&catalog, "glucose", None).await?;
    assert_eq!(ids(observations, "concept_id").await, vec![31]);
    Ok(())
}
