//! Vocabulary navigation: concept lookup, hierarchy, relationships and
//! source code mapping.
//!
//! Hierarchy queries read the `concept_ancestor` closure table, which holds
//! every (ancestor, descendant) pair with the minimum and maximum number of
//! hops between them, including the 0-hop pair of each concept with itself.

use super::{
    MAPS_TO, RELATIVE_COLUMNS, name_or_synonym_matches, named, prefixed, require_values, run,
};
use crate::catalog::Catalog;
use crate::query::{Expr, QuerySpec, Select, and, label};
use crate::results::ResultHandle;
use crate::Result;

/// Concepts by id, with their vocabulary name.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `standard_concept`, `vocabulary_id`, `vocabulary_name`
pub async fn concepts_for_concept_ids(
    catalog: &Catalog,
    concept_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(concept_ids, "concept_ids")?;
    let c = catalog.table_ref("concept", "c").await?;
    let v = catalog.table_ref("vocabulary", "v").await?;

    let mut columns = named(
        &c,
        &[
            "concept_id",
            "concept_name",
            "concept_code",
            "concept_class_id",
            "standard_concept",
            "vocabulary_id",
        ],
    )?;
    columns.push(v.col("vocabulary_name")?.named());

    let select = Select::from(&c)
        .columns(columns)
        .join(&v, v.col("vocabulary_id")?.equals(c.col("vocabulary_id")?))
        .filter(c.col("concept_id")?.in_list(concept_ids.iter().copied()))
        .order_by(c.col("concept_id")?);

    run(catalog, select, return_columns).await
}

/// Concepts by their code within one vocabulary.
///
/// Codes are only unique together with their vocabulary.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `standard_concept`, `vocabulary_id`, `domain_id`
pub async fn concepts_for_source_codes(
    catalog: &Catalog,
    source_codes: &[&str],
    vocabulary_id: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(source_codes, "source_codes")?;
    let c = catalog.table_ref("concept", "c").await?;

    let select = Select::from(&c)
        .columns(named(
            &c,
            &[
                "concept_id",
                "concept_name",
                "concept_code",
                "concept_class_id",
                "standard_concept",
                "vocabulary_id",
                "domain_id",
            ],
        )?)
        .filter(and([
            c.col("concept_code")?.in_list(source_codes.iter().copied()),
            c.col("vocabulary_id")?.equals_value(vocabulary_id),
        ]))
        .order_by(c.col("concept_code")?);

    run(catalog, select, return_columns).await
}

/// Concepts whose name or any synonym contains `keyword`, ignoring case.
///
/// Concepts without synonyms are included; a concept matching through
/// several synonyms is returned once.
///
/// Columns: `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `standard_concept`, `vocabulary_id`, `domain_id`
pub async fn concepts_for_keyword(
    catalog: &Catalog,
    keyword: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let c = catalog.table_ref("concept", "c").await?;
    let s = catalog.table_ref("concept_synonym", "s").await?;

    let select = Select::from(&c)
        .columns(named(
            &c,
            &[
                "concept_id",
                "concept_name",
                "concept_code",
                "concept_class_id",
                "standard_concept",
                "vocabulary_id",
                "domain_id",
            ],
        )?)
        .left_join(&s, s.col("concept_id")?.equals(c.col("concept_id")?))
        .filter(name_or_synonym_matches(&c, &s, keyword)?)
        .distinct();

    run(catalog, select, return_columns).await
}

/// Synonyms of the given concepts.
///
/// Columns: `concept_id`, `concept_synonym_name`
pub async fn synonyms_for_concept_ids(
    catalog: &Catalog,
    concept_ids: &[i64],
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(concept_ids, "concept_ids")?;
    let c = catalog.table_ref("concept", "c").await?;
    let s = catalog.table_ref("concept_synonym", "s").await?;

    let select = Select::from(&c)
        .columns([
            c.col("concept_id")?.named(),
            s.col("concept_synonym_name")?.named(),
        ])
        .join(&s, s.col("concept_id")?.equals(c.col("concept_id")?))
        .filter(c.col("concept_id")?.in_list(concept_ids.iter().copied()))
        .order_by(c.col("concept_id")?);

    run(catalog, select, return_columns).await
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Closure column holding the queried concept.
    fn anchor(self) -> &'static str {
        match self {
            Direction::Up => "descendant_concept_id",
            Direction::Down => "ancestor_concept_id",
        }
    }

    /// Closure column holding the related concept.
    fn related(self) -> &'static str {
        match self {
            Direction::Up => "ancestor_concept_id",
            Direction::Down => "descendant_concept_id",
        }
    }
}

/// All strict ancestors or descendants, closest first within a vocabulary.
async fn closure(
    catalog: &Catalog,
    concept_id: i64,
    direction: Direction,
    prefix: &str,
) -> Result<QuerySpec> {
    let ca = catalog.table_ref("concept_ancestor", "ca").await?;
    let r = catalog.table_ref("concept", "r").await?;

    let mut columns = prefixed(
        &r,
        prefix,
        &[
            ("concept_id", "concept_id"),
            ("concept_name", "concept_name"),
            ("concept_code", "concept_code"),
            ("concept_class_id", "concept_class_id"),
        ],
    )?;
    columns.extend(named(&r, &["vocabulary_id"])?);
    columns.extend(named(
        &ca,
        &["min_levels_of_separation", "max_levels_of_separation"],
    )?);

    Ok(Select::from(&ca)
        .columns(columns)
        .join(&r, r.col("concept_id")?.equals(ca.col(direction.related())?))
        .filter(and([
            ca.col(direction.anchor())?.equals_value(concept_id),
            ca.col("ancestor_concept_id")?
                .not_equals(ca.col("descendant_concept_id")?),
        ]))
        .order_by(r.col("vocabulary_id")?)
        .order_by(ca.col("min_levels_of_separation")?)
        .into())
}

/// Immediate parents or children (one hop away).
async fn immediate(
    catalog: &Catalog,
    concept_id: i64,
    direction: Direction,
    prefix: &str,
) -> Result<QuerySpec> {
    let ca = catalog.table_ref("concept_ancestor", "ca").await?;
    let r = catalog.table_ref("concept", "r").await?;

    Ok(Select::from(&ca)
        .columns(prefixed(&r, prefix, RELATIVE_COLUMNS)?)
        .join(&r, r.col("concept_id")?.equals(ca.col(direction.related())?))
        .filter(and([
            ca.col(direction.anchor())?.equals_value(concept_id),
            ca.col("min_levels_of_separation")?.equals_value(1_i64),
        ]))
        .order_by(r.col("concept_id")?)
        .into())
}

/// Every ancestor of a concept, excluding the concept itself.
///
/// Ordered by vocabulary, then by increasing distance.
///
/// Columns: `ancestor_concept_id`, `ancestor_concept_name`,
/// `ancestor_concept_code`, `ancestor_concept_class_id`, `vocabulary_id`,
/// `min_levels_of_separation`, `max_levels_of_separation`
pub async fn ancestors_for_concept_id(
    catalog: &Catalog,
    concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let query = closure(catalog, concept_id, Direction::Up, "ancestor").await?;
    run(catalog, query, return_columns).await
}

/// Every descendant of a concept, excluding the concept itself.
///
/// Columns: `descendant_concept_id`, `descendant_concept_name`,
/// `descendant_concept_code`, `descendant_concept_class_id`, `vocabulary_id`,
/// `min_levels_of_separation`, `max_levels_of_separation`
pub async fn descendants_for_concept_id(
    catalog: &Catalog,
    concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let query = closure(catalog, concept_id, Direction::Down, "descendant").await?;
    run(catalog, query, return_columns).await
}

/// Immediate parents of a concept.
///
/// Columns: `parent_concept_id`, `parent_concept_name`, `parent_concept_code`,
/// `parent_concept_class_id`, `parent_vocabulary_id`
pub async fn parents_for_concept_id(
    catalog: &Catalog,
    concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let query = immediate(catalog, concept_id, Direction::Up, "parent").await?;
    run(catalog, query, return_columns).await
}

/// Immediate children of a concept.
///
/// Columns: `child_concept_id`, `child_concept_name`, `child_concept_code`,
/// `child_concept_class_id`, `child_vocabulary_id`
pub async fn children_for_concept_id(
    catalog: &Catalog,
    concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let query = immediate(catalog, concept_id, Direction::Down, "child").await?;
    run(catalog, query, return_columns).await
}

/// Other immediate children of the concept's immediate parents.
///
/// The concept itself is not part of its own siblings.
///
/// Columns: `sibling_concept_id`, `sibling_concept_name`,
/// `sibling_concept_code`, `sibling_concept_class_id`, `sibling_vocabulary_id`
pub async fn siblings_for_concept_id(
    catalog: &Catalog,
    concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let pa = catalog.table_ref("concept_ancestor", "pa").await?;
    let ca = catalog.table_ref("concept_ancestor", "ca").await?;
    let s = catalog.table_ref("concept", "s").await?;

    let parents = Select::from(&pa)
        .columns([pa.col("ancestor_concept_id")?.named()])
        .filter(and([
            pa.col("descendant_concept_id")?.equals_value(concept_id),
            pa.col("min_levels_of_separation")?.equals_value(1_i64),
        ]));

    let select = Select::from(&ca)
        .columns(prefixed(&s, "sibling", RELATIVE_COLUMNS)?)
        .join(&s, s.col("concept_id")?.equals(ca.col("descendant_concept_id")?))
        .filter(and([
            ca.col("ancestor_concept_id")?.in_subquery(parents),
            ca.col("min_levels_of_separation")?.equals_value(1_i64),
            ca.col("descendant_concept_id")?
                .not_equals(Expr::Param(concept_id.into())),
        ]))
        .distinct();

    run(catalog, select, return_columns).await
}

/// Both directions of a concept's relationships.
///
/// Rows where the concept is `concept_id_1` are labelled `Relates to`, rows
/// where it is `concept_id_2` are labelled `Is related by`. The two halves
/// are concatenated without removing duplicates.
///
/// Columns: `relationship_polarity`, `relationship_id`, `relationship_name`,
/// `concept_id`, `concept_name`, `concept_code`, `concept_class_id`,
/// `vocabulary_id`
pub async fn related_concepts_for_concept_id(
    catalog: &Catalog,
    concept_id: i64,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let outgoing =
        relationship_half(catalog, concept_id, "Relates to", "concept_id_1", "concept_id_2")
            .await?;
    let incoming =
        relationship_half(catalog, concept_id, "Is related by", "concept_id_2", "concept_id_1")
            .await?;

    run(
        catalog,
        QuerySpec::UnionAll(vec![outgoing, incoming]),
        return_columns,
    )
    .await
}

async fn relationship_half(
    catalog: &Catalog,
    concept_id: i64,
    polarity: &str,
    anchor: &str,
    other: &str,
) -> Result<Select> {
    let cr = catalog.table_ref("concept_relationship", "cr").await?;
    let r = catalog.table_ref("relationship", "r").await?;
    let c = catalog.table_ref("concept", "c").await?;

    let mut columns = vec![
        label(polarity).alias("relationship_polarity"),
        cr.col("relationship_id")?.named(),
        r.col("relationship_name")?.named(),
    ];
    columns.extend(named(
        &c,
        &[
            "concept_id",
            "concept_name",
            "concept_code",
            "concept_class_id",
            "vocabulary_id",
        ],
    )?);

    Ok(Select::from(&cr)
        .columns(columns)
        .left_join(&r, r.col("relationship_id")?.equals(cr.col("relationship_id")?))
        .join(&c, c.col("concept_id")?.equals(cr.col(other)?))
        .filter(cr.col(anchor)?.equals_value(concept_id)))
}

/// Standard concepts for source codes through `Maps to`.
///
/// Source concepts are matched on (code, vocabulary). `domain_id`, when
/// given, restricts the standard concepts to one domain.
pub(crate) async fn source_to_standard(
    catalog: &Catalog,
    source_codes: &[&str],
    source_vocabulary_id: &str,
    domain_id: Option<&str>,
) -> Result<Select> {
    require_values(source_codes, "source_codes")?;
    let s = catalog.table_ref("concept", "s").await?;
    let cr = catalog.table_ref("concept_relationship", "cr").await?;
    let t = catalog.table_ref("concept", "t").await?;

    let mut filter = vec![
        s.col("concept_code")?.in_list(source_codes.iter().copied()),
        s.col("vocabulary_id")?.equals_value(source_vocabulary_id),
        cr.col("relationship_id")?.equals_value(MAPS_TO),
    ];
    if let Some(domain) = domain_id {
        filter.push(t.col("domain_id")?.equals_value(domain));
    }

    Ok(Select::from(&s)
        .columns([
            s.col("concept_code")?.alias("source_code"),
            s.col("vocabulary_id")?.alias("source_vocabulary_id"),
            s.col("concept_name")?.alias("source_concept_name"),
            cr.col("relationship_id")?.named(),
            t.col("concept_id")?.alias("target_concept_id"),
            t.col("concept_name")?.alias("target_concept_name"),
            t.col("vocabulary_id")?.alias("target_vocabulary_id"),
            t.col("domain_id")?.alias("target_domain_id"),
        ])
        .join(&cr, cr.col("concept_id_1")?.equals(s.col("concept_id")?))
        .join(&t, t.col("concept_id")?.equals(cr.col("concept_id_2")?))
        .filter(and(filter))
        .order_by(s.col("concept_code")?))
}

/// Standard concepts that source codes map to.
///
/// Columns: `source_code`, `source_vocabulary_id`, `source_concept_name`,
/// `relationship_id`, `target_concept_id`, `target_concept_name`,
/// `target_vocabulary_id`, `target_domain_id`
pub async fn standard_concepts_for_source_codes(
    catalog: &Catalog,
    source_codes: &[&str],
    source_vocabulary_id: &str,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    let select = source_to_standard(catalog, source_codes, source_vocabulary_id, None).await?;
    run(catalog, select, return_columns).await
}

/// Source codes that map to the given standard concepts.
///
/// A standard concept's own `Maps to` row onto itself is skipped.
/// `source_vocabulary_ids` restricts the source vocabularies.
///
/// Columns: `concept_id`, `concept_name`, `source_code`,
/// `source_vocabulary_id`, `source_concept_name`
pub async fn source_codes_for_concept_ids(
    catalog: &Catalog,
    concept_ids: &[i64],
    source_vocabulary_ids: Option<&[&str]>,
    return_columns: Option<&[&str]>,
) -> Result<ResultHandle> {
    require_values(concept_ids, "concept_ids")?;
    let t = catalog.table_ref("concept", "t").await?;
    let cr = catalog.table_ref("concept_relationship", "cr").await?;
    let s = catalog.table_ref("concept", "s").await?;

    let mut filter = vec![
        t.col("concept_id")?.in_list(concept_ids.iter().copied()),
        cr.col("relationship_id")?.equals_value(MAPS_TO),
        cr.col("concept_id_1")?.not_equals(cr.col("concept_id_2")?),
    ];
    if let Some(vocabularies) = source_vocabulary_ids {
        require_values(vocabularies, "source_vocabulary_ids")?;
        filter.push(s.col("vocabulary_id")?.in_list(vocabularies.iter().copied()));
    }

    let select = Select::from(&t)
        .columns([
            t.col("concept_id")?.named(),
            t.col("concept_name")?.named(),
            s.col("concept_code")?.alias("source_code"),
            s.col("vocabulary_id")?.alias("source_vocabulary_id"),
            s.col("concept_name")?.alias("source_concept_name"),
        ])
        .join(&cr, cr.col("concept_id_2")?.equals(t.col("concept_id")?))
        .join(&s, s.col("concept_id")?.equals(cr.col("concept_id_1")?))
        .filter(and(filter))
        .order_by(t.col("concept_id")?)
        .order_by(s.col("vocabulary_id")?);

    run(catalog, select, return_columns).await
}
