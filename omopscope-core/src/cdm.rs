//! Static registry of OMOP CDM v5.3.1 table definitions.
//!
//! The registry is the reference shape of a CDM database. The catalog uses
//! it to classify discovered tables into categories and to fill in foreign
//! keys that a physical database does not declare. It can also emit DDL,
//! which is how test fixtures and the `ddl` command build empty CDM schemas.

use crate::models::{ForeignKey, TableCategory};
use crate::query::Dialect;

/// Storage class of a registry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 32/64-bit integer
    Integer,
    /// Floating point
    Real,
    /// Bounded text, `VARCHAR(n)`
    Varchar(u16),
    /// Unbounded text
    Text,
    /// Calendar date
    Date,
    /// Timestamp without time zone
    DateTime,
}

/// One column of a registry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: &'static str,
    /// Storage class
    pub kind: ColumnKind,
    /// Part of the table's primary key
    pub primary_key: bool,
    /// Referenced `(table, column)`, if any
    pub references: Option<(&'static str, &'static str)>,
}

impl ColumnDef {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
            references: None,
        }
    }

    const fn pk(mut self) -> Self {
        self.primary_key = true;
        self
    }

    const fn fk(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }

    const fn concept(self) -> Self {
        self.fk("concept", "concept_id")
    }

    /// Renders the column type for a dialect.
    pub fn sql_type(&self, dialect: Dialect) -> String {
        match (self.kind, dialect) {
            (ColumnKind::Integer, _) => "INTEGER".to_string(),
            (ColumnKind::Real, Dialect::Sqlite) => "REAL".to_string(),
            (ColumnKind::Real, Dialect::Postgres) => "DOUBLE PRECISION".to_string(),
            (ColumnKind::Varchar(len), _) => format!("VARCHAR({})", len),
            (ColumnKind::Text, _) => "TEXT".to_string(),
            (ColumnKind::Date, _) => "DATE".to_string(),
            (ColumnKind::DateTime, Dialect::Sqlite) => "DATETIME".to_string(),
            (ColumnKind::DateTime, Dialect::Postgres) => "TIMESTAMP".to_string(),
        }
    }
}

const fn int(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::Integer)
}

const fn real(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::Real)
}

const fn varchar(name: &'static str, len: u16) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::Varchar(len))
}

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::Text)
}

const fn date(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::Date)
}

const fn datetime(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::DateTime)
}

const fn person() -> ColumnDef {
    int("person_id").fk("person", "person_id")
}

const fn provider() -> ColumnDef {
    int("provider_id").fk("provider", "provider_id")
}

const fn care_site() -> ColumnDef {
    int("care_site_id").fk("care_site", "care_site_id")
}

const fn visit_occurrence() -> ColumnDef {
    int("visit_occurrence_id").fk("visit_occurrence", "visit_occurrence_id")
}

const fn visit_detail() -> ColumnDef {
    int("visit_detail_id").fk("visit_detail", "visit_detail_id")
}

/// A CDM table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Table name
    pub name: &'static str,
    /// Category the table belongs to
    pub category: TableCategory,
    /// Columns in declaration order
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// Primary key column names, in declaration order.
    pub fn primary_key(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect()
    }

    /// Foreign keys declared by the registry.
    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        self.columns
            .iter()
            .filter_map(|c| {
                c.references.map(|(table, column)| ForeignKey {
                    column: c.name.to_string(),
                    referenced_table: table.to_string(),
                    referenced_column: column.to_string(),
                })
            })
            .collect()
    }

    /// Finds a column definition by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Renders a `CREATE TABLE` statement.
    ///
    /// Foreign keys are left out so tables can be created and loaded in any
    /// order; the catalog restores them from the registry.
    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let not_null = if c.primary_key { " NOT NULL" } else { "" };
                format!(
                    "    {} {}{}",
                    dialect.quote_ident(c.name),
                    c.sql_type(dialect),
                    not_null
                )
            })
            .collect();

        let pk = self.primary_key();
        if !pk.is_empty() {
            let cols: Vec<String> = pk.iter().map(|c| dialect.quote_ident(c)).collect();
            lines.push(format!("    PRIMARY KEY ({})", cols.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            dialect.quote_ident(self.name),
            lines.join(",\n")
        )
    }
}

/// Looks up a table definition by name.
pub fn table_def(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

/// Table names that belong to a category, in registry order.
pub fn table_names(category: TableCategory) -> impl Iterator<Item = &'static str> {
    TABLES
        .iter()
        .filter(move |t| t.category == category)
        .map(|t| t.name)
}

/// Renders DDL for every registry table.
pub fn create_schema_sql(dialect: Dialect) -> Vec<String> {
    TABLES.iter().map(|t| t.create_table_sql(dialect)).collect()
}

use TableCategory::{Clinical, Derived, HealthEconomic, HealthSystem, Metadata, Vocabulary};

/// Every table of the CDM v5.3.1.
pub static TABLES: &[TableDef] = &[
    // Standardized vocabularies
    TableDef {
        name: "concept",
        category: Vocabulary,
        columns: &[
            int("concept_id").pk(),
            varchar("concept_name", 255),
            varchar("domain_id", 20).fk("domain", "domain_id"),
            varchar("vocabulary_id", 20).fk("vocabulary", "vocabulary_id"),
            varchar("concept_class_id", 20).fk("concept_class", "concept_class_id"),
            varchar("standard_concept", 1),
            varchar("concept_code", 50),
            date("valid_start_date"),
            date("valid_end_date"),
            varchar("invalid_reason", 1),
        ],
    },
    TableDef {
        name: "vocabulary",
        category: Vocabulary,
        columns: &[
            varchar("vocabulary_id", 20).pk(),
            varchar("vocabulary_name", 255),
            varchar("vocabulary_reference", 255),
            varchar("vocabulary_version", 255),
            int("vocabulary_concept_id").concept(),
        ],
    },
    TableDef {
        name: "domain",
        category: Vocabulary,
        columns: &[
            varchar("domain_id", 20).pk(),
            varchar("domain_name", 255),
            int("domain_concept_id").concept(),
        ],
    },
    TableDef {
        name: "concept_class",
        category: Vocabulary,
        columns: &[
            varchar("concept_class_id", 20).pk(),
            varchar("concept_class_name", 255),
            int("concept_class_concept_id").concept(),
        ],
    },
    TableDef {
        name: "concept_relationship",
        category: Vocabulary,
        columns: &[
            int("concept_id_1").pk().concept(),
            int("concept_id_2").pk().concept(),
            varchar("relationship_id", 20)
                .pk()
                .fk("relationship", "relationship_id"),
            date("valid_start_date"),
            date("valid_end_date"),
            varchar("invalid_reason", 1),
        ],
    },
    TableDef {
        name: "relationship",
        category: Vocabulary,
        columns: &[
            varchar("relationship_id", 20).pk(),
            varchar("relationship_name", 255),
            varchar("is_hierarchical", 1),
            varchar("defines_ancestry", 1),
            varchar("reverse_relationship_id", 20),
            int("relationship_concept_id").concept(),
        ],
    },
    TableDef {
        name: "concept_synonym",
        category: Vocabulary,
        columns: &[
            int("concept_id").pk().concept(),
            varchar("concept_synonym_name", 1000).pk(),
            int("language_concept_id").concept(),
        ],
    },
    TableDef {
        name: "concept_ancestor",
        category: Vocabulary,
        columns: &[
            int("ancestor_concept_id").pk().concept(),
            int("descendant_concept_id").pk().concept(),
            int("min_levels_of_separation"),
            int("max_levels_of_separation"),
        ],
    },
    TableDef {
        name: "source_to_concept_map",
        category: Vocabulary,
        columns: &[
            varchar("source_code", 50).pk(),
            int("source_concept_id").concept(),
            varchar("source_vocabulary_id", 20)
                .pk()
                .fk("vocabulary", "vocabulary_id"),
            varchar("source_code_description", 255),
            int("target_concept_id").pk().concept(),
            varchar("target_vocabulary_id", 20).fk("vocabulary", "vocabulary_id"),
            date("valid_start_date"),
            date("valid_end_date").pk(),
            varchar("invalid_reason", 1),
        ],
    },
    TableDef {
        name: "drug_strength",
        category: Vocabulary,
        columns: &[
            int("drug_concept_id").pk().concept(),
            int("ingredient_concept_id").pk().concept(),
            real("amount_value"),
            int("amount_unit_concept_id").concept(),
            real("numerator_value"),
            int("numerator_unit_concept_id").concept(),
            real("denominator_value"),
            int("denominator_unit_concept_id").concept(),
            int("box_size"),
            date("valid_start_date"),
            date("valid_end_date"),
            varchar("invalid_reason", 1),
        ],
    },
    TableDef {
        name: "cohort_definition",
        category: Vocabulary,
        columns: &[
            int("cohort_definition_id").pk(),
            varchar("cohort_definition_name", 255),
            text("cohort_definition_description"),
            int("definition_type_concept_id").concept(),
            text("cohort_definition_syntax"),
            int("subject_concept_id").concept(),
            date("cohort_initiation_date"),
        ],
    },
    TableDef {
        name: "attribute_definition",
        category: Vocabulary,
        columns: &[
            int("attribute_definition_id").pk(),
            varchar("attribute_name", 255),
            text("attribute_description"),
            int("attribute_type_concept_id").concept(),
            text("attribute_syntax"),
        ],
    },
    // Metadata
    TableDef {
        name: "cdm_source",
        category: Metadata,
        columns: &[
            varchar("cdm_source_name", 255),
            varchar("cdm_source_abbreviation", 25),
            varchar("cdm_holder", 255),
            text("source_description"),
            varchar("source_documentation_reference", 255),
            varchar("cdm_etl_reference", 255),
            date("source_release_date"),
            date("cdm_release_date"),
            varchar("cdm_version", 10),
            varchar("vocabulary_version", 20),
        ],
    },
    TableDef {
        name: "metadata",
        category: Metadata,
        columns: &[
            int("metadata_concept_id").pk().concept(),
            int("metadata_type_concept_id").pk().concept(),
            varchar("name", 250).pk(),
            text("value_as_string"),
            int("value_as_concept_id").concept(),
            date("metadata_date"),
            datetime("metadata_datetime"),
        ],
    },
    // Standardized clinical data
    TableDef {
        name: "person",
        category: Clinical,
        columns: &[
            int("person_id").pk(),
            int("gender_concept_id").concept(),
            int("year_of_birth"),
            int("month_of_birth"),
            int("day_of_birth"),
            datetime("birth_datetime"),
            int("race_concept_id").concept(),
            int("ethnicity_concept_id").concept(),
            int("location_id").fk("location", "location_id"),
            provider(),
            care_site(),
            varchar("person_source_value", 50),
            varchar("gender_source_value", 50),
            int("gender_source_concept_id").concept(),
            varchar("race_source_value", 50),
            int("race_source_concept_id").concept(),
            varchar("ethnicity_source_value", 50),
            int("ethnicity_source_concept_id").concept(),
        ],
    },
    TableDef {
        name: "observation_period",
        category: Clinical,
        columns: &[
            int("observation_period_id").pk(),
            person(),
            date("observation_period_start_date"),
            date("observation_period_end_date"),
            int("period_type_concept_id").concept(),
        ],
    },
    TableDef {
        name: "specimen",
        category: Clinical,
        columns: &[
            int("specimen_id").pk(),
            person(),
            int("specimen_concept_id").concept(),
            int("specimen_type_concept_id").concept(),
            date("specimen_date"),
            datetime("specimen_datetime"),
            real("quantity"),
            int("unit_concept_id").concept(),
            int("anatomic_site_concept_id").concept(),
            int("disease_status_concept_id").concept(),
            varchar("specimen_source_id", 50),
            varchar("specimen_source_value", 50),
            varchar("unit_source_value", 50),
            varchar("anatomic_site_source_value", 50),
            varchar("disease_status_source_value", 50),
        ],
    },
    TableDef {
        name: "death",
        category: Clinical,
        columns: &[
            int("person_id").pk().fk("person", "person_id"),
            date("death_date"),
            datetime("death_datetime"),
            int("death_type_concept_id").concept(),
            int("cause_concept_id").concept(),
            varchar("cause_source_value", 50),
            int("cause_source_concept_id").concept(),
        ],
    },
    TableDef {
        name: "visit_occurrence",
        category: Clinical,
        columns: &[
            int("visit_occurrence_id").pk(),
            person(),
            int("visit_concept_id").concept(),
            date("visit_start_date"),
            datetime("visit_start_datetime"),
            date("visit_end_date"),
            datetime("visit_end_datetime"),
            int("visit_type_concept_id").concept(),
            provider(),
            care_site(),
            varchar("visit_source_value", 50),
            int("visit_source_concept_id").concept(),
            int("admitting_source_concept_id").concept(),
            varchar("admitting_source_value", 50),
            int("discharge_to_concept_id").concept(),
            varchar("discharge_to_source_value", 50),
            int("preceding_visit_occurrence_id").fk("visit_occurrence", "visit_occurrence_id"),
        ],
    },
    TableDef {
        name: "visit_detail",
        category: Clinical,
        columns: &[
            int("visit_detail_id").pk(),
            person(),
            int("visit_detail_concept_id").concept(),
            date("visit_detail_start_date"),
            datetime("visit_detail_start_datetime"),
            date("visit_detail_end_date"),
            datetime("visit_detail_end_datetime"),
            int("visit_detail_type_concept_id").concept(),
            provider(),
            care_site(),
            varchar("visit_detail_source_value", 50),
            int("visit_detail_source_concept_id").concept(),
            varchar("admitting_source_value", 50),
            int("admitting_source_concept_id").concept(),
            varchar("discharge_to_source_value", 50),
            int("discharge_to_concept_id").concept(),
            int("preceding_visit_detail_id").fk("visit_detail", "visit_detail_id"),
            int("visit_detail_parent_id").fk("visit_detail", "visit_detail_id"),
            visit_occurrence(),
        ],
    },
    TableDef {
        name: "procedure_occurrence",
        category: Clinical,
        columns: &[
            int("procedure_occurrence_id").pk(),
            person(),
            int("procedure_concept_id").concept(),
            date("procedure_date"),
            datetime("procedure_datetime"),
            int("procedure_type_concept_id").concept(),
            int("modifier_concept_id").concept(),
            int("quantity"),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("procedure_source_value", 50),
            int("procedure_source_concept_id").concept(),
            varchar("modifier_source_value", 50),
        ],
    },
    TableDef {
        name: "drug_exposure",
        category: Clinical,
        columns: &[
            int("drug_exposure_id").pk(),
            person(),
            int("drug_concept_id").concept(),
            date("drug_exposure_start_date"),
            datetime("drug_exposure_start_datetime"),
            date("drug_exposure_end_date"),
            datetime("drug_exposure_end_datetime"),
            date("verbatim_end_date"),
            int("drug_type_concept_id").concept(),
            varchar("stop_reason", 20),
            int("refills"),
            real("quantity"),
            int("days_supply"),
            text("sig"),
            int("route_concept_id").concept(),
            varchar("lot_number", 50),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("drug_source_value", 50),
            int("drug_source_concept_id").concept(),
            varchar("route_source_value", 50),
            varchar("dose_unit_source_value", 50),
        ],
    },
    TableDef {
        name: "device_exposure",
        category: Clinical,
        columns: &[
            int("device_exposure_id").pk(),
            person(),
            int("device_concept_id").concept(),
            date("device_exposure_start_date"),
            datetime("device_exposure_start_datetime"),
            date("device_exposure_end_date"),
            datetime("device_exposure_end_datetime"),
            int("device_type_concept_id").concept(),
            varchar("unique_device_id", 50),
            int("quantity"),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("device_source_value", 100),
            int("device_source_concept_id").concept(),
        ],
    },
    TableDef {
        name: "condition_occurrence",
        category: Clinical,
        columns: &[
            int("condition_occurrence_id").pk(),
            person(),
            int("condition_concept_id").concept(),
            date("condition_start_date"),
            datetime("condition_start_datetime"),
            date("condition_end_date"),
            datetime("condition_end_datetime"),
            int("condition_type_concept_id").concept(),
            varchar("stop_reason", 20),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("condition_source_value", 50),
            int("condition_source_concept_id").concept(),
            varchar("condition_status_source_value", 50),
            int("condition_status_concept_id").concept(),
        ],
    },
    TableDef {
        name: "measurement",
        category: Clinical,
        columns: &[
            int("measurement_id").pk(),
            person(),
            int("measurement_concept_id").concept(),
            date("measurement_date"),
            datetime("measurement_datetime"),
            varchar("measurement_time", 10),
            int("measurement_type_concept_id").concept(),
            int("operator_concept_id").concept(),
            real("value_as_number"),
            int("value_as_concept_id").concept(),
            int("unit_concept_id").concept(),
            real("range_low"),
            real("range_high"),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("measurement_source_value", 50),
            int("measurement_source_concept_id").concept(),
            varchar("unit_source_value", 50),
            varchar("value_source_value", 50),
        ],
    },
    TableDef {
        name: "note",
        category: Clinical,
        columns: &[
            int("note_id").pk(),
            person(),
            date("note_date"),
            datetime("note_datetime"),
            int("note_type_concept_id").concept(),
            int("note_class_concept_id").concept(),
            varchar("note_title", 250),
            text("note_text"),
            int("encoding_concept_id").concept(),
            int("language_concept_id").concept(),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("note_source_value", 50),
        ],
    },
    TableDef {
        name: "note_nlp",
        category: Clinical,
        columns: &[
            int("note_nlp_id").pk(),
            int("note_id").fk("note", "note_id"),
            int("section_concept_id").concept(),
            varchar("snippet", 250),
            varchar("offset", 250),
            varchar("lexical_variant", 250),
            int("note_nlp_concept_id").concept(),
            int("note_nlp_source_concept_id").concept(),
            varchar("nlp_system", 250),
            date("nlp_date"),
            datetime("nlp_datetime"),
            varchar("term_exists", 1),
            varchar("term_temporal", 50),
            varchar("term_modifiers", 2000),
        ],
    },
    TableDef {
        name: "observation",
        category: Clinical,
        columns: &[
            int("observation_id").pk(),
            person(),
            int("observation_concept_id").concept(),
            date("observation_date"),
            datetime("observation_datetime"),
            int("observation_type_concept_id").concept(),
            real("value_as_number"),
            varchar("value_as_string", 60),
            int("value_as_concept_id").concept(),
            int("qualifier_concept_id").concept(),
            int("unit_concept_id").concept(),
            provider(),
            visit_occurrence(),
            visit_detail(),
            varchar("observation_source_value", 50),
            int("observation_source_concept_id").concept(),
            varchar("unit_source_value", 50),
            varchar("qualifier_source_value", 50),
        ],
    },
    TableDef {
        name: "fact_relationship",
        category: Clinical,
        columns: &[
            int("domain_concept_id_1").concept(),
            int("fact_id_1"),
            int("domain_concept_id_2").concept(),
            int("fact_id_2"),
            int("relationship_concept_id").concept(),
        ],
    },
    // Standardized health system data
    TableDef {
        name: "location",
        category: HealthSystem,
        columns: &[
            int("location_id").pk(),
            varchar("address_1", 50),
            varchar("address_2", 50),
            varchar("city", 50),
            varchar("state", 2),
            varchar("zip", 9),
            varchar("county", 20),
            varchar("location_source_value", 50),
        ],
    },
    TableDef {
        name: "care_site",
        category: HealthSystem,
        columns: &[
            int("care_site_id").pk(),
            varchar("care_site_name", 255),
            int("place_of_service_concept_id").concept(),
            int("location_id").fk("location", "location_id"),
            varchar("care_site_source_value", 50),
            varchar("place_of_service_source_value", 50),
        ],
    },
    TableDef {
        name: "provider",
        category: HealthSystem,
        columns: &[
            int("provider_id").pk(),
            varchar("provider_name", 255),
            varchar("npi", 20),
            varchar("dea", 20),
            int("specialty_concept_id").concept(),
            care_site(),
            int("year_of_birth"),
            int("gender_concept_id").concept(),
            varchar("provider_source_value", 50),
            varchar("specialty_source_value", 50),
            int("specialty_source_concept_id").concept(),
            varchar("gender_source_value", 50),
            int("gender_source_concept_id").concept(),
        ],
    },
    // Standardized health economics
    TableDef {
        name: "payer_plan_period",
        category: HealthEconomic,
        columns: &[
            int("payer_plan_period_id").pk(),
            person(),
            date("payer_plan_period_start_date"),
            date("payer_plan_period_end_date"),
            int("payer_concept_id").concept(),
            varchar("payer_source_value", 50),
            int("payer_source_concept_id").concept(),
            int("plan_concept_id").concept(),
            varchar("plan_source_value", 50),
            int("plan_source_concept_id").concept(),
            int("sponsor_concept_id").concept(),
            varchar("sponsor_source_value", 50),
            int("sponsor_source_concept_id").concept(),
            varchar("family_source_value", 50),
            int("stop_reason_concept_id").concept(),
            varchar("stop_reason_source_value", 50),
            int("stop_reason_source_concept_id").concept(),
        ],
    },
    TableDef {
        name: "cost",
        category: HealthEconomic,
        columns: &[
            int("cost_id").pk(),
            int("cost_event_id"),
            varchar("cost_domain_id", 20).fk("domain", "domain_id"),
            int("cost_type_concept_id").concept(),
            int("currency_concept_id").concept(),
            real("total_charge"),
            real("total_cost"),
            real("total_paid"),
            real("paid_by_payer"),
            real("paid_by_patient"),
            real("paid_patient_copay"),
            real("paid_patient_coinsurance"),
            real("paid_patient_deductible"),
            real("paid_by_primary"),
            real("paid_ingredient_cost"),
            real("paid_dispensing_fee"),
            int("payer_plan_period_id").fk("payer_plan_period", "payer_plan_period_id"),
            real("amount_allowed"),
            int("revenue_code_concept_id").concept(),
            varchar("revenue_code_source_value", 50),
            int("drg_concept_id").concept(),
            varchar("drg_source_value", 3),
        ],
    },
    // Standardized derived elements
    TableDef {
        name: "cohort",
        category: Derived,
        columns: &[
            int("cohort_definition_id")
                .pk()
                .fk("cohort_definition", "cohort_definition_id"),
            int("subject_id").pk(),
            date("cohort_start_date").pk(),
            date("cohort_end_date").pk(),
        ],
    },
    TableDef {
        name: "cohort_attribute",
        category: Derived,
        columns: &[
            int("cohort_definition_id")
                .pk()
                .fk("cohort_definition", "cohort_definition_id"),
            int("subject_id").pk(),
            date("cohort_start_date").pk(),
            date("cohort_end_date").pk(),
            int("attribute_definition_id")
                .pk()
                .fk("attribute_definition", "attribute_definition_id"),
            real("value_as_number"),
            int("value_as_concept_id").concept(),
        ],
    },
    TableDef {
        name: "drug_era",
        category: Derived,
        columns: &[
            int("drug_era_id").pk(),
            person(),
            int("drug_concept_id").concept(),
            date("drug_era_start_date"),
            date("drug_era_end_date"),
            int("drug_exposure_count"),
            int("gap_days"),
        ],
    },
    TableDef {
        name: "dose_era",
        category: Derived,
        columns: &[
            int("dose_era_id").pk(),
            person(),
            int("drug_concept_id").concept(),
            int("unit_concept_id").concept(),
            real("dose_value"),
            date("dose_era_start_date"),
            date("dose_era_end_date"),
        ],
    },
    TableDef {
        name: "condition_era",
        category: Derived,
        columns: &[
            int("condition_era_id").pk(),
            person(),
            int("condition_concept_id").concept(),
            date("condition_era_start_date"),
            date("condition_era_end_date"),
            int("condition_occurrence_count"),
        ],
    },
];
