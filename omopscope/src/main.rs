//! Command-line explorer for OMOP CDM databases.
//!
//! Connects to a CDM database, lists its tables by category and runs the
//! canned vocabulary and population queries of `omopscope-core`.
//!
//! # Guarantees
//! - Connections are read-only
//! - Credentials never appear in logs or error output

mod output;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use omopscope_core::logging::init_logging;
use omopscope_core::queries::{
    care_site, condition, drug, general, observation, payer_plan, person, procedure,
};
use omopscope_core::{Catalog, Dialect, Table, TableCategory, Value, cdm};
use output::{OutputFormat, parse_attach, print_handle, print_json, print_table};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "omopscope")]
#[command(about = "Explore OMOP CDM databases")]
#[command(version)]
#[command(long_about = "
omopscope - query an OMOP Common Data Model database

Discovers the tables of a CDM database and runs canned queries over the
standardized vocabularies and clinical data:
- concept lookup and keyword search
- ancestor, descendant, parent, child and sibling navigation
- source code to standard concept mapping
- population counts by demographics, care site and payer plan

SUPPORTED DATABASES:
- PostgreSQL (postgres:// or postgresql://)
- SQLite (sqlite://, sqlite::memory:, or .db/.sqlite/.sqlite3 files)

EXAMPLES:
  omopscope --database-url sqlite:///data/cdm.sqlite tables
  omopscope search diabetes --domain condition
  omopscope hierarchy children 201820
  omopscope --format json map --vocabulary ICD9CM 250.00 250.02
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logging except errors")]
    quiet: bool,

    /// Database connection URL
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    database_url: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Restrict output columns
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        help = "Comma-separated output columns to keep (default: all)"
    )]
    columns: Vec<String>,

    /// Attach SQLite databases before querying
    #[arg(
        long,
        global = true,
        value_name = "PATH=ALIAS",
        help = "Attach another SQLite file under an alias (repeatable)"
    )]
    attach: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List discovered tables by category
    Tables(TablesArgs),
    /// Show the columns of one table
    Info(InfoArgs),
    /// Look up concepts by id
    Concepts(ConceptsArgs),
    /// Search concepts by keyword
    Search(SearchArgs),
    /// Navigate the concept hierarchy
    Hierarchy(HierarchyArgs),
    /// Show relationships of a concept in both directions
    Related(RelatedArgs),
    /// Map source codes to standard concepts
    Map(MapArgs),
    /// Population counts
    Demographics(DemographicsArgs),
    /// Run a raw SQL statement (unchecked)
    Sql(SqlArgs),
    /// Print CDM DDL
    Ddl(DdlArgs),
    /// List supported database types and table categories
    List,
}

#[derive(Args)]
struct TablesArgs {
    /// Only list one category (clinical, vocabulary, derived, health_system,
    /// health_economic, metadata)
    #[arg(long)]
    category: Option<TableCategory>,
}

#[derive(Args)]
struct InfoArgs {
    /// Table name
    table: String,
}

#[derive(Args)]
struct ConceptsArgs {
    /// Concept ids
    #[arg(required = true)]
    ids: Vec<i64>,

    /// Show synonyms instead of concepts
    #[arg(long)]
    synonyms: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchDomain {
    Condition,
    Drug,
    Procedure,
    Observation,
    Pathogen,
}

#[derive(Args)]
struct SearchArgs {
    /// Case-insensitive keyword
    keyword: String,

    /// Restrict the search to one clinical domain
    #[arg(long, value_enum)]
    domain: Option<SearchDomain>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Ancestors,
    Descendants,
    Parents,
    Children,
    Siblings,
}

#[derive(Args)]
struct HierarchyArgs {
    /// Direction to navigate
    #[arg(value_enum)]
    direction: Direction,

    /// Concept id
    concept_id: i64,
}

#[derive(Args)]
struct RelatedArgs {
    /// Concept id
    concept_id: i64,
}

#[derive(Args)]
struct MapArgs {
    /// Source vocabulary id (e.g. ICD9CM)
    #[arg(long)]
    vocabulary: String,

    /// Source codes
    #[arg(required = true)]
    codes: Vec<String>,

    /// Only map to Condition-domain concepts
    #[arg(long)]
    conditions: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Demographic {
    Gender,
    YearOfBirth,
    YearOfBirthAndGender,
    State,
    Zip,
    CareSite,
    Facilities,
    PlanType,
    Coverage,
}

#[derive(Args)]
struct DemographicsArgs {
    /// Count to produce
    #[arg(value_enum)]
    kind: Demographic,

    /// Restrict person-level counts to these persons
    #[arg(long, value_delimiter = ',')]
    person_ids: Vec<i64>,
}

#[derive(Args)]
struct SqlArgs {
    /// SQL statement, passed through without validation
    statement: String,
}

#[derive(Args)]
struct DdlArgs {
    /// Only one table
    #[arg(long)]
    table: Option<String>,

    /// Target dialect
    #[arg(long, default_value = "sqlite")]
    dialect: Dialect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Ddl(args) => print_ddl(args),
        Command::List => {
            list_supported();
            Ok(())
        }
        command => {
            let catalog = connect(&cli.global).await?;
            let result = run(&catalog, command, &cli.global).await;
            catalog.close().await;
            result
        }
    }
}

/// Connects and attaches any requested SQLite files.
async fn connect(global: &GlobalArgs) -> anyhow::Result<Catalog> {
    let Some(url) = global.database_url.as_deref() else {
        bail!("A database URL is required: pass --database-url or set DATABASE_URL");
    };

    let mut catalog = Catalog::connect(url).await.map_err(|e| {
        error!("Failed to connect: {}", e);
        e
    })?;
    info!("Connected to {}", catalog.redacted_url());

    for attach in &global.attach {
        let (path, alias) = parse_attach(attach)?;
        catalog
            .attach_external_source(path, alias)
            .await
            .with_context(|| format!("Failed to attach '{}'", alias))?;
    }
    Ok(catalog)
}

async fn run(catalog: &Catalog, command: &Command, global: &GlobalArgs) -> anyhow::Result<()> {
    let columns: Vec<&str> = global.columns.iter().map(String::as_str).collect();
    let cols = (!columns.is_empty()).then_some(columns.as_slice());
    let format = global.format;

    match command {
        Command::Tables(args) => list_tables(catalog, args.category, format).await,
        Command::Info(args) => describe_table(catalog, &args.table, format).await,
        Command::Concepts(args) => {
            let handle = if args.synonyms {
                general::synonyms_for_concept_ids(catalog, &args.ids, cols).await?
            } else {
                general::concepts_for_concept_ids(catalog, &args.ids, cols).await?
            };
            print_handle(handle, format).await
        }
        Command::Search(args) => {
            let keyword = args.keyword.as_str();
            let handle = match args.domain {
                None => general::concepts_for_keyword(catalog, keyword, cols).await?,
                Some(SearchDomain::Condition) => {
                    condition::condition_concepts_for_keyword(catalog, keyword, cols).await?
                }
                Some(SearchDomain::Drug) => {
                    drug::drug_concepts_for_keyword(catalog, keyword, cols).await?
                }
                Some(SearchDomain::Procedure) => {
                    procedure::procedure_concepts_for_keyword(catalog, keyword, cols).await?
                }
                Some(SearchDomain::Observation) => {
                    observation::observation_concepts_for_keyword(catalog, keyword, cols).await?
                }
                Some(SearchDomain::Pathogen) => {
                    condition::pathogen_concepts_for_keyword(catalog, keyword, cols).await?
                }
            };
            print_handle(handle, format).await
        }
        Command::Hierarchy(args) => {
            let id = args.concept_id;
            let handle = match args.direction {
                Direction::Ancestors => general::ancestors_for_concept_id(catalog, id, cols).await?,
                Direction::Descendants => {
                    general::descendants_for_concept_id(catalog, id, cols).await?
                }
                Direction::Parents => general::parents_for_concept_id(catalog, id, cols).await?,
                Direction::Children => general::children_for_concept_id(catalog, id, cols).await?,
                Direction::Siblings => general::siblings_for_concept_id(catalog, id, cols).await?,
            };
            print_handle(handle, format).await
        }
        Command::Related(args) => {
            let handle =
                general::related_concepts_for_concept_id(catalog, args.concept_id, cols).await?;
            print_handle(handle, format).await
        }
        Command::Map(args) => {
            let codes: Vec<&str> = args.codes.iter().map(String::as_str).collect();
            let handle = if args.conditions {
                condition::condition_concepts_for_source_codes(
                    catalog,
                    &codes,
                    &args.vocabulary,
                    cols,
                )
                .await?
            } else {
                general::standard_concepts_for_source_codes(catalog, &codes, &args.vocabulary, cols)
                    .await?
            };
            print_handle(handle, format).await
        }
        Command::Demographics(args) => demographics(catalog, args, cols, format).await,
        Command::Sql(args) => {
            let handle = catalog.execute_raw(&args.statement).await?;
            print_handle(handle, format).await
        }
        Command::Ddl(_) | Command::List => Ok(()),
    }
}

async fn demographics(
    catalog: &Catalog,
    args: &DemographicsArgs,
    cols: Option<&[&str]>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let persons = (!args.person_ids.is_empty()).then_some(args.person_ids.as_slice());

    let handle = match args.kind {
        Demographic::Gender => person::patient_counts_by_gender(catalog, persons, cols).await?,
        Demographic::YearOfBirth => {
            person::patient_counts_by_year_of_birth(catalog, persons, cols).await?
        }
        Demographic::YearOfBirthAndGender => {
            person::patient_counts_by_year_of_birth_and_gender(catalog, persons, cols).await?
        }
        Demographic::State => {
            person::patient_counts_by_residence_state(catalog, persons, cols).await?
        }
        Demographic::Zip => person::patient_counts_by_zip_code(catalog, persons, cols).await?,
        Demographic::CareSite => {
            care_site::patient_counts_by_care_site_type(catalog, cols).await?
        }
        Demographic::Facilities => care_site::facility_counts_by_type(catalog, cols).await?,
        Demographic::PlanType => {
            payer_plan::patient_distribution_by_plan_type(catalog, cols).await?
        }
        Demographic::Coverage => {
            let table = payer_plan::counts_by_years_of_coverage(catalog).await?;
            return print_table(&table, format);
        }
    };
    print_handle(handle, format).await
}

/// Lists discovered tables with their category.
async fn list_tables(
    catalog: &Catalog,
    only: Option<TableCategory>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    let categories = only.map_or_else(|| TableCategory::ALL.to_vec(), |c| vec![c]);

    for category in categories {
        for (name, table) in catalog.category(category).await? {
            rows.push(table_row(
                &name,
                category.as_str(),
                table.schema.as_deref(),
                table.columns.len(),
            ));
        }
    }
    if only.is_none() {
        for (name, table) in catalog.uncategorized().await? {
            rows.push(table_row(
                &name,
                "other",
                table.schema.as_deref(),
                table.columns.len(),
            ));
        }
    }

    let table = Table::from_rows(
        vec![
            "table".to_string(),
            "category".to_string(),
            "schema".to_string(),
            "columns".to_string(),
        ],
        rows,
    );
    print_table(&table, format)
}

fn table_row(name: &str, category: &str, schema: Option<&str>, columns: usize) -> Vec<Value> {
    vec![
        Value::from(name),
        Value::from(category),
        Value::from(schema),
        Value::Integer(i64::try_from(columns).unwrap_or(i64::MAX)),
    ]
}

/// Shows the columns and foreign keys of one table.
async fn describe_table(catalog: &Catalog, name: &str, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        let table = catalog.table(name).await?;
        return print_json(table.as_ref());
    }

    let rows = catalog
        .column_info(name)
        .await?
        .into_iter()
        .map(|c| {
            vec![
                Value::Text(c.name),
                Value::Text(c.declared_type),
                Value::Text(c.data_type.to_string()),
                Value::Bool(c.nullable),
                Value::Bool(c.primary_key),
            ]
        })
        .collect();
    let columns = Table::from_rows(
        ["column", "declared_type", "data_type", "nullable", "primary_key"]
            .map(String::from)
            .to_vec(),
        rows,
    );
    print_table(&columns, format)?;

    let table = catalog.table(name).await?;
    if table.synthetic_primary_key {
        println!("\nNo declared primary key; first column used as key");
    }
    if !table.foreign_keys.is_empty() {
        println!("\nForeign keys:");
        for fk in &table.foreign_keys {
            println!("  {} -> {}.{}", fk.column, fk.referenced_table, fk.referenced_column);
        }
    }
    Ok(())
}

fn print_ddl(args: &DdlArgs) -> anyhow::Result<()> {
    match args.table.as_deref() {
        Some(name) => {
            let def = cdm::table_def(name)
                .with_context(|| format!("'{}' is not a CDM v5.3.1 table", name))?;
            println!("{};", def.create_table_sql(args.dialect));
        }
        None => {
            for statement in cdm::create_schema_sql(args.dialect) {
                println!("{};\n", statement);
            }
        }
    }
    Ok(())
}

fn list_supported() {
    println!("Supported databases:");
    #[cfg(feature = "postgresql")]
    println!("  PostgreSQL  postgres://user@host:5432/cdm");
    #[cfg(feature = "sqlite")]
    println!("  SQLite      sqlite:///path/to/cdm.sqlite, sqlite::memory:, *.db");

    println!("\nTable categories:");
    for category in TableCategory::ALL {
        let names: Vec<&str> = cdm::table_names(category).collect();
        println!("  {:<16} {}", category.as_str(), names.join(", "));
    }
}
