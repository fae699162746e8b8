//! Rendering of query results on stdout.

use anyhow::Context;
use clap::ValueEnum;
use omopscope_core::{ResultHandle, Table};
use serde::Serialize;

/// Output format for result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text columns
    #[default]
    Text,
    /// Pretty-printed JSON records
    Json,
}

/// Materializes a handle and prints it.
pub async fn print_handle(mut handle: ResultHandle, format: OutputFormat) -> anyhow::Result<()> {
    let table = handle.materialize_table().await?;
    print_table(&table, format)
}

/// Prints a table in the requested format.
pub fn print_table(table: &Table, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if table.is_empty() {
                eprintln!("(no rows)");
            }
            if table.num_columns() > 0 {
                print!("{}", table);
            }
        }
        OutputFormat::Json => println!("{}", table.to_json()?),
    }
    Ok(())
}

/// Prints any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Splits `PATH=ALIAS` at the last `=`.
pub fn parse_attach(arg: &str) -> anyhow::Result<(&str, &str)> {
    arg.rsplit_once('=')
        .filter(|(path, alias)| !path.is_empty() && !alias.is_empty())
        .with_context(|| format!("Invalid --attach value '{}': expected PATH=ALIAS", arg))
}
