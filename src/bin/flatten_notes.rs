//! Flattening stage entry point: structured table in, wide CSV out.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use epistruct::flatten::flatten_rows;
use epistruct::table::{flattened_output_path, read_structured_table, write_wide_table};
use epistruct::ExtractError;

#[derive(Parser)]
#[command(name = "flatten-notes")]
#[command(about = "Flatten structured extraction output into one wide CSV")]
struct Cli {
    /// Structured table written by extract-notes (PATNR, structured_output)
    input: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let Some(input) = cli.input else {
        println!("Usage: flatten-notes <structured_output.csv>");
        return;
    };

    if let Err(e) = run(&input) {
        eprintln!("{e}");
    }
}

fn run(input: &Path) -> Result<(), ExtractError> {
    let rows = read_structured_table(input)?;
    let table = flatten_rows(&rows);
    tracing::info!(
        patients = table.rows.len(),
        columns = table.columns.len(),
        "Flattened structured output"
    );

    let output_path = flattened_output_path(input);
    write_wide_table(&output_path, &table.columns, &table.rows)?;
    println!("Flattened output saved to {}", output_path.display());
    Ok(())
}
