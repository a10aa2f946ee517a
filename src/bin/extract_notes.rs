//! Extraction stage entry point: notes table in, structured table out.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use epistruct::extract::{run_extraction, NoteExtractor, Variant};
use epistruct::ollama::{LlmClient, OllamaClient, DEFAULT_BASE_URL};
use epistruct::prompt::{DiseaseCategory, PromptTemplate};
use epistruct::table::{
    group_notes, read_notes_table, structured_output_path, write_structured_table,
};
use epistruct::ExtractError;

#[derive(Parser)]
#[command(name = "extract-notes")]
#[command(about = "Extract structured clinical variables from a notes table via a local LLM")]
struct Cli {
    /// Input notes table (.csv or .tsv) with PATNR and Beurteilung columns
    input: Option<PathBuf>,

    /// Disease category selecting the prompt template
    #[arg(long, value_enum, default_value_t = DiseaseCategory::Epilepsy)]
    category: DiseaseCategory,

    /// Model name as known to the Ollama instance
    #[arg(long, default_value = "llama3.2")]
    model: String,

    /// Base URL of the Ollama instance
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Chunked variant: split each patient's note into chunks of at most
    /// this many characters and take the first chunk that validates
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Directory containing the prompt template files
    #[arg(long, default_value = "prompts")]
    prompts_dir: PathBuf,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let Some(input) = cli.input.clone() else {
        println!("Usage: extract-notes <your_file.csv>");
        return;
    };

    if let Err(e) = run(&cli, &input) {
        eprintln!("{e}");
    }
}

fn run(cli: &Cli, input: &Path) -> Result<(), ExtractError> {
    let chunked = cli.chunk_size.is_some();
    let template = PromptTemplate::load(&cli.prompts_dir, cli.category, chunked)?;

    let rows = read_notes_table(input)?;
    let grouped = group_notes(&rows);
    tracing::info!(
        patients = grouped.len(),
        rows = rows.len(),
        category = cli.category.as_str(),
        "Notes table loaded"
    );

    let mut client = OllamaClient::new(&cli.base_url, cli.timeout);
    if let Some(temperature) = cli.temperature {
        client = client.with_temperature(temperature);
    }
    warn_if_model_missing(&client, &cli.model);

    let variant = match cli.chunk_size {
        Some(budget) => Variant::Chunked { budget },
        None => Variant::SingleShot,
    };
    let extractor = NoteExtractor::new(&client, &cli.model, template, variant);

    let outputs = run_extraction(&extractor, &grouped);

    let output_path = structured_output_path(input, chunked);
    write_structured_table(&output_path, &outputs)?;
    println!("Done. Output saved to {}", output_path.display());
    Ok(())
}

/// Advisory preflight. An unreachable backend is recorded per patient
/// downstream, so a failing model listing must not abort the stage.
fn warn_if_model_missing(client: &dyn LlmClient, model: &str) {
    match client.is_model_available(model) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(model = %model, "Model not listed by the backend; trying anyway");
        }
        Err(e) => {
            tracing::warn!(model = %model, error = %e, "Could not query backend models; trying anyway");
        }
    }
}

#[cfg(test)]
mod tests {
    use epistruct::ollama::MockLlmClient;

    use super::*;

    #[test]
    fn model_preflight_failure_is_advisory_only() {
        let client = MockLlmClient::failing("error sending request");
        assert!(client.is_model_available("llama3.2").is_err());
        // Must return normally so extraction still runs and records
        // per-patient sentinels.
        warn_if_model_missing(&client, "llama3.2");
    }
}
