//! Schema-validated extraction of structured epilepsy variables from
//! free-text clinical notes.
//!
//! Two stages, two binaries:
//! - `extract-notes`: group notes by patient, prompt a local LLM, recover and
//!   validate the returned JSON, write one JSON blob (or error sentinel) per
//!   patient.
//! - `flatten-notes`: project the stored JSON blobs into one wide CSV with a
//!   data-dependent column set.

pub mod chunk;
pub mod extract;
pub mod flatten;
pub mod ollama;
pub mod prompt;
pub mod recover;
pub mod report;
pub mod table;

use thiserror::Error;

/// Pipeline-wide error type.
///
/// File and column errors abort a stage before any output is written; model,
/// parse, and validation errors are caught per patient (or per chunk) and
/// recorded as sentinel cell values.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Ollama is not running at {0}")]
    BackendConnection(String),

    #[error("Inference backend returned error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("No JSON object found in model response: {raw}")]
    UnparseableResponse { raw: String },

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("No prompt file registered for category '{0}'")]
    UnknownCategory(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural validation failure carrying the offending field path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value at '{path}': {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
