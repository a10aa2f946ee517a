//! Per-patient extraction orchestration.
//!
//! Drives the pipeline for one patient at a time: concatenated note in,
//! JSON text (or error sentinel) out. Model, parse, and validation failures
//! are recorded per patient and never abort the batch.

use serde_json::json;

use crate::chunk::chunk_text;
use crate::ollama::{ChatMessage, LlmClient};
use crate::prompt::PromptTemplate;
use crate::recover::recover_json;
use crate::report::{coerce_report, report_json_schema, validate_report};
use crate::ExtractError;

/// Sentinel recorded when no chunk of a patient's note validates.
pub const ERROR_SENTINEL: &str = "[ERROR]";

/// Extraction strategy for one patient's concatenated note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// One schema-guided model call on the whole note.
    SingleShot,
    /// Split the note at paragraph boundaries into chunks of at most
    /// `budget` characters and try chunks in order until one validates.
    Chunked { budget: usize },
}

/// Drives the per-patient extraction pipeline.
pub struct NoteExtractor<'a> {
    llm: &'a dyn LlmClient,
    model: String,
    template: PromptTemplate,
    variant: Variant,
}

impl<'a> NoteExtractor<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        model: &str,
        template: PromptTemplate,
        variant: Variant,
    ) -> Self {
        Self {
            llm,
            model: model.to_string(),
            template,
            variant,
        }
    }

    /// Extract one patient's note into the output-cell text.
    ///
    /// Returns serialized report JSON on success, an empty string for an
    /// empty note, and an error sentinel otherwise. Never panics.
    pub fn extract_patient(&self, patient_id: &str, note: &str) -> String {
        if note.trim().is_empty() {
            tracing::info!(patient_id = %patient_id, "No note text, skipping");
            return String::new();
        }

        match self.variant {
            Variant::SingleShot => match self.extract_single(note) {
                Ok(json) => {
                    tracing::info!(patient_id = %patient_id, "Report validated");
                    json
                }
                Err(e) => {
                    tracing::warn!(patient_id = %patient_id, error = %e, "Extraction failed");
                    format!("[ERROR: {e}]")
                }
            },
            Variant::Chunked { budget } => self
                .extract_chunked(patient_id, note, budget)
                .unwrap_or_else(|| ERROR_SENTINEL.to_string()),
        }
    }

    /// Single-shot variant: the filled template is the system instruction and
    /// the response format is pinned to the report schema, so the response is
    /// validated without coercion.
    fn extract_single(&self, note: &str) -> Result<String, ExtractError> {
        let prompt = self.template.fill(note);
        let messages = [ChatMessage::system(prompt), ChatMessage::user("")];
        let schema = report_json_schema();

        let response = self.llm.chat(&self.model, &messages, Some(&schema))?;
        let value = recover_json(&response)?;
        let report = validate_report(&value)?;
        report
            .to_json()
            .map_err(|e| ExtractError::JsonParsing(e.to_string()))
    }

    /// Chunked variant: short-circuiting search over chunks in order. The
    /// first chunk whose response validates wins; later chunks are not
    /// attempted and nothing is merged across chunks.
    fn extract_chunked(&self, patient_id: &str, note: &str, budget: usize) -> Option<String> {
        let chunks = chunk_text(note, budget);
        let total = chunks.clone().count();

        chunks.enumerate().find_map(|(index, chunk)| {
            tracing::info!(
                patient_id = %patient_id,
                chunk = index + 1,
                total,
                "Sending chunk"
            );
            match self.try_chunk(chunk) {
                Ok(json) => {
                    tracing::info!(patient_id = %patient_id, chunk = index + 1, "Parsed successfully");
                    Some(json)
                }
                Err(e) => {
                    tracing::warn!(
                        patient_id = %patient_id,
                        chunk = index + 1,
                        error = %e,
                        "Chunk failed"
                    );
                    None
                }
            }
        })
    }

    fn try_chunk(&self, chunk: &str) -> Result<String, ExtractError> {
        let messages = [
            ChatMessage::system(self.template.text()),
            ChatMessage::user(chunk),
        ];
        let format = json!("json");

        let response = self.llm.chat(&self.model, &messages, Some(&format))?;
        let mut value = recover_json(&response)?;
        coerce_report(&mut value);
        let report = validate_report(&value)?;
        report
            .to_json()
            .map_err(|e| ExtractError::JsonParsing(e.to_string()))
    }
}

/// Run the extraction stage over grouped per-patient notes, strictly
/// sequentially, returning one output row per patient in input order.
pub fn run_extraction(
    extractor: &NoteExtractor<'_>,
    grouped: &[(String, String)],
) -> Vec<(String, String)> {
    grouped
        .iter()
        .map(|(patient_id, note)| {
            tracing::info!(patient_id = %patient_id, "Processing patient");
            let output = extractor.extract_patient(patient_id, note);
            (patient_id.clone(), output)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::ollama::MockLlmClient;
    use crate::prompt::PromptTemplate;

    fn valid_report_json() -> String {
        crate::report::validate::complete_report_value().to_string()
    }

    fn template() -> PromptTemplate {
        PromptTemplate::from_text("Extract variables from:\n{report}")
    }

    #[test]
    fn single_shot_returns_validated_json() {
        let llm = MockLlmClient::new(&valid_report_json());
        let extractor = NoteExtractor::new(&llm, "llama3.2", template(), Variant::SingleShot);
        let output = extractor.extract_patient("1", "Patient on Keppra.");
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["patient_id"], "10499138");
    }

    #[test]
    fn single_shot_failure_records_message_sentinel() {
        let llm = MockLlmClient::failing("connection refused");
        let extractor = NoteExtractor::new(&llm, "llama3.2", template(), Variant::SingleShot);
        let output = extractor.extract_patient("1", "Patient on Keppra.");
        assert!(output.starts_with("[ERROR: "));
        assert!(output.contains("connection refused"));
    }

    #[test]
    fn empty_note_yields_empty_output() {
        let llm = MockLlmClient::new(&valid_report_json());
        let extractor = NoteExtractor::new(&llm, "llama3.2", template(), Variant::SingleShot);
        assert_eq!(extractor.extract_patient("1", "  \n "), "");
    }

    #[test]
    fn chunked_first_validating_chunk_wins() {
        // First chunk returns prose, second returns a valid report. The note
        // has three paragraphs and a tiny budget, so three chunks exist; the
        // third response would be garbage but must never be requested.
        let llm = MockLlmClient::with_responses(vec![
            "I could not find structured information.".into(),
            format!("Here you go: {}", valid_report_json()),
            "{broken".into(),
        ]);
        let extractor = NoteExtractor::new(
            &llm,
            "llama3.2",
            template(),
            Variant::Chunked { budget: 4 },
        );
        let output = extractor.extract_patient("1", "one\n\ntwo\n\nthree");
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["patient_id"], "10499138");
    }

    #[test]
    fn chunked_all_failures_yield_error_sentinel() {
        let llm = MockLlmClient::new("no json in sight");
        let extractor = NoteExtractor::new(
            &llm,
            "llama3.2",
            template(),
            Variant::Chunked { budget: 4 },
        );
        let output = extractor.extract_patient("1", "one\n\ntwo\n\nthree");
        assert_eq!(output, ERROR_SENTINEL);
    }

    #[test]
    fn chunked_coerces_model_shorthand() {
        let mut value = crate::report::validate::complete_report_value();
        value["seizure_free"] = serde_json::json!(true);
        value["medications"][0]["dose"] = serde_json::json!("1500 mg");
        let llm = MockLlmClient::new(&value.to_string());
        let extractor = NoteExtractor::new(
            &llm,
            "llama3.2",
            template(),
            Variant::Chunked { budget: 4000 },
        );
        let output = extractor.extract_patient("1", "note text");
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["seizure_free"], "yes");
        assert_eq!(parsed["medications"][0]["dose"], 1500.0);
    }

    #[test]
    fn run_extraction_preserves_patient_order_and_continues_after_failures() {
        let llm = MockLlmClient::with_responses(vec![
            "garbage".into(),
            valid_report_json(),
        ]);
        let extractor = NoteExtractor::new(
            &llm,
            "llama3.2",
            template(),
            Variant::Chunked { budget: 4000 },
        );
        let grouped = vec![
            ("1".to_string(), "first note".to_string()),
            ("2".to_string(), "second note".to_string()),
            ("3".to_string(), String::new()),
        ];
        let rows = run_extraction(&extractor, &grouped);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ("1".to_string(), ERROR_SENTINEL.to_string()));
        assert_eq!(rows[1].0, "2");
        assert!(rows[1].1.starts_with('{'));
        assert_eq!(rows[2], ("3".to_string(), String::new()));
    }
}
