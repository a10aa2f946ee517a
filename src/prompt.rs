//! Disease-category prompt registry.
//!
//! Prompt templates live as plain text files on disk, one per disease
//! category (plus chunked variants). The single-shot variant substitutes the
//! whole note for a `{report}` placeholder; the chunked variant uses the
//! template verbatim as the system instruction and passes each chunk as the
//! user turn.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ExtractError;

/// Placeholder substituted with the note text in single-shot templates.
pub const REPORT_PLACEHOLDER: &str = "{report}";

/// Disease category selecting which prompt template to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DiseaseCategory {
    Epilepsy,
    Stroke,
    Ms,
}

impl DiseaseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseCategory::Epilepsy => "Epilepsy",
            DiseaseCategory::Stroke => "Stroke",
            DiseaseCategory::Ms => "MS",
        }
    }

    /// Template file name under the prompts directory.
    fn file_name(&self, chunked: bool) -> &'static str {
        match (self, chunked) {
            (DiseaseCategory::Epilepsy, false) => "epilepsy_prompt.txt",
            (DiseaseCategory::Epilepsy, true) => "epilepsy_prompt_chunked.txt",
            (DiseaseCategory::Stroke, false) => "stroke_prompt.txt",
            (DiseaseCategory::Stroke, true) => "stroke_prompt_chunked.txt",
            (DiseaseCategory::Ms, false) => "ms_prompt.txt",
            (DiseaseCategory::Ms, true) => "ms_prompt_chunked.txt",
        }
    }
}

/// A loaded prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Load the template for `category` from `prompts_dir`.
    pub fn load(
        prompts_dir: &Path,
        category: DiseaseCategory,
        chunked: bool,
    ) -> Result<Self, ExtractError> {
        let path: PathBuf = prompts_dir.join(category.file_name(chunked));
        if !path.exists() {
            return Err(ExtractError::UnknownCategory(format!(
                "{} ({})",
                category.as_str(),
                path.display()
            )));
        }
        let text = fs::read_to_string(&path)?;
        Ok(Self { text })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Substitute the `{report}` placeholder with the note text.
    pub fn fill(&self, report: &str) -> String {
        self.text.replace(REPORT_PLACEHOLDER, report)
    }

    /// The template text verbatim (chunked variant system instruction).
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn fill_substitutes_report_text() {
        let template = PromptTemplate::from_text("Extract from:\n{report}\nEnd.");
        let filled = template.fill("Patient on Keppra.");
        assert_eq!(filled, "Extract from:\nPatient on Keppra.\nEnd.");
        assert!(!filled.contains(REPORT_PLACEHOLDER));
    }

    #[test]
    fn load_reads_template_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("epilepsy_prompt.txt")).unwrap();
        write!(file, "prompt body {{report}}").unwrap();

        let template = PromptTemplate::load(dir.path(), DiseaseCategory::Epilepsy, false).unwrap();
        assert_eq!(template.text(), "prompt body {report}");
    }

    #[test]
    fn load_missing_template_is_unknown_category() {
        let dir = tempfile::tempdir().unwrap();
        let result = PromptTemplate::load(dir.path(), DiseaseCategory::Stroke, true);
        match result {
            Err(ExtractError::UnknownCategory(msg)) => assert!(msg.contains("Stroke")),
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn shipped_prompts_exist_for_all_single_shot_categories() {
        let prompts = Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts");
        for category in [
            DiseaseCategory::Epilepsy,
            DiseaseCategory::Stroke,
            DiseaseCategory::Ms,
        ] {
            let template = PromptTemplate::load(&prompts, category, false).unwrap();
            assert!(template.text().contains(REPORT_PLACEHOLDER));
        }
    }

    #[test]
    fn shipped_chunked_epilepsy_prompt_exists() {
        let prompts = Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts");
        let template = PromptTemplate::load(&prompts, DiseaseCategory::Epilepsy, true).unwrap();
        assert!(!template.text().is_empty());
    }
}
