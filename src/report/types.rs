//! Typed clinical report schema.
//!
//! One `ClinicalReport` is constructed per validated model response and
//! serialized straight back to JSON text for the output table; nothing here
//! is persisted. Every scalar has a defined value when absent (null or empty
//! string, never omitted) so flattening produces a consistent column set.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A currently prescribed medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    #[serde(default)]
    pub dose: Option<f64>,
    #[serde(default)]
    pub dose_unit: Option<String>,
}

/// A discontinued medication, with the reason it was stopped when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousMedication {
    pub name: String,
    #[serde(default)]
    pub dose: Option<f64>,
    #[serde(default)]
    pub dose_unit: Option<String>,
    #[serde(default)]
    pub reason_stopped: Option<String>,
}

/// Comorbidity flags ("yes"/"no"/"" after coercion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub febrile_seizures: String,
    pub ischemic_stroke: String,
    pub hemorraghic_stroke: String,
    pub traumatic_brain_injury: String,
    pub neuroinfection: String,
    pub psychiatric_disorder: String,
    pub heart_failure: String,
    pub diabetes: String,
}

/// MRI and EEG findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingEeg {
    pub mri_abnormal: String,
    pub mri_findings_summary: String,
    pub interictal_spikes_present: String,
    pub ictal_pattern: String,
    pub eeg_lateralization: String,
}

/// Epilepsy surgery history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpilepsySurgery {
    pub epilepsy_surgery_done: String,
    pub surgery_type: String,
    pub surgery_outcome: String,
}

/// Social impact of the disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialImpact {
    pub driving_status: String,
    pub working_status: String,
    pub quality_of_life_comments: String,
}

/// Full structured report for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalReport {
    pub patient_id: String,
    pub age: Option<i64>,
    pub sex: String,
    pub epilepsy_diagnosis_present: String,
    pub earliest_report_date: String,
    pub latest_report_date: String,
    pub is_focal: String,
    pub seizure_frequency: Option<f64>,
    pub duration_epilepsy: Option<i64>,
    pub ever_status_epilepsy: String,
    pub location_epilepsy: String,
    pub hippocampal_sclerosis_present: String,
    pub focal_cortical_dysplasia_present: String,
    pub refractory_epilepsy: String,
    pub seizure_free: String,
    pub last_seizure_date: String,
    pub medications: Vec<Medication>,
    pub previous_medications: Vec<PreviousMedication>,
    pub medical_history: MedicalHistory,
    pub imaging_eeg: ImagingEeg,
    pub epilepsy_surgery: EpilepsySurgery,
    pub social_impact: SocialImpact,
}

impl ClinicalReport {
    /// Serialize back to the JSON text stored in the output table.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Normalize a medication name for use as a column-name fragment:
/// trim, lowercase, spaces to underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn string_field() -> Value {
    json!({ "type": "string" })
}

fn nullable_string() -> Value {
    json!({ "type": ["string", "null"] })
}

fn medication_properties() -> Value {
    json!({
        "name": string_field(),
        "dose": { "type": ["number", "null"] },
        "dose_unit": nullable_string(),
    })
}

/// JSON Schema for [`ClinicalReport`], passed to the backend as the
/// response-format hint in the schema-guided variant.
pub fn report_json_schema() -> Value {
    let mut previous_medication_properties = medication_properties();
    previous_medication_properties["reason_stopped"] = nullable_string();

    json!({
        "type": "object",
        "properties": {
            "patient_id": { "type": "string" },
            "age": { "type": ["integer", "null"] },
            "sex": string_field(),
            "epilepsy_diagnosis_present": string_field(),
            "earliest_report_date": string_field(),
            "latest_report_date": string_field(),
            "is_focal": string_field(),
            "seizure_frequency": { "type": ["number", "null"] },
            "duration_epilepsy": { "type": ["integer", "null"] },
            "ever_status_epilepsy": string_field(),
            "location_epilepsy": string_field(),
            "hippocampal_sclerosis_present": string_field(),
            "focal_cortical_dysplasia_present": string_field(),
            "refractory_epilepsy": string_field(),
            "seizure_free": string_field(),
            "last_seizure_date": string_field(),
            "medications": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": medication_properties(),
                    "required": ["name"],
                },
            },
            "previous_medications": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": previous_medication_properties,
                    "required": ["name"],
                },
            },
            "medical_history": {
                "type": "object",
                "properties": {
                    "febrile_seizures": string_field(),
                    "ischemic_stroke": string_field(),
                    "hemorraghic_stroke": string_field(),
                    "traumatic_brain_injury": string_field(),
                    "neuroinfection": string_field(),
                    "psychiatric_disorder": string_field(),
                    "heart_failure": string_field(),
                    "diabetes": string_field(),
                },
                "required": [
                    "febrile_seizures", "ischemic_stroke", "hemorraghic_stroke",
                    "traumatic_brain_injury", "neuroinfection",
                    "psychiatric_disorder", "heart_failure", "diabetes",
                ],
            },
            "imaging_eeg": {
                "type": "object",
                "properties": {
                    "mri_abnormal": string_field(),
                    "mri_findings_summary": string_field(),
                    "interictal_spikes_present": string_field(),
                    "ictal_pattern": string_field(),
                    "eeg_lateralization": string_field(),
                },
                "required": [
                    "mri_abnormal", "mri_findings_summary",
                    "interictal_spikes_present", "ictal_pattern",
                    "eeg_lateralization",
                ],
            },
            "epilepsy_surgery": {
                "type": "object",
                "properties": {
                    "epilepsy_surgery_done": string_field(),
                    "surgery_type": string_field(),
                    "surgery_outcome": string_field(),
                },
                "required": ["epilepsy_surgery_done", "surgery_type", "surgery_outcome"],
            },
            "social_impact": {
                "type": "object",
                "properties": {
                    "driving_status": string_field(),
                    "working_status": string_field(),
                    "quality_of_life_comments": string_field(),
                },
                "required": ["driving_status", "working_status", "quality_of_life_comments"],
            },
        },
        "required": [
            "patient_id", "age", "sex", "epilepsy_diagnosis_present",
            "earliest_report_date", "latest_report_date", "is_focal",
            "seizure_frequency", "duration_epilepsy", "ever_status_epilepsy",
            "location_epilepsy", "hippocampal_sclerosis_present",
            "focal_cortical_dysplasia_present", "refractory_epilepsy",
            "seizure_free", "last_seizure_date", "medications",
            "previous_medications", "medical_history", "imaging_eeg",
            "epilepsy_surgery", "social_impact",
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_keeps_absent_scalars_as_null() {
        let med = Medication {
            name: "Keppra".into(),
            dose: None,
            dose_unit: None,
        };
        let json = serde_json::to_value(&med).unwrap();
        assert!(json.get("dose").is_some_and(Value::is_null));
        assert!(json.get("dose_unit").is_some_and(Value::is_null));
    }

    #[test]
    fn normalize_name_trims_lowercases_and_underscores() {
        assert_eq!(normalize_name("  Valproic Acid "), "valproic_acid");
        assert_eq!(normalize_name("Levetiracetam"), "levetiracetam");
        assert_eq!(normalize_name("levetiracetam "), "levetiracetam");
    }

    #[test]
    fn schema_declares_every_top_level_field_required() {
        let schema = report_json_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 22);
        assert!(required.iter().any(|f| f == "medical_history"));
        assert!(required.iter().any(|f| f == "previous_medications"));
    }

    #[test]
    fn schema_medication_items_require_name() {
        let schema = report_json_schema();
        let required = &schema["properties"]["medications"]["items"]["required"];
        assert_eq!(required, &json!(["name"]));
    }
}
