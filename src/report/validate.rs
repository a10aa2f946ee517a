//! Structural validation of model-produced JSON against the report schema.
//!
//! Validation is driven by declarative field tables so the schema is visible
//! in one place. A failure in any required field fails the whole record; the
//! caller decides whether to try another chunk or record a sentinel.

use serde_json::Value;

use super::types::ClinicalReport;
use crate::ValidationError;

/// Declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// Required JSON string.
    Str,
    /// Integer, null, or empty string (coerced null).
    OptInt,
    /// Number, null, or empty string (coerced null).
    OptFloat,
}

/// Top-level scalar fields and their declared types.
const SCALAR_FIELDS: &[(&str, FieldKind)] = &[
    ("patient_id", FieldKind::Str),
    ("age", FieldKind::OptInt),
    ("sex", FieldKind::Str),
    ("epilepsy_diagnosis_present", FieldKind::Str),
    ("earliest_report_date", FieldKind::Str),
    ("latest_report_date", FieldKind::Str),
    ("is_focal", FieldKind::Str),
    ("seizure_frequency", FieldKind::OptFloat),
    ("duration_epilepsy", FieldKind::OptInt),
    ("ever_status_epilepsy", FieldKind::Str),
    ("location_epilepsy", FieldKind::Str),
    ("hippocampal_sclerosis_present", FieldKind::Str),
    ("focal_cortical_dysplasia_present", FieldKind::Str),
    ("refractory_epilepsy", FieldKind::Str),
    ("seizure_free", FieldKind::Str),
    ("last_seizure_date", FieldKind::Str),
];

/// Nested groups and their (all-string) fields.
const GROUPS: &[(&str, &[&str])] = &[
    (
        "medical_history",
        &[
            "febrile_seizures",
            "ischemic_stroke",
            "hemorraghic_stroke",
            "traumatic_brain_injury",
            "neuroinfection",
            "psychiatric_disorder",
            "heart_failure",
            "diabetes",
        ],
    ),
    (
        "imaging_eeg",
        &[
            "mri_abnormal",
            "mri_findings_summary",
            "interictal_spikes_present",
            "ictal_pattern",
            "eeg_lateralization",
        ],
    ),
    (
        "epilepsy_surgery",
        &["epilepsy_surgery_done", "surgery_type", "surgery_outcome"],
    ),
    (
        "social_impact",
        &["driving_status", "working_status", "quality_of_life_comments"],
    ),
];

/// Validate raw (possibly coerced) JSON and build the typed report.
///
/// Errors carry the dotted/indexed path of the offending field, e.g.
/// `medications[1].dose`.
pub fn validate_report(value: &Value) -> Result<ClinicalReport, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::new("$", "expected a JSON object"))?;

    for (name, kind) in SCALAR_FIELDS {
        let field = object
            .get(*name)
            .ok_or_else(|| ValidationError::new(*name, "required field missing"))?;
        check_scalar(name, field, *kind)?;
    }

    for (group, fields) in GROUPS {
        let section = object
            .get(*group)
            .ok_or_else(|| ValidationError::new(*group, "required field missing"))?;
        let section = section.as_object().ok_or_else(|| {
            ValidationError::new(*group, format!("expected object, found {}", kind_of(section)))
        })?;
        for field in *fields {
            let path = format!("{group}.{field}");
            let value = section
                .get(*field)
                .ok_or_else(|| ValidationError::new(path.as_str(), "required field missing"))?;
            if !value.is_string() {
                return Err(ValidationError::new(
                    path.as_str(),
                    format!("expected string, found {}", kind_of(value)),
                ));
            }
        }
    }

    validate_medication_list(object, "medications", false)?;
    validate_medication_list(object, "previous_medications", true)?;

    // Replace coerced empty strings in optional numeric fields with nulls so
    // the typed deserialization sees proper Option values.
    let mut normalized = value.clone();
    if let Some(object) = normalized.as_object_mut() {
        for (name, kind) in SCALAR_FIELDS {
            if matches!(kind, FieldKind::OptInt | FieldKind::OptFloat) {
                if let Some(field) = object.get_mut(*name) {
                    if field.as_str() == Some("") {
                        *field = Value::Null;
                    }
                }
            }
        }
    }

    serde_json::from_value(normalized).map_err(|e| ValidationError::new("$", e.to_string()))
}

fn check_scalar(path: &str, value: &Value, kind: FieldKind) -> Result<(), ValidationError> {
    let ok = match kind {
        FieldKind::Str => value.is_string(),
        FieldKind::OptInt => value.is_null() || value.is_i64() || value.as_str() == Some(""),
        FieldKind::OptFloat => value.is_null() || value.is_number() || value.as_str() == Some(""),
    };
    if ok {
        return Ok(());
    }
    let expected = match kind {
        FieldKind::Str => "string",
        FieldKind::OptInt => "integer or null",
        FieldKind::OptFloat => "number or null",
    };
    Err(ValidationError::new(
        path,
        format!("expected {expected}, found {}", kind_of(value)),
    ))
}

fn validate_medication_list(
    object: &serde_json::Map<String, Value>,
    list: &str,
    with_reason: bool,
) -> Result<(), ValidationError> {
    let items = object
        .get(list)
        .ok_or_else(|| ValidationError::new(list, "required field missing"))?;
    let items = items.as_array().ok_or_else(|| {
        ValidationError::new(list, format!("expected array, found {}", kind_of(items)))
    })?;

    for (index, item) in items.iter().enumerate() {
        let path = format!("{list}[{index}]");
        let entry = item.as_object().ok_or_else(|| {
            ValidationError::new(path.as_str(), format!("expected object, found {}", kind_of(item)))
        })?;

        let name = entry
            .get("name")
            .ok_or_else(|| ValidationError::new(format!("{path}.name"), "required field missing"))?;
        if !name.is_string() {
            return Err(ValidationError::new(
                format!("{path}.name"),
                format!("expected string, found {}", kind_of(name)),
            ));
        }

        if let Some(dose) = entry.get("dose") {
            if !dose.is_null() && !dose.is_number() {
                return Err(ValidationError::new(
                    format!("{path}.dose"),
                    format!("expected number or null, found {}", kind_of(dose)),
                ));
            }
        }

        optional_string_field(entry, &path, "dose_unit")?;
        if with_reason {
            optional_string_field(entry, &path, "reason_stopped")?;
        }
    }

    Ok(())
}

fn optional_string_field(
    entry: &serde_json::Map<String, Value>,
    path: &str,
    field: &str,
) -> Result<(), ValidationError> {
    if let Some(value) = entry.get(field) {
        if !value.is_null() && !value.is_string() {
            return Err(ValidationError::new(
                format!("{path}.{field}"),
                format!("expected string or null, found {}", kind_of(value)),
            ));
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Complete raw value that passes validation. Shared fixture for unit and
/// integration tests.
#[cfg(test)]
pub(crate) fn complete_report_value() -> Value {
    use serde_json::json;
    json!({
        "patient_id": "10499138",
        "age": 41,
        "sex": "f",
        "epilepsy_diagnosis_present": "yes",
        "earliest_report_date": "2015-03-02",
        "latest_report_date": "2023-11-20",
        "is_focal": "yes",
        "seizure_frequency": 2.0,
        "duration_epilepsy": 12,
        "ever_status_epilepsy": "no",
        "location_epilepsy": "left temporal",
        "hippocampal_sclerosis_present": "yes",
        "focal_cortical_dysplasia_present": "no",
        "refractory_epilepsy": "yes",
        "seizure_free": "no",
        "last_seizure_date": "2023-10-01",
        "medications": [
            { "name": "Levetiracetam", "dose": 1500.0, "dose_unit": "mg" }
        ],
        "previous_medications": [
            { "name": "Valproate", "dose": 900.0, "dose_unit": "mg",
              "reason_stopped": "side effects" }
        ],
        "medical_history": {
            "febrile_seizures": "yes",
            "ischemic_stroke": "no",
            "hemorraghic_stroke": "no",
            "traumatic_brain_injury": "no",
            "neuroinfection": "no",
            "psychiatric_disorder": "yes",
            "heart_failure": "no",
            "diabetes": "no",
        },
        "imaging_eeg": {
            "mri_abnormal": "yes",
            "mri_findings_summary": "left hippocampal sclerosis",
            "interictal_spikes_present": "yes",
            "ictal_pattern": "left temporal onset",
            "eeg_lateralization": "left",
        },
        "epilepsy_surgery": {
            "epilepsy_surgery_done": "no",
            "surgery_type": "",
            "surgery_outcome": "",
        },
        "social_impact": {
            "driving_status": "not driving",
            "working_status": "part time",
            "quality_of_life_comments": "",
        },
    })
}
