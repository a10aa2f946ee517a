//! Permissive type coercion applied before validation.
//!
//! The chunked extraction variant asks the model for free-form JSON, so
//! booleans, nulls, and composite dose strings ("250 mg") arrive in whatever
//! shape the model chose. Coercion rewrites the raw value in place into the
//! canonical shape the schema expects. It never fails; anything it cannot
//! interpret is left for validation to reject.

use serde_json::{Map, Value};

/// Nested group fields whose values are all stringified.
const GROUP_FIELDS: &[&str] = &[
    "medical_history",
    "imaging_eeg",
    "epilepsy_surgery",
    "social_impact",
];

/// Medication list fields whose `dose` entries are normalized to numbers.
const MEDICATION_FIELDS: &[&str] = &["medications", "previous_medications"];

/// Coerce a raw model-produced report value in place.
pub fn coerce_report(value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };

    // Top level: booleans become "yes"/"no", nulls become "".
    for (_, field) in object.iter_mut() {
        if field.is_boolean() || field.is_null() {
            *field = Value::String(stringify(field));
        }
    }

    // Nested groups: every value stringified.
    for group in GROUP_FIELDS {
        if let Some(fields) = object.get_mut(*group).and_then(Value::as_object_mut) {
            stringify_fields(fields);
        }
    }

    // Medication lists: doses become numbers or null.
    for list in MEDICATION_FIELDS {
        if let Some(items) = object.get_mut(*list).and_then(Value::as_array_mut) {
            for item in items {
                if let Some(dose) = item.get_mut("dose") {
                    *dose = coerce_dose(dose);
                }
            }
        }
    }
}

fn stringify_fields(fields: &mut Map<String, Value>) {
    for (_, field) in fields.iter_mut() {
        if !field.is_string() {
            *field = Value::String(stringify(field));
        }
    }
}

/// Render a scalar into the fixed string vocabulary: booleans map to
/// "yes"/"no", null to "", numbers to their decimal form.
fn stringify(value: &Value) -> String {
    match value {
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Coerce a dose value to a number or null.
///
/// Strings like "250 mg" take the first whitespace-delimited token; a token
/// that is not numeric yields null (the "no value" marker), never zero.
fn coerce_dose(dose: &Value) -> Value {
    match dose {
        Value::Number(_) => dose.clone(),
        Value::String(s) => s
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<f64>().ok())
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn top_level_booleans_become_yes_no() {
        let mut value = json!({ "seizure_free": true, "is_focal": false });
        coerce_report(&mut value);
        assert_eq!(value["seizure_free"], "yes");
        assert_eq!(value["is_focal"], "no");
    }

    #[test]
    fn top_level_null_becomes_empty_string() {
        let mut value = json!({ "last_seizure_date": null });
        coerce_report(&mut value);
        assert_eq!(value["last_seizure_date"], "");
    }

    #[test]
    fn top_level_numbers_and_strings_untouched() {
        let mut value = json!({ "age": 41, "sex": "f", "seizure_frequency": 2.5 });
        coerce_report(&mut value);
        assert_eq!(value["age"], 41);
        assert_eq!(value["sex"], "f");
        assert_eq!(value["seizure_frequency"], 2.5);
    }

    #[test]
    fn group_values_are_all_stringified() {
        let mut value = json!({
            "medical_history": {
                "diabetes": true,
                "heart_failure": null,
                "febrile_seizures": "no",
                "neuroinfection": 0,
            }
        });
        coerce_report(&mut value);
        assert_eq!(value["medical_history"]["diabetes"], "yes");
        assert_eq!(value["medical_history"]["heart_failure"], "");
        assert_eq!(value["medical_history"]["febrile_seizures"], "no");
        assert_eq!(value["medical_history"]["neuroinfection"], "0");
    }

    #[test]
    fn composite_dose_string_takes_first_token() {
        let mut value = json!({ "medications": [{ "name": "Keppra", "dose": "250 mg" }] });
        coerce_report(&mut value);
        assert_eq!(value["medications"][0]["dose"], 250.0);
    }

    #[test]
    fn non_numeric_dose_becomes_null_not_zero() {
        let mut value = json!({
            "medications": [{ "name": "Keppra", "dose": "unknown" }],
            "previous_medications": [{ "name": "VPA", "dose": true }],
        });
        coerce_report(&mut value);
        assert!(value["medications"][0]["dose"].is_null());
        assert!(value["previous_medications"][0]["dose"].is_null());
    }

    #[test]
    fn numeric_dose_passes_through() {
        let mut value = json!({ "medications": [{ "name": "Keppra", "dose": 500 }] });
        coerce_report(&mut value);
        assert_eq!(value["medications"][0]["dose"], 500);
    }

    #[test]
    fn non_object_input_is_left_alone() {
        let mut value = json!([1, 2, 3]);
        coerce_report(&mut value);
        assert_eq!(value, json!([1, 2, 3]));
    }
}
