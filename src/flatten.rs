//! Flattening of stored report JSON into one wide table.
//!
//! Column names derived from medication names are not known until the data
//! is seen, so flattening is two-pass: first collect every row's key/value
//! map and the union of keys across the dataset, then materialize each row
//! against that union with absent keys defaulting to empty.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::report::normalize_name;
use crate::table::ID_COLUMN;

/// Medication list fields, flattened into per-name column triples.
const MEDICATION_FIELDS: &[&str] = &["medications", "previous_medications"];

/// The assembled wide table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Flatten one stored JSON blob per patient into the wide table.
///
/// Malformed or missing JSON (including error sentinels) yields a row with
/// the identifier only; it never aborts the run. Column order is the
/// identifier first, then first-seen order across rows.
pub fn flatten_rows(rows: &[(String, String)]) -> FlatTable {
    let mut columns: Vec<String> = vec![ID_COLUMN.to_string()];
    let mut seen: std::collections::HashSet<String> =
        columns.iter().cloned().collect();
    let mut row_maps: Vec<HashMap<String, String>> = Vec::new();

    for (patient_id, json_text) in rows {
        let mut cells = HashMap::new();
        cells.insert(ID_COLUMN.to_string(), patient_id.clone());

        for (column, value) in flatten_record(json_text) {
            if seen.insert(column.clone()) {
                columns.push(column.clone());
            }
            // Later entries overwrite earlier ones (duplicate medication
            // names collapse to one column set, last write wins).
            cells.insert(column, value);
        }
        row_maps.push(cells);
    }

    let rows = row_maps
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .map(|column| cells.get(column).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    FlatTable { columns, rows }
}

/// Project one JSON blob into ordered (column, value) pairs.
///
/// Parses leniently: anything that is not a JSON object contributes no
/// columns.
fn flatten_record(json_text: &str) -> Vec<(String, String)> {
    let entry: Map<String, Value> = match serde_json::from_str(json_text) {
        Ok(Value::Object(map)) => map,
        _ => return Vec::new(),
    };

    let mut pairs = Vec::new();

    for (key, value) in &entry {
        if MEDICATION_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Object(group) => {
                for (subkey, subvalue) in group {
                    pairs.push((format!("{key}_{subkey}"), render_scalar(subvalue)));
                }
            }
            other => pairs.push((key.clone(), render_scalar(other))),
        }
    }

    for list in MEDICATION_FIELDS {
        let Some(items) = entry.get(*list).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            let name = normalize_name(item.get("name").and_then(Value::as_str).unwrap_or(""));
            let prefix = format!("{list}_{name}");
            pairs.push((prefix.clone(), "True".to_string()));
            pairs.push((
                format!("{prefix}_dose"),
                render_scalar(item.get("dose").unwrap_or(&Value::Null)),
            ));
            pairs.push((
                format!("{prefix}_dose_unit"),
                render_scalar(item.get("dose_unit").unwrap_or(&Value::Null)),
            ));
            if *list == "previous_medications" {
                pairs.push((
                    format!("previous_{name}_reason_stopped"),
                    render_scalar(item.get("reason_stopped").unwrap_or(&Value::Null)),
                ));
            }
        }
    }

    pairs
}

/// Render a JSON scalar as a table cell.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Lists and objects do not occur in scalar positions for valid
        // reports; keep them readable rather than dropping them.
        other => other.to_string(),
    }
}
