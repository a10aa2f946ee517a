//! Delimited-file I/O for the notes and output tables.
//!
//! Input tables come out of a hospital information system export: comma or
//! tab separated (by extension), UTF-8 or Latin-1 encoded. Decoding tries
//! UTF-8 first and falls back to Latin-1, which maps every byte to the
//! code point of the same value.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ExtractError;

/// Identifier column expected in every input table.
pub const ID_COLUMN: &str = "PATNR";
/// Free-text note column in the notes table.
pub const NOTE_COLUMN: &str = "Beurteilung";
/// JSON-or-sentinel column in the structured table.
pub const OUTPUT_COLUMN: &str = "structured_output";

/// One row of the notes table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub patient_id: String,
    pub note: String,
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

fn decode_with_fallback(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::io::Cursor<String>>, ExtractError> {
    let bytes = fs::read(path)?;
    let text = decode_with_fallback(bytes);
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .from_reader(std::io::Cursor::new(text)))
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, ExtractError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ExtractError::MissingColumn(name.to_string()))
}

/// Read the notes table, requiring the identifier and note columns.
pub fn read_notes_table(path: &Path) -> Result<Vec<NoteRow>, ExtractError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let id_index = column_index(&headers, ID_COLUMN)?;
    let note_index = column_index(&headers, NOTE_COLUMN)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(NoteRow {
            patient_id: record.get(id_index).unwrap_or_default().to_string(),
            note: record.get(note_index).unwrap_or_default().to_string(),
        });
    }
    Ok(rows)
}

/// Group note rows by patient, preserving first-seen patient order, and
/// concatenate each patient's non-empty notes with a blank line in file
/// order. Patients whose notes are all empty keep an empty combined note.
pub fn group_notes(rows: &[NoteRow]) -> Vec<(String, String)> {
    let mut order: Vec<String> = Vec::new();
    let mut notes: std::collections::HashMap<String, Vec<&str>> =
        std::collections::HashMap::new();

    for row in rows {
        let entry = notes.entry(row.patient_id.clone()).or_insert_with(|| {
            order.push(row.patient_id.clone());
            Vec::new()
        });
        if !row.note.trim().is_empty() {
            entry.push(row.note.as_str());
        }
    }

    order
        .into_iter()
        .map(|patient_id| {
            let combined = notes
                .get(&patient_id)
                .map(|texts| texts.join("\n\n"))
                .unwrap_or_default();
            (patient_id, combined)
        })
        .collect()
}

/// Read the extraction stage's output table back in for flattening.
pub fn read_structured_table(path: &Path) -> Result<Vec<(String, String)>, ExtractError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let id_index = column_index(&headers, ID_COLUMN)?;
    let output_index = column_index(&headers, OUTPUT_COLUMN)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push((
            record.get(id_index).unwrap_or_default().to_string(),
            record.get(output_index).unwrap_or_default().to_string(),
        ));
    }
    Ok(rows)
}

/// Write the extraction stage's two-column output table.
pub fn write_structured_table(
    path: &Path,
    rows: &[(String, String)],
) -> Result<(), ExtractError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([ID_COLUMN, OUTPUT_COLUMN])?;
    for (patient_id, output) in rows {
        writer.write_record([patient_id, output])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a wide table with a dynamic column set.
pub fn write_wide_table(
    path: &Path,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<(), ExtractError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Output path for the extraction stage: `<stem>_structured.csv`, or
/// `<stem>_structured_chunked.csv` for the chunked variant.
pub fn structured_output_path(input: &Path, chunked: bool) -> PathBuf {
    let suffix = if chunked {
        "_structured_chunked.csv"
    } else {
        "_structured.csv"
    };
    with_suffix(input, suffix)
}

/// Output path for the flattening stage: `<stem>_flattened.csv`.
pub fn flattened_output_path(input: &Path) -> PathBuf {
    with_suffix(input, "_flattened.csv")
}

fn with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{suffix}"))
}
