// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON and CSV renderings of audit entries and log records.

use csv::Writer;
use serde_json::{Map, Value};
use tillprint_core::error::{Result, TillprintError};

use crate::audit::AuditEntry;

fn csv_err(e: impl std::fmt::Display) -> TillprintError {
    TillprintError::Io(std::io::Error::other(e.to_string()))
}

fn finish(wtr: Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().map_err(csv_err)?;
    String::from_utf8(bytes).map_err(csv_err)
}

/// Render a value as a CSV cell: strings as-is, everything else as JSON.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn entries_to_json(entries: &[AuditEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// One row per entry; `payload` and `metadata` are JSON-encoded cells.
pub fn entries_to_csv(entries: &[AuditEntry]) -> Result<String> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(["id", "timestamp", "kind", "payload", "metadata"])
        .map_err(csv_err)?;
    for entry in entries {
        wtr.write_record([
            entry.id.as_str(),
            entry.timestamp.as_str(),
            entry.kind.as_str(),
            entry.payload.to_string().as_str(),
            entry.metadata.to_string().as_str(),
        ])
        .map_err(csv_err)?;
    }
    finish(wtr)
}

/// Flatten heterogeneous JSON objects into CSV.
///
/// The header is the union of keys in first-seen order; missing keys give
/// empty cells and nested values are JSON-encoded.
pub fn records_to_csv(records: &[Map<String, Value>]) -> Result<String> {
    let mut header: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }

    let mut wtr = Writer::from_writer(Vec::new());
    if header.is_empty() {
        return finish(wtr);
    }
    wtr.write_record(&header).map_err(csv_err)?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|key| record.get(*key).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&row).map_err(csv_err)?;
    }
    finish(wtr)
}
