// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reading back the JSON log file for export.

use std::path::Path;

use serde_json::{Map, Value};
use tillprint_core::error::Result;

/// The last `limit` well-formed records of a JSON-lines file, oldest first.
///
/// `limit == 0` returns everything. A missing file is an empty log. Lines
/// that are blank, malformed or not JSON objects are skipped; they still
/// count against the limit.
pub fn tail_records(path: &Path, limit: usize) -> Result<Vec<Map<String, Value>>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<&str> = data.lines().collect();
    let start = if limit == 0 {
        0
    } else {
        lines.len().saturating_sub(limit)
    };

    Ok(lines[start..]
        .iter()
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) => Some(record),
            _ => None,
        })
        .collect())
}
