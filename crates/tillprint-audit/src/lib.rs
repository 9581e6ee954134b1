// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint-audit: Job audit trail.
//
// Every accepted submission is appended to a SQLite table so the web page can
// list recent jobs and reprint them after the in-memory registry is gone.
// Uploaded files are stored under their SHA-256 digest.

pub mod audit;
pub mod export;
pub mod integrity;

pub use audit::{AuditEntry, AuditLog};
pub use export::{entries_to_csv, entries_to_json, records_to_csv};
pub use integrity::hash_bytes;
