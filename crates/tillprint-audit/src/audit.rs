// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail: append-only SQLite log of every accepted print submission.
//
// Schema:
//   audit_log(
//     id        TEXT PRIMARY KEY,   -- UUID v4, distinct from the queue job id
//     timestamp TEXT NOT NULL,      -- RFC 3339
//     kind      TEXT NOT NULL,      -- "text" | "image"
//     payload   TEXT NOT NULL,      -- JSON job content
//     metadata  TEXT NOT NULL       -- JSON: queue_job_id, requeue_of, reprint_of
//   )

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tillprint_core::audit::AuditSink;
use tillprint_core::error::{Result, TillprintError};
use tracing::{debug, instrument};
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id        TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    kind      TEXT NOT NULL,
    payload   TEXT NOT NULL,
    metadata  TEXT NOT NULL
);";

fn db_err(e: rusqlite::Error) -> TillprintError {
    TillprintError::Database(e.to_string())
}

/// One row of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: String,
    pub kind: String,
    pub payload: Value,
    pub metadata: Value,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let payload: String = row.get(3)?;
        let metadata: String = row.get(4)?;
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            kind: row.get(2)?,
            payload: serde_json::from_str(&payload).unwrap_or(Value::Null),
            metadata: serde_json::from_str(&metadata).unwrap_or(Value::Null),
        })
    }

    /// Short one-line description for listings.
    pub fn summary(&self, max_chars: usize) -> String {
        let raw = match self.kind.as_str() {
            "text" => self.payload.get("text").and_then(Value::as_str).unwrap_or(""),
            "image" => self.payload.get("path").and_then(Value::as_str).unwrap_or(""),
            _ => "",
        };
        let line = raw.lines().next().unwrap_or("");
        if line.chars().count() > max_chars {
            let mut cut: String = line.chars().take(max_chars).collect();
            cut.push('…');
            cut
        } else {
            line.to_owned()
        }
    }
}

/// Append-only audit log backed by a SQLite database.
///
/// The connection sits behind a mutex so the log can be shared between the
/// print service (writes from the blocking pool) and HTTP handlers (reads).
pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Open (or create) the audit database at `path` with WAL enabled.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry and return its id.
    #[instrument(skip(self, payload, metadata), fields(%kind))]
    pub fn append(&self, kind: &str, payload: &Value, metadata: &Value) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO audit_log (id, timestamp, kind, payload, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    timestamp,
                    kind,
                    serde_json::to_string(payload)?,
                    serde_json::to_string(metadata)?
                ],
            )
            .map_err(db_err)?;

        debug!(audit_id = %id, "audit entry recorded");
        Ok(id)
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, kind, payload, metadata
                 FROM audit_log
                 ORDER BY rowid DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], AuditEntry::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    pub fn get(&self, id: &str) -> Result<Option<AuditEntry>> {
        self.conn()
            .query_row(
                "SELECT id, timestamp, kind, payload, metadata
                 FROM audit_log
                 WHERE id = ?1",
                params![id],
                AuditEntry::from_row,
            )
            .optional()
            .map_err(db_err)
    }

    pub fn count(&self) -> Result<u64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}

impl AuditSink for AuditLog {
    fn record(&self, kind: &str, payload: &Value, metadata: &Value) -> Result<()> {
        self.append(kind, payload, metadata).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().unwrap(), 0);

        log.record("text", &json!({"kind": "text", "text": "a", "lang": "tr"}), &json!({}))
            .unwrap();
        log.record("image", &json!({"kind": "image", "path": "/x.png"}), &json!({}))
            .unwrap();

        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn recent_entries_newest_first() {
        let log = make_log();
        for i in 0..5 {
            log.append("text", &json!({"text": format!("receipt {i}")}), &json!({}))
                .unwrap();
        }

        let recent = log.recent_entries(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].payload["text"], "receipt 4");
        assert_eq!(recent[2].payload["text"], "receipt 2");
    }

    #[test]
    fn get_returns_stored_json() {
        let log = make_log();
        let id = log
            .append(
                "text",
                &json!({"kind": "text", "text": "Merhaba", "lang": "tr"}),
                &json!({"queue_job_id": "abc"}),
            )
            .unwrap();

        let entry = log.get(&id).unwrap().unwrap();
        assert_eq!(entry.kind, "text");
        assert_eq!(entry.payload["lang"], "tr");
        assert_eq!(entry.metadata["queue_job_id"], "abc");
        assert!(log.get("missing").unwrap().is_none());
    }

    #[test]
    fn summary_truncates_first_line() {
        let entry = AuditEntry {
            id: "1".into(),
            timestamp: String::new(),
            kind: "text".into(),
            payload: json!({"text": "TOPLAM 12,50 TL\nTesekkurler"}),
            metadata: json!({}),
        };
        assert_eq!(entry.summary(90), "TOPLAM 12,50 TL");
        assert_eq!(entry.summary(6), "TOPLAM…");
    }

    #[test]
    fn file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        {
            let log = AuditLog::open(&path).unwrap();
            log.append("text", &json!({"text": "x"}), &json!({})).unwrap();
        }
        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.count().unwrap(), 1);
    }
}
