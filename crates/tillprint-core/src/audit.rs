// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit collaborator seam. The print core only appends; reading entries back
// belongs to whoever owns the store.

use serde_json::Value;

use crate::error::Result;

/// Write-append capability consumed by the print service.
///
/// Implementations are called from the blocking pool and may do synchronous
/// I/O.
pub trait AuditSink: Send + Sync {
    /// Append one record. `kind` is the job kind (`"text"`, `"image"`),
    /// `payload` the job content and `metadata` free-form context such as
    /// the queue job id.
    fn record(&self, kind: &str, payload: &Value, metadata: &Value) -> Result<()>;
}
