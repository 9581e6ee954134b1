// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit-backed job listings.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tillprint_audit::{AuditEntry, entries_to_csv, entries_to_json};

use super::logs::{ExportFormat, csv_attachment};
use super::{ApiError, AppState, blocking};

/// Newest-first audit entries; empty when auditing is off.
pub(super) async fn load_entries(state: &AppState, limit: u32) -> Result<Vec<AuditEntry>, ApiError> {
    match state.audit.clone() {
        Some(audit) => blocking(move || audit.recent_entries(limit)).await,
        None => Ok(Vec::new()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    Ok(Json(load_entries(&state, query.limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    /// `0` exports everything.
    #[serde(default)]
    pub limit: u32,
}

pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let limit = if query.limit == 0 { u32::MAX } else { query.limit };
    let entries = load_entries(&state, limit).await?;

    match query.format {
        ExportFormat::Json => {
            let body = blocking(move || entries_to_json(&entries)).await?;
            Ok((
                [
                    (header::CONTENT_TYPE, "application/json"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=jobs.json"),
                ],
                body,
            )
                .into_response())
        }
        ExportFormat::Csv => {
            let body = blocking(move || entries_to_csv(&entries)).await?;
            Ok(csv_attachment(body, "jobs.csv"))
        }
    }
}
