// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::str::FromStr;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tillprint_audit::records_to_csv;

use super::{ApiError, AppState, blocking};
use crate::services::log_export;

/// `?format=` value; matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format {other:?}, expected json or csv")),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A CSV download.
pub fn csv_attachment(body: String, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={file_name}"),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub format: ExportFormat,
}

fn default_limit() -> usize {
    200
}

/// The newest log records as JSON or CSV.
pub async fn export_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let path = state.log_file.clone();
    let records = blocking(move || log_export::tail_records(&path, query.limit)).await?;

    match query.format {
        ExportFormat::Json => Ok(Json(records).into_response()),
        ExportFormat::Csv => {
            let body = blocking(move || records_to_csv(&records)).await?;
            Ok(csv_attachment(body, "logs.csv"))
        }
    }
}
