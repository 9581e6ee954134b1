// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error bodies: `{error, detail, hint?}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tillprint_core::error::TillprintError;
use tillprint_core::human_errors::humanize_error;
use tillprint_core::types::ErrorCode;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    detail: String,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_owned(),
            detail: detail.into(),
            hint: None,
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", detail)
    }

    pub fn gone(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, "GONE", detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", detail)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            format!("upload exceeds {limit} bytes"),
        )
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InvalidMode
        | ErrorCode::MissingCredentials
        | ErrorCode::BadCredentials
        | ErrorCode::Serialization => StatusCode::BAD_REQUEST,
        ErrorCode::Image => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::DeviceOpenFailed | ErrorCode::JobExecutionFailed => StatusCode::BAD_GATEWAY,
        ErrorCode::BackendUnavailable => StatusCode::NOT_IMPLEMENTED,
        ErrorCode::Database | ErrorCode::Config | ErrorCode::Io => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<TillprintError> for ApiError {
    fn from(err: TillprintError) -> Self {
        let code = err.code();
        let error = match serde_json::to_value(code) {
            Ok(Value::String(s)) => s,
            _ => format!("{code:?}"),
        };
        Self {
            status: status_for(code),
            error,
            detail: err.to_string(),
            hint: Some(humanize_error(&err).suggestion),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, detail = %self.detail, "request failed");
        }
        let mut body = json!({
            "error": self.error,
            "detail": self.detail,
        });
        if let Some(hint) = self.hint {
            body["hint"] = hint.into();
        }
        (self.status, Json(body)).into_response()
    }
}
