// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status, connect and job submission endpoints.

use axum::Json;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tillprint_core::types::{ConnectParams, JobId, JobPayload, ServiceStatus};
use tracing::{info, warn};

use super::{ApiError, AppState, blocking};
use crate::services::uploads;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Printer service is running" }))
}

pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.service.status())
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let status = state.service.status();
    Json(json!({
        "ok": true,
        "connected": status.connected,
        "mode": status.mode,
        "queue_size": status.queue_size,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub mode: String,
    #[serde(default)]
    pub params: ConnectParams,
}

/// 200 with the connect result, or 400 carrying the same result.
pub async fn connect(State(state): State<AppState>, Json(req): Json<ConnectRequest>) -> Response {
    let report = state.service.connect(&req.mode, &req.params).await;
    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(report)).into_response()
}

fn default_lang() -> String {
    "tr".into()
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

pub async fn print_text(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<Value>, ApiError> {
    let jobid = state.service.enqueue_text(req.text, req.lang).await?;
    Ok(Json(json!({ "status": "queued", "jobid": jobid })))
}

/// Multipart upload with a `file` field; the image is stored by digest and
/// queued for printing.
pub async fn print_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let limit = state.max_upload_bytes;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(limit)
        } else {
            ApiError::bad_request(format!("multipart error: {e}"))
        }
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::payload_too_large(limit)
            } else {
                ApiError::bad_request(format!("read error: {e}"))
            }
        })?;
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| ApiError::bad_request("no file provided"))?;
    if data.is_empty() {
        return Err(ApiError::bad_request("empty file"));
    }
    if data.len() > limit {
        return Err(ApiError::payload_too_large(limit));
    }

    let dir = state.uploads_dir.clone();
    let name = file_name.clone();
    let path = blocking(move || uploads::store(&dir, &data, name.as_deref())).await?;

    let mut metadata = Map::new();
    if let Some(name) = &file_name {
        metadata.insert("filename".into(), name.clone().into());
    }
    let jobid = state
        .service
        .enqueue(JobPayload::Image { path: path.clone() }, metadata)
        .await?;
    info!(%jobid, path = %path.display(), "image upload queued");

    let file = file_name.unwrap_or_else(|| path.display().to_string());
    Ok(Json(json!({ "status": "queued", "jobid": jobid, "file": file })))
}

#[derive(Debug, Deserialize)]
pub struct ReprintQuery {
    pub jobid: String,
}

/// Requeue a job still in the registry. Unknown and malformed ids are 404.
pub async fn reprint(
    State(state): State<AppState>,
    Query(query): Query<ReprintQuery>,
) -> Result<Json<Value>, ApiError> {
    let not_found = || ApiError::not_found(format!("job {} not found", query.jobid));

    let id: JobId = query.jobid.parse().map_err(|_| {
        warn!(jobid = %query.jobid, "reprint with malformed job id");
        not_found()
    })?;
    let new_id = state.service.requeue_job(&id).await.ok_or_else(not_found)?;

    Ok(Json(json!({
        "status": "requeued",
        "jobid": id,
        "new_jobid": new_id,
    })))
}
