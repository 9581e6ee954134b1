// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP API over the printer service.

pub mod error;
mod jobs;
mod logs;
mod printer;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tillprint_audit::AuditLog;
use tillprint_core::error::TillprintError;
use tillprint_print::PrinterService;

pub use self::error::ApiError;

/// Room for multipart headers and boundaries on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: PrinterService,
    /// `None` when auditing is disabled; job listings are then empty.
    pub audit: Option<Arc<AuditLog>>,
    pub uploads_dir: PathBuf,
    /// JSON-lines log file read by `/logs`.
    pub log_file: PathBuf,
    pub max_upload_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(printer::root))
        .route("/status", get(printer::status))
        .route("/health", get(printer::health))
        .route("/connect", post(printer::connect))
        .route("/print/text", post(printer::print_text))
        .route(
            "/print/image",
            post(printer::print_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/reprint", post(printer::reprint))
        .route("/logs", get(logs::export_logs))
        .route("/jobs", get(jobs::recent))
        .route("/jobs/export", get(jobs::export))
        .route("/ui/jobs", get(ui::jobs_page))
        .route("/ui/actions/reprint/{audit_id}", post(ui::reprint))
        .with_state(state)
}

/// Run blocking file or database work off the async scheduler.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TillprintError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("background task failed: {e}")))?
        .map_err(ApiError::from)
}
