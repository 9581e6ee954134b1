// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal HTML job list with reprint buttons.

use std::fmt::Write as _;
use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Html;
use chrono::{DateTime, Local};
use serde_json::{Map, Value, json};
use tillprint_audit::AuditEntry;
use tillprint_core::types::JobPayload;
use tracing::info;

use super::jobs::load_entries;
use super::{ApiError, AppState, blocking};

const PAGE_LIMIT: u32 = 100;
const SUMMARY_CHARS: usize = 90;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn local_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_owned())
}

fn render_rows(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return r#"<tr><td colspan="4">No jobs yet</td></tr>"#.to_owned();
    }
    let mut rows = String::new();
    for entry in entries {
        let id = escape(&entry.id);
        // Writing to a String cannot fail.
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td>{}</td><td class="summary">{}</td><td><form method="post" action="/ui/actions/reprint/{id}"><button type="submit">Reprint</button></form></td></tr>"#,
            escape(&local_time(&entry.timestamp)),
            escape(&entry.kind),
            escape(&entry.summary(SUMMARY_CHARS)),
        );
    }
    rows
}

pub async fn jobs_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let entries = load_entries(&state, PAGE_LIMIT).await?;
    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>tillprint jobs</title>
<style>
body {{ font-family: sans-serif; margin: 1.5rem; }}
table {{ border-collapse: collapse; width: 100%; }}
td, th {{ border-bottom: 1px solid #ddd; padding: 0.4rem; text-align: left; }}
.summary {{ max-width: 520px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }}
</style>
</head>
<body>
<h1>Recent jobs</h1>
<table>
<thead><tr><th>Time</th><th>Kind</th><th>Summary</th><th></th></tr></thead>
<tbody>{}</tbody>
</table>
</body>
</html>
"#,
        render_rows(&entries)
    )))
}

/// Rebuild a job from an audit entry and queue it again.
pub async fn reprint(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let not_found = || ApiError::not_found(format!("audit entry {audit_id} not found"));

    let audit = state.audit.clone().ok_or_else(not_found)?;
    let lookup = audit_id.clone();
    let entry = blocking(move || audit.get(&lookup)).await?.ok_or_else(not_found)?;

    let payload = match entry.kind.as_str() {
        "text" => {
            let text = entry
                .payload
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::bad_request("audit entry has no text"))?;
            let lang = entry
                .payload
                .get("lang")
                .and_then(Value::as_str)
                .unwrap_or("tr");
            JobPayload::Text {
                text: text.to_owned(),
                lang: lang.to_owned(),
            }
        }
        "image" => {
            let path = entry
                .payload
                .get("path")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .ok_or_else(|| ApiError::gone("audit entry has no file"))?;
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ApiError::gone(format!(
                    "{} is no longer available",
                    path.display()
                )));
            }
            JobPayload::Image { path }
        }
        other => return Err(ApiError::bad_request(format!("unknown job kind {other:?}"))),
    };

    let mut metadata = Map::new();
    metadata.insert("reprint_of".into(), audit_id.clone().into());
    let jobid = state.service.enqueue(payload, metadata).await?;
    info!(%jobid, reprint_of = %audit_id, "audit entry reprinted");

    Ok(Json(json!({
        "status": "queued",
        "jobid": jobid,
        "reprint_of": audit_id,
    })))
}
