// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the tillprint receipt printer service.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TillprintError;

/// Key/value parameters passed to `connect`.
pub type ConnectParams = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// What a job asks the printer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Text,
    Image,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific job content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobPayload {
    /// Plain text plus the language tag used to pick a code page.
    Text { text: String, lang: String },
    /// Path to an image file (pre-rendered or raw upload).
    Image { path: PathBuf },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Text { .. } => JobKind::Text,
            Self::Image { .. } => JobKind::Image,
        }
    }
}

/// One unit of work for the printer.
///
/// Immutable once created. Resubmission builds a new job with a copy of the
/// payload and a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub payload: JobPayload,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: JobId::new(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// A new job carrying a copy of this job's payload.
    pub fn resubmit(&self) -> Self {
        Self::new(self.payload.clone())
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

/// Printer connection modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Nothing connected yet.
    None,
    /// Simulated printer: no device, always connected.
    Dummy,
    /// ESC/POS printer on a USB bulk endpoint.
    Usb,
    /// ESC/POS printer on a raw TCP socket (port 9100).
    Lan,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dummy => "dummy",
            Self::Usb => "usb",
            Self::Lan => "lan",
        }
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionMode {
    type Err = TillprintError;

    /// Parse a connectable mode. Case and surrounding whitespace are ignored;
    /// `none` is not connectable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dummy" => Ok(Self::Dummy),
            "usb" => Ok(Self::Usb),
            "lan" => Ok(Self::Lan),
            _ => Err(TillprintError::InvalidMode(s.to_owned())),
        }
    }
}

/// Mode and link state as published by the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub mode: ConnectionMode,
    pub connected: bool,
}

impl Default for LinkSnapshot {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::None,
            connected: false,
        }
    }
}

/// Answer to `status()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub mode: ConnectionMode,
    pub connected: bool,
    pub queue_size: usize,
}

/// Stable error codes used in structured results and HTTP bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidMode,
    MissingCredentials,
    BadCredentials,
    DeviceOpenFailed,
    NotConnected,
    BackendUnavailable,
    JobExecutionFailed,
    Image,
    Database,
    Config,
    Io,
    Serialization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectStatus {
    Ok,
    Error,
}

/// Structured result of a `connect` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectReport {
    pub status: ConnectStatus,
    /// Requested mode, normalized.
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Mode-specific diagnostics (`vid`/`pid`, `host`/`port`, ...).
    #[serde(flatten)]
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl ConnectReport {
    pub fn ok(mode: ConnectionMode, info: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            status: ConnectStatus::Ok,
            mode: mode.as_str().to_owned(),
            error: None,
            detail: None,
            info,
        }
    }

    pub fn failed(mode: &str, err: &TillprintError) -> Self {
        Self {
            status: ConnectStatus::Error,
            mode: mode.trim().to_ascii_lowercase(),
            error: Some(err.code()),
            detail: Some(err.to_string()),
            info: serde_json::Map::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ConnectStatus::Ok
    }
}

/// Optional printer commands whose failure does not fail the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticCommand {
    CodePage,
    Cut,
}

/// A cosmetic command that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCommand {
    pub command: CosmeticCommand,
    pub reason: String,
}

/// Result of a successful print: the job was printed, possibly without some
/// cosmetic commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOutcome {
    pub skipped: Vec<SkippedCommand>,
}

impl PrintOutcome {
    pub fn skip(&mut self, command: CosmeticCommand, reason: impl Into<String>) {
        self.skipped.push(SkippedCommand {
            command,
            reason: reason.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// How the worker finished a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobOutcome {
    Completed { skipped: Vec<SkippedCommand> },
    Failed { code: ErrorCode, message: String },
}

/// Published by the worker after each dequeued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: JobKind,
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_normalizes() {
        assert_eq!(" USB ".parse::<ConnectionMode>().unwrap(), ConnectionMode::Usb);
        assert_eq!("Dummy".parse::<ConnectionMode>().unwrap(), ConnectionMode::Dummy);
        assert!(matches!(
            "serial".parse::<ConnectionMode>(),
            Err(TillprintError::InvalidMode(_))
        ));
        assert!("none".parse::<ConnectionMode>().is_err());
    }

    #[test]
    fn resubmit_copies_payload_under_new_id() {
        let job = PrintJob::new(JobPayload::Text {
            text: "Merhaba".into(),
            lang: "tr".into(),
        });
        let copy = job.resubmit();
        assert_ne!(copy.id, job.id);
        assert_eq!(copy.payload, job.payload);
    }

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn connect_report_flattens_info() {
        let mut info = serde_json::Map::new();
        info.insert("host".into(), "10.0.0.5".into());
        let report = ConnectReport::ok(ConnectionMode::Lan, info);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["mode"], "lan");
        assert_eq!(json["host"], "10.0.0.5");
        assert!(json.get("error").is_none());

        let failed = ConnectReport::failed(" USB", &TillprintError::NotConnected);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["mode"], "usb");
        assert_eq!(json["error"], "NOT_CONNECTED");
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let payload = JobPayload::Image {
            path: PathBuf::from("/tmp/logo.png"),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["path"], "/tmp/logo.png");
    }
}
