// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for tillprint.

use thiserror::Error;

use crate::types::{ErrorCode, JobId};

/// Top-level error type for all tillprint operations.
#[derive(Debug, Error)]
pub enum TillprintError {
    // -- Connection errors --
    #[error("invalid connection mode: {0:?}")]
    InvalidMode(String),

    #[error("missing connection parameter: {0}")]
    MissingCredentials(String),

    #[error("bad value for {field}: {value}")]
    BadCredentials { field: String, value: String },

    #[error("device open failed: {0}")]
    DeviceOpenFailed(String),

    #[error("printer not connected")]
    NotConnected,

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    // -- Job errors --
    #[error("job {job_id} failed: {cause}")]
    JobExecutionFailed { job_id: JobId, cause: String },

    // -- Document errors --
    #[error("image processing failed: {0}")]
    Image(String),

    // -- Storage / configuration --
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TillprintError {
    /// Stable machine-readable code for structured results.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidMode(_) => ErrorCode::InvalidMode,
            Self::MissingCredentials(_) => ErrorCode::MissingCredentials,
            Self::BadCredentials { .. } => ErrorCode::BadCredentials,
            Self::DeviceOpenFailed(_) => ErrorCode::DeviceOpenFailed,
            Self::NotConnected => ErrorCode::NotConnected,
            Self::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            Self::JobExecutionFailed { .. } => ErrorCode::JobExecutionFailed,
            Self::Image(_) => ErrorCode::Image,
            Self::Database(_) => ErrorCode::Database,
            Self::Config(_) => ErrorCode::Config,
            Self::Io(_) => ErrorCode::Io,
            Self::Serialization(_) => ErrorCode::Serialization,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TillprintError>;
