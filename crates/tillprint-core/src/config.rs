// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ConnectParams;

/// Persistent service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP API binds to.
    pub listen_addr: String,
    /// Root for uploads, the audit database and logs. `None` picks the
    /// platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Connection applied right after startup (`"none"` skips it).
    pub startup_mode: String,
    /// Parameters for the startup connection.
    pub startup_params: ConnectParams,
    /// Upper bound for the LAN reachability probe and the USB open.
    pub probe_timeout_ms: u64,
    /// Default thermal head width in dots (384 for 58mm, 576 for 80mm).
    pub paper_width_dots: u32,
    /// Whether jobs end with a paper cut unless a profile says otherwise.
    pub cut_paper: bool,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Write JSON log lines to `<data_dir>/logs/service.jsonl`.
    pub json_log: bool,
    /// Record accepted jobs in the audit log.
    pub audit_enabled: bool,
    /// Largest accepted image upload.
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".into(),
            data_dir: None,
            startup_mode: "dummy".into(),
            startup_params: ConnectParams::new(),
            probe_timeout_ms: 5_000,
            paper_width_dots: 384,
            cut_paper: true,
            log_level: "info".into(),
            json_log: true,
            audit_enabled: true,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}
