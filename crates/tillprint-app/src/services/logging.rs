// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tracing setup: human-readable console output plus an optional JSON-lines
// file that the `/logs` endpoint reads back.

use std::path::Path;

use tillprint_core::error::{Result, TillprintError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// JSON log file name inside the logs directory. Never rotated.
pub const LOG_FILE: &str = "service.jsonl";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. When `json_dir` is given, every event is
/// also written there as one flattened JSON object per line; keep the
/// returned guard alive until exit so buffered lines get flushed.
pub fn init(level: &str, json_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer().with_target(false);

    let (json_layer, guard) = match json_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(json_layer)
        .try_init()
        .map_err(|e| TillprintError::Config(format!("logging already initialised: {e}")))?;

    Ok(guard)
}
