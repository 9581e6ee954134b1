// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint daemon entry point.
//
// Loads configuration, initialises logging and the audit log, starts the
// printer service, applies the startup connection and serves HTTP until
// Ctrl-C. Everything runs on a single-threaded runtime; device and file I/O
// goes to the blocking pool.

use std::process::ExitCode;
use std::sync::Arc;

use tillprint_app::services::config::{self, LoadedConfig};
use tillprint_app::services::{data_dir, logging};
use tillprint_app::{AppState, router};
use tillprint_audit::AuditLog;
use tillprint_core::audit::AuditSink;
use tillprint_core::error::Result;
use tillprint_print::PrinterService;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let loaded = match config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("tillprint: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("tillprint: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(loaded)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "tillprint stopped with an error");
            eprintln!("tillprint: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(loaded: LoadedConfig) -> Result<()> {
    let LoadedConfig {
        config,
        path,
        data_dir,
    } = loaded;

    let logs_dir = data_dir::subdir(&data_dir, "logs")?;
    let _log_guard = logging::init(&config.log_level, config.json_log.then_some(logs_dir.as_path()))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        data_dir = %data_dir.display(),
        "tillprint starting"
    );

    let uploads_dir = data_dir::subdir(&data_dir, "uploads")?;
    let audit = if config.audit_enabled {
        let audit = match AuditLog::open(data_dir.join("audit.db")) {
            Ok(log) => log,
            Err(e) => {
                error!(error = %e, "audit database failed, using in-memory fallback");
                AuditLog::open_in_memory()?
            }
        };
        Some(Arc::new(audit))
    } else {
        None
    };
    let sink = audit.clone().map(|log| log as Arc<dyn AuditSink>);

    let service = PrinterService::start(&config, sink);
    if config.startup_mode.trim().eq_ignore_ascii_case("none") {
        info!("no startup connection configured");
    } else {
        let report = service
            .connect(&config.startup_mode, &config.startup_params)
            .await;
        if report.is_ok() {
            info!(mode = %report.mode, "startup connection established");
        } else {
            warn!(
                mode = %report.mode,
                error = ?report.error,
                detail = report.detail.as_deref().unwrap_or(""),
                "startup connection failed, waiting for /connect"
            );
        }
    }

    let state = AppState {
        service: service.clone(),
        audit,
        uploads_dir,
        log_file: logs_dir.join(logging::LOG_FILE),
        max_upload_bytes: config.max_upload_bytes,
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP API listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    service.shutdown().await;
    served?;
    info!("tillprint stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => {
            error!(error = %e, "cannot listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
