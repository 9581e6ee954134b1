// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated printer: no device I/O, every request succeeds and is journaled.

use std::path::Path;
use std::time::Duration;

use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{ConnectionMode, JobKind, PrintOutcome};
use tracing::info;

use super::DeviceBackend;
use crate::journal::{DeviceEvent, DeviceJournal};

#[derive(Debug)]
pub struct DummyBackend {
    connected: bool,
    /// Simulated print time, so lock sequencing can be observed.
    latency: Duration,
    journal: DeviceJournal,
}

impl DummyBackend {
    pub fn new(latency: Duration, journal: DeviceJournal) -> Self {
        Self {
            connected: false,
            latency,
            journal,
        }
    }

    async fn simulate(&self, kind: JobKind, detail: String) -> Result<PrintOutcome> {
        if !self.connected {
            return Err(TillprintError::NotConnected);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        info!(%kind, %detail, "simulated print");
        self.journal.push(DeviceEvent::Simulated { kind, detail });
        Ok(PrintOutcome::default())
    }
}

impl DeviceBackend for DummyBackend {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Dummy
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn print_text(&mut self, text: &str, _lang: &str) -> Result<PrintOutcome> {
        self.simulate(JobKind::Text, text.to_owned()).await
    }

    async fn print_image(&mut self, path: &Path) -> Result<PrintOutcome> {
        self.simulate(JobKind::Image, path.display().to_string()).await
    }
}
