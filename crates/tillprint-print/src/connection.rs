// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection manager: sole owner of the live backend.
//
// The manager itself is not synchronized; `PrinterService` keeps it behind
// the async device lock, so connects, closes and prints are strictly
// serialized. The current mode/connected pair is published on a watch
// channel so status reads never wait for that lock.

use std::time::Duration;

use serde_json::{Map, Value};
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{ConnectParams, ConnectionMode, JobPayload, LinkSnapshot, PrintJob, PrintOutcome};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::backend::{Backend, DeviceBackend, DeviceProfile, DummyBackend, LanBackend, UsbBackend, usb};
use crate::journal::{DeviceEvent, DeviceJournal};
use crate::params::ConnectPlan;

pub struct ConnectionManager {
    backend: Option<Backend>,
    mode: ConnectionMode,
    link: watch::Sender<LinkSnapshot>,
    journal: DeviceJournal,
    defaults: DeviceProfile,
    probe_timeout: Duration,
}

impl ConnectionManager {
    /// A manager with nothing connected (`mode = none`).
    pub fn new(defaults: DeviceProfile, probe_timeout: Duration, journal: DeviceJournal) -> Self {
        let (link, _) = watch::channel(LinkSnapshot::default());
        Self {
            backend: None,
            mode: ConnectionMode::None,
            link,
            journal,
            defaults,
            probe_timeout,
        }
    }

    /// Lock-free view of mode and link state.
    pub fn subscribe(&self) -> watch::Receiver<LinkSnapshot> {
        self.link.subscribe()
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        *self.link.borrow()
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn journal(&self) -> &DeviceJournal {
        &self.journal
    }

    fn publish(&self) {
        let snapshot = LinkSnapshot {
            mode: self.mode,
            connected: self.backend.as_ref().is_some_and(|b| b.is_connected()),
        };
        self.link.send_replace(snapshot);
    }

    /// Switch to `mode`, returning the diagnostic fields for the result.
    ///
    /// Mode and parameters are validated first; a validation error leaves the
    /// current connection as it was. After that the old backend is always
    /// closed before the new one opens, and `connected = false` is published
    /// for the whole open. If opening fails the mode is still recorded, with
    /// `connected = false`.
    #[instrument(skip(self, params), fields(requested = %mode))]
    pub async fn connect(&mut self, mode: &str, params: &ConnectParams) -> Result<Map<String, Value>> {
        let mode: ConnectionMode = mode.parse()?;
        if mode == ConnectionMode::Usb && !usb::AVAILABLE {
            return Err(TillprintError::BackendUnavailable("built without USB support".into()));
        }
        let plan = ConnectPlan::from_params(mode, params, self.defaults, self.probe_timeout)?;
        let info = plan.info();

        self.teardown().await;
        self.mode = mode;
        self.publish();

        let mut backend = match plan {
            ConnectPlan::Dummy { latency } => Backend::Dummy(DummyBackend::new(latency, self.journal.clone())),
            ConnectPlan::Usb { target, profile } => {
                Backend::Usb(UsbBackend::new(target, profile, self.probe_timeout))
            }
            ConnectPlan::Lan { target, profile } => Backend::Lan(LanBackend::new(target, profile)),
        };

        let opened = backend.connect().await;
        match opened {
            Ok(()) => {
                self.journal.push(DeviceEvent::Opened { mode });
                self.backend = Some(backend);
                self.publish();
                info!(%mode, "printer connected");
                Ok(info)
            }
            Err(e) => {
                warn!(%mode, error = %e, "printer connect failed");
                Err(e)
            }
        }
    }

    /// Release the active device. Idempotent. The simulated printer stays
    /// connected.
    pub async fn close(&mut self) {
        if self.mode == ConnectionMode::Dummy {
            debug!("close ignored in dummy mode");
            return;
        }
        self.teardown().await;
        self.publish();
    }

    /// Release the device whatever the mode; used on service shutdown.
    pub async fn shutdown(&mut self) {
        self.teardown().await;
        self.publish();
    }

    /// Close and drop the current backend, swallowing close errors.
    async fn teardown(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            let mode = backend.mode();
            if let Err(e) = backend.disconnect().await {
                warn!(%mode, error = %e, "error while closing printer, ignoring");
            }
            self.journal.push(DeviceEvent::Closed { mode });
            debug!(%mode, "backend released");
        }
    }

    /// Run one job on the active backend. Callers hold the device lock.
    pub async fn execute(&mut self, job: &PrintJob) -> Result<PrintOutcome> {
        self.journal.push(DeviceEvent::PrintStarted { job_id: job.id });
        let result = match self.backend.as_mut() {
            None => Err(TillprintError::NotConnected),
            Some(backend) => match &job.payload {
                JobPayload::Text { text, lang } => backend.print_text(text, lang).await,
                JobPayload::Image { path } => backend.print_image(path).await,
            },
        };
        self.journal.push(DeviceEvent::PrintFinished {
            job_id: job.id,
            ok: result.is_ok(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(DeviceProfile::default(), Duration::from_millis(300), DeviceJournal::default())
    }

    fn params(value: Value) -> ConnectParams {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn starts_with_nothing_connected() {
        let mgr = manager();
        assert_eq!(mgr.snapshot(), LinkSnapshot::default());
    }

    #[tokio::test]
    async fn dummy_connects_and_survives_close() {
        let mut mgr = manager();
        mgr.connect("DUMMY ", &params(json!({}))).await.unwrap();
        assert_eq!(
            mgr.snapshot(),
            LinkSnapshot {
                mode: ConnectionMode::Dummy,
                connected: true
            }
        );
        mgr.close().await;
        assert!(mgr.snapshot().connected);
        mgr.shutdown().await;
        assert!(!mgr.snapshot().connected);
    }

    #[tokio::test]
    async fn invalid_mode_keeps_current_connection() {
        let mut mgr = manager();
        mgr.connect("dummy", &params(json!({}))).await.unwrap();
        let err = mgr.connect("serial", &params(json!({}))).await.unwrap_err();
        assert!(matches!(err, TillprintError::InvalidMode(_)));
        assert_eq!(mgr.mode(), ConnectionMode::Dummy);
        assert!(mgr.snapshot().connected);
    }

    #[tokio::test]
    async fn failed_open_records_mode_disconnected() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut mgr = manager();
        mgr.connect("dummy", &params(json!({}))).await.unwrap();
        let err = mgr
            .connect("lan", &params(json!({"host": "127.0.0.1", "port": port})))
            .await
            .unwrap_err();
        assert!(matches!(err, TillprintError::DeviceOpenFailed(_)));
        assert_eq!(
            mgr.snapshot(),
            LinkSnapshot {
                mode: ConnectionMode::Lan,
                connected: false
            }
        );
        // The dummy backend was closed before the LAN attempt.
        assert!(mgr.journal().events().contains(&DeviceEvent::Closed {
            mode: ConnectionMode::Dummy
        }));
    }

    #[tokio::test]
    async fn execute_without_backend_is_not_connected() {
        let mut mgr = manager();
        let job = PrintJob::new(JobPayload::Text {
            text: "x".into(),
            lang: "tr".into(),
        });
        let err = mgr.execute(&job).await.unwrap_err();
        assert!(matches!(err, TillprintError::NotConnected));
        assert_eq!(
            mgr.journal().events(),
            vec![
                DeviceEvent::PrintStarted { job_id: job.id },
                DeviceEvent::PrintFinished {
                    job_id: job.id,
                    ok: false
                },
            ]
        );
    }
}
