// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer service: the one object callers talk to.
//
// Composes the connection manager (behind the device lock), the job
// registry, the FIFO queue and a single worker task. Startup spawns the
// worker; shutdown signals it at its queue wait, lets an in-flight job
// finish, then releases the device.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};
use tillprint_core::audit::AuditSink;
use tillprint_core::config::ServiceConfig;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{
    ConnectParams, ConnectReport, JobEvent, JobId, JobOutcome, JobPayload, LinkSnapshot,
    PrintJob, ServiceStatus,
};
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::DeviceProfile;
use crate::connection::ConnectionManager;
use crate::journal::DeviceJournal;
use crate::queue::{self, JobQueue, JobReceiver};
use crate::registry::JobRegistry;

/// Buffered job events per subscriber before the slowest one lags.
const EVENT_CAPACITY: usize = 256;

/// Handle on the running service. Clones share one instance.
#[derive(Clone)]
pub struct PrinterService {
    inner: Arc<Inner>,
}

struct Inner {
    /// The device lock.
    device: Arc<Mutex<ConnectionManager>>,
    link: watch::Receiver<LinkSnapshot>,
    queue: JobQueue,
    registry: JobRegistry,
    events: broadcast::Sender<JobEvent>,
    journal: DeviceJournal,
    audit: Option<Arc<dyn AuditSink>>,
    shutdown: Arc<Notify>,
    stopped: AtomicBool,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl PrinterService {
    /// Build the service and spawn its worker. Must run inside a Tokio
    /// runtime. Nothing is connected yet.
    pub fn start(config: &ServiceConfig, audit: Option<Arc<dyn AuditSink>>) -> Self {
        let journal = DeviceJournal::default();
        let manager = ConnectionManager::new(
            DeviceProfile::from_config(config),
            config.probe_timeout(),
            journal.clone(),
        );
        let link = manager.subscribe();
        let device = Arc::new(Mutex::new(manager));
        let (queue, receiver) = queue::channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown = Arc::new(Notify::new());

        let worker = Worker {
            device: Arc::clone(&device),
            jobs: receiver,
            events: events.clone(),
            shutdown: Arc::clone(&shutdown),
        };
        let handle = tokio::spawn(worker.run());
        info!("printer service started");

        Self {
            inner: Arc::new(Inner {
                device,
                link,
                queue,
                registry: JobRegistry::new(),
                events,
                journal,
                audit,
                shutdown,
                stopped: AtomicBool::new(false),
                worker: StdMutex::new(Some(handle)),
            }),
        }
    }

    // -- Connection -----------------------------------------------------------

    /// Switch the printer connection. Never fails; errors come back as a
    /// structured report.
    pub async fn connect(&self, mode: &str, params: &ConnectParams) -> ConnectReport {
        if self.is_stopped() {
            let err = TillprintError::BackendUnavailable("service is shut down".into());
            return ConnectReport::failed(mode, &err);
        }
        let mut device = self.inner.device.lock().await;
        match device.connect(mode, params).await {
            Ok(info) => ConnectReport::ok(device.mode(), info),
            Err(e) => ConnectReport::failed(mode, &e),
        }
    }

    /// Release the device (no-op for the simulated printer).
    pub async fn close(&self) {
        self.inner.device.lock().await.close().await;
    }

    pub fn status(&self) -> ServiceStatus {
        let link = *self.inner.link.borrow();
        ServiceStatus {
            mode: link.mode,
            connected: link.connected && !self.is_stopped(),
            queue_size: self.inner.queue.len(),
        }
    }

    // -- Submission -----------------------------------------------------------

    pub async fn enqueue_text(&self, text: impl Into<String>, lang: impl Into<String>) -> Result<JobId> {
        self.enqueue(
            JobPayload::Text {
                text: text.into(),
                lang: lang.into(),
            },
            Map::new(),
        )
        .await
    }

    pub async fn enqueue_image(&self, path: impl Into<PathBuf>) -> Result<JobId> {
        self.enqueue(JobPayload::Image { path: path.into() }, Map::new()).await
    }

    /// Accept a job while connected. `metadata` is merged into the audit
    /// record (e.g. `reprint_of`).
    pub async fn enqueue(&self, payload: JobPayload, metadata: Map<String, Value>) -> Result<JobId> {
        if !self.status().connected {
            return Err(TillprintError::NotConnected);
        }
        let job = PrintJob::new(payload);
        self.inner.registry.insert(job.clone());
        if self.inner.queue.push(job.clone()).is_err() {
            return Err(TillprintError::NotConnected);
        }
        info!(job_id = %job.id, kind = %job.kind(), "job queued");

        self.audit(&job, metadata).await;
        Ok(job.id)
    }

    /// Resubmit a known job's payload under a new id, connected or not.
    /// Returns the new id, or `None` for unknown ids.
    pub async fn requeue_job(&self, id: &JobId) -> Option<JobId> {
        if self.is_stopped() {
            return None;
        }
        let original = self.inner.registry.get(id)?;
        let job = original.resubmit();
        self.inner.registry.insert(job.clone());
        if self.inner.queue.push(job.clone()).is_err() {
            return None;
        }
        info!(job_id = %job.id, requeue_of = %id, "job requeued");

        let mut metadata = Map::new();
        metadata.insert("requeue_of".into(), id.to_string().into());
        self.audit(&job, metadata).await;
        Some(job.id)
    }

    /// `true` if the job was found and resubmitted.
    pub async fn requeue(&self, id: &JobId) -> bool {
        self.requeue_job(id).await.is_some()
    }

    async fn audit(&self, job: &PrintJob, mut metadata: Map<String, Value>) {
        let Some(sink) = self.inner.audit.clone() else {
            return;
        };
        let payload = match serde_json::to_value(&job.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "job payload not auditable");
                return;
            }
        };
        metadata.insert("queue_job_id".into(), job.id.to_string().into());
        let kind = job.kind();

        let recorded = tokio::task::spawn_blocking(move || {
            sink.record(kind.as_str(), &payload, &Value::Object(metadata))
        })
        .await;
        match recorded {
            Ok(Ok(())) => debug!(job_id = %job.id, "job audited"),
            Ok(Err(e)) => warn!(job_id = %job.id, error = %e, "audit record failed"),
            Err(e) => warn!(job_id = %job.id, error = %e, "audit task aborted"),
        }
    }

    // -- Observation ----------------------------------------------------------

    /// Job completions and failures as the worker reports them.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    pub fn journal(&self) -> &DeviceJournal {
        &self.inner.journal
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    // -- Lifecycle ------------------------------------------------------------

    fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stop the worker, wait for any in-flight job, release the device.
    /// Idempotent.
    pub async fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutting down printer service");
        self.inner.shutdown.notify_one();

        let handle = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task ended abnormally");
            }
        }

        self.inner.device.lock().await.shutdown().await;
        info!("printer service stopped");
    }
}

/// The single consumer of the job queue.
struct Worker {
    device: Arc<Mutex<ConnectionManager>>,
    jobs: JobReceiver,
    events: broadcast::Sender<JobEvent>,
    shutdown: Arc<Notify>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let job = tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    debug!("worker received shutdown signal");
                    break;
                }
                next = self.jobs.recv() => match next {
                    Some(job) => job,
                    None => break,
                },
            };
            self.process(job).await;
        }
        debug!("worker stopped");
    }

    async fn process(&self, job: PrintJob) {
        let result = {
            let mut device = self.device.lock().await;
            device.execute(&job).await
        };

        let outcome = match result {
            Ok(outcome) => {
                if outcome.is_clean() {
                    info!(job_id = %job.id, kind = %job.kind(), "job printed");
                } else {
                    info!(job_id = %job.id, kind = %job.kind(), skipped = ?outcome.skipped, "job printed with skipped commands");
                }
                JobOutcome::Completed {
                    skipped: outcome.skipped,
                }
            }
            Err(cause) => {
                let code = cause.code();
                let err = TillprintError::JobExecutionFailed {
                    job_id: job.id,
                    cause: cause.to_string(),
                };
                error!(job_id = %job.id, kind = %job.kind(), error = %err, "job failed");
                JobOutcome::Failed {
                    code,
                    message: err.to_string(),
                }
            }
        };

        // No subscribers is fine.
        let _ = self.events.send(JobEvent {
            job_id: job.id,
            kind: job.kind(),
            outcome,
            finished_at: Utc::now(),
        });
    }
}
