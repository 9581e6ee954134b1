// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory FIFO of print jobs.
//
// An unbounded MPSC channel: any number of producers, exactly one consumer
// (the worker). Nothing is persisted; pending jobs die with the process.
// The channel has no length accessor, so depth is tracked alongside it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tillprint_core::types::PrintJob;
use tokio::sync::mpsc;

/// Producer side. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<PrintJob>,
    depth: Arc<AtomicUsize>,
}

/// Consumer side, owned by the worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<PrintJob>,
    depth: Arc<AtomicUsize>,
}

pub fn channel() -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        JobQueue {
            tx,
            depth: Arc::clone(&depth),
        },
        JobReceiver { rx, depth },
    )
}

impl JobQueue {
    /// Append to the tail. Hands the job back if the worker is gone.
    pub fn push(&self, job: PrintJob) -> Result<(), PrintJob> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.tx.send(job).map_err(|rejected| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            rejected.0
        })
    }

    /// Jobs waiting; the one being printed is not counted.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobReceiver {
    /// Next job in FIFO order, or `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<PrintJob> {
        let job = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }
}
