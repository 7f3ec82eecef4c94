// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size worker pool with a bounded backlog.
//!
//! Admission control lives here: when the backlog is full, [`WorkerPool::send_work`]
//! fails immediately instead of queueing, and the HTTP edge turns that into
//! a 503.

use crate::engine::{Engine, WorkError};
use crate::job::Job;
use kiln_core::{BuildInfo, Clock};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The work backlog is at capacity; retry later.
#[derive(Debug, Error)]
#[error("queue is full")]
pub struct QueueFull;

/// The outcome of a build: a [`BuildInfo`] or the engine error.
pub type WorkResult = Result<BuildInfo, WorkError>;

/// A [`WorkResult`] that may not have become available yet.
#[derive(Debug)]
pub struct FutureWorkResult {
    rx: oneshot::Receiver<WorkResult>,
}

impl FutureWorkResult {
    /// Wait for the worker to finish the job. Exactly one value is produced
    /// per future.
    pub async fn wait(self) -> WorkResult {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(WorkError::LostWorker),
        }
    }
}

struct WorkItem {
    job: Job,
    result: oneshot::Sender<WorkResult>,
}

/// Fixed pool of workers draining a shared bounded queue in arrival order.
pub struct WorkerPool {
    queue: mpsc::Sender<WorkItem>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `concurrency` workers over a queue of depth `backlog`.
    pub fn new<C: Clock + 'static>(
        engine: Arc<Engine<C>>,
        concurrency: usize,
        backlog: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(backlog.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..concurrency.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(id, Arc::clone(&engine), Arc::clone(&rx), cancel.clone()))
            })
            .collect();

        info!(concurrency, backlog, "set up workers");
        Self { queue: tx, workers }
    }

    /// Schedule `job` and return a future for its result, or [`QueueFull`]
    /// without blocking.
    pub fn send_work(&self, job: Job) -> Result<FutureWorkResult, QueueFull> {
        let (tx, rx) = oneshot::channel();
        self.queue
            .try_send(WorkItem { job, result: tx })
            .map_err(|_| QueueFull)?;
        Ok(FutureWorkResult { rx })
    }

    /// Close the queue and wait for the workers to drain it.
    pub async fn stop(self) {
        drop(self.queue);
        for handle in self.workers {
            let _ = handle.await;
        }
    }
}

async fn worker_loop<C: Clock + 'static>(
    id: usize,
    engine: Arc<Engine<C>>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<WorkItem>>>,
    cancel: CancellationToken,
) {
    loop {
        // Hold the receiver lock only while pulling the next item, so other
        // idle workers can take over immediately.
        let item = { rx.lock().await.recv().await };
        let Some(item) = item else { break };

        let result = engine.work(&cancel, &item.job).await;
        if item.result.send(result).is_err() {
            // fire-and-forget submissions drop their receiver
            debug!(worker = id, "result receiver gone");
        }
    }
    debug!(worker = id, "exiting");
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
