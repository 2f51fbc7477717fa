// src/exec/backend.rs

//! Pluggable worker backend abstraction.
//!
//! The runtime talks to a `WorkerBackend` instead of spawning workers itself.
//! This makes it easy to swap in a fake backend in tests while keeping the
//! production worker (`worker::run_worker`) in one place.
//!
//! - `TransformBackend` is the default implementation used by `imgbatch`.
//!   It spawns one Tokio task per dispatched task and reports the outcome as
//!   a `QueueEvent::WorkerFinished`.
//! - Tests can provide their own `WorkerBackend` that, for example, records
//!   which tasks were dispatched and completes them by hand.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::engine::{QueueEvent, WorkerOutcome};
use crate::errors::Result;
use crate::queue::DispatchedTask;

use super::worker::{WorkerContext, run_worker};

/// Trait abstracting how dispatched tasks are executed.
pub trait WorkerBackend: Send {
    /// Launch a worker for `task` without waiting for it to finish.
    ///
    /// The outcome must eventually arrive at the runtime as a
    /// `QueueEvent::WorkerFinished`. `stop` flips to `true` when the queue is
    /// stopped.
    fn spawn_worker(
        &mut self,
        task: DispatchedTask,
        stop: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs `run_worker` against the real transform service.
pub struct TransformBackend {
    ctx: WorkerContext,
    events: mpsc::Sender<QueueEvent>,
    workers: JoinSet<()>,
}

impl TransformBackend {
    pub fn new(ctx: WorkerContext, events: mpsc::Sender<QueueEvent>) -> Self {
        Self {
            ctx,
            events,
            workers: JoinSet::new(),
        }
    }

    fn reap(&mut self) {
        while let Some(res) = self.workers.try_join_next() {
            if let Err(err) = res {
                error!(error = %err, "worker wrapper ended abnormally");
            }
        }
    }
}

impl WorkerBackend for TransformBackend {
    fn spawn_worker(
        &mut self,
        task: DispatchedTask,
        stop: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.reap();
        self.workers
            .spawn(run_and_report(task, self.ctx.clone(), stop, self.events.clone()));
        Box::pin(async { Ok(()) })
    }
}

/// Run the worker in its own task so that a panic inside the transform
/// service still produces a `Failed` outcome.
async fn run_and_report(
    task: DispatchedTask,
    ctx: WorkerContext,
    stop: watch::Receiver<bool>,
    events: mpsc::Sender<QueueEvent>,
) {
    let id = task.id;
    let outcome = match tokio::spawn(run_worker(task, ctx, stop)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %id, error = %err, "worker crashed");
            WorkerOutcome::Failed {
                error: format!("worker crashed: {err}"),
                attempts: 0,
            }
        }
    };

    if events
        .send(QueueEvent::WorkerFinished { id, outcome })
        .await
        .is_err()
    {
        debug!(task = %id, "runtime gone; dropping worker outcome");
    }
}
