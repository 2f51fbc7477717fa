// src/engine/runtime.rs

use std::fmt;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::exec::WorkerBackend;
use crate::queue::DispatchDecision;

use super::core::CoreQueue;
use super::handle::QueueHandle;
use super::{QueueEvent, QueueProgress, WorkerOutcome};

/// Drives the queue core in response to `QueueEvent`s and launches workers
/// through a `WorkerBackend`.
///
/// All queue semantics live in `CoreQueue`; this shell adds the async parts:
/// - reading commands and worker completions from the event channel
/// - spacing successive dispatch decisions by the configured interval
/// - broadcasting the stop flag to workers and progress to handles
///
/// Completions arrive on the same channel as commands, so the loop sleeps
/// until something happens instead of polling the store.
pub struct QueueRuntime<B: WorkerBackend> {
    pub(super) core: CoreQueue,
    event_rx: mpsc::Receiver<QueueEvent>,
    backend: B,
    stop_tx: watch::Sender<bool>,
    progress_tx: watch::Sender<QueueProgress>,
    /// Earliest time the next dispatch decision may be made.
    next_dispatch_at: Option<Instant>,
}

impl<B: WorkerBackend> fmt::Debug for QueueRuntime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRuntime")
            .field("core", &self.core)
            .field("next_dispatch_at", &self.next_dispatch_at)
            .finish_non_exhaustive()
    }
}

impl<B: WorkerBackend> QueueRuntime<B> {
    pub fn new(core: CoreQueue, event_rx: mpsc::Receiver<QueueEvent>, backend: B) -> Self {
        let (stop_tx, _) = watch::channel(core.state().stop_requested);
        let (progress_tx, _) = watch::channel(core.progress());
        Self {
            core,
            event_rx,
            backend,
            stop_tx,
            progress_tx,
            next_dispatch_at: None,
        }
    }

    /// A handle that sends commands on `events` (the sender half of this
    /// runtime's event channel).
    pub fn handle(&self, events: mpsc::Sender<QueueEvent>) -> QueueHandle {
        QueueHandle::new(
            events,
            self.progress_tx.subscribe(),
            self.core.settings().clone(),
        )
    }

    /// Main event loop.
    ///
    /// - Makes at most one dispatch decision per iteration, once the
    ///   previous dispatch's interval has elapsed.
    /// - Waits for the next event (or for the interval to elapse).
    /// - Feeds the event into the core.
    pub async fn run(mut self) -> Result<()> {
        info!("imgbatch queue runtime started");

        loop {
            self.dispatch_if_due().await;

            let event = match self.dispatch_deadline() {
                Some(deadline) => tokio::select! {
                    event = self.event_rx.recv() => event,
                    _ = time::sleep_until(deadline) => continue,
                },
                None => self.event_rx.recv().await,
            };

            let Some(event) = event else {
                info!("queue event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            if !self.handle_event(event) {
                info!("shutdown requested; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    fn handle_event(&mut self, event: QueueEvent) -> bool {
        match event {
            QueueEvent::Command(command) => self.handle_command(command),
            QueueEvent::WorkerFinished { id, outcome } => self.handle_worker_finished(id, outcome),
            QueueEvent::ShutdownRequested => return false,
        }
        true
    }

    /// The pending dispatch deadline, if a run is active and waiting on one.
    fn dispatch_deadline(&self) -> Option<Instant> {
        match self.next_dispatch_at {
            Some(at) if self.core.is_running() => Some(at),
            _ => None,
        }
    }

    async fn dispatch_if_due(&mut self) {
        if let Some(at) = self.next_dispatch_at {
            if Instant::now() < at {
                return;
            }
            self.next_dispatch_at = None;
        }

        if let DispatchDecision::Dispatched(task) = self.core.next_dispatch() {
            let id = task.id;
            let interval = self.core.settings().current().dispatch_interval();

            if let Err(err) = self.backend.spawn_worker(task, self.stop_tx.subscribe()).await {
                error!(task = %id, error = %err, "failed to launch worker");
                self.core.apply_outcome(
                    id,
                    WorkerOutcome::Failed {
                        error: format!("could not launch worker: {err}"),
                        attempts: 0,
                    },
                );
            }

            self.next_dispatch_at = Some(Instant::now() + interval);
        }

        self.publish();
    }

    /// Push the current stop flag and progress to their watchers.
    pub(super) fn publish(&self) {
        let stop = self.core.state().stop_requested;
        self.stop_tx.send_if_modified(|current| {
            if *current != stop {
                *current = stop;
                true
            } else {
                false
            }
        });

        let progress = self.core.progress();
        self.progress_tx.send_if_modified(|current| {
            if *current != progress {
                *current = progress;
                true
            } else {
                false
            }
        });
    }

    /// Publish state, then answer the caller, so a caller that awaits the
    /// reply always sees progress that includes its own operation.
    pub(super) fn respond<T>(&self, reply: oneshot::Sender<T>, value: T) {
        self.publish();
        if reply.send(value).is_err() {
            debug!("caller went away before receiving the reply");
        }
    }
}
