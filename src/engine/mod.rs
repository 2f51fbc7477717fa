// src/engine/mod.rs

//! Orchestration engine for imgbatch.
//!
//! This module ties together:
//! - the task store and dispatch policy (owned by [`core::CoreQueue`])
//! - the runtime loop that reacts to:
//!   - lifecycle commands from a [`handle::QueueHandle`]
//!   - worker completion events
//!   - shutdown requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`], with command handling in [`event_handlers`].

use tokio::sync::{mpsc, oneshot};

use crate::config::QueueSettings;
use crate::queue::{QueueError, StatusCounts, Task, TaskId};
use crate::types::{ImageData, SourceImage};

pub mod clock;
pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod runtime;

pub use clock::{Clock, ManualClock, SystemClock};
pub use core::{CoreQueue, SchedulerState};
pub use handle::QueueHandle;
pub use runtime::QueueRuntime;

/// Capacity of the runtime event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result a worker reports back for the task it was given.
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Succeeded { result: ImageData, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

/// Lifecycle operations, each carrying the channel its answer goes back on.
#[derive(Debug)]
pub enum QueueCommand {
    Enqueue {
        images: Vec<SourceImage>,
        paired: bool,
        reply: oneshot::Sender<Vec<TaskId>>,
    },
    Start {
        reply: oneshot::Sender<usize>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Regenerate {
        id: TaskId,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },
    CloneFromResult {
        id: TaskId,
        inherit_prompt: bool,
        reply: oneshot::Sender<Result<TaskId, QueueError>>,
    },
    Remove {
        id: TaskId,
        reply: oneshot::Sender<Result<Task, QueueError>>,
    },
    SetPromptOverride {
        id: TaskId,
        prompt: Option<String>,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },
    UpdateSettings {
        settings: QueueSettings,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Task>>,
    },
}

/// Events flowing into the runtime.
#[derive(Debug)]
pub enum QueueEvent {
    /// A lifecycle operation from a handle.
    Command(QueueCommand),
    /// A worker finished (successfully or not) with the task it was given.
    WorkerFinished { id: TaskId, outcome: WorkerOutcome },
    /// Stop the runtime loop. In-flight workers are abandoned.
    ShutdownRequested,
}

/// Published summary of queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueProgress {
    /// A run is active: pending work will be dispatched.
    pub running: bool,
    pub stop_requested: bool,
    pub counts: StatusCounts,
}

impl QueueProgress {
    /// No run is active and no worker is in flight.
    pub fn is_settled(&self) -> bool {
        !self.running && self.counts.processing == 0
    }
}

/// Create the runtime event channel.
pub fn event_channel() -> (mpsc::Sender<QueueEvent>, mpsc::Receiver<QueueEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
