// src/queue/mod.rs

//! Task records, the task store and the dispatch policy.
//!
//! - [`task`] holds the `Task` record and its state machine.
//! - [`store`] is the ordered, authoritative collection of tasks.
//! - [`scheduler`] decides which pending task is dispatched next and whether
//!   the concurrency ceiling allows it.
//! - [`dispatch`] defines the result type of a single dispatch decision.

pub mod dispatch;
pub mod scheduler;
pub mod store;
pub mod task;

use thiserror::Error;

pub use dispatch::{DispatchDecision, DispatchedTask};
pub use scheduler::Scheduler;
pub use store::{StatusCounts, TaskStore};
pub use task::{Task, TaskId, TaskStatus, Timestamp};

/// Errors returned by lifecycle operations on the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("task {0} is {1} and cannot be changed right now")]
    TaskBusy(TaskId, TaskStatus),

    #[error("task {0} has no result to use as input")]
    NoResult(TaskId),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("queue runtime is no longer running")]
    QueueClosed,
}
