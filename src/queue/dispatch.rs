// src/queue/dispatch.rs

//! Result types for a single dispatch decision.

use crate::queue::task::{Task, TaskId};
use crate::types::{ImageData, SourceImage};

/// Everything a worker needs to process one task, copied out of the store at
/// dispatch time.
///
/// The worker owns this copy, so the task can be removed from the store while
/// the worker is still running.
#[derive(Debug, Clone)]
pub struct DispatchedTask {
    pub id: TaskId,
    pub primary: SourceImage,
    pub secondary: Option<SourceImage>,
    pub prompt_override: Option<String>,
}

impl DispatchedTask {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id(),
            primary: task.primary().clone(),
            secondary: task.secondary().cloned(),
            prompt_override: task.prompt_override().map(str::to_string),
        }
    }

    /// The images to send, primary first.
    pub fn images(&self) -> Vec<ImageData> {
        let mut images = vec![self.primary.data.clone()];
        if let Some(secondary) = &self.secondary {
            images.push(secondary.data.clone());
        }
        images
    }
}

/// Outcome of asking the scheduler for the next task to dispatch.
#[derive(Debug, Clone)]
pub enum DispatchDecision {
    /// A task was moved to `Processing` and should be launched now.
    Dispatched(DispatchedTask),
    /// Pending work exists but the concurrency ceiling is reached.
    Saturated { active: usize, ceiling: usize },
    /// Nothing is pending, but workers are still in flight.
    AwaitingWorkers { active: usize },
    /// No pending and no active tasks: the run is over.
    Drained,
    /// The queue is not running (never started, drained, or stopped).
    NotRunning,
}

impl DispatchDecision {
    pub fn dispatched(&self) -> Option<&DispatchedTask> {
        match self {
            DispatchDecision::Dispatched(task) => Some(task),
            _ => None,
        }
    }
}
