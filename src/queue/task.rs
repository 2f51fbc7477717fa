// src/queue/task.rs

//! The task record and its state machine.

use std::fmt;

use crate::queue::QueueError;
use crate::types::{ImageData, SourceImage};

/// Milliseconds on the queue clock. Used as the recency ordering key.
pub type Timestamp = u64;

/// Opaque task identifier, unique within one queue and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        TaskId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task.
///
/// `Idle -> Pending -> Processing -> {Completed, Failed}`. The only ways out
/// of a terminal state are `start` (Failed -> Pending) and `regenerate`
/// (Completed/Failed/Idle -> Pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Idle,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// `Completed` or `Failed`: nothing further will happen without a new
    /// start, regenerate or clone.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.pad(s)
    }
}

/// One unit of work: a single input image (or a pair) on its way to a
/// transformed result or a failure.
///
/// Fields are only mutated through the transition methods below, which keep
/// `result`/`error` consistent with `status`.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    primary: SourceImage,
    secondary: Option<SourceImage>,
    status: TaskStatus,
    prompt_override: Option<String>,
    result: Option<ImageData>,
    error: Option<String>,
    is_retry_derived: bool,
    last_activity: Timestamp,
    attempts: u32,
}

impl Task {
    /// A fresh `Idle` task.
    pub fn new(
        id: TaskId,
        primary: SourceImage,
        secondary: Option<SourceImage>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            primary,
            secondary,
            status: TaskStatus::Idle,
            prompt_override: None,
            result: None,
            error: None,
            is_retry_derived: false,
            last_activity: created_at,
            attempts: 0,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn primary(&self) -> &SourceImage {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&SourceImage> {
        self.secondary.as_ref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn prompt_override(&self) -> Option<&str> {
        self.prompt_override.as_deref()
    }

    pub fn result(&self) -> Option<&ImageData> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_retry_derived(&self) -> bool {
        self.is_retry_derived
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Number of transform calls made by the most recent worker run.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn with_prompt_override(mut self, prompt: Option<String>) -> Self {
        self.prompt_override = prompt;
        self
    }

    pub(crate) fn set_prompt_override(&mut self, prompt: Option<String>) {
        self.prompt_override = prompt;
    }

    /// `Idle | Failed -> Pending` when processing is started.
    ///
    /// Returns `false` (and leaves the task untouched) for any other status.
    pub(crate) fn enqueue_for_start(&mut self, now: Timestamp) -> bool {
        if !matches!(self.status, TaskStatus::Idle | TaskStatus::Failed) {
            return false;
        }
        self.status = TaskStatus::Pending;
        self.error = None;
        self.touch(now);
        true
    }

    /// `Pending -> Processing` when the scheduler dispatches the task.
    pub(crate) fn mark_processing(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.status = TaskStatus::Processing;
        self.error = None;
    }

    /// `Processing -> Completed`.
    pub(crate) fn complete(&mut self, result: ImageData, attempts: u32) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.attempts = attempts;
    }

    /// `Processing -> Failed`.
    pub(crate) fn fail(&mut self, error: String, attempts: u32) {
        self.status = TaskStatus::Failed;
        self.result = None;
        self.error = Some(error);
        self.attempts = attempts;
    }

    /// `Completed | Failed | Idle -> Pending` for a user-requested re-run of
    /// this same record.
    pub(crate) fn regenerate(&mut self, now: Timestamp) -> Result<(), QueueError> {
        match self.status {
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Idle => {
                self.status = TaskStatus::Pending;
                self.result = None;
                self.error = None;
                self.is_retry_derived = true;
                self.touch(now);
                Ok(())
            }
            busy @ (TaskStatus::Pending | TaskStatus::Processing) => {
                Err(QueueError::TaskBusy(self.id, busy))
            }
        }
    }

    fn touch(&mut self, now: Timestamp) {
        self.last_activity = self.last_activity.max(now);
    }
}
