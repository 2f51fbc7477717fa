// src/engine/core.rs

//! Pure core queue state machine.
//!
//! `CoreQueue` owns the task store and the scheduler state (running / stop
//! requested). Every lifecycle operation, dispatch decision and worker
//! write-back is a synchronous method call here, so all queue semantics can
//! be unit tested without Tokio, channels or a transform service.
//!
//! The async shell (`engine::runtime::QueueRuntime`) is the only caller in
//! production, which makes it the single writer of the store.

use tracing::{debug, info, warn};

use crate::config::LiveSettings;
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::{QueueProgress, WorkerOutcome};
use crate::media::extension_for_mime;
use crate::queue::{
    DispatchDecision, QueueError, Scheduler, Task, TaskId, TaskStatus, TaskStore, Timestamp,
};
use crate::types::SourceImage;

/// Scheduler flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerState {
    /// A run is active and pending tasks will be dispatched.
    pub running: bool,
    /// `stop` was called and no `start`/`regenerate` has happened since.
    pub stop_requested: bool,
}

#[derive(Debug)]
pub struct CoreQueue {
    store: TaskStore,
    settings: LiveSettings,
    clock: Box<dyn Clock>,
    last_stamp: Timestamp,
    state: SchedulerState,
}

impl CoreQueue {
    pub fn new(settings: LiveSettings, clock: Box<dyn Clock>) -> Self {
        Self {
            store: TaskStore::new(),
            settings,
            clock,
            last_stamp: 0,
            state: SchedulerState::default(),
        }
    }

    pub fn with_system_clock(settings: LiveSettings) -> Self {
        Self::new(settings, Box::new(SystemClock))
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn progress(&self) -> QueueProgress {
        QueueProgress {
            running: self.state.running,
            stop_requested: self.state.stop_requested,
            counts: self.store.counts(),
        }
    }

    /// Add new `Idle` tasks, all stamped with the same time.
    ///
    /// In paired mode consecutive images are grouped two at a time; a
    /// trailing unpaired image becomes a single-input task.
    pub fn enqueue(&mut self, images: Vec<SourceImage>, paired: bool) -> Vec<TaskId> {
        let now = self.stamp();
        let mut tasks = Vec::new();

        if paired {
            let mut iter = images.into_iter();
            while let Some(primary) = iter.next() {
                let secondary = iter.next();
                tasks.push(Task::new(self.store.allocate_id(), primary, secondary, now));
            }
        } else {
            for primary in images {
                tasks.push(Task::new(self.store.allocate_id(), primary, None, now));
            }
        }

        let ids: Vec<TaskId> = tasks.iter().map(Task::id).collect();
        info!(count = ids.len(), paired, "enqueued tasks");
        self.store.append(tasks);
        ids
    }

    /// Move every `Idle`/`Failed` task to `Pending` and begin (or continue)
    /// a run. Returns how many tasks were moved.
    pub fn start(&mut self) -> usize {
        let now = self.stamp();
        let candidates: Vec<TaskId> = self
            .store
            .iter()
            .filter(|t| matches!(t.status(), TaskStatus::Idle | TaskStatus::Failed))
            .map(Task::id)
            .collect();

        let mut moved = 0;
        for id in candidates {
            if self.store.replace(id, |t| t.enqueue_for_start(now)) == Some(true) {
                moved += 1;
            }
        }

        self.state.stop_requested = false;
        if self.state.running {
            debug!(moved, "start requested while already running");
        } else {
            info!(moved, "starting queue run");
            self.state.running = true;
        }
        moved
    }

    /// Stop dispatching. Tasks already `Processing` resolve on their own.
    pub fn stop(&mut self) {
        let in_flight = self.store.counts().processing;
        info!(in_flight, "stop requested; no further tasks will be dispatched");
        self.state.stop_requested = true;
        self.state.running = false;
    }

    /// Re-run one task in place: same id, fresh timestamp, result and error
    /// cleared.
    pub fn regenerate(&mut self, id: TaskId) -> Result<(), QueueError> {
        let now = self.stamp();
        self.store
            .replace(id, |t| t.regenerate(now))
            .ok_or(QueueError::TaskNotFound(id))??;

        info!(task = %id, "task queued for regeneration");
        self.state.stop_requested = false;
        self.state.running = true;
        Ok(())
    }

    /// Create a new `Idle` task whose input is the result of a completed
    /// task. The source task is left untouched.
    pub fn clone_from_result(&mut self, id: TaskId, inherit_prompt: bool) -> Result<TaskId, QueueError> {
        let source = self.store.get(id).ok_or(QueueError::TaskNotFound(id))?;
        let result = match (source.status(), source.result()) {
            (TaskStatus::Completed, Some(result)) => result.clone(),
            _ => return Err(QueueError::NoResult(id)),
        };

        let name = format!(
            "{}-edit.{}",
            source.primary().stem(),
            extension_for_mime(result.mime_type())
        );
        let prompt = if inherit_prompt {
            source.prompt_override().map(str::to_string)
        } else {
            None
        };

        let now = self.stamp();
        let new_id = self.store.allocate_id();
        let task = Task::new(new_id, SourceImage::new(name, result), None, now)
            .with_prompt_override(prompt);
        self.store.append([task]);

        info!(source = %id, task = %new_id, "created task from result");
        Ok(new_id)
    }

    /// Delete a task. If its worker is still running, the eventual
    /// write-back will find no record and be dropped.
    pub fn remove(&mut self, id: TaskId) -> Result<Task, QueueError> {
        let task = self.store.remove(id).ok_or(QueueError::TaskNotFound(id))?;
        if task.status() == TaskStatus::Processing {
            debug!(task = %id, "removed task while its worker is in flight");
        }
        self.maybe_finish_run();
        Ok(task)
    }

    pub fn set_prompt_override(&mut self, id: TaskId, prompt: Option<String>) -> Result<(), QueueError> {
        let prompt = prompt.filter(|p| !p.trim().is_empty());
        self.store
            .replace(id, |t| t.set_prompt_override(prompt))
            .ok_or(QueueError::TaskNotFound(id))
    }

    /// Make at most one dispatch decision.
    ///
    /// Ends the run when nothing is pending and nothing is in flight.
    pub fn next_dispatch(&mut self) -> DispatchDecision {
        if !self.state.running || self.state.stop_requested {
            return DispatchDecision::NotRunning;
        }

        let ceiling = self.settings.current().concurrency_ceiling();
        let decision = Scheduler::dispatch_next(&mut self.store, ceiling);
        if matches!(decision, DispatchDecision::Drained) {
            self.maybe_finish_run();
        }
        decision
    }

    /// Write a worker's outcome back to its task.
    ///
    /// Returns `false` if the write-back was dropped because the task no
    /// longer exists (or is no longer `Processing`).
    pub fn apply_outcome(&mut self, id: TaskId, outcome: WorkerOutcome) -> bool {
        let applied = self.store.replace(id, |task| {
            if task.status() != TaskStatus::Processing {
                return false;
            }
            match outcome {
                WorkerOutcome::Succeeded { result, attempts } => {
                    info!(task = %id, attempts, "task completed");
                    task.complete(result, attempts);
                }
                WorkerOutcome::Failed { error, attempts } => {
                    warn!(task = %id, attempts, error = %error, "task failed");
                    task.fail(error, attempts);
                }
            }
            true
        });

        let applied = match applied {
            Some(applied) => {
                if !applied {
                    warn!(task = %id, "write-back for a task that is not processing; ignoring");
                }
                applied
            }
            None => {
                debug!(task = %id, "write-back for removed task dropped");
                false
            }
        };

        self.maybe_finish_run();
        applied
    }

    /// End the run if there is nothing left to dispatch or wait for.
    ///
    /// Returns `true` if this call ended the run.
    pub fn maybe_finish_run(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        let counts = self.store.counts();
        if counts.pending == 0 && counts.processing == 0 {
            info!(
                completed = counts.completed,
                failed = counts.failed,
                "no pending or active tasks; run finished"
            );
            self.state.running = false;
            true
        } else {
            false
        }
    }

    /// Current time on the queue clock, strictly later than any previous
    /// stamp so each operation orders after the one before it.
    fn stamp(&mut self) -> Timestamp {
        let now = self.clock.now_millis().max(self.last_stamp + 1);
        self.last_stamp = now;
        now
    }
}
