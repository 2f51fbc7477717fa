// src/queue/scheduler.rs

//! Admission and ordering policy.
//!
//! The scheduler is stateless: it inspects the store, and when the
//! concurrency ceiling allows it, moves exactly one pending task to
//! `Processing`. Among pending tasks the one with the largest
//! `last_activity` wins, so freshly added or regenerated work preempts older
//! queued work. Ties go to the task that appears first in the store.

use tracing::{debug, info};

use crate::queue::dispatch::{DispatchDecision, DispatchedTask};
use crate::queue::store::TaskStore;
use crate::queue::task::{TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    /// The pending task that should run next, if any.
    pub fn select_candidate(store: &TaskStore) -> Option<TaskId> {
        let mut best: Option<(TaskId, u64)> = None;
        for task in store.iter().filter(|t| t.status() == TaskStatus::Pending) {
            match best {
                Some((_, ts)) if ts >= task.last_activity() => {}
                _ => best = Some((task.id(), task.last_activity())),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Make one dispatch decision against the given ceiling.
    ///
    /// On `Dispatched`, the chosen task has already been marked
    /// `Processing` in the store, so it can never be selected twice.
    pub fn dispatch_next(store: &mut TaskStore, ceiling: usize) -> DispatchDecision {
        let counts = store.counts();
        let active = counts.processing;

        if counts.pending == 0 {
            return if active == 0 {
                DispatchDecision::Drained
            } else {
                DispatchDecision::AwaitingWorkers { active }
            };
        }

        let ceiling = ceiling.max(1);
        if active >= ceiling {
            debug!(active, ceiling, "concurrency ceiling reached; not dispatching");
            return DispatchDecision::Saturated { active, ceiling };
        }

        let Some(id) = Self::select_candidate(store) else {
            return DispatchDecision::Drained;
        };

        let dispatched = store.replace(id, |task| {
            task.mark_processing();
            DispatchedTask::from_task(task)
        });

        match dispatched {
            Some(task) => {
                info!(
                    task = %task.id,
                    source = %task.primary.name,
                    paired = task.secondary.is_some(),
                    active = active + 1,
                    ceiling,
                    "dispatching task"
                );
                DispatchDecision::Dispatched(task)
            }
            None => DispatchDecision::Drained,
        }
    }
}
