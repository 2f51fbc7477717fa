// src/queue/store.rs

//! The ordered collection of task records.

use tracing::debug;

use crate::queue::task::{Task, TaskId, TaskStatus};

/// Per-status task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub idle: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.idle + self.pending + self.processing + self.completed + self.failed
    }
}

/// Authoritative, ordered collection of tasks.
///
/// Insertion order is preserved and is the default display order; it is also
/// the tie-breaker when two pending tasks share a timestamp. All mutation goes
/// through whole-record replacement keyed by id.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id. Ids are never handed out twice, even after removal.
    pub fn allocate_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId::from_raw(self.next_id)
    }

    /// Add records at the end without reordering existing ones.
    pub fn append(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.tasks.extend(tasks);
    }

    /// Replace one record with an updated copy.
    ///
    /// Returns `None` (and does nothing) if the id is not present.
    pub fn replace<R>(&mut self, id: TaskId, updater: impl FnOnce(&mut Task) -> R) -> Option<R> {
        let slot = self.tasks.iter_mut().find(|t| t.id() == id)?;
        let mut updated = slot.clone();
        let out = updater(&mut updated);
        *slot = updated;
        Some(out)
    }

    /// Delete a record and hand it back to the caller.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id() == id)?;
        let task = self.tasks.remove(idx);
        debug!(task = %id, status = %task.status(), "removed task from store");
        Some(task)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Owned copy of every record, in store order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for task in &self.tasks {
            match task.status() {
                TaskStatus::Idle => counts.idle += 1,
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageData, SourceImage};

    fn push(store: &mut TaskStore, name: &str) -> TaskId {
        let id = store.allocate_id();
        let src = SourceImage::new(name, ImageData::new(vec![0u8], "image/png"));
        store.append([Task::new(id, src, None, 1)]);
        id
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut store = TaskStore::new();
        let a = push(&mut store, "a.png");
        let b = push(&mut store, "b.png");
        let c = push(&mut store, "c.png");

        let order: Vec<_> = store.iter().map(|t| t.id()).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn replace_on_missing_id_is_a_noop() {
        let mut store = TaskStore::new();
        let a = push(&mut store, "a.png");
        store.remove(a);

        let touched = store.replace(a, |t| t.set_prompt_override(Some("x".into())));
        assert!(touched.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn replace_updates_only_the_target() {
        let mut store = TaskStore::new();
        let a = push(&mut store, "a.png");
        let b = push(&mut store, "b.png");

        store.replace(b, |t| t.set_prompt_override(Some("only b".into())));

        assert_eq!(store.get(a).and_then(|t| t.prompt_override()), None);
        assert_eq!(store.get(b).and_then(|t| t.prompt_override()), Some("only b"));
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut store = TaskStore::new();
        let a = push(&mut store, "a.png");
        store.remove(a);
        let b = push(&mut store, "b.png");
        assert_ne!(a, b);
    }

    #[test]
    fn counts_by_status() {
        let mut store = TaskStore::new();
        let a = push(&mut store, "a.png");
        push(&mut store, "b.png");
        store.replace(a, |t| t.enqueue_for_start(2));

        let counts = store.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.idle, 1);
        assert_eq!(counts.total(), 2);
    }
}
