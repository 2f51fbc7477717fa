#![allow(dead_code)]

pub use imgbatch_test_utils::builders;
pub use imgbatch_test_utils::fake_backend::{BackendProbe, ControllableBackend};
pub use imgbatch_test_utils::fake_transform::{RecordedCall, ScriptedTransform, default_result};
pub use imgbatch_test_utils::{
    ControlledQueue, ScriptedQueue, init_tracing, spawn_controlled, spawn_scripted, with_timeout,
};

use imgbatch::queue::{Task, TaskId};

/// Find a task in a snapshot by id.
pub fn task_by_id(tasks: &[Task], id: TaskId) -> &Task {
    tasks
        .iter()
        .find(|t| t.id() == id)
        .unwrap_or_else(|| panic!("task {id} missing from snapshot"))
}
