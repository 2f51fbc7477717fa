// tests/lifecycle.rs

mod common;
use crate::common::builders::{SettingsBuilder, png, pngs};
use crate::common::{ScriptedTransform, default_result, init_tracing, spawn_scripted, task_by_id, with_timeout};

use std::error::Error;
use std::time::Duration;

use imgbatch::queue::{QueueError, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn regenerate_keeps_id_and_replaces_result() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new());

    let ids = q.handle.enqueue(vec![png("a.png")], false).await?;
    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;
    let first = q.handle.snapshot().await?;
    assert_eq!(first[0].result(), Some(&default_result(1)));
    assert!(!first[0].is_retry_derived());

    q.handle.regenerate(ids[0]).await?;
    with_timeout(q.handle.wait_until_settled()).await?;

    let tasks = q.handle.snapshot().await?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id(), ids[0]);
    assert_eq!(tasks[0].status(), TaskStatus::Completed);
    assert_eq!(tasks[0].result(), Some(&default_result(2)));
    assert!(tasks[0].is_retry_derived());
    assert!(tasks[0].last_activity() >= first[0].last_activity());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn regenerate_of_busy_task_is_refused() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new().gated());

    let ids = q.handle.enqueue(vec![png("a.png")], false).await?;
    q.handle.start().await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let err = q.handle.regenerate(ids[0]).await.unwrap_err();
    assert_eq!(err, QueueError::TaskBusy(ids[0], TaskStatus::Processing));

    q.service.release(1);
    with_timeout(q.handle.wait_until_settled()).await?;
    assert_eq!(q.service.call_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clone_from_result_leaves_source_untouched() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new());

    let ids = q.handle.enqueue(vec![png("cat.png")], false).await?;
    q.handle
        .set_prompt_override(ids[0], Some("make it a lion".to_string()))
        .await?;
    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;
    let before = q.handle.snapshot().await?;

    let clone_id = q.handle.clone_from_result(ids[0], true).await?;
    assert_ne!(clone_id, ids[0]);

    let tasks = q.handle.snapshot().await?;
    let source = task_by_id(&tasks, ids[0]);
    let clone = task_by_id(&tasks, clone_id);
    assert_eq!(source.status(), before[0].status());
    assert_eq!(source.result(), before[0].result());
    assert_eq!(source.last_activity(), before[0].last_activity());
    assert_eq!(clone.status(), TaskStatus::Idle);
    assert_eq!(clone.primary().name, "cat-edit.png");
    assert_eq!(&clone.primary().data, source.result().unwrap());
    assert_eq!(clone.prompt_override(), Some("make it a lion"));

    // Only the clone is picked up by the next run.
    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;
    let calls = q.service.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].images, vec![default_result(1)]);
    assert_eq!(calls[1].prompt, "make it a lion");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clone_without_inheriting_prompt_uses_template() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new());

    let ids = q.handle.enqueue(vec![png("cat.png")], false).await?;
    q.handle
        .set_prompt_override(ids[0], Some("make it a lion".to_string()))
        .await?;
    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;

    let clone_id = q.handle.clone_from_result(ids[0], false).await?;
    let tasks = q.handle.snapshot().await?;
    assert_eq!(task_by_id(&tasks, clone_id).prompt_override(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clone_requires_a_completed_result() -> TestResult {
    init_tracing();
    let q = spawn_scripted(
        SettingsBuilder::new().auto_retry(false).build(),
        ScriptedTransform::failing_times(1),
    );

    let ids = q.handle.enqueue(pngs(&["a.png", "b.png"]), false).await?;
    assert_eq!(
        q.handle.clone_from_result(ids[1], false).await,
        Err(QueueError::NoResult(ids[1]))
    );

    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;
    let tasks = q.handle.snapshot().await?;
    let failed = tasks
        .iter()
        .find(|t| t.status() == TaskStatus::Failed)
        .expect("one task failed");
    assert_eq!(
        q.handle.clone_from_result(failed.id(), false).await,
        Err(QueueError::NoResult(failed.id()))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn removing_an_in_flight_task_drops_its_write_back() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new().gated());

    let ids = q.handle.enqueue(pngs(&["a.png", "b.png"]), false).await?;
    q.handle.start().await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(q.service.in_flight(), 2);

    let removed = q.handle.remove(ids[0]).await?;
    assert_eq!(removed.status(), TaskStatus::Processing);

    q.service.release(2);
    with_timeout(q.handle.wait_until_settled()).await?;

    let tasks = q.handle.snapshot().await?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id(), ids[1]);
    assert_eq!(tasks[0].status(), TaskStatus::Completed);

    // The runtime is still serving requests.
    assert_eq!(
        q.handle.remove(ids[0]).await.unwrap_err(),
        QueueError::TaskNotFound(ids[0])
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_ids_are_reported() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new());

    let ids = q.handle.enqueue(vec![png("a.png")], false).await?;
    q.handle.remove(ids[0]).await?;

    assert_eq!(
        q.handle.regenerate(ids[0]).await,
        Err(QueueError::TaskNotFound(ids[0]))
    );
    assert_eq!(
        q.handle.set_prompt_override(ids[0], Some("x".into())).await,
        Err(QueueError::TaskNotFound(ids[0]))
    );
    assert_eq!(
        q.handle.clone_from_result(ids[0], true).await,
        Err(QueueError::TaskNotFound(ids[0]))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn new_ids_are_never_reused() -> TestResult {
    init_tracing();
    let q = spawn_scripted(SettingsBuilder::new().build(), ScriptedTransform::new());

    let first = q.handle.enqueue(pngs(&["a.png", "b.png"]), false).await?;
    q.handle.remove(first[1]).await?;
    let second = q.handle.enqueue(pngs(&["c.png"]), false).await?;

    assert!(!first.contains(&second[0]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_requeues_failed_tasks_only() -> TestResult {
    init_tracing();
    let q = spawn_scripted(
        SettingsBuilder::new().auto_retry(false).concurrency(false, 1).build(),
        ScriptedTransform::failing_times(1),
    );

    let ids = q.handle.enqueue(pngs(&["a.png", "b.png"]), false).await?;
    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;
    let tasks = q.handle.snapshot().await?;
    assert_eq!(task_by_id(&tasks, ids[0]).status(), TaskStatus::Failed);
    assert_eq!(task_by_id(&tasks, ids[1]).status(), TaskStatus::Completed);

    let queued = q.handle.start().await?;
    assert_eq!(queued, 1);
    with_timeout(q.handle.wait_until_settled()).await?;

    let tasks = q.handle.snapshot().await?;
    assert!(tasks.iter().all(|t| t.status() == TaskStatus::Completed));
    assert_eq!(q.service.call_count(), 3);
    Ok(())
}
