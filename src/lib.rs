// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod media;
pub mod queue;
pub mod transform;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, LiveSettings, load_raw_or_default};
use crate::engine::{CoreQueue, QueueRuntime, event_channel};
use crate::exec::{TransformBackend, WorkerContext};
use crate::fs::RealFileSystem;
use crate::media::{export_results, load_sources};
use crate::queue::{Task, TaskStatus};
use crate::transform::{CredentialProvider, EnvCredential, GeminiTransformService};
use crate::types::SourceImage;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, then CLI overrides, then validation)
/// - source loading
/// - queue core / runtime / transform backend
/// - Ctrl-C handling (first press stops dispatch)
/// - result export and the summary on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let mut raw = load_raw_or_default(&args.config)?;
    args.apply_overrides(&mut raw);
    let cfg = ConfigFile::try_from(raw)?;

    if cfg.queue.prompt_template.trim().is_empty() {
        bail!("no prompt given: pass --prompt or set [queue].prompt_template");
    }

    let fs = RealFileSystem;
    let sources = load_sources(&fs, &args.inputs)?;
    if sources.is_empty() {
        bail!("no input images found");
    }

    if args.dry_run {
        print_dry_run(&cfg, sources, args.paired);
        return Ok(());
    }

    let credentials = EnvCredential::new(cfg.transform.api_key_env.clone());
    if credentials.credential().is_none() {
        warn!(var = credentials.var(), "API key is not set; attempts fail until it is");
    }

    let settings = LiveSettings::new(cfg.queue_settings());
    let ctx = WorkerContext::new(
        Arc::new(GeminiTransformService::from_config(&cfg.transform)?),
        Arc::new(credentials),
        settings.clone(),
    );

    let (events_tx, events_rx) = event_channel();
    let backend = TransformBackend::new(ctx, events_tx.clone());
    let runtime = QueueRuntime::new(CoreQueue::with_system_clock(settings), events_rx, backend);
    let handle = runtime.handle(events_tx);
    let runtime_task = tokio::spawn(runtime.run());

    let ids = handle.enqueue(sources, args.paired).await?;
    let queued = handle.start().await?;
    info!(tasks = ids.len(), queued, "run started");

    // Ctrl-C → cooperative stop; in-flight tasks still finish.
    let ctrl_c = {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received; waiting for in-flight tasks");
            if let Err(e) = handle.stop().await {
                debug!(error = %e, "stop after interrupt failed");
            }
        })
    };

    handle.wait_until_settled().await?;
    ctrl_c.abort();

    let tasks = handle.snapshot().await?;
    let written = export_results(&fs, &tasks, &args.output)?;
    print_summary(&tasks, written.len(), &args.output);

    handle.shutdown().await?;
    runtime_task.await??;

    check_outcome(&tasks)
}

/// Error if any task failed, or was left unfinished because the run was
/// interrupted.
fn check_outcome(tasks: &[Task]) -> Result<()> {
    let failed = tasks
        .iter()
        .filter(|t| t.status() == TaskStatus::Failed)
        .count();
    let unfinished = tasks.iter().filter(|t| !t.status().is_terminal()).count();

    match (failed, unfinished) {
        (0, 0) => Ok(()),
        (failed, 0) => bail!("{failed} of {} task(s) failed", tasks.len()),
        (0, unfinished) => bail!("{unfinished} of {} task(s) did not finish", tasks.len()),
        (failed, unfinished) => bail!(
            "{failed} of {} task(s) failed and {unfinished} did not finish",
            tasks.len()
        ),
    }
}

/// Print the effective settings and the tasks a run would create.
fn print_dry_run(cfg: &ConfigFile, sources: Vec<SourceImage>, paired: bool) {
    let settings = cfg.queue_settings();
    println!("imgbatch dry-run");
    println!("  prompt_template = {:?}", settings.prompt_template);
    println!("  temperature = {}", settings.temperature);
    println!("  attempts per task = {}", settings.attempt_budget());
    println!("  concurrency ceiling = {}", settings.concurrency_ceiling());
    println!("  dispatch interval = {:?}", settings.dispatch_interval());
    println!("  model = {}", cfg.transform.model);
    println!();

    let mut core = CoreQueue::with_system_clock(LiveSettings::new(settings));
    core.enqueue(sources, paired);

    println!("tasks ({}):", core.store().len());
    for task in core.store().iter() {
        match task.secondary() {
            Some(second) => println!("  - {}: {} + {}", task.id(), task.primary().name, second.name),
            None => println!("  - {}: {}", task.id(), task.primary().name),
        }
    }

    debug!("dry-run complete (no service calls)");
}

fn print_summary(tasks: &[Task], exported: usize, output: &Path) {
    for task in tasks {
        let attempts = task.attempts();
        match task.status() {
            TaskStatus::Completed => {
                println!("  ok      {} {} ({attempts} attempt(s))", task.id(), task.primary().name)
            }
            TaskStatus::Failed => println!(
                "  failed  {} {} ({attempts} attempt(s)): {}",
                task.id(),
                task.primary().name,
                task.error().unwrap_or("unknown error")
            ),
            status => println!("  {status:<7} {} {}", task.id(), task.primary().name),
        }
    }
    println!("{exported} result(s) written to {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TaskId;
    use crate::types::ImageData;

    fn task(raw: u64) -> Task {
        let image = ImageData::new(vec![0u8], "image/png");
        let mut task = Task::new(TaskId::from_raw(raw), SourceImage::new("a.png", image), None, 0);
        task.enqueue_for_start(1);
        task
    }

    fn finished(raw: u64, ok: bool) -> Task {
        let mut task = task(raw);
        task.mark_processing();
        if ok {
            task.complete(ImageData::new(vec![1u8], "image/png"), 1);
        } else {
            task.fail("boom".into(), 3);
        }
        task
    }

    #[test]
    fn all_completed_is_success() {
        assert!(check_outcome(&[finished(1, true), finished(2, true)]).is_ok());
    }

    #[test]
    fn failed_task_is_an_error() {
        let err = check_outcome(&[finished(1, true), finished(2, false)]).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 task(s) failed");
    }

    #[test]
    fn interrupted_run_with_pending_work_is_an_error() {
        let err = check_outcome(&[finished(1, true), task(2)]).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 task(s) did not finish");

        let err = check_outcome(&[finished(1, false), task(2), task(3)]).unwrap_err();
        assert!(err.to_string().contains("failed and 2 did not finish"));
    }
}
