// src/exec/worker.rs

//! Carries one dispatched task from `Processing` to an outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::LiveSettings;
use crate::engine::WorkerOutcome;
use crate::exec::prompt::resolve_prompt;
use crate::queue::DispatchedTask;
use crate::transform::{CredentialProvider, TransformError, TransformRequest, TransformService};
use crate::types::ImageData;

/// Pause between two attempts of the same task.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(1500);

/// Collaborators a worker reads at the moment of use.
#[derive(Clone)]
pub struct WorkerContext {
    pub service: Arc<dyn TransformService>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub settings: LiveSettings,
}

impl WorkerContext {
    pub fn new(
        service: Arc<dyn TransformService>,
        credentials: Arc<dyn CredentialProvider>,
        settings: LiveSettings,
    ) -> Self {
        Self {
            service,
            credentials,
            settings,
        }
    }
}

/// Run one task to an outcome.
///
/// - The prompt is resolved once, when the worker starts.
/// - Temperature, credential and the attempt budget are read live, so a
///   setting changed mid-run applies to this task's remaining attempts.
/// - Between attempts the worker waits [`RETRY_BACKOFF`]; if the stop flag is
///   set before or during that wait, no further attempt is made.
///
/// Never fails: every error ends up in `WorkerOutcome::Failed`.
pub async fn run_worker(
    task: DispatchedTask,
    ctx: WorkerContext,
    mut stop: watch::Receiver<bool>,
) -> WorkerOutcome {
    let template = ctx.settings.current().prompt_template;
    let prompt = resolve_prompt(task.prompt_override.as_deref(), &template, task.primary.stem());
    let images = task.images();

    let mut attempts = 0;
    let error = loop {
        attempts += 1;
        let budget = ctx.settings.current().attempt_budget();
        debug!(task = %task.id, attempt = attempts, budget, "calling transform service");

        let err = match attempt(&ctx, &images, &prompt).await {
            Ok(result) => {
                info!(task = %task.id, attempts, "transform succeeded");
                return WorkerOutcome::Succeeded { result, attempts };
            }
            Err(err) => err,
        };
        warn!(task = %task.id, attempt = attempts, budget, error = %err, "transform attempt failed");

        if attempts >= budget {
            break err;
        }

        if *stop.borrow() {
            info!(task = %task.id, "stop requested; not retrying");
            break err;
        }

        tokio::select! {
            _ = tokio::time::sleep(RETRY_BACKOFF) => {}
            _ = stop_requested(&mut stop) => {
                info!(task = %task.id, "stop requested during backoff; not retrying");
                break err;
            }
        }
    };

    WorkerOutcome::Failed {
        error: error.to_string(),
        attempts,
    }
}

async fn attempt(
    ctx: &WorkerContext,
    images: &[ImageData],
    prompt: &str,
) -> Result<ImageData, TransformError> {
    let credential = ctx
        .credentials
        .credential()
        .ok_or(TransformError::MissingCredential)?;

    let request = TransformRequest {
        images: images.to_vec(),
        prompt: prompt.to_string(),
        temperature: ctx.settings.current().temperature,
        credential,
    };

    ctx.service.transform(request).await
}

/// Resolves once the stop flag is set. Never resolves if the runtime is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
