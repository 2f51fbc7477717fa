use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use imgbatch::transform::{TransformError, TransformFuture, TransformRequest, TransformService};
use imgbatch::types::ImageData;

/// What the fake saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
    pub credential: String,
    pub images: Vec<ImageData>,
}

/// A fake transform service that:
/// - answers calls from a script, in call order, and succeeds once the
///   script runs out
/// - records every call it receives
/// - optionally holds each call open until the test releases it
/// - tracks the highest number of calls in flight at once
#[derive(Default)]
pub struct ScriptedTransform {
    script: Mutex<VecDeque<Result<ImageData, TransformError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransform {
    /// Always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers with `outcomes` first, then succeeds.
    pub fn with_script(outcomes: Vec<Result<ImageData, TransformError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    /// Fails `n` times with a transient HTTP error, then succeeds.
    pub fn failing_times(n: usize) -> Self {
        Self::with_script(
            (0..n)
                .map(|i| Err(TransformError::Http(format!("flaky #{}", i + 1))))
                .collect(),
        )
    }

    /// Every call blocks until [`ScriptedTransform::release`] grants it a
    /// permit.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// The image a successful unscripted call returns: `result-<n>` where `n`
/// is the 1-based call number.
pub fn default_result(call: usize) -> ImageData {
    ImageData::new(format!("result-{call}").into_bytes(), "image/png")
}

impl TransformService for ScriptedTransform {
    fn transform(&self, request: TransformRequest) -> TransformFuture<'_> {
        Box::pin(async move {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(RecordedCall {
                    prompt: request.prompt.clone(),
                    temperature: request.temperature,
                    credential: request.credential.clone(),
                    images: request.images.clone(),
                });
                calls.len()
            };

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            let scripted = self.script.lock().unwrap().pop_front();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            scripted.unwrap_or_else(|| Ok(default_result(call)))
        })
    }
}
