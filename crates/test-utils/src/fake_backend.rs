use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};

use imgbatch::engine::{QueueEvent, WorkerOutcome};
use imgbatch::errors::Result;
use imgbatch::exec::WorkerBackend;
use imgbatch::queue::{DispatchedTask, TaskId};
use imgbatch::types::ImageData;

/// A fake backend that:
/// - records which tasks were dispatched, in order
/// - never finishes a task on its own; the test completes tasks through the
///   paired [`BackendProbe`].
pub struct ControllableBackend {
    dispatched: Arc<Mutex<Vec<DispatchedTask>>>,
    count_tx: watch::Sender<usize>,
    stop_rx: Arc<Mutex<Option<watch::Receiver<bool>>>>,
}

/// Test-side view of a `ControllableBackend`.
#[derive(Clone)]
pub struct BackendProbe {
    dispatched: Arc<Mutex<Vec<DispatchedTask>>>,
    count_rx: watch::Receiver<usize>,
    stop_rx: Arc<Mutex<Option<watch::Receiver<bool>>>>,
    events: mpsc::Sender<QueueEvent>,
}

impl ControllableBackend {
    /// `events` is the runtime's event sender; the probe completes tasks
    /// through it.
    pub fn new(events: mpsc::Sender<QueueEvent>) -> (Self, BackendProbe) {
        let dispatched = Arc::new(Mutex::new(Vec::new()));
        let stop_rx = Arc::new(Mutex::new(None));
        let (count_tx, count_rx) = watch::channel(0);
        let backend = Self {
            dispatched: Arc::clone(&dispatched),
            count_tx,
            stop_rx: Arc::clone(&stop_rx),
        };
        let probe = BackendProbe {
            dispatched,
            count_rx,
            stop_rx,
            events,
        };
        (backend, probe)
    }
}

impl WorkerBackend for ControllableBackend {
    fn spawn_worker(
        &mut self,
        task: DispatchedTask,
        stop: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let len = {
            let mut guard = self.dispatched.lock().unwrap();
            guard.push(task);
            guard.len()
        };
        *self.stop_rx.lock().unwrap() = Some(stop);
        self.count_tx.send_replace(len);
        Box::pin(async { Ok(()) })
    }
}

impl BackendProbe {
    pub fn dispatched(&self) -> Vec<DispatchedTask> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatched_ids(&self) -> Vec<TaskId> {
        self.dispatched.lock().unwrap().iter().map(|t| t.id).collect()
    }

    pub fn dispatch_count(&self) -> usize {
        *self.count_rx.borrow()
    }

    /// Wait until at least `n` dispatches have happened in total.
    pub async fn wait_for_dispatches(&self, n: usize) {
        let mut rx = self.count_rx.clone();
        rx.wait_for(|count| *count >= n)
            .await
            .expect("backend dropped");
    }

    /// The stop flag as the most recently dispatched worker would see it.
    pub fn stop_flag(&self) -> Option<bool> {
        self.stop_rx.lock().unwrap().as_ref().map(|rx| *rx.borrow())
    }

    /// Report an outcome for `id` as if its worker had finished.
    pub async fn complete(&self, id: TaskId, outcome: WorkerOutcome) {
        self.events
            .send(QueueEvent::WorkerFinished { id, outcome })
            .await
            .expect("runtime gone");
    }

    pub async fn succeed(&self, id: TaskId, result: &[u8]) {
        self.complete(
            id,
            WorkerOutcome::Succeeded {
                result: ImageData::new(result.to_vec(), "image/png"),
                attempts: 1,
            },
        )
        .await;
    }

    pub async fn fail(&self, id: TaskId, error: &str) {
        self.complete(
            id,
            WorkerOutcome::Failed {
                error: error.to_string(),
                attempts: 1,
            },
        )
        .await;
    }
}
