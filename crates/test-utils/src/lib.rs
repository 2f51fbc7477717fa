pub mod builders;
pub mod fake_backend;
pub mod fake_transform;

use std::sync::{Arc, Once};

use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

use imgbatch::config::{LiveSettings, QueueSettings};
use imgbatch::engine::{CoreQueue, ManualClock, QueueHandle, QueueRuntime, event_channel};
use imgbatch::exec::{TransformBackend, WorkerContext};
use imgbatch::transform::StaticCredential;

use crate::fake_backend::{BackendProbe, ControllableBackend};
use crate::fake_transform::ScriptedTransform;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
///
/// Under a paused clock the timeout is virtual, so a hung test fails fast.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// A running queue whose workers are driven by hand through `probe`.
pub struct ControlledQueue {
    pub handle: QueueHandle,
    pub probe: BackendProbe,
    pub clock: ManualClock,
    pub runtime: JoinHandle<imgbatch::errors::Result<()>>,
}

/// Spawn a runtime on a `ControllableBackend` with a manual clock at 1000ms.
pub fn spawn_controlled(settings: QueueSettings) -> ControlledQueue {
    let clock = ManualClock::new(1_000);
    let core = CoreQueue::new(LiveSettings::new(settings), Box::new(clock.clone()));
    let (events_tx, events_rx) = event_channel();
    let (backend, probe) = ControllableBackend::new(events_tx.clone());
    let runtime = QueueRuntime::new(core, events_rx, backend);
    let handle = runtime.handle(events_tx);
    ControlledQueue {
        handle,
        probe,
        clock,
        runtime: tokio::spawn(runtime.run()),
    }
}

/// A running queue with real workers calling a `ScriptedTransform`.
pub struct ScriptedQueue {
    pub handle: QueueHandle,
    pub service: Arc<ScriptedTransform>,
    pub credentials: StaticCredential,
    pub clock: ManualClock,
    pub runtime: JoinHandle<imgbatch::errors::Result<()>>,
}

/// Spawn a runtime on the production `TransformBackend`, backed by `service`
/// and a credential of `"test-key"`.
pub fn spawn_scripted(settings: QueueSettings, service: ScriptedTransform) -> ScriptedQueue {
    let clock = ManualClock::new(1_000);
    let settings = LiveSettings::new(settings);
    let service = Arc::new(service);
    let credentials = StaticCredential::new("test-key");
    let ctx = WorkerContext::new(service.clone(), Arc::new(credentials.clone()), settings.clone());

    let core = CoreQueue::new(settings, Box::new(clock.clone()));
    let (events_tx, events_rx) = event_channel();
    let backend = TransformBackend::new(ctx, events_tx.clone());
    let runtime = QueueRuntime::new(core, events_rx, backend);
    let handle = runtime.handle(events_tx);
    ScriptedQueue {
        handle,
        service,
        credentials,
        clock,
        runtime: tokio::spawn(runtime.run()),
    }
}
