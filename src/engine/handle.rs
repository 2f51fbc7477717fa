// src/engine/handle.rs

//! Async front door to a running queue.

use tokio::sync::{mpsc, oneshot, watch};

use crate::config::{LiveSettings, QueueSettings};
use crate::queue::{QueueError, Task, TaskId};
use crate::types::SourceImage;

use super::{QueueCommand, QueueEvent, QueueProgress};

/// Cloneable handle for issuing lifecycle operations to a `QueueRuntime`.
///
/// Every method round-trips through the runtime, so operations from all
/// handles are applied one at a time, in the order they arrive.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    events: mpsc::Sender<QueueEvent>,
    progress: watch::Receiver<QueueProgress>,
    settings: LiveSettings,
}

impl QueueHandle {
    pub(crate) fn new(
        events: mpsc::Sender<QueueEvent>,
        progress: watch::Receiver<QueueProgress>,
        settings: LiveSettings,
    ) -> Self {
        Self {
            events,
            progress,
            settings,
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> QueueCommand,
    ) -> Result<T, QueueError> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(QueueEvent::Command(make(tx)))
            .await
            .map_err(|_| QueueError::QueueClosed)?;
        rx.await.map_err(|_| QueueError::QueueClosed)
    }

    /// Add images as new idle tasks. Returns their ids in order.
    pub async fn enqueue(&self, images: Vec<SourceImage>, paired: bool) -> Result<Vec<TaskId>, QueueError> {
        self.request(|reply| QueueCommand::Enqueue {
            images,
            paired,
            reply,
        })
        .await
    }

    /// Queue every idle and failed task and start dispatching.
    pub async fn start(&self) -> Result<usize, QueueError> {
        self.request(|reply| QueueCommand::Start { reply }).await
    }

    pub async fn stop(&self) -> Result<(), QueueError> {
        self.request(|reply| QueueCommand::Stop { reply }).await
    }

    pub async fn regenerate(&self, id: TaskId) -> Result<(), QueueError> {
        self.request(|reply| QueueCommand::Regenerate { id, reply })
            .await?
    }

    pub async fn clone_from_result(&self, id: TaskId, inherit_prompt: bool) -> Result<TaskId, QueueError> {
        self.request(|reply| QueueCommand::CloneFromResult {
            id,
            inherit_prompt,
            reply,
        })
        .await?
    }

    pub async fn remove(&self, id: TaskId) -> Result<Task, QueueError> {
        self.request(|reply| QueueCommand::Remove { id, reply })
            .await?
    }

    pub async fn set_prompt_override(&self, id: TaskId, prompt: Option<String>) -> Result<(), QueueError> {
        self.request(|reply| QueueCommand::SetPromptOverride { id, prompt, reply })
            .await?
    }

    /// Replace the live settings and wake the runtime so a raised ceiling
    /// takes effect immediately. Out-of-range values are rejected and the
    /// current settings stay in place.
    pub async fn update_settings(&self, settings: QueueSettings) -> Result<(), QueueError> {
        settings.check().map_err(QueueError::InvalidSettings)?;
        self.request(|reply| QueueCommand::UpdateSettings { settings, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<Vec<Task>, QueueError> {
        self.request(|reply| QueueCommand::Snapshot { reply }).await
    }

    pub fn progress(&self) -> QueueProgress {
        *self.progress.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueProgress> {
        self.progress.clone()
    }

    /// Wait until no run is active and no worker is in flight.
    pub async fn wait_until_settled(&self) -> Result<QueueProgress, QueueError> {
        let mut rx = self.progress.clone();
        let progress = rx
            .wait_for(QueueProgress::is_settled)
            .await
            .map_err(|_| QueueError::QueueClosed)?;
        Ok(*progress)
    }

    /// Ask the runtime loop to exit.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        self.events
            .send(QueueEvent::ShutdownRequested)
            .await
            .map_err(|_| QueueError::QueueClosed)
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }
}
