// src/engine/event_handlers.rs

//! Applying commands and worker completions to the core.

use tracing::debug;

use crate::exec::WorkerBackend;
use crate::queue::TaskId;

use super::runtime::QueueRuntime;
use super::{QueueCommand, WorkerOutcome};

impl<B: WorkerBackend> QueueRuntime<B> {
    pub(super) fn handle_command(&mut self, command: QueueCommand) {
        match command {
            QueueCommand::Enqueue {
                images,
                paired,
                reply,
            } => {
                let ids = self.core.enqueue(images, paired);
                self.respond(reply, ids);
            }
            QueueCommand::Start { reply } => {
                let moved = self.core.start();
                self.respond(reply, moved);
            }
            QueueCommand::Stop { reply } => {
                self.core.stop();
                self.respond(reply, ());
            }
            QueueCommand::Regenerate { id, reply } => {
                let res = self.core.regenerate(id);
                self.respond(reply, res);
            }
            QueueCommand::CloneFromResult {
                id,
                inherit_prompt,
                reply,
            } => {
                let res = self.core.clone_from_result(id, inherit_prompt);
                self.respond(reply, res);
            }
            QueueCommand::Remove { id, reply } => {
                let res = self.core.remove(id);
                self.respond(reply, res);
            }
            QueueCommand::SetPromptOverride { id, prompt, reply } => {
                let res = self.core.set_prompt_override(id, prompt);
                self.respond(reply, res);
            }
            QueueCommand::UpdateSettings { settings, reply } => {
                debug!(?settings, "queue settings updated");
                self.core.settings().replace(settings);
                self.respond(reply, ());
            }
            QueueCommand::Snapshot { reply } => {
                let tasks = self.core.store().snapshot();
                self.respond(reply, tasks);
            }
        }
    }

    pub(super) fn handle_worker_finished(&mut self, id: TaskId, outcome: WorkerOutcome) {
        self.core.apply_outcome(id, outcome);
        self.publish();
    }
}
