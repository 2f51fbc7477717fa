// src/config/settings.rs

//! Live queue settings.
//!
//! Workers and the runtime read settings at the moment of use rather than
//! capturing them at enqueue time, so a change made mid-run (for example a
//! new temperature) applies to the next retry of an in-flight task.

use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Attempts per task when auto-retry is enabled.
pub const AUTO_RETRY_ATTEMPTS: u32 = 3;

/// The settings the queue core consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    pub prompt_template: String,
    pub temperature: f32,
    pub auto_retry: bool,
    pub delay_between_dispatches: bool,
    pub concurrency: bool,
    pub max_concurrency: usize,
    pub dispatch_debounce: Duration,
    pub stagger_interval: Duration,
}

impl QueueSettings {
    /// Maximum number of tasks allowed in `Processing` at once.
    pub fn concurrency_ceiling(&self) -> usize {
        if self.concurrency {
            self.max_concurrency.max(1)
        } else {
            1
        }
    }

    /// Number of transform attempts a worker may make for one task.
    pub fn attempt_budget(&self) -> u32 {
        if self.auto_retry { AUTO_RETRY_ATTEMPTS } else { 1 }
    }

    /// Range checks shared by config validation and live updates. The error
    /// names the offending field as it appears in `[queue]`.
    pub fn check(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within 0.0..=1.0 (got {})",
                self.temperature
            ));
        }

        if self.max_concurrency == 0 {
            return Err("max_concurrency must be >= 1 (got 0)".to_string());
        }

        if self.stagger_interval < self.dispatch_debounce {
            return Err(format!(
                "stagger_interval_ms ({}) must not be shorter than dispatch_debounce_ms ({})",
                self.stagger_interval.as_millis(),
                self.dispatch_debounce.as_millis()
            ));
        }

        Ok(())
    }

    /// Pause between two successive dispatch decisions.
    pub fn dispatch_interval(&self) -> Duration {
        if self.delay_between_dispatches {
            self.stagger_interval
        } else {
            self.dispatch_debounce
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        crate::config::model::QueueSection::default().to_settings()
    }
}

/// Shared, always-current settings cell.
///
/// Cloning is cheap; every clone sees the same value.
#[derive(Debug, Clone, Default)]
pub struct LiveSettings {
    inner: Arc<RwLock<QueueSettings>>,
}

impl LiveSettings {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings.
    pub fn current(&self) -> QueueSettings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, settings: QueueSettings) {
        self.update(|current| *current = settings);
    }

    pub fn update(&self, f: impl FnOnce(&mut QueueSettings)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}
