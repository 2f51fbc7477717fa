// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::config::settings::QueueSettings;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [queue]
/// prompt_template = "Restyle {filename} as a watercolor painting"
/// temperature = 0.4
/// auto_retry = true
/// delay_between_dispatches = false
/// concurrency = true
/// max_concurrency = 3
///
/// [transform]
/// model = "gemini-2.5-flash-image-preview"
/// api_key_env = "GEMINI_API_KEY"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Queue behaviour from `[queue]`.
    #[serde(default)]
    pub queue: QueueSection,

    /// Remote service settings from `[transform]`.
    #[serde(default)]
    pub transform: TransformSection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub queue: QueueSection,
    pub transform: TransformSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(queue: QueueSection, transform: TransformSection) -> Self {
        Self { queue, transform }
    }

    /// The queue settings the runtime starts with.
    pub fn queue_settings(&self) -> QueueSettings {
        self.queue.to_settings()
    }
}

/// `[queue]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSection {
    /// Prompt used for tasks without their own override. `{filename}` is
    /// replaced with the source name minus its extension.
    #[serde(default)]
    pub prompt_template: String,

    /// Sampling temperature passed to the service, `0.0..=1.0`.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Allow up to three attempts per task instead of one.
    #[serde(default = "default_true")]
    pub auto_retry: bool,

    /// Space successive dispatches by `stagger_interval_ms` instead of the
    /// short debounce.
    #[serde(default)]
    pub delay_between_dispatches: bool,

    /// Allow more than one task in flight.
    #[serde(default = "default_true")]
    pub concurrency: bool,

    /// Ceiling on in-flight tasks when `concurrency` is enabled.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_dispatch_debounce_ms")]
    pub dispatch_debounce_ms: u64,

    #[serde(default = "default_stagger_interval_ms")]
    pub stagger_interval_ms: u64,
}

impl QueueSection {
    pub fn to_settings(&self) -> QueueSettings {
        QueueSettings {
            prompt_template: self.prompt_template.clone(),
            temperature: self.temperature,
            auto_retry: self.auto_retry,
            delay_between_dispatches: self.delay_between_dispatches,
            concurrency: self.concurrency,
            max_concurrency: self.max_concurrency,
            dispatch_debounce: Duration::from_millis(self.dispatch_debounce_ms),
            stagger_interval: Duration::from_millis(self.stagger_interval_ms),
        }
    }
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            prompt_template: String::new(),
            temperature: default_temperature(),
            auto_retry: true,
            delay_between_dispatches: false,
            concurrency: true,
            max_concurrency: default_max_concurrency(),
            dispatch_debounce_ms: default_dispatch_debounce_ms(),
            stagger_interval_ms: default_stagger_interval_ms(),
        }
    }
}

/// `[transform]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable the API key is read from, at call time.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl TransformSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TransformSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_concurrency() -> usize {
    3
}

fn default_dispatch_debounce_ms() -> u64 {
    100
}

fn default_stagger_interval_ms() -> u64 {
    3000
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}
