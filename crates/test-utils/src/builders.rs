#![allow(dead_code)]

use std::time::Duration;

use imgbatch::config::{ConfigFile, LiveSettings, QueueSettings, RawConfigFile};
use imgbatch::types::{ImageData, SourceImage};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn prompt(mut self, template: &str) -> Self {
        self.config.queue.prompt_template = template.to_string();
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.config.queue.temperature = value;
        self
    }

    pub fn auto_retry(mut self, val: bool) -> Self {
        self.config.queue.auto_retry = val;
        self
    }

    pub fn concurrency(mut self, enabled: bool, max: usize) -> Self {
        self.config.queue.concurrency = enabled;
        self.config.queue.max_concurrency = max;
        self
    }

    pub fn stagger(mut self, val: bool) -> Self {
        self.config.queue.delay_between_dispatches = val;
        self
    }

    pub fn intervals_ms(mut self, debounce: u64, stagger: u64) -> Self {
        self.config.queue.dispatch_debounce_ms = debounce;
        self.config.queue.stagger_interval_ms = stagger;
        self
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.config.transform.endpoint = endpoint.to_string();
        self
    }

    /// The raw, unvalidated config.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `QueueSettings` used directly by runtime tests.
pub struct SettingsBuilder {
    settings: QueueSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: QueueSettings {
                prompt_template: "restyle {filename}".to_string(),
                ..QueueSettings::default()
            },
        }
    }

    pub fn prompt(mut self, template: &str) -> Self {
        self.settings.prompt_template = template.to_string();
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.settings.temperature = value;
        self
    }

    pub fn auto_retry(mut self, val: bool) -> Self {
        self.settings.auto_retry = val;
        self
    }

    pub fn concurrency(mut self, enabled: bool, max: usize) -> Self {
        self.settings.concurrency = enabled;
        self.settings.max_concurrency = max;
        self
    }

    pub fn stagger(mut self, val: bool) -> Self {
        self.settings.delay_between_dispatches = val;
        self
    }

    pub fn intervals(mut self, debounce: Duration, stagger: Duration) -> Self {
        self.settings.dispatch_debounce = debounce;
        self.settings.stagger_interval = stagger;
        self
    }

    pub fn build(self) -> QueueSettings {
        self.settings
    }

    pub fn live(self) -> LiveSettings {
        LiveSettings::new(self.settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `SourceImage`. Defaults to a PNG whose bytes are the name.
pub struct SourceBuilder {
    name: String,
    bytes: Vec<u8>,
    mime: String,
}

impl SourceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: name.as_bytes().to_vec(),
            mime: "image/png".to_string(),
        }
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.bytes = bytes.to_vec();
        self
    }

    pub fn mime(mut self, mime: &str) -> Self {
        self.mime = mime.to_string();
        self
    }

    pub fn build(self) -> SourceImage {
        SourceImage::new(self.name, ImageData::new(self.bytes, self.mime))
    }
}

/// Shorthand for `SourceBuilder::new(name).build()`.
pub fn png(name: &str) -> SourceImage {
    SourceBuilder::new(name).build()
}

/// One PNG source per name.
pub fn pngs(names: &[&str]) -> Vec<SourceImage> {
    names.iter().map(|n| png(n)).collect()
}
