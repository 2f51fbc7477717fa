// src/config/validate.rs

use crate::config::model::{ConfigFile, QueueSection, RawConfigFile, TransformSection};
use crate::errors::{ImgBatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ImgBatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.queue, raw.transform))
    }
}

/// Run every check against a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_queue(&cfg.queue)?;
    validate_transform(&cfg.transform)?;
    Ok(())
}

fn validate_queue(queue: &QueueSection) -> Result<()> {
    queue
        .to_settings()
        .check()
        .map_err(|msg| ImgBatchError::ConfigError(format!("[queue].{msg}")))
}

fn validate_transform(transform: &TransformSection) -> Result<()> {
    if transform.endpoint.trim().is_empty() {
        return Err(ImgBatchError::ConfigError(
            "[transform].endpoint must not be empty".to_string(),
        ));
    }

    if transform.model.trim().is_empty() {
        return Err(ImgBatchError::ConfigError(
            "[transform].model must not be empty".to_string(),
        ));
    }

    if transform.api_key_env.trim().is_empty() {
        return Err(ImgBatchError::ConfigError(
            "[transform].api_key_env must name an environment variable".to_string(),
        ));
    }

    if transform.request_timeout_secs == 0 {
        return Err(ImgBatchError::ConfigError(
            "[transform].request_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
