// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::queue::QueueError;

#[derive(Error, Debug)]
pub enum ImgBatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, ImgBatchError>;
