// src/config/mod.rs

//! Configuration loading and validation for imgbatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate value ranges (`validate.rs`).
//! - Share the queue settings live with the runtime and workers
//!   (`settings.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_from_path, load_or_default,
    load_raw_or_default,
};
pub use model::{ConfigFile, QueueSection, RawConfigFile, TransformSection};
pub use settings::{LiveSettings, QueueSettings};
pub use validate::validate_config;
