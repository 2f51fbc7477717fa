// src/exec/mod.rs

//! Worker execution layer.
//!
//! This module is responsible for actually running dispatched tasks against
//! the transform service and reporting back to the runtime via
//! `QueueEvent`s.
//!
//! - [`prompt`] resolves the prompt a task is sent with.
//! - [`worker`] runs one task, including retries and backoff.
//! - [`backend`] provides the `WorkerBackend` trait and the concrete
//!   `TransformBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod prompt;
pub mod worker;

pub use backend::{TransformBackend, WorkerBackend};
pub use prompt::resolve_prompt;
pub use worker::{RETRY_BACKOFF, WorkerContext, run_worker};
