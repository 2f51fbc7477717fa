// src/transform/mod.rs

//! The remote image-transform collaborator.
//!
//! The queue treats the service as an opaque, possibly slow and possibly
//! flaky remote call. Production code uses [`gemini::GeminiTransformService`];
//! tests plug in scripted implementations of [`TransformService`].
//!
//! - [`credential`] supplies the API key at call time.
//! - [`gemini`] talks to the Gemini `generateContent` endpoint.

pub mod credential;
pub mod gemini;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::types::ImageData;

pub use credential::{CredentialProvider, EnvCredential, StaticCredential};
pub use gemini::GeminiTransformService;

/// One call to the transform service.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub images: Vec<ImageData>,
    pub prompt: String,
    pub temperature: f32,
    pub credential: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("API key was rejected by the service")]
    InvalidCredential,

    #[error("request failed: {0}")]
    Http(String),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no image in response: {0}")]
    NoImage(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Boxed future returned by [`TransformService::transform`].
pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ImageData, TransformError>> + Send + 'a>>;

/// Turns input images plus a prompt into one output image.
pub trait TransformService: Send + Sync {
    fn transform(&self, request: TransformRequest) -> TransformFuture<'_>;
}
