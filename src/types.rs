// src/types.rs

//! Image payload types shared by the queue, the workers and the transform
//! service.

use std::fmt;
use std::sync::Arc;

/// Raw image bytes plus their MIME type.
///
/// The bytes are reference counted: a task, the worker it was dispatched to
/// and any clone seeded from its result share one allocation, which is freed
/// when the last holder drops it.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl ImageData {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True if both values point at the same allocation.
    pub fn shares_bytes_with(&self, other: &ImageData) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

// Never dump image bytes into logs.
impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An input image together with the name it was supplied under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    pub data: ImageData,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, data: ImageData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// The source name with its final extension removed
    /// (`"cat.final.png"` -> `"cat.final"`).
    pub fn stem(&self) -> &str {
        strip_extension(&self.name)
    }
}

/// Strip the last `.ext` from a file name. Leading dots (hidden files) are
/// kept as part of the name.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
