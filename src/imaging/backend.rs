//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the transform capability the resolver calls
//! on a cache miss: source bytes in, encoded artifact bytes out.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests substitute a recording mock.

use super::params::ConvertParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),
    #[error("Failed to encode {format}: {message}")]
    Encode { format: String, message: String },
}

/// Trait for image processing backends.
///
/// Implementations must be deterministic: the same source bytes and
/// parameters always produce the same output bytes. Concurrent generation of
/// one cache key relies on this to make duplicate writes harmless.
pub trait ImageBackend: Send + Sync {
    /// Decode `source`, apply the conversion and encode to `params.format`.
    fn convert(&self, source: &[u8], params: &ConvertParams) -> Result<Vec<u8>, BackendError>;
}
