//! Pure Rust image processing backend. No system libraries, everything is
//! statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::load_from_memory` (format sniffed from content) |
//! | Transform | [`operations::apply`](super::operations::apply) |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` with the configured quality |
//! | Encode other formats | `DynamicImage::write_to` (lossless WebP, PNG, TIFF, GIF) |

use super::backend::{BackendError, ImageBackend};
use super::operations::apply;
use super::params::{ConvertParams, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Convert pixel layout to one the target encoder accepts.
///
/// JPEG has no alpha channel; the WebP and GIF encoders only take 8-bit RGB(A).
fn prepare_for(img: DynamicImage, format: ImageFormat) -> DynamicImage {
    match format {
        ImageFormat::Jpeg
            if !matches!(img, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) =>
        {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        ImageFormat::WebP | ImageFormat::Gif
            if !matches!(img, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) =>
        {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        _ => img,
    }
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value());
            img.write_with_encoder(encoder)
        }
        other => img.write_to(&mut Cursor::new(&mut buf), other),
    };
    result.map_err(|e| BackendError::Encode {
        format: format!("{format:?}"),
        message: e.to_string(),
    })?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn convert(&self, source: &[u8], params: &ConvertParams) -> Result<Vec<u8>, BackendError> {
        let img = decode(source)?;
        let converted = apply(params.operation, &img, params.width, params.height);
        let prepared = prepare_for(converted, params.format);
        encode(&prepared, params.format, params.quality)
    }
}
