//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the resolver (which decides what artifact to produce)
//! and the [`backend`](super::backend) (which does the pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock)
//! without changing resolution logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`ConvertParams`]: everything needed for one conversion: operation, target dimensions, output format, quality.

use crate::registry::{ConversionProfile, Operation};
use image::ImageFormat;
use std::path::Path;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Parameters for converting one original into one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertParams {
    pub operation: Operation,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub quality: Quality,
}

impl ConvertParams {
    pub fn for_profile(profile: &ConversionProfile, format: ImageFormat, quality: Quality) -> Self {
        Self {
            operation: profile.operation,
            width: profile.width,
            height: profile.height,
            format,
            quality,
        }
    }
}

/// Output format implied by a path's extension, if we can encode it.
pub fn output_format(path: &Path) -> Option<ImageFormat> {
    ImageFormat::from_path(path)
        .ok()
        .filter(|format| format.writing_enabled())
}

/// MIME type for the artifact stored at `path`.
pub fn content_type(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(
            output_format(Path::new("a/b/photo.JPG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(output_format(Path::new("x.png")), Some(ImageFormat::Png));
        assert_eq!(output_format(Path::new("x.webp")), Some(ImageFormat::WebP));
        assert_eq!(output_format(Path::new("notes.txt")), None);
        assert_eq!(output_format(Path::new("no-extension")), None);
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.gif")), "image/gif");
        assert_eq!(content_type(Path::new("a.bin")), "application/octet-stream");
    }

    #[test]
    fn params_copy_profile_fields() {
        let profile = ConversionProfile {
            name: "thumb".into(),
            operation: Operation::Thumbnail,
            width: 64,
            height: 48,
        };
        let params = ConvertParams::for_profile(&profile, ImageFormat::Png, Quality::new(80));
        assert_eq!(params.operation, Operation::Thumbnail);
        assert_eq!((params.width, params.height), (64, 48));
        assert_eq!(params.format, ImageFormat::Png);
        assert_eq!(params.quality.value(), 80);
    }
}
