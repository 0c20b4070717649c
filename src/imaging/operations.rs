//! The conversion operations, as a pure function over decoded images.
//!
//! | Operation | `image` call | Filter |
//! |---|---|---|
//! | `copy` | clone | — |
//! | `thumbnail` | `resize_to_fill` (scale + center crop) | Catmull-Rom |
//! | `resize` | `resize_exact` | Lanczos3 |
//! | `fit` | `resize_exact` to [`fit_dimensions`] | Lanczos3 |

use super::calculations::{fit_dimensions, resize_dimensions};
use crate::registry::Operation;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Apply `operation` with target `width × height` to a decoded image.
///
/// Exhaustive over [`Operation`], so there is no "unrecognised operation"
/// case left to handle at this point.
pub fn apply(operation: Operation, img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    match operation {
        Operation::Copy => img.clone(),
        Operation::Thumbnail => img.resize_to_fill(width, height, FilterType::CatmullRom),
        Operation::Resize => {
            let (w, h) = resize_dimensions(img.dimensions(), (width, height));
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        Operation::Fit => {
            let (w, h) = fit_dimensions(img.dimensions(), (width, height));
            if (w, h) == img.dimensions() {
                img.clone()
            } else {
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn copy_keeps_pixels() {
        let img = source(31, 17);
        let out = apply(Operation::Copy, &img, 5, 5);
        assert_eq!(out.dimensions(), (31, 17));
        assert_eq!(out.to_rgb8().as_raw(), img.to_rgb8().as_raw());
    }

    #[test]
    fn thumbnail_is_exact_regardless_of_aspect() {
        for (w, h) in [(400, 200), (200, 400), (60, 60), (30, 10)] {
            let out = apply(Operation::Thumbnail, &source(w, h), 50, 50);
            assert_eq!(out.dimensions(), (50, 50), "source {w}x{h}");
        }
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let out = apply(Operation::Fit, &source(400, 200), 100, 100);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn fit_does_not_upscale() {
        let out = apply(Operation::Fit, &source(40, 20), 100, 100);
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn resize_ignores_aspect_ratio() {
        let out = apply(Operation::Resize, &source(400, 200), 100, 100);
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn resize_with_zero_height_keeps_aspect() {
        let out = apply(Operation::Resize, &source(400, 200), 200, 0);
        assert_eq!(out.dimensions(), (200, 100));
    }
}
