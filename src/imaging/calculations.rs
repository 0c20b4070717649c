//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Largest size that fits inside `bounds` while keeping the source aspect ratio.
///
/// Images that already fit are returned unchanged; `fit` never upscales.
/// The constrained edge matches the bound exactly and the other edge is
/// rounded, never below 1px.
///
/// ```text
/// fit_dimensions((400, 200), (100, 100)) == (100, 50)
/// fit_dimensions((80, 60), (100, 100))   == (80, 60)
/// ```
pub fn fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let max_aspect = max_w as f64 / max_h as f64;

    if src_aspect > max_aspect {
        // Source is wider than the box: width is the constraint
        let h = (max_w as f64 / src_aspect).round() as u32;
        (max_w, h.max(1))
    } else {
        // Source is taller (or same shape): height is the constraint
        let w = (max_h as f64 * src_aspect).round() as u32;
        (w.max(1), max_h)
    }
}

/// Target size for `resize`.
///
/// Both dimensions set: exactly that size, aspect ratio ignored. One
/// dimension zero: derived from the other to keep the source aspect ratio.
/// Both zero is rejected at config load and yields the source size here.
pub fn resize_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    match target {
        (0, 0) => source,
        (w, 0) => {
            let h = (w as f64 * src_h as f64 / src_w.max(1) as f64).round() as u32;
            (w, h.max(1))
        }
        (0, h) => {
            let w = (h as f64 * src_w as f64 / src_h.max(1) as f64).round() as u32;
            (w.max(1), h)
        }
        exact => exact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_dimensions
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_dimensions((400, 200), (100, 100)), (100, 50));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_dimensions((200, 400), (100, 100)), (50, 100));
    }

    #[test]
    fn fit_preserves_ratio_into_wide_box() {
        // 3000x2000 into 800x200: height is the constraint
        assert_eq!(fit_dimensions((3000, 2000), (800, 200)), (300, 200));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_dimensions((80, 60), (100, 100)), (80, 60));
        assert_eq!(fit_dimensions((100, 100), (100, 100)), (100, 100));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_dimensions((10000, 1), (100, 100)), (100, 1));
    }

    // =========================================================================
    // resize_dimensions
    // =========================================================================

    #[test]
    fn resize_exact_ignores_aspect() {
        assert_eq!(resize_dimensions((400, 200), (50, 50)), (50, 50));
    }

    #[test]
    fn resize_width_only_keeps_aspect() {
        assert_eq!(resize_dimensions((400, 200), (100, 0)), (100, 50));
    }

    #[test]
    fn resize_height_only_keeps_aspect() {
        assert_eq!(resize_dimensions((400, 200), (0, 100)), (200, 100));
    }

    #[test]
    fn resize_may_upscale() {
        assert_eq!(resize_dimensions((10, 10), (0, 40)), (40, 40));
    }

    #[test]
    fn resize_zero_by_zero_is_identity() {
        assert_eq!(resize_dimensions((123, 45), (0, 0)), (123, 45));
    }
}
