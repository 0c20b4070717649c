//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Copy** | decode + re-encode |
//! | **Thumbnail** | `resize_to_fill` (Catmull-Rom) |
//! | **Resize** | `resize_exact` (Lanczos3) |
//! | **Fit** | `resize_exact` to the fitted size (Lanczos3), never upscaled |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a conversion
//! - **Operations**: The pure `apply(operation, image, width, height)` dispatch
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use operations::apply;
pub use params::{ConvertParams, Quality, content_type, output_format};
pub use rust_backend::RustBackend;
