//! Caption imaging: layout, compositing and text rasterization.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image::ImageReader`, `save_with_format` |
//! | **Cover-fit resize** | `imageops::resize` (Lanczos3) + `imageops::replace` |
//! | **Color filter, panel** | `imageops::overlay` (alpha compositing) |
//! | **Post filters** | fixed convolution kernels, `imageops::blur` / `unsharpen` |
//! | **Text** | `ab_glyph` glyph outlines blended into the canvas |
//! | **Average color** | `resize_exact(1, 1, Triangle)` |
//!
//! The module is split into:
//! - **Wrap**: Greedy word wrapping against an injected width function
//! - **Palette**: Text/background color pair from average brightness
//! - **Calculations**: Pure layout geometry (unit testable)
//! - **Filters**: Whole-canvas post-filter kernels
//! - **Backend**: [`TextBackend`] trait + [`FontBackend`], image I/O
//! - **Operations**: High-level functions combining the above

pub mod backend;
pub mod calculations;
pub mod filters;
pub mod font_backend;
pub mod operations;
pub mod palette;
pub mod wrap;

pub use backend::{BackendError, Dimensions, LINE_SPACING, TextBackend, TextSize};
pub use calculations::{Layout, LayoutError, LayoutParams, calculate_layout};
pub use filters::apply_filters;
pub use font_backend::{FontBackend, load_image, save_image};
pub use operations::{
    CaptionError, CaptionPlan, compose_caption, estimate_color_palette, generate_captioned,
    plan_caption, render_plan,
};
pub use palette::{BLACK_WHITE_PALETTE, estimate_palette};
pub use wrap::{WrapError, wrap_text};
