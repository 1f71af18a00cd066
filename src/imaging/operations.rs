//! High-level caption operations.
//!
//! These functions combine wrapping, palette estimation and layout with a
//! [`TextBackend`] and `image` pixel primitives. Planning is separate from
//! compositing so the geometry of a render can be inspected without
//! touching pixels.

use super::backend::{BackendError, Dimensions, TextBackend, TextSize};
use super::calculations::{
    Layout, LayoutError, LayoutParams, VerticalMargin, calculate_layout, validate_modes,
};
use super::filters::apply_filters;
use super::font_backend::{FontBackend, load_image};
use super::palette::{BLACK_WHITE_PALETTE, estimate_palette};
use super::wrap::{WrapError, wrap_text};
use crate::config::{CaptionConfig, ConfigError};
use crate::types::{Color, PaletteEntry, PanelMode};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error(transparent)]
    Wrap(#[from] WrapError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no font configured (set text.font_path or pass --font)")]
    MissingFont,
    #[error("palette table is empty")]
    EmptyPalette,
}

/// Result type for caption operations.
pub type Result<T> = std::result::Result<T, CaptionError>;

/// Everything needed to composite one caption, computed before any pixel work.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionPlan {
    pub canvas: Dimensions,
    pub px_size: f32,
    /// Caption with line breaks inserted.
    pub wrapped: String,
    pub text_size: TextSize,
    pub layout: Layout,
    pub text_color: Color,
    pub panel_color: Color,
}

/// Font size as a fraction of canvas width, estimated from caption length.
///
/// Longer captions get proportionally smaller text.
pub fn estimate_character_ratio(text: &str) -> f64 {
    -0.0005 * text.chars().count() as f64 + 0.116
}

/// Font pixel size for a canvas width and character ratio, at least 1.
pub fn font_px_size(canvas_width: u32, character_ratio: f64) -> f32 {
    (canvas_width as f64 * character_ratio).round().max(1.0) as f32
}

/// Plan a caption render without executing it.
///
/// `palette` replaces the configured text and panel colors when given.
/// Configuration errors are reported before the text is wrapped.
pub fn plan_caption(
    backend: &impl TextBackend,
    text: &str,
    photo: Dimensions,
    config: &CaptionConfig,
    palette: Option<PaletteEntry>,
) -> Result<CaptionPlan> {
    VerticalMargin::from_options(config.margins.bottom, config.margins.top)?;
    validate_modes(config.canvas.image_mode, config.panel.mode)?;
    config.validate()?;

    let canvas = match config.canvas.size {
        Some([width, height]) => Dimensions { width, height },
        None => photo,
    };

    let ratio = config
        .text
        .character_ratio
        .unwrap_or_else(|| estimate_character_ratio(text));
    let px_size = font_px_size(canvas.width, ratio);

    let width = canvas.width as f64;
    let max_width = width - config.margins.left * width - config.margins.right * width;
    let wrapped = wrap_text(text, max_width, |candidate| {
        backend.measure(candidate, px_size).width as f64
    })?;
    let text_size = backend.measure(&wrapped, px_size);

    let layout = calculate_layout(
        &LayoutParams {
            canvas,
            photo,
            image_mode: config.canvas.image_mode,
            panel_mode: config.panel.mode,
            left_margin: config.margins.left,
            bottom_margin: config.margins.bottom,
            top_margin: config.margins.top,
            text_min_height: config.text.min_height,
            panel_padding: config.panel.padding,
        },
        text_size,
    )?;

    tracing::debug!(
        canvas_width = canvas.width,
        canvas_height = canvas.height,
        px_size,
        lines = wrapped.lines().count(),
        text_width = text_size.width,
        text_height = layout.text_height,
        panel_height = layout.panel.height,
        panel_top = layout.panel.top,
        photo_scale = layout.photo.scale,
        "planned caption"
    );

    let (text_color, panel_color) = match palette {
        Some(entry) => (entry.text, entry.background),
        None => (config.text.color, config.panel.color),
    };

    Ok(CaptionPlan {
        canvas,
        px_size,
        wrapped,
        text_size,
        layout,
        text_color,
        panel_color,
    })
}

/// Composite a planned caption onto a fresh canvas.
///
/// Layers, bottom to top: photo, filter color, post filters (over the whole
/// canvas so far), panel, text.
pub fn render_plan(
    backend: &impl TextBackend,
    photo: &DynamicImage,
    plan: &CaptionPlan,
    config: &CaptionConfig,
) -> RgbaImage {
    let Dimensions { width, height } = plan.canvas;
    let placement = plan.layout.photo;
    let mut canvas = RgbaImage::new(width, height);

    let scaled = if (placement.width, placement.height) == (photo.width(), photo.height()) {
        photo.to_rgba8()
    } else {
        imageops::resize(
            &photo.to_rgba8(),
            placement.width,
            placement.height,
            FilterType::Lanczos3,
        )
    };
    imageops::replace(&mut canvas, &scaled, placement.x, placement.y);
    tracing::debug!(x = placement.x, y = placement.y, "pasted photo");

    let filter = RgbaImage::from_pixel(width, height, config.canvas.filter_color.into());
    imageops::overlay(&mut canvas, &filter, 0, 0);

    let mut canvas = apply_filters(canvas, &config.canvas.post_filters);

    let panel = plan.layout.panel;
    if config.panel.mode != PanelMode::None && panel.pixel_height() > 0 {
        let rect = RgbaImage::from_pixel(panel.width, panel.pixel_height(), plan.panel_color.into());
        imageops::overlay(&mut canvas, &rect, 0, panel.top);
        tracing::debug!(top = panel.top, height = panel.pixel_height(), "drew panel");
    }

    backend.draw(
        &mut canvas,
        plan.layout.text_anchor,
        &plan.wrapped,
        plan.px_size,
        config.text.align,
        plan.text_color,
    );
    canvas
}

/// Render `text` over `photo` with the given backend.
///
/// With `palette.auto` set, text and panel colors come from the photo's
/// brightness.
pub fn compose_caption(
    backend: &impl TextBackend,
    text: &str,
    photo: &DynamicImage,
    config: &CaptionConfig,
) -> Result<RgbaImage> {
    let palette = if config.palette.auto {
        Some(estimate_palette(photo, &config.palette.entries).ok_or(CaptionError::EmptyPalette)?)
    } else {
        None
    };

    let dims = Dimensions {
        width: photo.width(),
        height: photo.height(),
    };
    let plan = plan_caption(backend, text, dims, config, palette)?;
    Ok(render_plan(backend, photo, &plan, config))
}

/// Render `text` over the image at `image_source`, using the configured font.
///
/// The image file is closed before compositing starts.
pub fn generate_captioned(
    text: &str,
    image_source: &Path,
    config: &CaptionConfig,
) -> Result<RgbaImage> {
    let font_path = config
        .text
        .font_path
        .as_deref()
        .ok_or(CaptionError::MissingFont)?;
    let backend = FontBackend::open(font_path)?;
    let photo = load_image(image_source)?;
    compose_caption(&backend, text, &photo, config)
}

/// Pick the palette entry for the image at `image_source`.
///
/// Uses the black/white table when `palette` is `None`.
pub fn estimate_color_palette(
    image_source: &Path,
    palette: Option<&[PaletteEntry]>,
) -> Result<PaletteEntry> {
    let image = load_image(image_source)?;
    estimate_palette(&image, palette.unwrap_or(&BLACK_WHITE_PALETTE))
        .ok_or(CaptionError::EmptyPalette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockTextBackend;
    use crate::test_helpers::{solid_image, write_fixture};
    use crate::types::{ImageMode, PostFilter, TextAlign};
    use image::Rgba;
    use tempfile::TempDir;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: Color = Color::rgba(0, 255, 0, 255);

    /// 800x600 canvas from an 800x600 photo, so the photo is pasted unscaled.
    fn config() -> CaptionConfig {
        let mut config = CaptionConfig::default();
        config.text.character_ratio = Some(0.05);
        config.panel.color = GREEN;
        config
    }

    fn red_photo() -> DynamicImage {
        solid_image(800, 600, RED)
    }

    // =========================================================================
    // Font sizing
    // =========================================================================

    #[test]
    fn character_ratio_shrinks_with_length() {
        assert!((estimate_character_ratio("") - 0.116).abs() < 1e-12);
        assert!((estimate_character_ratio(&"x".repeat(100)) - 0.066).abs() < 1e-12);
    }

    #[test]
    fn px_size_is_rounded_and_at_least_one() {
        assert_eq!(font_px_size(800, 0.05), 40.0);
        assert_eq!(font_px_size(1000, 0.1105), 111.0);
        assert_eq!(font_px_size(10, 0.001), 1.0);
    }

    // =========================================================================
    // Planning
    // =========================================================================

    #[test]
    fn plan_wraps_hello_world_into_two_lines() {
        let backend = MockTextBackend::new();
        let mut config = config();
        // 88px font: "Hello world" is 484px, the budget is 480px
        config.text.character_ratio = Some(0.11);

        let plan = plan_caption(
            &backend,
            "Hello world",
            Dimensions {
                width: 800,
                height: 600,
            },
            &config,
            None,
        )
        .unwrap();

        assert_eq!(plan.px_size, 88.0);
        assert_eq!(plan.wrapped, "Hello\nworld");
        assert_eq!(plan.text_size, TextSize {
            width: 220,
            height: 180
        });
        assert_eq!(plan.layout.text_anchor, (160, 378));
    }

    #[test]
    fn plan_uses_configured_canvas_size() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.canvas.size = Some([1080, 1080]);

        let plan = plan_caption(
            &backend,
            "caption",
            Dimensions {
                width: 400,
                height: 300,
            },
            &config,
            None,
        )
        .unwrap();

        assert_eq!(plan.canvas, Dimensions {
            width: 1080,
            height: 1080
        });
        assert_eq!(plan.layout.photo.scale, 3.6);
    }

    #[test]
    fn plan_estimates_ratio_when_unset() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.text.character_ratio = None;

        let plan = plan_caption(
            &backend,
            "hi",
            Dimensions {
                width: 1000,
                height: 500,
            },
            &config,
            None,
        )
        .unwrap();

        // 1000 * (0.116 - 0.001)
        assert_eq!(plan.px_size, 115.0);
    }

    #[test]
    fn mode_mismatch_fails_before_wrapping() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.canvas.image_mode = ImageMode::NotOverlay;
        config.panel.mode = PanelMode::Stripe;
        // This font size would also fail to wrap
        config.text.character_ratio = Some(1.0);

        let err = compose_caption(&backend, "Unwrappable", &red_photo(), &config).unwrap_err();
        assert!(matches!(
            err,
            CaptionError::Layout(LayoutError::ModeMismatch {
                panel_mode: PanelMode::Stripe
            })
        ));
        assert!(backend.get_draws().is_empty());
    }

    #[test]
    fn missing_margin_is_a_layout_error() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.margins.bottom = None;

        let err = compose_caption(&backend, "text", &red_photo(), &config).unwrap_err();
        assert!(matches!(err, CaptionError::Layout(LayoutError::Margin { .. })));
    }

    #[test]
    fn out_of_range_config_is_rejected_before_drawing() {
        let backend = MockTextBackend::new();

        let mut nan_padding = config();
        nan_padding.panel.padding = f64::NAN;
        let mut negative_ratio = config();
        negative_ratio.text.character_ratio = Some(-0.1);
        let mut nan_ratio = config();
        nan_ratio.text.character_ratio = Some(f64::NAN);

        for config in [nan_padding, negative_ratio, nan_ratio] {
            let err = compose_caption(&backend, "text", &red_photo(), &config).unwrap_err();
            assert!(matches!(err, CaptionError::Config(ConfigError::Validation(_))));
        }
        assert!(backend.get_draws().is_empty());
    }

    #[test]
    fn oversized_word_is_a_wrap_error() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.text.character_ratio = Some(0.5);

        let err = compose_caption(&backend, "Enormous", &red_photo(), &config).unwrap_err();
        assert!(matches!(err, CaptionError::Wrap(_)));
        assert!(backend.get_draws().is_empty());
    }

    // =========================================================================
    // Compositing
    // =========================================================================

    #[test]
    fn compose_draws_text_at_anchor() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.text.align = TextAlign::Center;

        let canvas = compose_caption(&backend, "Hello world", &red_photo(), &config).unwrap();
        assert_eq!(canvas.dimensions(), (800, 600));

        let draws = backend.get_draws();
        assert_eq!(draws.len(), 1);
        // 40px font, one line 40px tall: y = 600 - (42 + 40)
        assert_eq!(draws[0].position, (160, 518));
        assert_eq!(draws[0].text, "Hello world");
        assert_eq!(draws[0].px_size, 40.0);
        assert_eq!(draws[0].align, TextAlign::Center);
        assert_eq!(draws[0].color, Color::WHITE);
    }

    #[test]
    fn stripe_panel_is_drawn_over_photo() {
        let backend = MockTextBackend::new();
        let canvas = compose_caption(&backend, "Hi", &red_photo(), &config()).unwrap();

        // text 40px at y=518; panel 56px tall from 514
        assert_eq!(canvas.get_pixel(5, 5), &Rgba(RED));
        assert_eq!(canvas.get_pixel(5, 515), &Rgba(GREEN.0));
        assert_eq!(canvas.get_pixel(5, 569), &Rgba(GREEN.0));
        assert_eq!(canvas.get_pixel(5, 570), &Rgba(RED));
    }

    #[test]
    fn panel_mode_none_draws_no_panel() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.panel.mode = PanelMode::None;

        let canvas = compose_caption(&backend, "Hi", &red_photo(), &config).unwrap();
        assert_eq!(canvas.get_pixel(5, 515), &Rgba(RED));
        assert_eq!(backend.get_draws().len(), 1);
    }

    #[test]
    fn zero_alpha_filter_leaves_photo_unchanged() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.canvas.filter_color = Color::rgba(0, 0, 255, 0);

        let canvas = compose_caption(&backend, "Hi", &red_photo(), &config).unwrap();
        assert_eq!(canvas.get_pixel(5, 5), &Rgba(RED));
    }

    #[test]
    fn opaque_filter_covers_photo_but_not_panel() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.canvas.filter_color = Color::rgba(0, 0, 255, 255);

        let canvas = compose_caption(&backend, "Hi", &red_photo(), &config).unwrap();
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(5, 515), &Rgba(GREEN.0));
    }

    #[test]
    fn post_filters_apply_before_panel_and_text() {
        let backend = MockTextBackend::new();
        let mut config = config();
        // find_edges blackens the flat photo, the panel stays green
        config.canvas.post_filters = vec![PostFilter::FindEdges];

        let canvas = compose_caption(&backend, "Hi", &red_photo(), &config).unwrap();
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(5, 515), &Rgba(GREEN.0));
        // text drawn last, on top of everything
        assert_eq!(canvas.get_pixel(160, 518), &Rgba(Color::WHITE.0));
    }

    #[test]
    fn not_overlay_leaves_panel_band_outside_photo() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.canvas.image_mode = ImageMode::NotOverlay;
        config.panel.mode = PanelMode::AttachToTop;
        config.panel.color = Color::TRANSPARENT;
        config.margins.bottom = None;
        config.margins.top = Some(0.05);
        config.canvas.size = Some([800, 600]);

        let canvas = compose_caption(&backend, "Hi", &solid_image(800, 400, RED), &config).unwrap();
        // panel = 40 + 2 * 600 * 0.05 = 100; photo scaled to 1000x500, starting at y=100
        assert_eq!(canvas.get_pixel(400, 0)[3], 0);
        assert_eq!(canvas.get_pixel(400, 99)[3], 0);
        assert!(canvas.get_pixel(400, 100)[3] > 200);
        assert!(canvas.get_pixel(400, 599)[0] > 200);
    }

    #[test]
    fn auto_palette_picks_colors_from_photo() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.palette.auto = true;

        let black = solid_image(800, 600, [0, 0, 0, 255]);
        let canvas = compose_caption(&backend, "Hi", &black, &config).unwrap();

        assert_eq!(backend.get_draws()[0].color, Color::BLACK);
        assert_eq!(canvas.get_pixel(5, 515), &Rgba([245, 245, 245, 255]));
    }

    #[test]
    fn auto_palette_with_empty_table_fails() {
        let backend = MockTextBackend::new();
        let mut config = config();
        config.palette.auto = true;
        config.palette.entries.clear();

        assert!(matches!(
            compose_caption(&backend, "Hi", &red_photo(), &config),
            Err(CaptionError::EmptyPalette)
        ));
    }

    // =========================================================================
    // File entry points
    // =========================================================================

    #[test]
    fn generate_without_font_is_missing_font() {
        let err = generate_captioned("Hi", Path::new("/nonexistent.png"), &config()).unwrap_err();
        assert!(matches!(err, CaptionError::MissingFont));
    }

    #[test]
    fn estimate_color_palette_reads_image() {
        let tmp = TempDir::new().unwrap();
        let white = write_fixture(tmp.path(), "white.png", &solid_image(2, 2, [255; 4]));
        let black = write_fixture(tmp.path(), "black.png", &solid_image(2, 2, [0, 0, 0, 255]));

        let entry = estimate_color_palette(&white, None).unwrap();
        assert_eq!(entry.background, Color::BLACK);

        let entry = estimate_color_palette(&black, None).unwrap();
        assert_eq!(entry.background, Color::rgba(245, 245, 245, 255));
    }

    #[test]
    fn estimate_color_palette_missing_file() {
        assert!(matches!(
            estimate_color_palette(Path::new("/nonexistent.png"), None),
            Err(CaptionError::Backend(BackendError::Io(_)))
        ));
    }
}
