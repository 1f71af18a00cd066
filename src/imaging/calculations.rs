//! Pure geometry for a captioned image.
//!
//! All functions here are pure and testable without any I/O or images.
//! Given the canvas size, the source photo size, the caption options and the
//! measured size of the wrapped text, [`calculate_layout`] derives:
//!
//! - the background panel's height and vertical placement,
//! - the cover-fit scale, scaled size and offset of the photo,
//! - the top-left anchor of the text block.
//!
//! Fractions (margins, minimum text height) are relative to the canvas:
//! horizontal ones to its width, vertical ones to its height.

use super::backend::{Dimensions, TextSize};
use crate::types::{ImageMode, PanelMode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("provide either a bottom or a top margin (got bottom={bottom:?}, top={top:?})")]
    Margin {
        bottom: Option<f64>,
        top: Option<f64>,
    },
    #[error(
        "not_overlay image mode is only supported with attach_to_top or attach_to_bottom panels, got {panel_mode}"
    )]
    ModeMismatch { panel_mode: PanelMode },
}

/// The one vertical margin a caption is positioned by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalMargin {
    /// Distance from the bottom edge to the bottom of the text block.
    Bottom(f64),
    /// Distance from the top edge to the top of the text block.
    Top(f64),
}

impl VerticalMargin {
    /// Exactly one of `bottom`/`top` must be set.
    pub fn from_options(bottom: Option<f64>, top: Option<f64>) -> Result<Self, LayoutError> {
        match (bottom, top) {
            (Some(b), None) => Ok(VerticalMargin::Bottom(b)),
            (None, Some(t)) => Ok(VerticalMargin::Top(t)),
            _ => Err(LayoutError::Margin { bottom, top }),
        }
    }

    pub fn fraction(self) -> f64 {
        match self {
            VerticalMargin::Bottom(f) | VerticalMargin::Top(f) => f,
        }
    }
}

/// Caption options that affect geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub canvas: Dimensions,
    pub photo: Dimensions,
    pub image_mode: ImageMode,
    pub panel_mode: PanelMode,
    pub left_margin: f64,
    pub bottom_margin: Option<f64>,
    pub top_margin: Option<f64>,
    /// Minimum text block height as a fraction of the canvas height.
    pub text_min_height: Option<f64>,
    /// Panel padding as a fraction of the text height (stripe/none panels).
    pub panel_padding: f64,
}

/// Background panel: always canvas-wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelGeometry {
    pub width: u32,
    pub height: f64,
    pub top: i64,
}

impl PanelGeometry {
    /// Height of the panel rectangle in whole pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height.ceil().max(0.0) as u32
    }
}

/// Where and how large the photo is pasted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoPlacement {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
}

/// Full geometry of one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Text block height after applying the minimum height.
    pub text_height: f64,
    pub panel: PanelGeometry,
    pub photo: PhotoPlacement,
    /// Top-left corner of the text block.
    pub text_anchor: (i64, i64),
}

/// Measured text height, raised to `min_fraction * canvas_height` if set.
pub fn effective_text_height(measured: u32, min_fraction: Option<f64>, canvas_height: u32) -> f64 {
    let measured = measured as f64;
    match min_fraction {
        Some(fraction) => measured.max(fraction * canvas_height as f64),
        None => measured,
    }
}

/// Panel height for the given mode.
///
/// Attached panels extend the text by the vertical margin on both sides;
/// stripe (and invisible none) panels extend it by the padding fraction of
/// the text height on both sides.
pub fn calculate_panel_height(
    panel_mode: PanelMode,
    margin: VerticalMargin,
    text_height: f64,
    canvas_height: u32,
    padding: f64,
) -> f64 {
    if panel_mode.is_attached() {
        text_height + 2.0 * canvas_height as f64 * margin.fraction()
    } else {
        text_height + 2.0 * text_height * padding
    }
}

/// `NotOverlay` needs a panel mode that reserves its own band.
pub fn validate_modes(image_mode: ImageMode, panel_mode: PanelMode) -> Result<(), LayoutError> {
    match image_mode {
        ImageMode::NotOverlay if !panel_mode.is_attached() => {
            Err(LayoutError::ModeMismatch { panel_mode })
        }
        ImageMode::Overlay | ImageMode::NotOverlay => Ok(()),
    }
}

/// Scale `photo` so it covers a `target_width` x `target_height` box.
///
/// Returns the scale factor and the ceiling-rounded scaled dimensions. One
/// axis matches the box, the other may overflow and gets cropped by the
/// canvas.
pub fn calculate_cover_fit(
    photo: Dimensions,
    target_width: f64,
    target_height: f64,
) -> (f64, Dimensions) {
    let scale = (target_width / photo.width as f64).max(target_height / photo.height as f64);
    let scaled = Dimensions {
        width: ((photo.width as f64 * scale).ceil() as u32).max(1),
        height: ((photo.height as f64 * scale).ceil() as u32).max(1),
    };
    (scale, scaled)
}

/// Offset that centers the scaled photo, shifted away from an attached
/// panel when the photo must not be overlaid.
pub fn calculate_photo_offset(
    canvas: Dimensions,
    scaled: Dimensions,
    image_mode: ImageMode,
    panel_mode: PanelMode,
    panel_height: f64,
) -> (i64, i64) {
    let centered_x = (canvas.width as f64 - scaled.width as f64) / 2.0;
    let centered_y = (canvas.height as f64 - scaled.height as f64) / 2.0;

    let y = match (image_mode, panel_mode) {
        (ImageMode::NotOverlay, PanelMode::AttachToTop) => centered_y + panel_height / 2.0,
        (ImageMode::NotOverlay, PanelMode::AttachToBottom) => centered_y - panel_height / 2.0,
        (ImageMode::NotOverlay, PanelMode::Stripe | PanelMode::None) | (ImageMode::Overlay, _) => {
            centered_y
        }
    };

    (
        centered_x.round_ties_even() as i64,
        y.round_ties_even() as i64,
    )
}

/// Top-left corner of the text block, before rounding.
pub fn calculate_text_anchor(
    canvas: Dimensions,
    left_margin: f64,
    margin: VerticalMargin,
    text_height: f64,
) -> (f64, f64) {
    let width = canvas.width as f64;
    let height = canvas.height as f64;
    let y = match margin {
        VerticalMargin::Bottom(bottom) => height - (bottom * height + text_height),
        VerticalMargin::Top(top) => top * height,
    };
    (left_margin * width, y)
}

/// Top edge of the panel.
pub fn calculate_panel_top(
    panel_mode: PanelMode,
    text_anchor_y: f64,
    text_height: f64,
    padding: f64,
) -> i64 {
    match panel_mode {
        PanelMode::AttachToTop => 0,
        PanelMode::AttachToBottom | PanelMode::Stripe | PanelMode::None => {
            (text_anchor_y - text_height * padding / 2.0).round_ties_even() as i64
        }
    }
}

/// Compute the complete geometry of a render.
///
/// Validation runs first, so an invalid configuration fails before any
/// pixel work.
pub fn calculate_layout(params: &LayoutParams, measured: TextSize) -> Result<Layout, LayoutError> {
    let margin = VerticalMargin::from_options(params.bottom_margin, params.top_margin)?;
    validate_modes(params.image_mode, params.panel_mode)?;

    let canvas = params.canvas;
    let text_height =
        effective_text_height(measured.height, params.text_min_height, canvas.height);
    let panel_height = calculate_panel_height(
        params.panel_mode,
        margin,
        text_height,
        canvas.height,
        params.panel_padding,
    );

    let available_height = match params.image_mode {
        ImageMode::NotOverlay => canvas.height as f64 - panel_height,
        ImageMode::Overlay => canvas.height as f64,
    };
    let (scale, scaled) = calculate_cover_fit(params.photo, canvas.width as f64, available_height);
    let (photo_x, photo_y) = calculate_photo_offset(
        canvas,
        scaled,
        params.image_mode,
        params.panel_mode,
        panel_height,
    );

    let (anchor_x, anchor_y) =
        calculate_text_anchor(canvas, params.left_margin, margin, text_height);
    let panel_top =
        calculate_panel_top(params.panel_mode, anchor_y, text_height, params.panel_padding);

    Ok(Layout {
        text_height,
        panel: PanelGeometry {
            width: canvas.width,
            height: panel_height,
            top: panel_top,
        },
        photo: PhotoPlacement {
            scale,
            width: scaled.width,
            height: scaled.height,
            x: photo_x,
            y: photo_y,
        },
        text_anchor: (
            anchor_x.round_ties_even() as i64,
            anchor_y.round_ties_even() as i64,
        ),
    })
}
