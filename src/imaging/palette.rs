//! Pick a readable text/background color pair from an image's brightness.

use crate::types::{Color, PaletteEntry};
use image::DynamicImage;
use image::imageops::FilterType;

/// Default two-entry table: black text on near-white, white text on black.
pub const BLACK_WHITE_PALETTE: [PaletteEntry; 2] = [
    PaletteEntry {
        text: Color::BLACK,
        background: Color::rgba(245, 245, 245, 255),
    },
    PaletteEntry {
        text: Color::WHITE,
        background: Color::BLACK,
    },
];

/// Average color of an image, from a smoothing downsample to a single pixel.
pub fn average_color(image: &DynamicImage) -> Color {
    let pixel = image
        .resize_exact(1, 1, FilterType::Triangle)
        .to_rgba8()
        .get_pixel(0, 0)
        .0;
    Color(pixel)
}

/// Index of the luminance bin `luminance` falls into, for `bins` equal-width
/// bins over `[0, 255]`.
///
/// A luminance of exactly 255 lands in the last bin.
pub fn palette_bin(luminance: f64, bins: usize) -> usize {
    let bin_width = 255.0 / bins as f64;
    let index = (luminance / bin_width).floor().max(0.0) as usize;
    index.min(bins - 1)
}

/// Select the palette entry matching the average brightness of `image`.
///
/// Entries are ranked by background brightness, lightest first, so brighter
/// images get darker backgrounds. Returns `None` for an empty table.
pub fn estimate_palette(image: &DynamicImage, palette: &[PaletteEntry]) -> Option<PaletteEntry> {
    if palette.is_empty() {
        return None;
    }
    let luminance = average_color(image).luminance();

    let mut ranked = palette.to_vec();
    ranked.sort_by(|a, b| b.background.luminance().total_cmp(&a.background.luminance()));

    let index = palette_bin(luminance, ranked.len());
    tracing::debug!(luminance, index, entries = ranked.len(), "estimated palette");
    Some(ranked[index])
}
