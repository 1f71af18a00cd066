//! Text rendering backend trait and shared types.
//!
//! The [`TextBackend`] trait is the seam between caption layout and glyph
//! rasterization. It defines the two operations the compositor needs:
//! measuring a multiline block and drawing it.
//!
//! The production implementation is
//! [`FontBackend`](super::font_backend::FontBackend), which rasterizes
//! TrueType/OpenType fonts with `ab_glyph`. Tests use a fixed-advance mock
//! so layout and compositing can be checked without font files.

use crate::types::{Color, TextAlign};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image or canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Rendered size of a (possibly multiline) text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
}

/// Pixels between consecutive lines of a text block.
pub const LINE_SPACING: u32 = 4;

/// Trait for text backends.
///
/// `text` may contain `\n`; lines are stacked top to bottom with
/// [`LINE_SPACING`] between them. Both operations take the font size in
/// pixels so one backend serves any canvas size.
pub trait TextBackend: Sync {
    /// Size of the rendered block: widest line by stacked line heights.
    fn measure(&self, text: &str, px_size: f32) -> TextSize;

    /// Draw the block with its top-left corner at `(x, y)`.
    ///
    /// Lines are aligned within the block's own width.
    fn draw(
        &self,
        canvas: &mut RgbaImage,
        position: (i64, i64),
        text: &str,
        px_size: f32,
        align: TextAlign,
        color: Color,
    );
}

/// Horizontal offset of a line of `line_width` inside a block of `block_width`.
pub fn align_offset(align: TextAlign, block_width: f32, line_width: f32) -> f32 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Right => block_width - line_width,
        TextAlign::Center => (block_width - line_width) / 2.0,
    }
}

/// Height of `lines` stacked lines of `line_height` each.
pub fn block_height(lines: usize, line_height: u32) -> u32 {
    if lines == 0 {
        return 0;
    }
    lines as u32 * line_height + (lines as u32 - 1) * LINE_SPACING
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;

    /// Mock backend with fixed per-character advance and line height.
    ///
    /// Each character is `advance * px_size` wide, each line `px_size` tall.
    /// Drawing fills a solid rectangle per line and records the call.
    /// Uses Mutex (not RefCell) so it is Sync.
    pub struct MockTextBackend {
        pub advance: f32,
        pub draws: Mutex<Vec<RecordedDraw>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedDraw {
        pub position: (i64, i64),
        pub text: String,
        pub px_size: f32,
        pub align: TextAlign,
        pub color: Color,
    }

    impl MockTextBackend {
        pub fn new() -> Self {
            Self::with_advance(0.5)
        }

        pub fn with_advance(advance: f32) -> Self {
            Self {
                advance,
                draws: Mutex::new(Vec::new()),
            }
        }

        pub fn get_draws(&self) -> Vec<RecordedDraw> {
            self.draws.lock().unwrap().clone()
        }

        fn line_width(&self, line: &str, px_size: f32) -> f32 {
            line.chars().count() as f32 * self.advance * px_size
        }
    }

    impl TextBackend for MockTextBackend {
        fn measure(&self, text: &str, px_size: f32) -> TextSize {
            let lines: Vec<&str> = text.split('\n').collect();
            let width = lines
                .iter()
                .map(|l| self.line_width(l, px_size))
                .fold(0.0f32, f32::max);
            TextSize {
                width: width.ceil() as u32,
                height: block_height(lines.len(), px_size.ceil() as u32),
            }
        }

        fn draw(
            &self,
            canvas: &mut RgbaImage,
            position: (i64, i64),
            text: &str,
            px_size: f32,
            align: TextAlign,
            color: Color,
        ) {
            self.draws.lock().unwrap().push(RecordedDraw {
                position,
                text: text.to_string(),
                px_size,
                align,
                color,
            });

            let block = self.measure(text, px_size);
            let line_height = px_size.ceil() as i64;
            for (i, line) in text.split('\n').enumerate() {
                let width = self.line_width(line, px_size);
                let x0 = position.0 + align_offset(align, block.width as f32, width) as i64;
                let y0 = position.1 + i as i64 * (line_height + LINE_SPACING as i64);
                for y in y0..y0 + line_height {
                    for x in x0..x0 + width.ceil() as i64 {
                        if x >= 0
                            && y >= 0
                            && (x as u32) < canvas.width()
                            && (y as u32) < canvas.height()
                        {
                            canvas.put_pixel(x as u32, y as u32, Rgba(color.0));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn mock_measures_widest_line() {
        let backend = MockTextBackend::new();
        // 10px font, 5px per char
        let size = backend.measure("abc\nabcdef", 10.0);
        assert_eq!(size.width, 30);
        assert_eq!(size.height, 10 + LINE_SPACING + 10);
    }

    #[test]
    fn mock_records_draw() {
        let backend = MockTextBackend::new();
        let mut canvas = RgbaImage::new(20, 20);

        backend.draw(
            &mut canvas,
            (2, 3),
            "ab",
            4.0,
            TextAlign::Left,
            Color::WHITE,
        );

        let draws = backend.get_draws();
        assert_eq!(draws.len(), 1);
        assert!(matches!(
            &draws[0],
            RecordedDraw { position: (2, 3), text, .. } if text == "ab"
        ));
        assert_eq!(canvas.get_pixel(2, 3), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(5, 6), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(6, 3), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn align_offsets() {
        assert_eq!(align_offset(TextAlign::Left, 100.0, 40.0), 0.0);
        assert_eq!(align_offset(TextAlign::Right, 100.0, 40.0), 60.0);
        assert_eq!(align_offset(TextAlign::Center, 100.0, 40.0), 30.0);
    }

    #[test]
    fn block_height_adds_spacing_between_lines() {
        assert_eq!(block_height(0, 10), 0);
        assert_eq!(block_height(1, 10), 10);
        assert_eq!(block_height(3, 10), 30 + 2 * LINE_SPACING);
    }
}
