//! Pure Rust raster collaborators: image codecs and font rasterization.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Encode by extension | `image::DynamicImage::save_with_format` |
//! | Glyph advances + kerning | `ab_glyph::ScaleFont` |
//! | Glyph coverage | `ab_glyph::Font::outline_glyph` + `OutlinedGlyph::draw` |
//! | Coverage blending | `image::Pixel::blend` |

use super::backend::{
    BackendError, LINE_SPACING, TextBackend, TextSize, align_offset, block_height,
};
use crate::types::{Color, TextAlign};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::{DynamicImage, ImageFormat, ImageReader, Pixel, Rgba, RgbaImage};
use std::path::Path;

/// Extensions accepted for output, with the format they encode to.
const OUTPUT_FORMATS: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("webp", ImageFormat::WebP),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

/// Load and decode an image from disk.
///
/// The file handle is dropped before this returns, on success and on error.
pub fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Save a canvas to `path`, choosing the encoder from the extension.
///
/// JPEG has no alpha channel, so the canvas is flattened to RGB first.
pub fn save_image(canvas: &RgbaImage, path: &Path) -> Result<(), BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let format = OUTPUT_FORMATS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Unsupported output format: {}", ext))
        })?;

    let image = match format {
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas.clone()).to_rgb8())
        }
        _ => DynamicImage::ImageRgba8(canvas.clone()),
    };

    image.save_with_format(path, format).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to encode {}: {}", path.display(), e))
    })
}

/// Text backend rasterizing a font file with `ab_glyph`.
pub struct FontBackend {
    font: FontVec,
}

impl FontBackend {
    /// Load a TrueType/OpenType font from disk.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let data = std::fs::read(path).map_err(BackendError::Io)?;
        Self::from_bytes(data).map_err(|e| {
            BackendError::ProcessingFailed(format!("Invalid font {}: {}", path.display(), e))
        })
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ab_glyph::InvalidFont> {
        Ok(Self {
            font: FontVec::try_from_vec(data)?,
        })
    }

    fn line_height(&self, scale: PxScale) -> u32 {
        let scaled = self.font.as_scaled(scale);
        (scaled.ascent() - scaled.descent()).ceil() as u32
    }
}

/// Advance width of one line, kerning included.
fn line_width<F: Font, SF: ScaleFont<F>>(font: &SF, line: &str) -> f32 {
    let mut width = 0.0f32;
    let mut prev = None;
    for c in line.chars() {
        let glyph_id = font.glyph_id(c);
        if let Some(prev) = prev {
            width += font.kern(prev, glyph_id);
        }
        width += font.h_advance(glyph_id);
        prev = Some(glyph_id);
    }
    width
}

impl TextBackend for FontBackend {
    fn measure(&self, text: &str, px_size: f32) -> TextSize {
        let scale = PxScale::from(px_size);
        let scaled = self.font.as_scaled(scale);
        let lines: Vec<&str> = text.split('\n').collect();
        let width = lines
            .iter()
            .map(|line| line_width(&scaled, line))
            .fold(0.0f32, f32::max);

        TextSize {
            width: width.ceil() as u32,
            height: block_height(lines.len(), self.line_height(scale)),
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
        let scale = PxScale::from(px_size);
        let scaled = self.font.as_scaled(scale);
        let block_width = self.measure(text, px_size).width as f32;
        let line_advance = self.line_height(scale) as f32 + LINE_SPACING as f32;
        let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);

        for (i, line) in text.split('\n').enumerate() {
            let mut cursor_x =
                position.0 as f32 + align_offset(align, block_width, line_width(&scaled, line));
            let baseline_y = position.1 as f32 + i as f32 * line_advance + scaled.ascent();
            let mut prev = None;

            for c in line.chars() {
                let glyph_id = scaled.glyph_id(c);
                if let Some(prev) = prev {
                    cursor_x += scaled.kern(prev, glyph_id);
                }
                let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline_y));

                if let Some(outlined) = self.font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let x = bounds.min.x as i64 + gx as i64;
                        let y = bounds.min.y as i64 + gy as i64;
                        if x < 0 || y < 0 || x >= canvas_w || y >= canvas_h {
                            return;
                        }
                        let alpha = (coverage.clamp(0.0, 1.0) * color.alpha() as f32) as u8;
                        let [r, g, b, _] = color.0;
                        canvas
                            .get_pixel_mut(x as u32, y as u32)
                            .blend(&Rgba([r, g, b, alpha]));
                    });
                }

                cursor_x += scaled.h_advance(glyph_id);
                prev = Some(glyph_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{solid_image, write_fixture};
    use tempfile::TempDir;

    #[test]
    fn save_then_load_png_preserves_pixels() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.png");
        let canvas = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 128]));

        save_image(&canvas, &path).unwrap();
        let loaded = load_image(&path).unwrap().to_rgba8();

        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(1, 1), &Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn save_jpeg_drops_alpha() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.JPG");
        let canvas = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 100]));

        save_image(&canvas, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert!(!loaded.color().has_alpha());
    }

    #[test]
    fn save_rejects_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let canvas = RgbaImage::new(1, 1);
        let err = save_image(&canvas, &tmp.path().join("out.bmp")).unwrap_err();
        assert!(matches!(err, BackendError::ProcessingFailed(msg) if msg.contains("bmp")));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_image(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(matches!(err, BackendError::Io(_)));
    }

    #[test]
    fn load_reads_fixture() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(tmp.path(), "photo.png", &solid_image(4, 3, [1, 2, 3, 255]));
        let loaded = load_image(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (4, 3));
    }

    // =========================================================================
    // Text measurement and rasterization
    // =========================================================================

    const FONT_DATA: &[u8] = include_bytes!("../../fixtures/fonts/DejaVuSans.ttf");
    const RED: Color = Color([255, 0, 0, 255]);

    fn backend() -> FontBackend {
        FontBackend::from_bytes(FONT_DATA.to_vec()).unwrap()
    }

    /// Leftmost inked column within rows `rows`.
    fn ink_min_x(canvas: &RgbaImage, rows: std::ops::Range<u32>) -> Option<u32> {
        canvas
            .enumerate_pixels()
            .filter(|(_, y, p)| rows.contains(y) && p[3] > 0)
            .map(|(x, _, _)| x)
            .min()
    }

    #[test]
    fn width_and_height_grow_with_px_size() {
        let backend = backend();
        let small = backend.measure("Hello", 12.0);
        let medium = backend.measure("Hello", 24.0);
        let large = backend.measure("Hello", 48.0);

        assert!(small.width > 0 && small.height > 0);
        assert!(medium.width > small.width);
        assert!(large.width > medium.width);
        assert!(medium.height > small.height);
        assert!(large.height > medium.height);
    }

    #[test]
    fn multiline_height_adds_line_spacing() {
        let backend = backend();
        let line_height = backend.line_height(PxScale::from(40.0));

        assert_eq!(backend.measure("a", 40.0).height, line_height);
        assert_eq!(
            backend.measure("a\nb", 40.0).height,
            2 * line_height + LINE_SPACING
        );
    }

    #[test]
    fn block_width_is_widest_line() {
        let backend = backend();
        assert_eq!(
            backend.measure("iii\nWWWW\nab", 30.0).width,
            backend.measure("WWWW", 30.0).width
        );
    }

    #[test]
    fn kerned_pair_is_no_wider_than_its_glyphs() {
        let backend = backend();
        let pair = backend.measure("AV", 60.0).width;
        let apart = backend.measure("A", 60.0).width + backend.measure("V", 60.0).width;
        assert!(pair <= apart);
    }

    #[test]
    fn draw_inks_only_inside_the_measured_block() {
        let backend = backend();
        let mut canvas = RgbaImage::new(400, 200);
        let text = "Hello\nworld";
        let size = backend.measure(text, 40.0);

        backend.draw(&mut canvas, (50, 40), text, 40.0, TextAlign::Left, RED);

        let mut inked = 0;
        for (x, y, pixel) in canvas.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            inked += 1;
            assert!((48..50 + size.width + 2).contains(&x), "x={x} outside block");
            assert!((38..40 + size.height + 2).contains(&y), "y={y} outside block");
        }
        assert!(inked > 0);
        // Glyph interiors are fully covered and take the text color
        assert!(
            canvas
                .pixels()
                .any(|p| p[0] > 250 && p[1] == 0 && p[2] == 0 && p[3] > 250)
        );
    }

    #[test]
    fn draw_blends_coverage_over_background() {
        let backend = backend();
        let mut canvas = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255]));
        backend.draw(&mut canvas, (10, 10), "Hi", 40.0, TextAlign::Left, RED);

        // Canvas stays opaque; antialiased edges mix text and background
        assert!(canvas.pixels().all(|p| p[3] == 255));
        assert!(canvas.pixels().any(|p| p[0] > 250 && p[2] < 5));
        assert!(canvas.pixels().any(|p| p[0] > 20 && p[0] < 235 && p[2] > 20));
    }

    #[test]
    fn alignment_shifts_short_lines_within_block() {
        let backend = backend();
        let text = "WWWW\nii";
        let px = 40.0;
        let scale = PxScale::from(px);
        let line_height = backend.line_height(scale);
        let block_width = backend.measure(text, px).width as f32;
        let short_width = line_width(&backend.font.as_scaled(scale), "ii");
        let second_line = 20 + line_height + LINE_SPACING..20 + 2 * line_height + LINE_SPACING;

        let render = |align| {
            let mut canvas = RgbaImage::new(400, 200);
            backend.draw(&mut canvas, (20, 20), text, px, align, RED);
            canvas
        };
        let left = render(TextAlign::Left);
        let right = render(TextAlign::Right);
        let center = render(TextAlign::Center);

        let left_x = ink_min_x(&left, second_line.clone()).unwrap() as f32;
        let right_x = ink_min_x(&right, second_line.clone()).unwrap() as f32;
        let center_x = ink_min_x(&center, second_line).unwrap() as f32;

        let full_shift = block_width - short_width;
        assert!(full_shift > 0.0);
        assert!((right_x - left_x - full_shift).abs() <= 1.0);
        assert!((center_x - left_x - full_shift / 2.0).abs() <= 1.0);

        // The long line spans the block, so alignment barely moves it
        let long_left = ink_min_x(&left, 20..20 + line_height).unwrap();
        let long_right = ink_min_x(&right, 20..20 + line_height).unwrap();
        assert!(long_right.abs_diff(long_left) <= 1);
    }

    #[test]
    fn open_rejects_non_font_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("font.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        assert!(matches!(
            FontBackend::open(&path),
            Err(BackendError::ProcessingFailed(_))
        ));
    }

    #[test]
    fn open_missing_font_is_io_error() {
        assert!(matches!(
            FontBackend::open(Path::new("/nonexistent/font.ttf")),
            Err(BackendError::Io(_))
        ));
    }
}
