//! Shared test utilities for the simple-caption test suite.
//!
//! Builds solid-color images in memory and writes them as fixture files,
//! so tests never depend on binary assets checked into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let photo = write_fixture(tmp.path(), "photo.png", &solid_image(800, 600, [255, 0, 0, 255]));
//! let jobs = write_file(tmp.path(), "jobs.toml", "[[job]]\n...");
//! ```

use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Fixture images
// =========================================================================

/// A `width` x `height` image filled with one RGBA color.
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// Save `img` under `dir/name` (format from the extension) and return the path.
pub fn write_fixture(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    img.save(&path).unwrap();
    path
}

// =========================================================================
// Fixture text files
// =========================================================================

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
