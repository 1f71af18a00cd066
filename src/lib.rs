//! # Simple Caption
//!
//! Batch generator for captioned images: a background photo, an optional
//! color filter and post filters, and a word-wrapped caption drawn over an
//! optionally colored background panel. Meme and card style output, driven
//! by declarative TOML config.
//!
//! # Architecture: Plan, Then Composite
//!
//! A render is split into a pure planning step and a pixel step:
//!
//! ```text
//! 1. Wrap      text + width function  →  lines that fit the margins
//! 2. Layout    canvas + config + text box  →  panel, photo placement, anchor
//! 3. Composite photo → filter color → post filters → panel → text
//! ```
//!
//! Wrapping and layout never touch pixels, so they are unit tested with
//! synthetic width functions and a mock [`imaging::TextBackend`]. Only the
//! last step needs a real font and image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Wrapping, palette estimation, layout geometry, compositing, font rasterization |
//! | [`config`] | Layered `CaptionConfig` loading, validation, merging, stock config text |
//! | [`types`] | Closed option enums, `Color`, `PaletteEntry`, `PostFilter` |
//! | [`process`] | Parallel batch rendering of a jobs file |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Closed Option Enums
//!
//! Image mode, panel mode, alignment and post filters are enums matched
//! exhaustively wherever they branch (panel height, validation, placement),
//! so a new variant is a compile error until every consumer handles it.
//!
//! ## Injected Text Measurement
//!
//! [`imaging::wrap_text`] takes a width function rather than a font. The
//! compositor binds it to a [`imaging::TextBackend`] at the chosen pixel
//! size, keeping wrapping independent of rasterization.
//!
//! ## Pure-Rust Raster Stack
//!
//! Decoding, resampling and compositing use the `image` crate; glyphs are
//! rasterized with `ab_glyph`. No system libraries are needed.
//!
//! ## Config Layering
//!
//! ```text
//! stock defaults → config file → jobs [defaults] → job config
//! ```
//!
//! Each layer only names what it changes. Layers merge table by table in
//! [`config::merge_toml`].

pub mod config;
pub mod imaging;
pub mod output;
pub mod process;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
