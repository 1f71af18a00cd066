//! Caption configuration module.
//!
//! Handles loading, validating, and merging caption config files. A config
//! is layered: stock defaults are overridden by a config file, and in batch
//! mode by the jobs file's `[defaults]` table and each job's own `config`
//! table.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [canvas]
//! # size = [1080, 1080]     # Output size; omit to use the photo's size
//! image_mode = "overlay"    # overlay | not_overlay
//! filter_color = "#00000000"
//! post_filters = []         # e.g. ["smooth", { gaussian_blur = { radius = 2.0 } }]
//!
//! [text]
//! # font_path = "fonts/Impact.ttf"
//! align = "left"            # left | right | center
//! color = "#ffffffff"
//! # min_height = 0.1        # Minimum text block height (fraction of height)
//! # character_ratio = 0.05  # Font size as a fraction of width; estimated if omitted
//!
//! [margins]
//! left = 0.2
//! right = 0.2
//! bottom = 0.07             # Exactly one of bottom / top
//! # top = 0.1
//!
//! [panel]
//! mode = "stripe"           # none | attach_to_bottom | attach_to_top | stripe
//! color = "#000000b4"
//! padding = 0.2
//!
//! [palette]
//! auto = false              # Pick text and panel colors from the photo
//! entries = [
//!     { text = "#000000", background = "#f5f5f5" },
//!     { text = "#ffffff", background = "#000000" },
//! ]
//! ```
//!
//! ## Vertical margin layering
//!
//! A layer cannot unset a key, so a layer that sets exactly one of
//! `margins.bottom` / `margins.top` replaces whichever one it inherited.
//! Setting both in the same layer is an error.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::palette::BLACK_WHITE_PALETTE;
use crate::types::{Color, ImageMode, PaletteEntry, PanelMode, PostFilter, TextAlign};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Caption configuration.
///
/// All fields have defaults; config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    /// Output canvas, photo treatment and post filters.
    pub canvas: CanvasConfig,
    /// Font, alignment, color and sizing of the caption text.
    pub text: TextConfig,
    /// Text margins as fractions of the canvas.
    pub margins: MarginsConfig,
    /// Background panel behind the text.
    pub panel: PanelConfig,
    /// Automatic text/panel color selection.
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Output `[width, height]`. When absent, the photo's own size is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
    pub image_mode: ImageMode,
    /// Color composited over the whole photo.
    pub filter_color: Color,
    /// Filters applied to the whole canvas, in order, after the color filter.
    pub post_filters: Vec<PostFilter>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            size: None,
            image_mode: ImageMode::Overlay,
            filter_color: Color::TRANSPARENT,
            post_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// Font file used to measure and draw the caption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    pub align: TextAlign,
    pub color: Color,
    /// Minimum text block height as a fraction of the canvas height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f64>,
    /// Font size as a fraction of the canvas width.
    /// When absent, estimated from the text length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_ratio: Option<f64>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            align: TextAlign::Left,
            color: Color::WHITE,
            min_height: None,
            character_ratio: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarginsConfig {
    pub left: f64,
    pub right: f64,
    // Missing vertical margins stay unset instead of falling back to the
    // stock bottom margin, so a layer naming only `top` stays valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
}

impl Default for MarginsConfig {
    fn default() -> Self {
        Self {
            left: 0.2,
            right: 0.2,
            bottom: Some(0.07),
            top: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    pub mode: PanelMode,
    pub color: Color,
    /// Padding around the text as a fraction of the text height
    /// (stripe and none panels only).
    pub padding: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            mode: PanelMode::Stripe,
            color: Color::rgba(0, 0, 0, 180),
            padding: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteConfig {
    /// Replace text and panel colors with the entry matching the photo.
    pub auto: bool,
    pub entries: Vec<PaletteEntry>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            auto: false,
            entries: BLACK_WHITE_PALETTE.to_vec(),
        }
    }
}

impl CaptionConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Validation(format!(
                    "{name} must be between 0 and 1, got {value}"
                )))
            }
        };

        fraction("margins.left", self.margins.left)?;
        fraction("margins.right", self.margins.right)?;
        if self.margins.left + self.margins.right >= 1.0 {
            return Err(ConfigError::Validation(
                "margins.left + margins.right must leave room for text".into(),
            ));
        }
        match (self.margins.bottom, self.margins.top) {
            (Some(bottom), None) => fraction("margins.bottom", bottom)?,
            (None, Some(top)) => fraction("margins.top", top)?,
            _ => {
                return Err(ConfigError::Validation(
                    "provide either margins.bottom or margins.top".into(),
                ));
            }
        }
        if let Some(min_height) = self.text.min_height {
            fraction("text.min_height", min_height)?;
        }
        if let Some(ratio) = self.text.character_ratio {
            if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
                return Err(ConfigError::Validation(format!(
                    "text.character_ratio must be in (0, 1], got {ratio}"
                )));
            }
        }
        if self.panel.padding.is_nan() || self.panel.padding < 0.0 {
            return Err(ConfigError::Validation(
                "panel.padding must not be negative".into(),
            ));
        }
        if let Some([w, h]) = self.canvas.size {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(
                    "canvas.size values must be non-zero".into(),
                ));
            }
        }
        if self.palette.auto && self.palette.entries.is_empty() {
            return Err(ConfigError::Validation(
                "palette.entries must not be empty when palette.auto is set".into(),
            ));
        }
        Ok(())
    }

    /// Resolve a relative font path against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(font) = &self.text.font_path {
            if font.is_relative() {
                self.text.font_path = Some(base.join(font));
            }
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CaptionConfig::default()).expect("default config must serialize")
}

/// A resolved config as a TOML value, for use as the base of further layers.
pub fn config_to_value(config: &CaptionConfig) -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(config)?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved, except that a
///   `margins` table naming only one of `bottom`/`top` drops the other.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    merge_at(base, overlay, &[])
}

fn merge_at(base: toml::Value, overlay: toml::Value, path: &[&str]) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            if path == ["margins"] {
                let sets_bottom = overlay_table.contains_key("bottom");
                let sets_top = overlay_table.contains_key("top");
                if sets_bottom && !sets_top {
                    base_table.remove("top");
                } else if sets_top && !sets_bottom {
                    base_table.remove("bottom");
                }
            }
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => {
                        let mut child = path.to_vec();
                        child.push(key.as_str());
                        merge_at(base_val, overlay_val, &child)
                    }
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<CaptionConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: CaptionConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file, merged over the stock defaults.
///
/// A relative `text.font_path` is resolved against the file's directory,
/// made absolute so later layers cannot re-anchor it.
pub fn load_config(path: &Path) -> Result<CaptionConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    let mut config = resolve_config(stock_defaults_value(), [overlay])?;
    let dir = path.parent().unwrap_or(Path::new(""));
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    config.resolve_paths(&dir);
    Ok(config)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Caption Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Fractions are relative to the output canvas: horizontal ones to its
# width, vertical ones to its height.
# Colors are "#RGB", "#RRGGBB" or "#RRGGBBAA".
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Canvas and photo
# ---------------------------------------------------------------------------
[canvas]
# Output size as [width, height]. Omit to use the photo's own size.
# The photo is scaled to cover the canvas and center-cropped.
# size = [1080, 1080]

# "overlay": text and panel are drawn on top of the photo.
# "not_overlay": the photo and the panel get separate bands
# (requires an attach_to_top or attach_to_bottom panel).
image_mode = "overlay"

# Color composited over the whole photo, e.g. "#00000060" to darken it.
filter_color = "#00000000"

# Filters applied to the whole canvas, in order. Available:
# blur, contour, detail, edge_enhance, edge_enhance_more, emboss,
# find_edges, sharpen, smooth, smooth_more,
# { gaussian_blur = { radius = 2.0 } },
# { unsharp_mask = { sigma = 0.5, threshold = 0 } }
post_filters = []

# ---------------------------------------------------------------------------
# Caption text
# ---------------------------------------------------------------------------
[text]
# TrueType/OpenType font. Relative paths resolve against this file.
# font_path = "fonts/Impact.ttf"

# "left", "right" or "center" (lines aligned within the text block).
align = "left"

color = "#ffffffff"

# Minimum height of the text block as a fraction of the canvas height.
# min_height = 0.1

# Font size as a fraction of the canvas width. When omitted it is
# estimated from the caption length: -0.0005 * characters + 0.116
# character_ratio = 0.05

# ---------------------------------------------------------------------------
# Margins
# ---------------------------------------------------------------------------
[margins]
left = 0.2
right = 0.2

# Exactly one of bottom / top. Setting one in a config layer replaces
# the other one inherited from defaults.
bottom = 0.07
# top = 0.1

# ---------------------------------------------------------------------------
# Background panel
# ---------------------------------------------------------------------------
[panel]
# "none", "attach_to_bottom", "attach_to_top" or "stripe".
mode = "stripe"

color = "#000000b4"

# Padding around the text as a fraction of the text height
# (stripe and none panels only).
padding = 0.2

# ---------------------------------------------------------------------------
# Automatic palette
# ---------------------------------------------------------------------------
[palette]
# When true, text and panel colors are picked from the entries below
# according to the photo's average brightness: brighter photos get
# darker backgrounds.
auto = false

entries = [
    { text = "#000000ff", background = "#f5f5f5ff" },
    { text = "#ffffffff", background = "#000000ff" },
]
"##
}
