//! Shared value types used by configuration, layout and compositing.
//!
//! The string-valued options of a caption (overlay mode, panel mode, text
//! alignment, post filters) are closed enums. Every branch point in the
//! layout engine matches on them exhaustively, so a new variant cannot be
//! added without revisiting the panel-height formula, validation and
//! placement.
//!
//! All types here round-trip through TOML (`snake_case` names, colors as
//! hex strings) and parse from CLI arguments via [`FromStr`].

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the caption panel shares the photo's region or reserves its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    /// Panel and text are drawn on top of the photo.
    #[default]
    Overlay,
    /// Photo and panel occupy disjoint vertical regions.
    NotOverlay,
}

/// Shape and placement of the background panel behind the caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelMode {
    /// No visible panel.
    None,
    /// Full-width panel hugging the bottom margin.
    AttachToBottom,
    /// Full-width panel starting at the top edge of the canvas.
    AttachToTop,
    /// Full-width band around the text, sized by the panel padding.
    #[default]
    Stripe,
}

impl PanelMode {
    /// True for the modes whose height is derived from the vertical margin.
    pub fn is_attached(self) -> bool {
        match self {
            PanelMode::AttachToBottom | PanelMode::AttachToTop => true,
            PanelMode::None | PanelMode::Stripe => false,
        }
    }
}

/// Horizontal alignment of the lines inside the wrapped text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
}

macro_rules! snake_case_enum_str {
    ($ty:ty { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value '{other}', expected one of: {}",
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

snake_case_enum_str!(ImageMode {
    ImageMode::Overlay => "overlay",
    ImageMode::NotOverlay => "not_overlay",
});

snake_case_enum_str!(PanelMode {
    PanelMode::None => "none",
    PanelMode::AttachToBottom => "attach_to_bottom",
    PanelMode::AttachToTop => "attach_to_top",
    PanelMode::Stripe => "stripe",
});

snake_case_enum_str!(TextAlign {
    TextAlign::Left => "left",
    TextAlign::Right => "right",
    TextAlign::Center => "center",
});

/// An RGBA color, written in config files as `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
///
/// Colors without an alpha component are fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Brightness proxy used by palette estimation: mean of R, G and B.
    pub fn luminance(self) -> f64 {
        let [r, g, b, _] = self.0;
        (r as f64 + g as f64 + b as f64) / 3.0
    }

    /// Parse a hex color string.
    pub fn parse_hex(hex: &str) -> Result<Self, String> {
        let digits = hex
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{hex}' must start with '#'"))?;
        if !digits.is_ascii() {
            return Err(format!("color '{hex}' contains non-hex characters"));
        }

        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| format!("color '{hex}' has invalid hex digits"))
        };

        match digits.len() {
            3 => {
                // #RGB: each digit doubled, 0xF -> 0xFF
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self([r * 17, g * 17, b * 17, 255]))
            }
            6 | 8 => {
                let r = channel(&digits[0..2])?;
                let g = channel(&digits[2..4])?;
                let b = channel(&digits[4..6])?;
                let a = if digits.len() == 8 {
                    channel(&digits[6..8])?
                } else {
                    255
                };
                Ok(Self([r, g, b, a]))
            }
            n => Err(format!(
                "color '{hex}' must be #RGB, #RRGGBB or #RRGGBBAA, got {n} digits"
            )),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba(color.0)
    }
}

/// A readable (text color, background color) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaletteEntry {
    pub text: Color,
    pub background: Color,
}

/// A filter kernel applied to the whole canvas after the color filter.
///
/// In TOML, fixed kernels are plain strings and parameterized kernels are
/// inline tables:
///
/// ```toml
/// post_filters = ["smooth", { gaussian_blur = { radius = 2.0 } }]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostFilter {
    Blur,
    Contour,
    Detail,
    EdgeEnhance,
    EdgeEnhanceMore,
    Emboss,
    FindEdges,
    Sharpen,
    Smooth,
    SmoothMore,
    GaussianBlur { radius: f32 },
    UnsharpMask { sigma: f32, threshold: i32 },
}

impl fmt::Display for PostFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostFilter::Blur => f.write_str("blur"),
            PostFilter::Contour => f.write_str("contour"),
            PostFilter::Detail => f.write_str("detail"),
            PostFilter::EdgeEnhance => f.write_str("edge_enhance"),
            PostFilter::EdgeEnhanceMore => f.write_str("edge_enhance_more"),
            PostFilter::Emboss => f.write_str("emboss"),
            PostFilter::FindEdges => f.write_str("find_edges"),
            PostFilter::Sharpen => f.write_str("sharpen"),
            PostFilter::Smooth => f.write_str("smooth"),
            PostFilter::SmoothMore => f.write_str("smooth_more"),
            PostFilter::GaussianBlur { radius } => write!(f, "gaussian_blur:{radius}"),
            PostFilter::UnsharpMask { sigma, threshold } => {
                write!(f, "unsharp_mask:{sigma},{threshold}")
            }
        }
    }
}

/// Parses the CLI form: `blur`, `gaussian_blur:2.5`, `unsharp_mask:0.5,0`.
impl FromStr for PostFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let (name, args) = match normalized.split_once(':') {
            Some((name, args)) => (name.to_string(), Some(args.to_string())),
            None => (normalized, None),
        };

        let float = |v: &str| {
            v.trim()
                .parse::<f32>()
                .map_err(|_| format!("invalid number '{v}' for filter '{name}'"))
        };

        match (name.as_str(), args.as_deref()) {
            ("blur", None) => Ok(PostFilter::Blur),
            ("contour", None) => Ok(PostFilter::Contour),
            ("detail", None) => Ok(PostFilter::Detail),
            ("edge_enhance", None) => Ok(PostFilter::EdgeEnhance),
            ("edge_enhance_more", None) => Ok(PostFilter::EdgeEnhanceMore),
            ("emboss", None) => Ok(PostFilter::Emboss),
            ("find_edges", None) => Ok(PostFilter::FindEdges),
            ("sharpen", None) => Ok(PostFilter::Sharpen),
            ("smooth", None) => Ok(PostFilter::Smooth),
            ("smooth_more", None) => Ok(PostFilter::SmoothMore),
            ("gaussian_blur", Some(radius)) => Ok(PostFilter::GaussianBlur {
                radius: float(radius)?,
            }),
            ("unsharp_mask", Some(args)) => {
                let (sigma, threshold) = args
                    .split_once(',')
                    .ok_or_else(|| "unsharp_mask expects 'sigma,threshold'".to_string())?;
                let threshold = threshold
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| format!("invalid threshold '{threshold}' for unsharp_mask"))?;
                Ok(PostFilter::UnsharpMask {
                    sigma: float(sigma)?,
                    threshold,
                })
            }
            (other, _) => Err(format!("unknown post filter '{other}'")),
        }
    }
}
