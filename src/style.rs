//! Style records and themes
//!
//! A [`Style`] is a partial record attached to a node: every attribute is
//! optional and unset ones fall back to an inherited style and finally to the
//! canvas [`Theme`]. Themes are plain TOML:
//!
//! ```toml
//! [metadata]
//! name = "Slate"
//!
//! [style]
//! padding = 6
//! fill_color = "#eceff1"
//! stroke_color = "#37474f"
//! anchor = "mm"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{Color, Point};

/// Errors that can occur when loading a theme
#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("failed to read theme file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse theme TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Text anchor, as a horizontal/vertical pair of two-letter codes
///
/// Horizontal: `l`eft, `m`iddle, `r`ight. Vertical: `a`scender (top),
/// `m`iddle, `d`escender (bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Anchor {
    #[default]
    TopLeft,
    TopMiddle,
    TopRight,
    MiddleLeft,
    Middle,
    MiddleRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

impl Anchor {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TopLeft => "la",
            Self::TopMiddle => "ma",
            Self::TopRight => "ra",
            Self::MiddleLeft => "lm",
            Self::Middle => "mm",
            Self::MiddleRight => "rm",
            Self::BottomLeft => "ld",
            Self::BottomMiddle => "md",
            Self::BottomRight => "rd",
        }
    }

    /// Shift from the anchor point to the top-left corner of a `size` box
    pub fn shift(&self, size: Point) -> Point {
        let code = self.code().as_bytes();
        let dx = match code[0] {
            b'm' => -size.x / 2.0,
            b'r' => -size.x,
            _ => 0.0,
        };
        let dy = match code[1] {
            b'm' => -size.y / 2.0,
            b'd' => -size.y,
            _ => 0.0,
        };
        Point::new(dx, dy)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid anchor '{0}' (expected one of la ma ra lm mm rm ld md rd)")]
pub struct ParseAnchorError(pub String);

impl FromStr for Anchor {
    type Err = ParseAnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "la" => Self::TopLeft,
            "ma" => Self::TopMiddle,
            "ra" => Self::TopRight,
            "lm" => Self::MiddleLeft,
            "mm" => Self::Middle,
            "rm" => Self::MiddleRight,
            "ld" => Self::BottomLeft,
            "md" => Self::BottomMiddle,
            "rd" => Self::BottomRight,
            other => return Err(ParseAnchorError(other.to_string())),
        })
    }
}

impl TryFrom<String> for Anchor {
    type Error = ParseAnchorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Horizontal placement of text inside its box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

/// Colour-valued style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorAttribute {
    Stroke,
    Fill,
    Font,
}

/// A fully resolved style record
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolvedStyle {
    pub padding: f64,
    pub font: String,
    pub font_size: f64,
    pub anchor: Anchor,
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub fill_color: Color,
    pub font_color: Color,
    pub alpha: u8,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            padding: 10.0,
            font: crate::renderer::DEFAULT_FONT.to_string(),
            font_size: 32.0,
            anchor: Anchor::TopLeft,
            stroke_color: Color::BLACK,
            stroke_width: 1.0,
            fill_color: Color::WHITE,
            font_color: Color::BLACK,
            alpha: 255,
        }
    }
}

impl ResolvedStyle {
    pub fn color(&self, attribute: ColorAttribute) -> Color {
        match attribute {
            ColorAttribute::Stroke => self.stroke_color,
            ColorAttribute::Fill => self.fill_color,
            ColorAttribute::Font => self.font_color,
        }
    }
}

/// A partial style: unset attributes are inherited
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub padding: Option<f64>,
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub anchor: Option<Anchor>,
    pub stroke_color: Option<Color>,
    pub stroke_width: Option<f64>,
    pub fill_color: Option<Color>,
    pub font_color: Option<Color>,
    pub alpha: Option<u8>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_stroke_color(mut self, color: Color) -> Self {
        self.stroke_color = Some(color);
        self
    }

    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn with_fill_color(mut self, color: Color) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn with_font_color(mut self, color: Color) -> Self {
        self.font_color = Some(color);
        self
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn set_color(&mut self, attribute: ColorAttribute, color: Color) {
        let slot = match attribute {
            ColorAttribute::Stroke => &mut self.stroke_color,
            ColorAttribute::Fill => &mut self.fill_color,
            ColorAttribute::Font => &mut self.font_color,
        };
        *slot = Some(color);
    }

    /// This style with unset attributes taken from `base`
    pub fn inherit(&self, base: &Style) -> Style {
        Style {
            padding: self.padding.or(base.padding),
            font: self.font.clone().or_else(|| base.font.clone()),
            font_size: self.font_size.or(base.font_size),
            anchor: self.anchor.or(base.anchor),
            stroke_color: self.stroke_color.or(base.stroke_color),
            stroke_width: self.stroke_width.or(base.stroke_width),
            fill_color: self.fill_color.or(base.fill_color),
            font_color: self.font_color.or(base.font_color),
            alpha: self.alpha.or(base.alpha),
        }
    }

    pub fn resolve(&self, defaults: &ResolvedStyle) -> ResolvedStyle {
        ResolvedStyle {
            padding: self.padding.unwrap_or(defaults.padding),
            font: self.font.clone().unwrap_or_else(|| defaults.font.clone()),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            anchor: self.anchor.unwrap_or(defaults.anchor),
            stroke_color: self.stroke_color.unwrap_or(defaults.stroke_color),
            stroke_width: self.stroke_width.unwrap_or(defaults.stroke_width),
            fill_color: self.fill_color.unwrap_or(defaults.fill_color),
            font_color: self.font_color.unwrap_or(defaults.font_color),
            alpha: self.alpha.unwrap_or(defaults.alpha),
        }
    }
}

/// Blend `own` over `parent` with `alpha` (0..=255)
pub fn composite_color(parent: Color, own: Color, alpha: u8) -> Color {
    parent.mix(own, alpha as f64 / 255.0)
}

/// Multiply alpha down the structural parent chain
pub fn composite_alpha(parent: u8, own: u8) -> u8 {
    (parent as u32 * own as u32 / 255) as u8
}

/// Canvas-wide default style
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Theme {
    pub name: Option<String>,
    pub description: Option<String>,
    pub defaults: ResolvedStyle,
}

#[derive(Deserialize)]
struct TomlTheme {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    style: Style,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

impl Theme {
    pub fn new(defaults: ResolvedStyle) -> Self {
        Self {
            name: None,
            description: None,
            defaults,
        }
    }

    /// Load a theme from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ThemeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a theme from a TOML string; unset attributes keep built-in defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ThemeError> {
        let parsed: TomlTheme = toml::from_str(content)?;
        Ok(Theme {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            description: parsed.metadata.as_ref().and_then(|m| m.description.clone()),
            defaults: parsed.style.resolve(&ResolvedStyle::default()),
        })
    }

    pub fn resolve(&self, style: &Style) -> ResolvedStyle {
        style.resolve(&self.defaults)
    }
}
