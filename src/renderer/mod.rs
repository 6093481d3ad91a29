//! Drawing backends
//!
//! The scene graph only talks to the [`Renderer`] trait: four drawing
//! primitives, a text measurement, and the surface size. [`RasterRenderer`]
//! is the bundled implementation on top of `tiny-skia` and `swash`.

pub mod config;
pub mod fonts;
pub mod raster;

pub use config::RenderContext;
pub use fonts::DEFAULT_FONT;
pub use raster::RasterRenderer;

use crate::geometry::{Color, Point};
use crate::style::{Anchor, ResolvedStyle};

/// Everything a backend needs to draw one primitive
///
/// Colours are already composited against the node's structural parents;
/// `alpha` is the composited opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub font: String,
    pub font_size: f64,
    pub anchor: Anchor,
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub fill_color: Color,
    pub font_color: Color,
    pub alpha: u8,
}

impl From<&ResolvedStyle> for Paint {
    fn from(style: &ResolvedStyle) -> Self {
        Self {
            font: style.font.clone(),
            font_size: style.font_size,
            anchor: style.anchor,
            stroke_color: style.stroke_color,
            stroke_width: style.stroke_width,
            fill_color: style.fill_color,
            font_color: style.font_color,
            alpha: style.alpha,
        }
    }
}

/// Text extent relative to the anchor point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl TextBounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// A drawing surface
pub trait Renderer {
    /// Filled rectangle with a stroke ring; both corners are inclusive
    fn rectangle(&mut self, p1: Point, p2: Point, paint: &Paint);

    /// Text placed so that `paint.anchor` lands on `position`
    fn text(&mut self, text: &str, position: Point, paint: &Paint);

    fn text_bbox(&self, text: &str, paint: &Paint) -> TextBounds;

    fn line(&mut self, p1: Point, p2: Point, paint: &Paint);

    /// Logical size of the content about to be drawn
    fn set_dimensions(&mut self, size: Point);

    fn width(&self) -> f64;

    fn height(&self) -> f64;

    /// Shrink the surface to the last dimensions set
    fn crop_to_fit(&mut self);

    /// Reset to an empty surface of the configured size
    fn clear(&mut self);
}
