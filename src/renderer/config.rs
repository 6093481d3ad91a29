//! Configuration for raster rendering

use crate::geometry::Color;

/// Target surface for one rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// Logical width of the render target
    pub width: u32,

    /// Logical height of the render target
    pub height: u32,

    /// Physical pixels per logical unit
    pub scale: u32,

    /// Colour the surface is cleared to
    pub background: Color,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            scale: 1,
            background: Color::WHITE,
        }
    }
}

impl RenderContext {
    /// Create a context of the given logical size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the upscaling factor (clamped to at least 1)
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Whether frames drawn on this context can contain partial transparency
    pub fn has_transparent_background(&self) -> bool {
        self.background.a < 255
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let context = RenderContext::default();
        assert_eq!(context.width, 640);
        assert_eq!(context.height, 480);
        assert_eq!(context.scale, 1);
        assert_eq!(context.background, Color::WHITE);
    }

    #[test]
    fn test_builder_pattern() {
        let context = RenderContext::new(5, 5)
            .with_scale(0)
            .with_background(Color::TRANSPARENT);
        assert_eq!(context.width, 5);
        assert_eq!(context.scale, 1);
        assert!(context.has_transparent_background());
    }
}
