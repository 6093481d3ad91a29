//! Raster backend on `tiny-skia`
//!
//! The surface is an `image::RgbaImage` holding premultiplied pixels, so
//! `tiny_skia::PixmapMut` can draw into it in place. Shapes are filled
//! without anti-aliasing to keep pixel edges on the logical grid; glyphs
//! keep their coverage.

use image::{imageops, Rgba, RgbaImage};
use tiny_skia as sk;
use tracing::trace;

use super::fonts::{self, Face};
use super::{Paint, RenderContext, Renderer, TextBounds};
use crate::geometry::{Color, Point};

/// Renders into an in-memory RGBA surface
///
/// All drawing coordinates are logical; each logical pixel covers
/// `scale × scale` physical pixels.
#[derive(Debug, Clone)]
pub struct RasterRenderer {
    context: RenderContext,
    surface: RgbaImage,
    dimensions: Option<(u32, u32)>,
}

impl RasterRenderer {
    pub fn new(context: RenderContext) -> Self {
        let surface = blank(&context, context.width, context.height);
        Self {
            context,
            surface,
            dimensions: None,
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Physical size of the surface
    pub fn dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    /// The surface with straight (not premultiplied) alpha
    pub fn to_image(&self) -> RgbaImage {
        let (width, height) = self.surface.dimensions();
        RgbaImage::from_fn(width, height, |x, y| {
            let c = demultiply(self.surface.get_pixel(x, y));
            Rgba(c.to_array())
        })
    }

    pub fn into_image(self) -> RgbaImage {
        self.to_image()
    }

    /// Colour of a logical pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let s = self.context.scale;
        self.surface.get_pixel_checked(x * s, y * s).map(demultiply)
    }

    fn scale(&self) -> sk::Transform {
        let s = self.context.scale as f32;
        sk::Transform::from_scale(s, s)
    }

    fn pixmap(&mut self) -> Option<sk::PixmapMut<'_>> {
        let (width, height) = self.surface.dimensions();
        sk::PixmapMut::from_bytes(&mut self.surface, width, height)
    }

    /// Fill the logical pixel rectangle `[x0, x1] × [y0, y1]`
    fn fill_cells(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color, alpha: u8) {
        if x1 < x0 || y1 < y0 {
            return;
        }
        let rect = sk::Rect::from_ltrb(x0 as f32, y0 as f32, (x1 + 1) as f32, (y1 + 1) as f32);
        let transform = self.scale();
        let paint = solid(color, alpha);
        if let (Some(rect), Some(mut pixmap)) = (rect, self.pixmap()) {
            pixmap.fill_rect(rect, &paint, transform, None);
        }
    }

    fn face(paint: &Paint) -> Option<Face> {
        fonts::face(&paint.font)
    }
}

fn solid(color: Color, alpha: u8) -> sk::Paint<'static> {
    let a = (color.a as u16 * alpha as u16 + 127) / 255;
    let mut paint = sk::Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, a as u8);
    paint.anti_alias = false;
    paint
}

fn demultiply(p: &Rgba<u8>) -> Color {
    match sk::PremultipliedColorU8::from_rgba(p[0], p[1], p[2], p[3]) {
        Some(c) => {
            let c = c.demultiply();
            Color::rgba(c.red(), c.green(), c.blue(), c.alpha())
        }
        None => Color::rgba(p[0], p[1], p[2], p[3]),
    }
}

fn blank(context: &RenderContext, width: u32, height: u32) -> RgbaImage {
    let bg = context.background;
    let c = sk::ColorU8::from_rgba(bg.r, bg.g, bg.b, bg.a).premultiply();
    RgbaImage::from_pixel(
        width * context.scale,
        height * context.scale,
        Rgba([c.red(), c.green(), c.blue(), c.alpha()]),
    )
}

fn round(p: Point) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

impl Renderer for RasterRenderer {
    fn rectangle(&mut self, p1: Point, p2: Point, paint: &Paint) {
        let (ax, ay) = round(p1);
        let (bx, by) = round(p2);
        let (x0, x1) = (ax.min(bx), ax.max(bx));
        let (y0, y1) = (ay.min(by), ay.max(by));
        let sw = paint.stroke_width.round().max(0.0) as i64;
        let (stroke, alpha) = (paint.stroke_color, paint.alpha);
        trace!(x0, y0, x1, y1, "rectangle");

        // ring and interior are disjoint so translucent paint blends once
        self.fill_cells(x0 + sw, y0 + sw, x1 - sw, y1 - sw, paint.fill_color, alpha);
        if sw == 0 {
            return;
        }
        let top_end = (y0 + sw - 1).min(y1);
        let bottom_start = (y1 - sw + 1).max(top_end + 1);
        self.fill_cells(x0, y0, x1, top_end, stroke, alpha);
        self.fill_cells(x0, bottom_start, x1, y1, stroke, alpha);
        let left_end = (x0 + sw - 1).min(x1);
        let right_start = (x1 - sw + 1).max(left_end + 1);
        self.fill_cells(x0, top_end + 1, left_end, bottom_start - 1, stroke, alpha);
        self.fill_cells(right_start, top_end + 1, x1, bottom_start - 1, stroke, alpha);
    }

    fn text(&mut self, text: &str, position: Point, paint: &Paint) {
        let Some(face) = Self::face(paint) else {
            return;
        };
        let bounds = self.text_bbox(text, paint);
        let s = self.context.scale as f64;
        let px = paint.font_size * s;
        let metrics = face.line_metrics(px);
        let left = ((position.x + bounds.left) * s).round() as i32;
        let top = ((position.y + bounds.top) * s).round() as i32;
        let color = paint.font_color;
        let glyph_paint = sk::PixmapPaint {
            opacity: (color.a as f32 / 255.0) * (paint.alpha as f32 / 255.0),
            ..sk::PixmapPaint::default()
        };
        let Some(mut target) = self.pixmap() else {
            return;
        };

        for (line_no, line) in text.split('\n').enumerate() {
            let baseline = top + (line_no as f64 * metrics.pitch + metrics.ascent) as i32;
            let mut pen = left as f64;
            for glyph in face.glyphs(line, px) {
                if let Some(mut mask) = sk::Pixmap::new(glyph.width, glyph.height) {
                    for (dst, &cov) in mask.pixels_mut().iter_mut().zip(&glyph.coverage) {
                        *dst = sk::ColorU8::from_rgba(color.r, color.g, color.b, cov).premultiply();
                    }
                    target.draw_pixmap(
                        pen.round() as i32 + glyph.left,
                        baseline - glyph.top,
                        mask.as_ref(),
                        &glyph_paint,
                        sk::Transform::identity(),
                        None,
                    );
                }
                pen += glyph.advance;
            }
        }
    }

    fn text_bbox(&self, text: &str, paint: &Paint) -> TextBounds {
        let (width, height) = match Self::face(paint) {
            Some(face) => face.measure(text, paint.font_size),
            None => (0.0, 0.0),
        };
        let size = Point::new(width, height);
        let shift = paint.anchor.shift(size);
        TextBounds {
            left: shift.x,
            top: shift.y,
            right: shift.x + size.x,
            bottom: shift.y + size.y,
        }
    }

    fn line(&mut self, p1: Point, p2: Point, paint: &Paint) {
        let sw = paint.stroke_width.round().max(1.0) as i64;
        let (a, b) = (round(p1), round(p2));
        if a == b {
            let lead = (sw - 1) / 2;
            let (x, y) = (a.0 - lead, a.1 - lead);
            self.fill_cells(x, y, x + sw - 1, y + sw - 1, paint.stroke_color, paint.alpha);
            return;
        }
        // odd pens are centred on the pixel, even pens on its top-left corner
        let centre = if sw % 2 == 1 { 0.5 } else { 0.0 };
        let mut builder = sk::PathBuilder::new();
        builder.move_to(a.0 as f32 + centre, a.1 as f32 + centre);
        builder.line_to(b.0 as f32 + centre, b.1 as f32 + centre);
        let Some(path) = builder.finish() else {
            return;
        };
        let stroke = sk::Stroke {
            width: sw as f32,
            line_cap: sk::LineCap::Square,
            ..sk::Stroke::default()
        };
        let paint = solid(paint.stroke_color, paint.alpha);
        let transform = self.scale();
        if let Some(mut pixmap) = self.pixmap() {
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }

    fn set_dimensions(&mut self, size: Point) {
        let width = size.x.ceil().max(0.0) as u32;
        let height = size.y.ceil().max(0.0) as u32;
        let s = self.context.scale;
        let (w, h) = self.surface.dimensions();
        if width * s > w || height * s > h {
            let mut grown = blank(&self.context, width.max(w / s), height.max(h / s));
            imageops::replace(&mut grown, &self.surface, 0, 0);
            self.surface = grown;
        }
        self.dimensions = Some((width, height));
    }

    fn width(&self) -> f64 {
        self.context.width as f64
    }

    fn height(&self) -> f64 {
        self.context.height as f64
    }

    fn clear(&mut self) {
        self.surface = blank(&self.context, self.context.width, self.context.height);
        self.dimensions = None;
    }

    fn crop_to_fit(&mut self) {
        let Some((width, height)) = self.dimensions else {
            return;
        };
        let s = self.context.scale;
        let (w, h) = ((width * s).max(1), (height * s).max(1));
        if (w, h) != self.surface.dimensions() {
            self.surface = imageops::crop_imm(&self.surface, 0, 0, w, h).to_image();
        }
    }
}
