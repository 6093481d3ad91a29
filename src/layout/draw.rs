//! The render phase: walk the prepared tree and issue drawing calls

use std::f64::consts::FRAC_PI_4;

use tracing::instrument;

use crate::geometry::{BoundingBox, Point};
use crate::renderer::{Paint, Renderer};
use crate::style::{Align, Anchor};

use super::canvas::{Canvas, ROOT};
use super::error::LayoutError;
use super::node::NodeKind;

/// Start and end of a direction vector placed in its bounding box
fn endpoints(bounds: &BoundingBox, vector: Point) -> (Point, Point) {
    let start = Point::new(
        if vector.x >= 0.0 { bounds.x } else { bounds.right() },
        if vector.y >= 0.0 { bounds.y } else { bounds.bottom() },
    );
    (start, start + vector)
}

/// Point of `bounds` that `anchor` refers to
fn anchor_point(bounds: &BoundingBox, anchor: Anchor) -> Point {
    let shift = anchor.shift(bounds.size());
    Point::new(bounds.x - shift.x, bounds.y - shift.y)
}

fn arrow_head(
    renderer: &mut dyn Renderer,
    tip: Point,
    direction: Point,
    length: f64,
    paint: &Paint,
) {
    let back = -direction.unit() * length;
    for angle in [FRAC_PI_4, -FRAC_PI_4] {
        renderer.line(tip, tip + back.rotated(angle), paint);
    }
}

impl Canvas {
    /// Draw the prepared tree; fails if the canvas changed since `prepare`
    pub fn render(&self, renderer: &mut dyn Renderer) -> Result<(), LayoutError> {
        if self.dirty {
            return Err(LayoutError::NotPrepared { canvas: self.key });
        }
        self.render_node(ROOT, renderer)
    }

    /// Prepare, size the surface to the canvas, and render
    #[instrument(skip_all, fields(canvas = %self.key))]
    pub fn draw<R: Renderer>(&mut self, renderer: &mut R) -> Result<(), LayoutError> {
        self.prepare(renderer)?;
        let size = self.bounds_of(ROOT).size();
        renderer.set_dimensions(size);
        self.render(renderer)
    }

    fn render_node(&self, index: usize, renderer: &mut dyn Renderer) -> Result<(), LayoutError> {
        let node = &self.nodes[index];
        let bounds = self.bounds_of(index);
        let paint = self.paint_of(index);

        match &node.kind {
            NodeKind::Rect | NodeKind::TextBox => {
                let minimum = self.config.min_box_size;
                // solver values are floats; allow for rounding noise
                if bounds.width + 1e-6 < minimum || bounds.height + 1e-6 < minimum {
                    return Err(LayoutError::BoxTooSmall {
                        object: node.id,
                        width: bounds.width,
                        height: bounds.height,
                        minimum,
                    });
                }
                renderer.rectangle(
                    bounds.origin(),
                    Point::new(bounds.right() - 1.0, bounds.bottom() - 1.0),
                    &paint,
                );
            }
            NodeKind::Text { text, align } => {
                let anchor = match align {
                    None => paint.anchor,
                    Some(Align::Left) => Anchor::MiddleLeft,
                    Some(Align::Center) => Anchor::Middle,
                    Some(Align::Right) => Anchor::MiddleRight,
                };
                let paint = Paint { anchor, ..paint };
                renderer.text(text, anchor_point(&bounds, anchor), &paint);
            }
            NodeKind::Line { vector } => {
                let (start, end) = endpoints(&bounds, *vector);
                renderer.line(start, end, &paint);
            }
            NodeKind::DottedLine { vector, dash } => {
                let (start, _) = endpoints(&bounds, *vector);
                let dash = dash.unwrap_or(self.config.dash_length).max(1.0);
                let unit = vector.unit();
                let length = vector.length();
                let mut t = 0.0;
                while t < length {
                    let stop = (t + dash).min(length);
                    renderer.line(start + unit * t, start + unit * stop, &paint);
                    t += 2.0 * dash;
                }
            }
            NodeKind::Arrow {
                vector,
                head_ratio,
                double_sided,
            } => {
                let (start, end) = endpoints(&bounds, *vector);
                renderer.line(start, end, &paint);
                // a zero-length arrow has no direction to point its heads in
                if vector.length() == 0.0 {
                    return self.render_children(index, renderer);
                }
                let head = vector.length() * head_ratio.unwrap_or(self.config.arrow_head_ratio);
                arrow_head(renderer, end, *vector, head, &paint);
                if *double_sided {
                    arrow_head(renderer, start, -*vector, head, &paint);
                }
            }
            NodeKind::Grid { spacing } => {
                let spacing = spacing.unwrap_or(self.config.grid_spacing).max(1.0);
                let (top, bottom) = (bounds.y, bounds.bottom());
                let (left, right) = (bounds.x, bounds.right());
                let mut x = left;
                while x <= right {
                    renderer.line(Point::new(x, top), Point::new(x, bottom), &paint);
                    x += spacing;
                }
                let mut y = top;
                while y <= bottom {
                    renderer.line(Point::new(left, y), Point::new(right, y), &paint);
                    y += spacing;
                }
            }
            NodeKind::Plain
            | NodeKind::Canvas
            | NodeKind::VLayout
            | NodeKind::HLayout
            | NodeKind::Table
            | NodeKind::Spacer => {}
        }
        self.render_children(index, renderer)
    }

    fn render_children(
        &self,
        index: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<(), LayoutError> {
        for child in &self.nodes[index].children {
            self.render_node(child.node, renderer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Insertable, Object};
    use crate::renderer::TextBounds;
    use std::f64::consts::SQRT_2;

    /// Keeps every drawing call instead of rasterizing
    #[derive(Default)]
    struct Recorder {
        lines: Vec<(Point, Point)>,
        rectangles: usize,
        texts: Vec<String>,
    }

    impl Renderer for Recorder {
        fn rectangle(&mut self, _: Point, _: Point, _: &Paint) {
            self.rectangles += 1;
        }

        fn text(&mut self, text: &str, _: Point, _: &Paint) {
            self.texts.push(text.to_string());
        }

        fn text_bbox(&self, text: &str, _: &Paint) -> TextBounds {
            TextBounds {
                left: 0.0,
                top: 0.0,
                right: text.len() as f64,
                bottom: 1.0,
            }
        }

        fn line(&mut self, p1: Point, p2: Point, _: &Paint) {
            self.lines.push((p1, p2));
        }

        fn set_dimensions(&mut self, _: Point) {}

        fn width(&self) -> f64 {
            40.0
        }

        fn height(&self) -> f64 {
            40.0
        }

        fn crop_to_fit(&mut self) {}

        fn clear(&mut self) {
            *self = Self::default();
        }
    }

    fn record(object: impl Into<Insertable>) -> Recorder {
        let mut canvas = Canvas::default().with_padding(0.0);
        let root = canvas.root();
        canvas.add(root, object, (0.0, 0.0)).unwrap();
        let mut recorder = Recorder::default();
        canvas.draw(&mut recorder).unwrap();
        recorder
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_arrow_heads_slant_at_45_degrees() {
        let r = record(Object::arrow((10.0, 0.0)));
        assert_eq!(r.lines.len(), 3);
        assert_eq!(r.lines[0], (Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        // head length is 0.2 of the shaft, so each side is √2 along both axes
        let tip = Point::new(10.0, 0.0);
        assert!(r.lines[1..].iter().all(|(from, _)| close(*from, tip)));
        assert!(close(r.lines[1].1, Point::new(10.0 - SQRT_2, -SQRT_2)));
        assert!(close(r.lines[2].1, Point::new(10.0 - SQRT_2, SQRT_2)));
    }

    #[test]
    fn test_double_sided_arrow_has_heads_at_both_ends() {
        let r = record(Object::arrow((10.0, 0.0)).double_sided(true).head_ratio(0.5));
        assert_eq!(r.lines.len(), 5);
        let d = 5.0 / SQRT_2;
        assert!(close(r.lines[3].0, Point::new(0.0, 0.0)));
        assert!(close(r.lines[3].1, Point::new(d, d)));
        assert!(close(r.lines[4].1, Point::new(d, -d)));
    }

    #[test]
    fn test_negative_vector_starts_at_far_edge() {
        let r = record(Object::arrow((-10.0, 0.0)));
        assert_eq!(r.lines[0], (Point::new(10.0, 0.0), Point::new(0.0, 0.0)));
        let tip = Point::new(0.0, 0.0);
        assert!(r.lines[1..].iter().all(|(from, to)| close(*from, tip) && to.x > 0.0));
    }

    #[test]
    fn test_zero_length_arrow_draws_no_heads() {
        let r = record(Object::arrow((0.0, 0.0)));
        assert_eq!(r.lines, vec![(Point::zero(), Point::zero())]);
    }

    #[test]
    fn test_dotted_line_alternates_dash_and_gap() {
        let r = record(Object::dotted_line((10.0, 0.0)).dash(4.0));
        assert_eq!(
            r.lines,
            vec![
                (Point::new(0.0, 0.0), Point::new(4.0, 0.0)),
                (Point::new(8.0, 0.0), Point::new(10.0, 0.0)),
            ]
        );
        assert!(record(Object::dotted_line((0.0, 0.0))).lines.is_empty());
    }

    #[test]
    fn test_grid_lines_follow_spacing() {
        let r = record(Object::grid().spacing(20.0));
        let vertical: Vec<f64> = r
            .lines
            .iter()
            .filter(|(a, b)| a.x == b.x)
            .map(|(a, _)| a.x)
            .collect();
        assert_eq!(vertical, vec![0.0, 20.0, 40.0]);
        assert_eq!(r.lines.len(), 6);
        assert!(r.lines.iter().all(|(a, b)| a.x == b.x || a.y == b.y));
    }

    #[test]
    fn test_spacer_and_layouts_draw_nothing() {
        let r = record(Object::spacer());
        assert!(r.lines.is_empty() && r.texts.is_empty());
        assert_eq!(r.rectangles, 0);

        let r = record(Object::text_box("hi"));
        assert_eq!((r.rectangles, r.texts.len()), (1, 1));
    }

    #[test]
    fn test_endpoints_follow_vector_sign() {
        let b = BoundingBox::new(10.0, 10.0, 5.0, 3.0);
        assert_eq!(
            endpoints(&b, Point::new(5.0, 3.0)),
            (Point::new(10.0, 10.0), Point::new(15.0, 13.0))
        );
        assert_eq!(
            endpoints(&b, Point::new(-5.0, 3.0)),
            (Point::new(15.0, 10.0), Point::new(10.0, 13.0))
        );
        assert_eq!(
            endpoints(&b, Point::new(5.0, -3.0)),
            (Point::new(10.0, 13.0), Point::new(15.0, 10.0))
        );
    }

    #[test]
    fn test_anchor_point() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 4.0);
        assert_eq!(anchor_point(&b, Anchor::TopLeft), Point::new(0.0, 0.0));
        assert_eq!(anchor_point(&b, Anchor::Middle), Point::new(5.0, 2.0));
        assert_eq!(anchor_point(&b, Anchor::BottomRight), Point::new(10.0, 4.0));
    }
}
