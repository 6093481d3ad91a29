//! Constraint generation: the prepare phase
//!
//! Every reachable node contributes two constraint lists. Its *own*
//! constraints bound its size (non-negativity, fixed sizes, intrinsic sizes
//! such as measured text). Its *layout* constraints relate it to its
//! children and depend on the node kind. Both lists are retracted and
//! rebuilt on every prepare.

use kasuari::WeightedRelation::{EQ, GE};
use tracing::{debug, instrument};

use crate::geometry::Offset;
use crate::renderer::Renderer;
use crate::solver::{Constraint, Expression, Strength};

use super::canvas::Canvas;
use super::error::LayoutError;
use super::node::{Geometry, NodeKind};

/// A child as seen by its parent's layout rule
struct Slot<'a> {
    index: usize,
    geometry: &'a Geometry,
    offset: &'a Offset,
    fixed_height: bool,
    fixed_width: bool,
}

/// Main axis of a stacking layout
#[derive(Clone, Copy)]
enum Axis {
    Vertical,
    Horizontal,
}

impl Canvas {
    /// Assert every constraint of the tree and solve
    #[instrument(skip_all, fields(canvas = %self.key))]
    pub fn prepare(&mut self, renderer: &dyn Renderer) -> Result<(), LayoutError> {
        let order = self.reachable();
        for &index in &order {
            self.prepare_node(index, renderer)?;
        }
        self.solver.update();
        self.dirty = false;
        debug!(nodes = order.len(), constraints = self.solver.len(), "prepared");
        Ok(())
    }

    fn prepare_node(&mut self, index: usize, renderer: &dyn Renderer) -> Result<(), LayoutError> {
        let own = self.own_constraints(index, renderer);
        let previous = std::mem::take(&mut self.nodes[index].own);
        self.solver.remove_all(&previous)?;
        for constraint in own {
            self.solver.add(constraint.clone())?;
            self.nodes[index].own.push(constraint);
        }

        let layout = self.layout_constraints(index, renderer);
        self.retract_layout(index)?;
        for constraint in layout {
            self.solver.add(constraint.clone())?;
            self.nodes[index].layout.push(constraint);
        }
        Ok(())
    }

    fn own_constraints(&self, index: usize, renderer: &dyn Renderer) -> Vec<Constraint> {
        let node = &self.nodes[index];
        let g = &node.geometry;
        let mut out = vec![
            &g.width | GE(Strength::REQUIRED) | 0.0,
            &g.height | GE(Strength::REQUIRED) | 0.0,
        ];
        if let Some(width) = &node.fixed_width {
            out.push(&g.width | EQ(Strength::REQUIRED) | width.clone());
        }
        if let Some(height) = &node.fixed_height {
            out.push(&g.height | EQ(Strength::REQUIRED) | height.clone());
        }
        let free_width = node.fixed_width.is_none();
        let free_height = node.fixed_height.is_none();
        let mut intrinsic = |width: f64, height: f64, strength: Strength| {
            if free_width {
                out.push(&g.width | EQ(strength) | width);
            }
            if free_height {
                out.push(&g.height | EQ(strength) | height);
            }
        };

        match &node.kind {
            NodeKind::Canvas => {
                intrinsic(renderer.width(), renderer.height(), Strength::MEDIUM);
                out.push(&g.x | EQ(Strength::REQUIRED) | 0.0);
                out.push(&g.y | EQ(Strength::REQUIRED) | 0.0);
            }
            NodeKind::Grid { .. } => {
                intrinsic(renderer.width(), renderer.height(), Strength::REQUIRED);
            }
            NodeKind::Line { vector }
            | NodeKind::DottedLine { vector, .. }
            | NodeKind::Arrow { vector, .. } => {
                intrinsic(vector.x.abs(), vector.y.abs(), Strength::REQUIRED);
            }
            NodeKind::Spacer => {
                let padding = self.resolved_style_of(index).padding;
                intrinsic(padding, padding, Strength::REQUIRED);
            }
            NodeKind::Text { text, .. } => {
                let bounds = renderer.text_bbox(text, &self.paint_of(index));
                intrinsic(bounds.width(), bounds.height(), Strength::STRONG);
            }
            NodeKind::Plain
            | NodeKind::VLayout
            | NodeKind::HLayout
            | NodeKind::Table
            | NodeKind::Rect
            | NodeKind::TextBox => {}
        }
        out
    }

    /// Height the measured content of `index` needs, for kinds that measure
    fn content_height(&self, index: usize, renderer: &dyn Renderer) -> Option<f64> {
        let node = &self.nodes[index];
        match &node.kind {
            NodeKind::Text { text, .. } => {
                Some(renderer.text_bbox(text, &self.paint_of(index)).height())
            }
            NodeKind::TextBox => {
                let label = node.children.first()?.node;
                let padding = self.resolved_style_of(index).padding;
                self.content_height(label, renderer)
                    .map(|height| height + 2.0 * padding)
            }
            _ => None,
        }
    }

    fn layout_constraints(&self, index: usize, renderer: &dyn Renderer) -> Vec<Constraint> {
        let node = &self.nodes[index];
        let g = &node.geometry;
        let slots: Vec<Slot<'_>> = node
            .children
            .iter()
            .map(|c| {
                let child = &self.nodes[c.node];
                Slot {
                    index: c.node,
                    geometry: &child.geometry,
                    offset: &c.offset,
                    fixed_height: child.fixed_height.is_some(),
                    fixed_width: child.fixed_width.is_some(),
                }
            })
            .collect();
        match &node.kind {
            NodeKind::Canvas => canvas_rule(g, &slots, self.resolved_style_of(index).padding),
            NodeKind::VLayout => {
                stack_rule(g, &slots, Axis::Vertical, node.fixed_height.is_some())
            }
            NodeKind::HLayout => {
                stack_rule(g, &slots, Axis::Horizontal, node.fixed_width.is_some())
            }
            NodeKind::Table => {
                let fixed = node.fixed_width.is_some();
                let mut out = stack_rule(g, &slots, Axis::Horizontal, fixed);
                // cells share one height, at least as tall as the tallest content
                for slot in slots.iter().filter(|s| !s.fixed_height) {
                    out.push(&slot.geometry.height | EQ(Strength::REQUIRED) | &g.height);
                    if let Some(height) = self.content_height(slot.index, renderer) {
                        out.push(&g.height | GE(Strength::REQUIRED) | height);
                    }
                }
                out
            }
            NodeKind::TextBox => {
                let padding = self.resolved_style_of(index).padding;
                let mut out = Vec::new();
                let mut slots = slots.into_iter();
                if let Some(label) = slots.next() {
                    let c = label.geometry;
                    out.push(&c.x | EQ(Strength::REQUIRED) | &g.x + padding);
                    out.push(&c.y | EQ(Strength::REQUIRED) | &g.y + padding);
                    if !label.fixed_width {
                        out.push(&c.width | EQ(Strength::REQUIRED) | &g.width - 2.0 * padding);
                    }
                    if !label.fixed_height {
                        out.push(&c.height | EQ(Strength::REQUIRED) | &g.height - 2.0 * padding);
                    }
                }
                out.extend(offset_rule(g, &slots.collect::<Vec<_>>()));
                out
            }
            NodeKind::Plain
            | NodeKind::Grid { .. }
            | NodeKind::Rect
            | NodeKind::Text { .. }
            | NodeKind::Line { .. }
            | NodeKind::DottedLine { .. }
            | NodeKind::Arrow { .. }
            | NodeKind::Spacer => offset_rule(g, &slots),
        }
    }
}

/// Children sit at the parent origin plus their offset
fn offset_rule(g: &Geometry, slots: &[Slot<'_>]) -> Vec<Constraint> {
    slots
        .iter()
        .flat_map(|slot| {
            let c = slot.geometry;
            [
                &c.x | EQ(Strength::REQUIRED) | &g.x + slot.offset.x.clone(),
                &c.y | EQ(Strength::REQUIRED) | &g.y + slot.offset.y.clone(),
            ]
        })
        .collect()
}

/// Children inside the padding; the canvas prefers the render target size
/// but grows to fit
fn canvas_rule(g: &Geometry, slots: &[Slot<'_>], padding: f64) -> Vec<Constraint> {
    let mut out = Vec::with_capacity(slots.len() * 4);
    for slot in slots {
        let c = slot.geometry;
        let (ox, oy) = (&slot.offset.x, &slot.offset.y);
        out.push(&c.x | EQ(Strength::REQUIRED) | &g.x + padding + ox.clone());
        out.push(&c.y | EQ(Strength::REQUIRED) | &g.y + padding + oy.clone());
        out.push(&g.width | GE(Strength::REQUIRED) | &c.width + ox.clone() + 2.0 * padding);
        out.push(&g.height | GE(Strength::REQUIRED) | &c.height + oy.clone() + 2.0 * padding);
    }
    out
}

/// Centre, secondary, chain and primary constraints of a stacking layout
fn stack_rule(
    g: &Geometry,
    slots: &[Slot<'_>],
    axis: Axis,
    fixed_primary: bool,
) -> Vec<Constraint> {
    // (position, size) along the main axis, then across it
    let main = |geo: &Geometry| match axis {
        Axis::Vertical => (geo.y.clone(), geo.height.clone()),
        Axis::Horizontal => (geo.x.clone(), geo.width.clone()),
    };
    let cross = |geo: &Geometry| match axis {
        Axis::Vertical => (geo.x.clone(), geo.width.clone()),
        Axis::Horizontal => (geo.y.clone(), geo.height.clone()),
    };
    let split = |offset: &Offset| match axis {
        Axis::Vertical => (offset.y.clone(), offset.x.clone()),
        Axis::Horizontal => (offset.x.clone(), offset.y.clone()),
    };

    let (self_pos, self_size) = main(g);
    let (self_cross_pos, self_cross_size) = cross(g);
    let mut out = Vec::with_capacity(slots.len() * 3 + 2);

    // the weak pull towards zero makes the cross size the largest lower bound
    out.push(&self_cross_size | EQ(Strength::WEAK) | 0.0);

    let mut previous_end: Option<Expression> = None;
    let mut total = Expression::default();
    for slot in slots {
        let (pos, size) = main(slot.geometry);
        let (cross_pos, cross_size) = cross(slot.geometry);
        let (main_offset, cross_offset) = split(slot.offset);

        out.push(
            &cross_pos + &cross_size / 2.0
                | EQ(Strength::REQUIRED)
                | &self_cross_pos + &self_cross_size / 2.0 + cross_offset.clone(),
        );
        out.push(&self_cross_size | GE(Strength::REQUIRED) | &cross_size + cross_offset);

        let start = previous_end
            .take()
            .unwrap_or_else(|| Expression::from(&self_pos));
        out.push(&pos | EQ(Strength::REQUIRED) | start + main_offset.clone());
        previous_end = Some(&pos + &size);

        total = total + Expression::from(&size) + main_offset;
    }

    let primary = if fixed_primary { GE(Strength::REQUIRED) } else { EQ(Strength::REQUIRED) };
    out.push(&self_size | primary | total);
    out
}
