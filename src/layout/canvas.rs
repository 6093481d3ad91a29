//! The canvas: an arena of nodes sharing one solver

use std::collections::HashMap;

use tracing::debug;

use crate::geometry::{BoundingBox, Color, Offset};
use crate::renderer::Paint;
use crate::solver::{DupMap, Expression, Solver, SolverError, Variable, VariableReport};
use crate::style::{self, ColorAttribute, ResolvedStyle, Style, Theme};

use super::config::LayoutConfig;
use super::error::LayoutError;
use super::node::{CanvasKey, Child, Geometry, Handle, Node, NodeKind, ObjectId};
use super::object::{Insertable, Object};

pub(crate) const ROOT: usize = 0;

/// Root of a scene graph
///
/// Owns every node reachable from it and the solver holding their
/// constraints. Nodes are addressed through [`Handle`]s; a handle issued by a
/// canvas stays valid on every canvas cloned from it.
#[derive(Debug)]
pub struct Canvas {
    pub(crate) key: CanvasKey,
    pub(crate) ancestry: Vec<CanvasKey>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) solver: Solver,
    pub(crate) theme: Theme,
    pub(crate) config: LayoutConfig,
    pub(crate) dirty: bool,
}

impl Canvas {
    pub fn new(theme: Theme) -> Self {
        Self {
            key: CanvasKey::next(),
            ancestry: Vec::new(),
            nodes: vec![Node::new(NodeKind::Canvas)],
            solver: Solver::new(),
            theme,
            config: LayoutConfig::default(),
            dirty: true,
        }
    }

    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Padding between the canvas edge and its children
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.nodes[ROOT].style.padding = Some(padding);
        self
    }

    pub fn key(&self) -> CanvasKey {
        self.key
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn root(&self) -> Handle {
        self.handle(ROOT)
    }

    pub fn is_prepared(&self) -> bool {
        !self.dirty
    }

    pub(crate) fn handle(&self, index: usize) -> Handle {
        Handle {
            canvas: self.key,
            index,
            id: self.nodes[index].id,
        }
    }

    /// Resolve a handle to an arena slot
    ///
    /// Handles from an ancestor canvas take one forwarding step: the slot is
    /// reused and the identity must still match.
    pub(crate) fn index(&self, handle: Handle) -> Result<usize, LayoutError> {
        let stale = || LayoutError::StaleHandle {
            object: handle.id,
            issued_by: handle.canvas,
            canvas: self.key,
        };
        if handle.canvas != self.key && !self.ancestry.contains(&handle.canvas) {
            return Err(stale());
        }
        match self.nodes.get(handle.index) {
            Some(node) if node.id == handle.id => Ok(handle.index),
            _ => Err(stale()),
        }
    }

    /// Re-issue `handle` for this canvas
    pub fn latest(&self, handle: Handle) -> Result<Handle, LayoutError> {
        self.index(handle).map(|index| self.handle(index))
    }

    /// Whether `handle` resolves here and is reachable from the root
    pub fn contains(&self, handle: Handle) -> bool {
        match self.index(handle) {
            Ok(index) => self.is_reachable(index),
            Err(_) => false,
        }
    }

    fn is_reachable(&self, mut index: usize) -> bool {
        loop {
            if index == ROOT {
                return true;
            }
            match self.nodes[index].parent {
                Some(parent) => index = parent,
                None => return false,
            }
        }
    }

    /// Reachable nodes in pre-order; children in insertion order
    pub(crate) fn reachable(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index].children.iter().rev().map(|c| c.node));
        }
        order
    }

    fn subtree(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.nodes[i].children.iter().map(|c| c.node));
        }
        out
    }

    // ------------------------------------------------------------------
    // Construction and structural edits
    // ------------------------------------------------------------------

    /// Add a detached object to the arena
    pub fn insert(&mut self, object: impl Into<Insertable>) -> Handle {
        match object.into() {
            Insertable::Object(object) => self.insert_object(object),
            Insertable::TextBox(text_box) => {
                let frame = self.insert_object(text_box.frame);
                let label = self.insert_object(
                    Object::text(text_box.text).align(text_box.align),
                );
                self.nodes[label.index].inherit_parent_style = true;
                self.nodes[label.index].parent = Some(frame.index);
                self.nodes[frame.index].children.push(Child {
                    node: label.index,
                    offset: Offset::zero(),
                });
                frame
            }
        }
    }

    fn insert_object(&mut self, object: Object) -> Handle {
        let mut node = Node::new(object.kind);
        node.fixed_width = object.width;
        node.fixed_height = object.height;
        node.style = object.style;
        self.nodes.push(node);
        self.dirty = true;
        self.handle(self.nodes.len() - 1)
    }

    /// Insert `object` and attach it under `parent`
    pub fn add(
        &mut self,
        parent: Handle,
        object: impl Into<Insertable>,
        offset: impl Into<Offset>,
    ) -> Result<Handle, LayoutError> {
        let parent = self.index(parent)?;
        let child = self.insert(object);
        self.attach_index(parent, child.index, offset.into())?;
        Ok(child)
    }

    /// Attach a detached object as the last child of `parent`
    pub fn attach(
        &mut self,
        parent: Handle,
        child: Handle,
        offset: impl Into<Offset>,
    ) -> Result<(), LayoutError> {
        let parent = self.index(parent)?;
        let child = self.index(child)?;
        self.attach_index(parent, child, offset.into())
    }

    fn attach_index(
        &mut self,
        parent: usize,
        child: usize,
        offset: Offset,
    ) -> Result<(), LayoutError> {
        let id = self.nodes[child].id;
        if child == ROOT || self.nodes[child].parent.is_some() {
            return Err(LayoutError::AlreadyParented { object: id });
        }
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(LayoutError::invalid(id, "cannot attach an object below itself"));
            }
            ancestor = self.nodes[a].parent;
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(Child { node: child, offset });
        self.retract_layout(parent)?;
        self.dirty = true;
        Ok(())
    }

    /// Detach `child` from `parent`, retracting every constraint it introduced
    pub fn remove(&mut self, parent: Handle, child: Handle) -> Result<(), LayoutError> {
        let p = self.index(parent)?;
        let c = self.index(child)?;
        let position = self.nodes[p]
            .children
            .iter()
            .position(|ch| ch.node == c)
            .ok_or_else(|| {
                let context = format!("children of {}", self.nodes[p].id);
                LayoutError::not_found(self.nodes[c].id, context)
            })?;
        self.nodes[p].children.remove(position);
        self.nodes[c].parent = None;
        self.retract_subtree(c)?;
        self.retract_layout(p)?;
        self.dirty = true;
        debug!(parent = %self.nodes[p].id, child = %self.nodes[c].id, "removed");
        Ok(())
    }

    /// Put the detached `new` in the exact slot `old` occupies
    ///
    /// `old` keeps its identity but loses its constraints and its parent; the
    /// offset of the slot is kept.
    pub fn replace(&mut self, old: Handle, new: Handle) -> Result<(), LayoutError> {
        let o = self.index(old)?;
        let n = self.index(new)?;
        let old_id = self.nodes[o].id;
        if !self.is_reachable(o) {
            return Err(LayoutError::not_found(old_id, "the canvas tree"));
        }
        let Some(p) = self.nodes[o].parent else {
            return Err(LayoutError::invalid(old_id, "the canvas itself cannot be replaced"));
        };
        if n == ROOT || self.nodes[n].parent.is_some() {
            return Err(LayoutError::AlreadyParented {
                object: self.nodes[n].id,
            });
        }
        if self.subtree(n).contains(&p) {
            return Err(LayoutError::invalid(self.nodes[n].id, "cannot replace an ancestor"));
        }
        let slot = self.nodes[p]
            .children
            .iter_mut()
            .find(|ch| ch.node == o)
            .ok_or_else(|| LayoutError::not_found(old_id, "its parent's children"))?;
        slot.node = n;
        self.nodes[n].parent = Some(p);
        self.nodes[o].parent = None;
        self.retract_subtree(o)?;
        self.retract_layout(p)?;
        self.dirty = true;
        Ok(())
    }

    /// Copy a subtree into this canvas as a new detached object
    ///
    /// The copy has fresh variables; sizes and offsets that referred to nodes
    /// inside the subtree now refer to their copies. A non-unique copy keeps
    /// the source's identity.
    pub fn copy_subtree(&mut self, handle: Handle, unique: bool) -> Result<Handle, LayoutError> {
        let source = self.index(handle)?;
        if source == ROOT {
            let reason = "use clone_canvas to copy a canvas";
            return Err(LayoutError::invalid(self.nodes[ROOT].id, reason));
        }
        let members = self.subtree(source);
        // variables outside the subtree keep pointing at the originals
        let mut map = DupMap::keeping_unmapped();
        for &i in &members {
            let g = &self.nodes[i].geometry;
            for v in [&g.x, &g.y, &g.width, &g.height] {
                map.seed(v);
            }
        }
        let base = self.nodes.len();
        let slot: HashMap<usize, usize> = members
            .iter()
            .enumerate()
            .map(|(k, &i)| (i, base + k))
            .collect();
        let mut copies = Vec::with_capacity(members.len());
        for &i in &members {
            let mut copy = self.nodes[i].duplicate_into(&mut map, &HashMap::new());
            copy.own.clear();
            copy.layout.clear();
            copy.parent = copy.parent.and_then(|p| slot.get(&p).copied());
            for child in &mut copy.children {
                child.node = slot[&child.node];
            }
            if unique {
                copy.id = ObjectId::next();
            }
            copies.push(copy);
        }
        self.nodes.extend(copies);
        self.dirty = true;
        Ok(self.handle(base))
    }

    fn retract_subtree(&mut self, index: usize) -> Result<(), SolverError> {
        for i in self.subtree(index) {
            let own = std::mem::take(&mut self.nodes[i].own);
            self.solver.remove_all(&own)?;
            self.retract_layout(i)?;
        }
        Ok(())
    }

    pub(crate) fn retract_layout(&mut self, index: usize) -> Result<(), SolverError> {
        let layout = std::mem::take(&mut self.nodes[index].layout);
        self.solver.remove_all(&layout)
    }

    pub fn set_offset(
        &mut self,
        handle: Handle,
        offset: impl Into<Offset>,
    ) -> Result<(), LayoutError> {
        let index = self.index(handle)?;
        let id = self.nodes[index].id;
        let parent = self.nodes[index]
            .parent
            .ok_or_else(|| LayoutError::invalid(id, "a detached object has no offset"))?;
        let child = self.nodes[parent]
            .children
            .iter_mut()
            .find(|c| c.node == index)
            .ok_or_else(|| LayoutError::not_found(id, "its parent's children"))?;
        child.offset = offset.into();
        self.dirty = true;
        Ok(())
    }

    pub fn offset(&self, handle: Handle) -> Result<Offset, LayoutError> {
        let index = self.index(handle)?;
        let id = self.nodes[index].id;
        let parent = self.nodes[index]
            .parent
            .ok_or_else(|| LayoutError::invalid(id, "a detached object has no offset"))?;
        self.nodes[parent]
            .children
            .iter()
            .find(|c| c.node == index)
            .map(|c| c.offset.clone())
            .ok_or_else(|| LayoutError::not_found(id, "its parent's children"))
    }

    pub fn set_width(
        &mut self,
        handle: Handle,
        width: Option<Expression>,
    ) -> Result<(), LayoutError> {
        let index = self.index(handle)?;
        self.nodes[index].fixed_width = width;
        self.dirty = true;
        Ok(())
    }

    pub fn set_height(
        &mut self,
        handle: Handle,
        height: Option<Expression>,
    ) -> Result<(), LayoutError> {
        let index = self.index(handle)?;
        self.nodes[index].fixed_height = height;
        self.dirty = true;
        Ok(())
    }

    pub fn set_text(&mut self, handle: Handle, text: impl Into<String>) -> Result<(), LayoutError> {
        let index = self.text_node(handle)?;
        if let NodeKind::Text { text: slot, .. } = &mut self.nodes[index].kind {
            *slot = text.into();
        }
        self.dirty = true;
        Ok(())
    }

    /// Text of a text object, or the label of a text box
    pub fn text(&self, handle: Handle) -> Result<&str, LayoutError> {
        let index = self.text_node(handle)?;
        match &self.nodes[index].kind {
            NodeKind::Text { text, .. } => Ok(text),
            _ => Err(LayoutError::invalid(self.nodes[index].id, "not a text object")),
        }
    }

    fn text_node(&self, handle: Handle) -> Result<usize, LayoutError> {
        let index = self.index(handle)?;
        let node = &self.nodes[index];
        match node.kind {
            NodeKind::Text { .. } => Ok(index),
            NodeKind::TextBox => node
                .children
                .first()
                .map(|c| c.node)
                .ok_or_else(|| LayoutError::invalid(node.id, "text box without a label")),
            _ => Err(LayoutError::invalid(node.id, "not a text object")),
        }
    }

    pub fn kind(&self, handle: Handle) -> Result<&NodeKind, LayoutError> {
        Ok(&self.nodes[self.index(handle)?].kind)
    }

    pub fn children(&self, handle: Handle) -> Result<Vec<Handle>, LayoutError> {
        let index = self.index(handle)?;
        Ok(self.nodes[index]
            .children
            .iter()
            .map(|c| self.handle(c.node))
            .collect())
    }

    pub fn parent(&self, handle: Handle) -> Result<Option<Handle>, LayoutError> {
        let index = self.index(handle)?;
        Ok(self.nodes[index].parent.map(|p| self.handle(p)))
    }

    // ------------------------------------------------------------------
    // Geometry readback
    // ------------------------------------------------------------------

    /// Solver variables of an object, for building cross-object expressions
    pub fn geometry(&self, handle: Handle) -> Result<Geometry, LayoutError> {
        Ok(self.nodes[self.index(handle)?].geometry.clone())
    }

    pub fn value(&self, variable: &Variable) -> f64 {
        self.solver.value(variable)
    }

    pub fn evaluate(&self, expression: &Expression) -> f64 {
        self.solver.evaluate(expression)
    }

    pub(crate) fn bounds_of(&self, index: usize) -> BoundingBox {
        let g = &self.nodes[index].geometry;
        BoundingBox::new(
            self.value(&g.x),
            self.value(&g.y),
            self.value(&g.width),
            self.value(&g.height),
        )
    }

    /// Resolved position and size from the last prepare
    pub fn bounds(&self, handle: Handle) -> Result<BoundingBox, LayoutError> {
        Ok(self.bounds_of(self.index(handle)?))
    }

    pub fn analyze(&self, error: &LayoutError) -> Vec<VariableReport> {
        error
            .solver_error()
            .map(|e| self.solver.analyze(e))
            .unwrap_or_default()
    }

    pub fn diagnose(&self, error: &LayoutError) -> String {
        match error.solver_error() {
            Some(e) => self.solver.diagnose(e),
            None => error.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Style
    // ------------------------------------------------------------------

    pub fn style(&self, handle: Handle) -> Result<&Style, LayoutError> {
        Ok(&self.nodes[self.index(handle)?].style)
    }

    pub fn style_mut(&mut self, handle: Handle) -> Result<&mut Style, LayoutError> {
        let index = self.index(handle)?;
        self.dirty = true;
        Ok(&mut self.nodes[index].style)
    }

    pub fn set_style(&mut self, handle: Handle, style: Style) -> Result<(), LayoutError> {
        *self.style_mut(handle)? = style;
        Ok(())
    }

    fn effective_style(&self, index: usize) -> Style {
        let node = &self.nodes[index];
        match node.parent {
            Some(parent) if node.inherit_parent_style => {
                let mut base = self.effective_style(parent);
                base.alpha = None;
                node.style.inherit(&base)
            }
            _ => node.style.clone(),
        }
    }

    pub(crate) fn resolved_style_of(&self, index: usize) -> ResolvedStyle {
        self.theme.resolve(&self.effective_style(index))
    }

    pub fn resolved_style(&self, handle: Handle) -> Result<ResolvedStyle, LayoutError> {
        Ok(self.resolved_style_of(self.index(handle)?))
    }

    fn composite_alpha_of(&self, index: usize) -> u8 {
        let own = self.resolved_style_of(index).alpha;
        match self.nodes[index].parent {
            Some(parent) => style::composite_alpha(self.composite_alpha_of(parent), own),
            None => own,
        }
    }

    fn composite_color_of(&self, index: usize, attribute: ColorAttribute) -> Color {
        let resolved = self.resolved_style_of(index);
        let own = resolved.color(attribute);
        match self.nodes[index].parent {
            Some(parent) => style::composite_color(
                self.composite_color_of(parent, attribute),
                own,
                resolved.alpha,
            ),
            None => own,
        }
    }

    /// Opacity after multiplying down from the root
    pub fn composite_alpha(&self, handle: Handle) -> Result<u8, LayoutError> {
        Ok(self.composite_alpha_of(self.index(handle)?))
    }

    /// Colour after blending over every structural parent
    pub fn composite_color(
        &self,
        handle: Handle,
        attribute: ColorAttribute,
    ) -> Result<Color, LayoutError> {
        Ok(self.composite_color_of(self.index(handle)?, attribute))
    }

    pub(crate) fn paint_of(&self, index: usize) -> Paint {
        let mut paint = Paint::from(&self.resolved_style_of(index));
        paint.stroke_color = self.composite_color_of(index, ColorAttribute::Stroke);
        paint.fill_color = self.composite_color_of(index, ColorAttribute::Fill);
        paint.font_color = self.composite_color_of(index, ColorAttribute::Font);
        paint.alpha = self.composite_alpha_of(index);
        paint
    }

    // ------------------------------------------------------------------
    // Versioning
    // ------------------------------------------------------------------

    /// Snapshot the whole canvas into an independent copy
    ///
    /// The copy gets a fresh solver holding duplicates of every constraint,
    /// and node constraint lists point at exactly those duplicates. Every
    /// reachable source node records the copy as its newest version.
    /// Detached nodes are left behind; their handles are stale on the copy.
    pub fn clone_canvas(&mut self) -> Result<Canvas, LayoutError> {
        let copy = self.duplicate()?;
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if copy.carries(i) {
                node.cloned_to = Some(copy.key);
            }
        }
        debug!(from = %self.key, to = %copy.key, nodes = copy.nodes.len(), "canvas cloned");
        Ok(copy)
    }

    /// Clone the canvas owning `handle` and return the copy's handle
    ///
    /// With `unique` the copied object gets a new identity and the source is
    /// not forwarded to it; the rest of the canvas is forwarded as usual.
    pub fn clone_object(
        &mut self,
        handle: Handle,
        unique: bool,
    ) -> Result<(Canvas, Handle), LayoutError> {
        let index = self.index(handle)?;
        if !self.is_reachable(index) {
            return Err(LayoutError::invalid(
                self.nodes[index].id,
                "a detached object is not carried into clones",
            ));
        }
        let mut copy = self.duplicate()?;
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if copy.carries(i) && !(unique && i == index) {
                node.cloned_to = Some(copy.key);
            }
        }
        if unique {
            copy.nodes[index].id = ObjectId::next();
        }
        let cloned = copy.handle(index);
        Ok((copy, cloned))
    }

    fn duplicate(&self) -> Result<Canvas, LayoutError> {
        let mut keep = vec![false; self.nodes.len()];
        for index in self.reachable() {
            keep[index] = true;
        }
        let mut map = DupMap::new();
        let (solver, remap) = self.solver.duplicate(&mut map)?;
        let mut nodes: Vec<Node> = self
            .nodes
            .iter()
            .zip(&keep)
            .map(|(node, &keep)| {
                if keep {
                    node.duplicate_into(&mut map, &remap)
                } else {
                    Node::vacant()
                }
            })
            .collect();
        let used = keep.iter().rposition(|&k| k).map_or(0, |last| last + 1);
        nodes.truncate(used);
        let mut ancestry = self.ancestry.clone();
        ancestry.push(self.key);
        Ok(Canvas {
            key: CanvasKey::next(),
            ancestry,
            nodes,
            solver,
            theme: self.theme.clone(),
            config: self.config.clone(),
            dirty: self.dirty,
        })
    }

    /// Whether slot `index` holds a live node rather than a vacancy
    fn carries(&self, index: usize) -> bool {
        self.nodes.get(index).is_some_and(|node| node.id != ObjectId::VACANT)
    }

    /// Canvas holding the newest non-unique copy of `handle`'s object
    pub fn forwarded_to(&self, handle: Handle) -> Result<Option<CanvasKey>, LayoutError> {
        Ok(self.nodes[self.index(handle)?].cloned_to)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}
