//! Scene graph nodes and handles

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::{Offset, Point};
use crate::solver::{Constraint, ConstraintId, DupMap, Duplicate, Expression, Variable};
use crate::style::{Align, Style};

use std::collections::HashMap;

static NEXT_OBJECT: AtomicU64 = AtomicU64::new(1);
static NEXT_CANVAS: AtomicU64 = AtomicU64::new(1);

/// Stable object identity, shared by an object and its non-unique clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Never issued; marks vacant arena slots
    pub(crate) const VACANT: Self = Self(0);

    pub(crate) fn next() -> Self {
        Self(NEXT_OBJECT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generation stamp of a canvas; every clone gets a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasKey(u64);

impl CanvasKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_CANVAS.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CanvasKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "canvas@{}", self.0)
    }
}

/// Reference to an object, stamped with the canvas that issued it
///
/// Handles compare by [`ObjectId`], so a handle to an object and a handle to
/// its non-unique clone are equal. Use [`Handle::same_instance`] to tell the
/// two apart.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub(crate) canvas: CanvasKey,
    pub(crate) index: usize,
    pub(crate) id: ObjectId,
}

impl Handle {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn canvas(&self) -> CanvasKey {
        self.canvas
    }

    pub fn same_instance(&self, other: &Handle) -> bool {
        self.canvas == other.canvas && self.index == other.index && self.id == other.id
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.id, self.canvas)
    }
}

/// The four solver variables of an object
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub x: Variable,
    pub y: Variable,
    pub width: Variable,
    pub height: Variable,
}

impl Geometry {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            x: Variable::new(format!("{label}.x")),
            y: Variable::new(format!("{label}.y")),
            width: Variable::new(format!("{label}.width")),
            height: Variable::new(format!("{label}.height")),
        }
    }

    pub fn right(&self) -> Expression {
        &self.x + &self.width
    }

    pub fn bottom(&self) -> Expression {
        &self.y + &self.height
    }

    pub fn center_x(&self) -> Expression {
        &self.x + &self.width / 2.0
    }

    pub fn center_y(&self) -> Expression {
        &self.y + &self.height / 2.0
    }
}

impl Duplicate for Geometry {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        Self {
            x: self.x.duplicate(map),
            y: self.y.duplicate(map),
            width: self.width.duplicate(map),
            height: self.height.duplicate(map),
        }
    }
}

/// What an object is, and so which constraint rule it contributes
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A bare group: children are placed at their offsets
    Plain,
    Canvas,
    VLayout,
    HLayout,
    /// A horizontal layout whose cells share one height
    Table,
    Grid {
        spacing: Option<f64>,
    },
    Rect,
    /// A rectangle holding a [`NodeKind::Text`] as its first child
    TextBox,
    Text {
        text: String,
        align: Option<Align>,
    },
    Line {
        vector: Point,
    },
    DottedLine {
        vector: Point,
        dash: Option<f64>,
    },
    Arrow {
        vector: Point,
        head_ratio: Option<f64>,
        double_sided: bool,
    },
    Spacer,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plain => "object",
            Self::Canvas => "canvas",
            Self::VLayout => "vlayout",
            Self::HLayout => "hlayout",
            Self::Table => "table",
            Self::Grid { .. } => "grid",
            Self::Rect => "box",
            Self::TextBox => "textbox",
            Self::Text { .. } => "text",
            Self::Line { .. } => "line",
            Self::DottedLine { .. } => "dotted_line",
            Self::Arrow { .. } => "arrow",
            Self::Spacer => "spacer",
        }
    }

    pub(crate) fn vector(&self) -> Option<Point> {
        match self {
            Self::Line { vector }
            | Self::DottedLine { vector, .. }
            | Self::Arrow { vector, .. } => Some(*vector),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Child {
    pub node: usize,
    pub offset: Offset,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub id: ObjectId,
    pub kind: NodeKind,
    pub geometry: Geometry,
    pub fixed_width: Option<Expression>,
    pub fixed_height: Option<Expression>,
    pub style: Style,
    /// Take unset style attributes (except alpha) from the structural parent
    pub inherit_parent_style: bool,
    pub children: Vec<Child>,
    pub parent: Option<usize>,
    /// Non-negativity, fixed-size and intrinsic-size constraints
    pub own: Vec<Constraint>,
    /// Constraints emitted about this node's children
    pub layout: Vec<Constraint>,
    /// Canvas holding the most recent non-unique copy of this node
    pub cloned_to: Option<CanvasKey>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        let id = ObjectId::next();
        Self::with_id(id, kind)
    }

    /// Placeholder for a slot a clone did not carry over; no handle matches it
    pub fn vacant() -> Self {
        Self::with_id(ObjectId::VACANT, NodeKind::Plain)
    }

    fn with_id(id: ObjectId, kind: NodeKind) -> Self {
        let geometry = Geometry::new(&format!("{}{}", kind.label(), id));
        Self {
            id,
            kind,
            geometry,
            fixed_width: None,
            fixed_height: None,
            style: Style::default(),
            inherit_parent_style: false,
            children: Vec::new(),
            parent: None,
            own: Vec::new(),
            layout: Vec::new(),
            cloned_to: None,
        }
    }

    /// Copy into another canvas generation
    ///
    /// Variables go through `map`; stored constraints are taken from `remap`
    /// (the copies already installed in the duplicated solver).
    pub fn duplicate_into(
        &self,
        map: &mut DupMap,
        remap: &HashMap<ConstraintId, Constraint>,
    ) -> Self {
        let copy_constraint = |c: &Constraint, map: &mut DupMap| {
            remap
                .get(&c.id())
                .cloned()
                .unwrap_or_else(|| c.duplicate(map))
        };
        Self {
            id: self.id,
            kind: self.kind.clone(),
            geometry: self.geometry.duplicate(map),
            fixed_width: self.fixed_width.duplicate(map),
            fixed_height: self.fixed_height.duplicate(map),
            style: self.style.clone(),
            inherit_parent_style: self.inherit_parent_style,
            children: self
                .children
                .iter()
                .map(|c| Child {
                    node: c.node,
                    offset: c.offset.duplicate(map),
                })
                .collect(),
            parent: self.parent,
            own: self.own.iter().map(|c| copy_constraint(c, map)).collect(),
            layout: self.layout.iter().map(|c| copy_constraint(c, map)).collect(),
            cloned_to: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_names_carry_kind_and_id() {
        let node = Node::new(NodeKind::Rect);
        assert_eq!(
            node.geometry.width.name(),
            format!("box{}.width", node.id)
        );
    }

    #[test]
    fn test_handles_compare_by_identity() {
        let id = ObjectId::next();
        let a = Handle {
            canvas: CanvasKey::next(),
            index: 1,
            id,
        };
        let b = Handle {
            canvas: CanvasKey::next(),
            index: 1,
            id,
        };
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
        assert!(a.same_instance(&a));
    }

    #[test]
    fn test_duplicate_remaps_geometry() {
        let node = Node::new(NodeKind::Rect);
        let mut map = DupMap::new();
        let copy = node.duplicate_into(&mut map, &HashMap::new());
        assert_eq!(copy.id, node.id);
        assert_ne!(copy.geometry.x, node.geometry.x);
        assert_eq!(copy.geometry.x.name(), node.geometry.x.name());
        assert_eq!(map.get(&node.geometry.x), Some(&copy.geometry.x));
    }
}
