//! Object descriptions, inserted into a canvas with [`Canvas::insert`]
//!
//! [`Canvas::insert`]: super::Canvas::insert

use crate::geometry::Point;
use crate::solver::Expression;
use crate::style::{Align, Style};

use super::node::NodeKind;

/// A visual element that has not been placed in a canvas yet
#[derive(Debug, Clone)]
pub struct Object {
    pub(crate) kind: NodeKind,
    pub(crate) width: Option<Expression>,
    pub(crate) height: Option<Expression>,
    pub(crate) style: Style,
}

impl Object {
    fn of(kind: NodeKind) -> Self {
        Self {
            kind,
            width: None,
            height: None,
            style: Style::default(),
        }
    }

    /// A plain group that places children at their offsets
    pub fn group() -> Self {
        Self::of(NodeKind::Plain)
    }

    pub fn vlayout() -> Self {
        Self::of(NodeKind::VLayout)
    }

    pub fn hlayout() -> Self {
        Self::of(NodeKind::HLayout)
    }

    pub fn table() -> Self {
        Self::of(NodeKind::Table)
    }

    pub fn grid() -> Self {
        Self::of(NodeKind::Grid { spacing: None })
    }

    pub fn rect() -> Self {
        Self::of(NodeKind::Rect)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::of(NodeKind::Text {
            text: text.into(),
            align: None,
        })
    }

    /// A box with a text label; the label is created as an internal child
    pub fn text_box(text: impl Into<String>) -> TextBoxObject {
        TextBoxObject {
            frame: Self::of(NodeKind::TextBox),
            text: text.into(),
            align: Align::Center,
        }
    }

    pub fn line(vector: impl Into<Point>) -> Self {
        Self::of(NodeKind::Line {
            vector: vector.into(),
        })
    }

    pub fn dotted_line(vector: impl Into<Point>) -> Self {
        Self::of(NodeKind::DottedLine {
            vector: vector.into(),
            dash: None,
        })
    }

    pub fn arrow(vector: impl Into<Point>) -> Self {
        Self::of(NodeKind::Arrow {
            vector: vector.into(),
            head_ratio: None,
            double_sided: false,
        })
    }

    /// Empty space, `padding` wide and high unless sized
    pub fn spacer() -> Self {
        Self::of(NodeKind::Spacer)
    }

    pub fn width(mut self, width: impl Into<Expression>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn height(mut self, height: impl Into<Expression>) -> Self {
        self.height = Some(height.into());
        self
    }

    pub fn size(self, width: impl Into<Expression>, height: impl Into<Expression>) -> Self {
        self.width(width).height(height)
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Horizontal alignment for text objects
    pub fn align(mut self, align: Align) -> Self {
        if let NodeKind::Text { align: slot, .. } = &mut self.kind {
            *slot = Some(align);
        }
        self
    }

    /// Draw heads at both ends of an arrow
    pub fn double_sided(mut self, double_sided: bool) -> Self {
        if let NodeKind::Arrow {
            double_sided: slot, ..
        } = &mut self.kind
        {
            *slot = double_sided;
        }
        self
    }

    pub fn head_ratio(mut self, ratio: f64) -> Self {
        if let NodeKind::Arrow {
            head_ratio: slot, ..
        } = &mut self.kind
        {
            *slot = Some(ratio);
        }
        self
    }

    pub fn dash(mut self, length: f64) -> Self {
        if let NodeKind::DottedLine { dash: slot, .. } = &mut self.kind {
            *slot = Some(length);
        }
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        if let NodeKind::Grid { spacing: slot } = &mut self.kind {
            *slot = Some(spacing);
        }
        self
    }
}

/// Builder for a text box and its label
#[derive(Debug, Clone)]
pub struct TextBoxObject {
    pub(crate) frame: Object,
    pub(crate) text: String,
    pub(crate) align: Align,
}

impl TextBoxObject {
    pub fn width(mut self, width: impl Into<Expression>) -> Self {
        self.frame = self.frame.width(width);
        self
    }

    pub fn height(mut self, height: impl Into<Expression>) -> Self {
        self.frame = self.frame.height(height);
        self
    }

    pub fn size(self, width: impl Into<Expression>, height: impl Into<Expression>) -> Self {
        self.width(width).height(height)
    }

    pub fn style(mut self, style: Style) -> Self {
        self.frame = self.frame.style(style);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

/// Anything [`Canvas::insert`](super::Canvas::insert) accepts
#[derive(Debug, Clone)]
pub enum Insertable {
    Object(Object),
    TextBox(TextBoxObject),
}

impl From<Object> for Insertable {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl From<TextBoxObject> for Insertable {
    fn from(object: TextBoxObject) -> Self {
        Self::TextBox(object)
    }
}
