//! Scene graph: an arena of objects laid out by a constraint solver
//!
//! A [`Canvas`] owns every node and one solver. Building a diagram inserts
//! [`Object`]s and attaches them under containers; `prepare` turns the tree
//! into constraints and solves them, `render` walks the tree and draws.

pub mod canvas;
pub mod config;
mod draw;
pub mod error;
pub mod node;
pub mod object;
mod policy;

pub use canvas::Canvas;
pub use config::LayoutConfig;
pub use error::LayoutError;
pub use node::{CanvasKey, Geometry, Handle, NodeKind, ObjectId};
pub use object::{Insertable, Object, TextBoxObject};
