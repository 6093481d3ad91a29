//! Error types for the scene graph

use thiserror::Error;

use crate::solver::SolverError;

use super::node::{CanvasKey, ObjectId};

/// Errors that can occur while editing, preparing or rendering a canvas
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),

    /// An object can have only one parent
    #[error("object {object} already has a parent")]
    AlreadyParented { object: ObjectId },

    /// The object is not where the operation expected it
    #[error("object {object} not found in {context}")]
    NotFound { object: ObjectId, context: String },

    /// The handle belongs to a canvas this one was not cloned from
    #[error("handle for object {object} was issued by {issued_by}, not an ancestor of {canvas}")]
    StaleHandle {
        object: ObjectId,
        issued_by: CanvasKey,
        canvas: CanvasKey,
    },

    /// A box too small to have a border on each side
    #[error("box {object} is {width}x{height}, smaller than the minimum {minimum}x{minimum}")]
    BoxTooSmall {
        object: ObjectId,
        width: f64,
        height: f64,
        minimum: f64,
    },

    /// Render was called after a structural edit without a new prepare
    #[error("{canvas} has changed since it was last prepared")]
    NotPrepared { canvas: CanvasKey },

    #[error("invalid operation on object {object}: {reason}")]
    InvalidOperation { object: ObjectId, reason: String },
}

impl LayoutError {
    pub fn not_found(object: ObjectId, context: impl Into<String>) -> Self {
        Self::NotFound {
            object,
            context: context.into(),
        }
    }

    pub fn invalid(object: ObjectId, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            object,
            reason: reason.into(),
        }
    }

    /// The underlying solver error, when the failure was an infeasibility
    pub fn solver_error(&self) -> Option<&SolverError> {
        match self {
            Self::Solver(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = ObjectId::next();
        let err = LayoutError::not_found(id, "children of the canvas");
        assert_eq!(
            err.to_string(),
            format!("object {id} not found in children of the canvas")
        );
        let err = LayoutError::BoxTooSmall {
            object: id,
            width: 1.0,
            height: 5.0,
            minimum: 2.0,
        };
        assert!(err.to_string().contains("1x5"));
        assert!(err.solver_error().is_none());
    }
}
