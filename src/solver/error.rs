//! Error types for the constraint solver

use thiserror::Error;

use super::expr::Constraint;

/// Errors raised while mutating a constraint set
#[derive(Debug, Error)]
pub enum SolverError {
    /// The constraint cannot be satisfied together with the existing set
    #[error("unsatisfiable constraint `{constraint}`: {reason}")]
    Unsatisfiable {
        constraint: Constraint,
        reason: String,
    },

    /// kasuari already holds an identical constraint object
    #[error("duplicate constraint `{constraint}`")]
    Duplicate { constraint: String },

    #[error("internal solver error: {0}")]
    Internal(String),
}

impl SolverError {
    pub fn unsatisfiable(constraint: Constraint, reason: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            constraint,
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The constraint that triggered an infeasibility, if any
    pub fn offending_constraint(&self) -> Option<&Constraint> {
        match self {
            Self::Unsatisfiable { constraint, .. } => Some(constraint),
            _ => None,
        }
    }
}
