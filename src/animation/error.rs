//! Error types for animations

use thiserror::Error;

use crate::layout::LayoutError;

#[derive(Debug, Error)]
pub enum AnimationError {
    /// Start and end values do not move in the direction the animation needs
    #[error("{kind} needs start {expected} end, got {start} -> {end}")]
    InvalidRange {
        kind: &'static str,
        expected: &'static str,
        start: u8,
        end: u8,
    },

    #[error("frame rate must be a positive number, got {0}")]
    InvalidFrameRate(f64),

    #[error("duration must be a non-negative number, got {0}")]
    InvalidDuration(f64),

    /// The animated object could not be updated
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
