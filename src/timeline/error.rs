//! Error types for scene playback and output

use std::path::PathBuf;

use thiserror::Error;

use crate::animation::AnimationError;
use crate::layout::{Handle, LayoutError};

#[derive(Debug, Error)]
pub enum SceneError {
    /// The output extension names no supported container
    #[error("unsupported output format for '{}': expected .png, .apng or .gif", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The handle was not issued by any keyframe of this scene
    #[error("handle {handle} does not belong to this scene")]
    ForeignHandle { handle: Handle },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Animation(#[from] AnimationError),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("animated PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("frame store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
