//! Diagram Animator - constraint-laid-out diagrams and keyframe animations
//!
//! Diagrams are trees of objects on a [`Canvas`]. Containers turn their
//! children into linear constraints, a solver resolves every position and
//! size, and a [`Renderer`] draws the result. A [`Scene`] strings canvases
//! together as keyframes and plays [`Animation`]s on them into PNG, APNG or
//! GIF output.
//!
//! # Example
//!
//! ```rust
//! use diagram_animator::{Canvas, Object, RasterRenderer, RenderContext};
//!
//! let mut canvas = Canvas::default().with_padding(1.0);
//! let root = canvas.root();
//! let rect = canvas.add(root, Object::rect().size(3.0, 3.0), (0.0, 0.0)).unwrap();
//!
//! let mut renderer = RasterRenderer::new(RenderContext::new(5, 5));
//! canvas.draw(&mut renderer).unwrap();
//! assert_eq!(canvas.bounds(rect).unwrap().x, 1.0);
//! ```

pub mod animation;
pub mod bitfield;
pub mod geometry;
pub mod layout;
pub mod renderer;
pub mod solver;
pub mod style;
pub mod timeline;

pub use animation::{Animation, AnimationError};
pub use bitfield::{BitfieldError, BitfieldOptions, Register};
pub use geometry::{BoundingBox, Color, Offset, Point};
pub use layout::{Canvas, Handle, LayoutConfig, LayoutError, Object};
pub use renderer::{RasterRenderer, RenderContext, Renderer};
pub use solver::{Expression, Solver, SolverError, Strength, Variable, WeightedRelation};
pub use style::{Anchor, Align, ColorAttribute, Style, Theme, ThemeError};
pub use timeline::{FrameStore, OutputFormat, Scene, SceneConfig, SceneError};

use std::path::Path;

use thiserror::Error;

/// Any error the library can produce
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("animation error: {0}")]
    Animation(#[from] AnimationError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("theme error: {0}")]
    Theme(#[from] ThemeError),

    #[error("bitfield error: {0}")]
    Bitfield(#[from] BitfieldError),
}

/// Draw `canvas` once and write it to `path` as a still image
///
/// The format comes from the extension, as for [`Scene::play`].
pub fn render_to_file(
    canvas: &mut Canvas,
    context: &RenderContext,
    path: &Path,
) -> Result<(), Error> {
    let format = OutputFormat::from_path(path)?;
    let mut renderer = RasterRenderer::new(context.clone());
    canvas.draw(&mut renderer)?;
    renderer.crop_to_fit();
    let options = timeline::OutputOptions {
        frame_rate: 1.0,
        loop_count: 0,
        background: context.background,
    };
    timeline::write_frames(&[renderer.into_image()], path, format, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_to_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        let mut canvas = Canvas::default().with_padding(1.0);
        let root = canvas.root();
        canvas.add(root, Object::rect().size(3.0, 3.0), (0.0, 0.0)).unwrap();

        render_to_file(&mut canvas, &RenderContext::new(5, 5), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);
        let image = image::open(&path).unwrap();
        assert_eq!((image.width(), image.height()), (5, 5));
    }

    #[test]
    fn test_render_to_file_rejects_unknown_extension() {
        let mut canvas = Canvas::default();
        let context = RenderContext::new(5, 5);
        let err = render_to_file(&mut canvas, &context, Path::new("out.svg")).unwrap_err();
        assert!(matches!(err, Error::Scene(SceneError::UnsupportedFormat { .. })));
    }
}
