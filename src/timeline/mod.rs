//! Scenes: keyframes played back into frames
//!
//! A [`Scene`] is a list of keyframes. Each keyframe is a canvas plus the
//! animations that run on it. A new keyframe starts as a clone of the one
//! before it, so handles taken earlier keep working on the newer canvas.

pub mod error;
pub mod output;

pub use error::SceneError;
pub use output::{write_frames, FrameStore, OutputFormat, OutputOptions};

use std::path::Path;

use image::RgbaImage;
use tracing::{debug, info, instrument};

use crate::animation::Animation;
use crate::layout::{Canvas, Handle, LayoutConfig};
use crate::renderer::{RasterRenderer, RenderContext, Renderer};
use crate::style::Theme;

use output::FrameBuffer;

/// Settings shared by every keyframe of a scene
#[derive(Debug, Clone, Default)]
pub struct SceneConfig {
    pub context: RenderContext,
    pub theme: Theme,
    pub layout: LayoutConfig,
    /// Times an animated output repeats; 0 loops forever
    pub loop_count: u16,
    pub frame_store: FrameStore,
}

impl SceneConfig {
    pub fn new(context: RenderContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_loop_count(mut self, loop_count: u16) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_frame_store(mut self, store: FrameStore) -> Self {
        self.frame_store = store;
        self
    }
}

/// A canvas snapshot and the animations that play on it
#[derive(Debug)]
pub struct KeyFrame {
    canvas: Canvas,
    animations: Vec<Animation>,
}

impl KeyFrame {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            animations: Vec::new(),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn add(&mut self, animation: impl Into<Animation>) {
        self.animations.push(animation.into());
    }
}

#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    history: Vec<KeyFrame>,
    current: KeyFrame,
    renderer: RasterRenderer,
    frames: Vec<RgbaImage>,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        let canvas = Canvas::new(config.theme.clone()).with_config(config.layout.clone());
        Self {
            renderer: RasterRenderer::new(config.context.clone()),
            config,
            history: Vec::new(),
            current: KeyFrame::new(canvas),
            frames: Vec::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Canvas of the newest keyframe
    pub fn canvas(&self) -> &Canvas {
        &self.current.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.current.canvas
    }

    pub fn keyframes(&self) -> impl Iterator<Item = &KeyFrame> {
        self.history.iter().chain(std::iter::once(&self.current))
    }

    /// Start a new keyframe from a clone of the current canvas
    pub fn keyframe(&mut self) -> Result<&mut Canvas, SceneError> {
        let next = KeyFrame::new(self.current.canvas.clone_canvas()?);
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push(previous);
        debug!(keyframes = self.history.len() + 1, "new keyframe");
        Ok(&mut self.current.canvas)
    }

    /// Attach an animation, or a group given as a `Vec`, to the newest keyframe
    pub fn add(&mut self, animation: impl Into<Animation>) {
        self.current.add(animation);
    }

    /// Newest version of `handle` among this scene's keyframes
    pub fn latest(&self, handle: Handle) -> Result<Handle, SceneError> {
        let keyframes: Vec<&KeyFrame> = self.keyframes().collect();
        let position_of = |key| keyframes.iter().position(|k| k.canvas.key() == key);
        let mut position =
            position_of(handle.canvas()).ok_or(SceneError::ForeignHandle { handle })?;
        let mut current = keyframes[position].canvas.latest(handle)?;
        while let Some(next) = keyframes[position].canvas.forwarded_to(current)? {
            match position_of(next) {
                Some(p) if p > position => {
                    current = keyframes[p].canvas.latest(current)?;
                    position = p;
                }
                _ => break,
            }
        }
        Ok(current)
    }

    /// Render the current canvas to one image
    pub fn render_frame(&mut self) -> Result<RgbaImage, SceneError> {
        capture(&mut self.renderer, &mut self.current.canvas)
    }

    /// Frames of the last [`Scene::play`]
    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    /// Play every keyframe's animations and write the result to `path`
    ///
    /// The output format comes from the extension and is checked before
    /// anything is rendered. Returns the number of frames; with no frames
    /// nothing is written.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn play(&mut self, frame_rate: f64, path: impl AsRef<Path>) -> Result<usize, SceneError> {
        let path = path.as_ref();
        let format = OutputFormat::from_path(path)?;

        let mut buffer = FrameBuffer::new(self.config.frame_store.clone());
        buffer.clear()?;

        let Scene {
            history,
            current,
            renderer,
            ..
        } = self;
        for keyframe in history.iter_mut().chain(std::iter::once(current)) {
            let KeyFrame { canvas, animations } = keyframe;
            // offsets captured by translations read the solved layout
            canvas.prepare(&*renderer)?;
            for animation in animations.iter_mut() {
                animation.play(canvas, frame_rate, |canvas: &mut Canvas| {
                    buffer.push(capture(renderer, canvas)?)
                })?;
            }
        }

        self.frames = buffer.read_back()?;
        info!(frames = self.frames.len(), frame_rate, "playback finished");
        let options = OutputOptions {
            frame_rate,
            loop_count: self.config.loop_count,
            background: self.config.context.background,
        };
        write_frames(&self.frames, path, format, &options)?;
        Ok(self.frames.len())
    }
}

fn capture(renderer: &mut RasterRenderer, canvas: &mut Canvas) -> Result<RgbaImage, SceneError> {
    canvas.draw(renderer)?;
    renderer.crop_to_fit();
    let frame = renderer.to_image();
    renderer.clear();
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Object;

    fn scene() -> Scene {
        Scene::new(SceneConfig::new(RenderContext::new(20, 20)))
    }

    #[test]
    fn test_keyframe_clones_current_canvas() {
        let mut scene = scene();
        let root = scene.canvas().root();
        let rect = scene.canvas_mut().add(root, Object::rect(), (0.0, 0.0)).unwrap();
        let first = scene.canvas().key();
        scene.keyframe().unwrap();
        assert_ne!(scene.canvas().key(), first);
        assert!(scene.canvas().contains(rect));
        assert_eq!(scene.keyframes().count(), 2);
    }

    #[test]
    fn test_latest_follows_keyframes() {
        let mut scene = scene();
        let root = scene.canvas().root();
        let rect = scene.canvas_mut().add(root, Object::rect(), (0.0, 0.0)).unwrap();
        scene.keyframe().unwrap();
        scene.keyframe().unwrap();
        let newest = scene.latest(rect).unwrap();
        assert_eq!(newest.canvas(), scene.canvas().key());
        assert_eq!(newest, rect);
    }

    #[test]
    fn test_no_animations_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gif");
        assert_eq!(scene().play(10.0, &path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_unsupported_format_rejected_before_rendering() {
        let mut scene = scene();
        scene.add(Animation::wait(1.0));
        let err = scene.play(10.0, "out.bmp").unwrap_err();
        assert!(matches!(err, SceneError::UnsupportedFormat { .. }));
        assert!(scene.frames().is_empty());
    }
}
