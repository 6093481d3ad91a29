//! Frame capture and the output containers

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{imageops, Delay, Frame, ImageFormat, Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::geometry::Color;

use super::error::SceneError;

/// Container chosen from the output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Still PNG, or APNG when there is more than one frame
    Png,
    /// Same container as [`OutputFormat::Png`] under its own extension
    Apng,
    /// Still or animated GIF; translucency is reduced to on/off
    Gif,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, SceneError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("apng") => Ok(Self::Apng),
            Some("gif") => Ok(Self::Gif),
            _ => Err(SceneError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn keeps_alpha(&self) -> bool {
        !matches!(self, Self::Gif)
    }
}

/// Where captured frames wait until the output is assembled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FrameStore {
    #[default]
    Memory,
    /// One `frame-N.png` per frame in this directory
    Directory(PathBuf),
}

/// Frames of one playback run
#[derive(Debug)]
pub(crate) struct FrameBuffer {
    store: FrameStore,
    memory: Vec<RgbaImage>,
    count: usize,
}

impl FrameBuffer {
    pub(crate) fn new(store: FrameStore) -> Self {
        Self {
            store,
            memory: Vec::new(),
            count: 0,
        }
    }

    fn frame_path(dir: &Path, n: usize) -> PathBuf {
        dir.join(format!("frame-{n}.png"))
    }

    /// Drop every frame of a previous run
    pub(crate) fn clear(&mut self) -> Result<(), SceneError> {
        self.memory.clear();
        self.count = 0;
        if let FrameStore::Directory(dir) = &self.store {
            fs::create_dir_all(dir)?;
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                let stale = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("frame-") && n.ends_with(".png"));
                if stale {
                    fs::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, frame: RgbaImage) -> Result<(), SceneError> {
        match &self.store {
            FrameStore::Memory => self.memory.push(frame),
            FrameStore::Directory(dir) => {
                frame.save_with_format(Self::frame_path(dir, self.count), ImageFormat::Png)?;
            }
        }
        self.count += 1;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Every frame of the run, in order
    pub(crate) fn read_back(&mut self) -> Result<Vec<RgbaImage>, SceneError> {
        match &self.store {
            FrameStore::Memory => Ok(std::mem::take(&mut self.memory)),
            FrameStore::Directory(dir) => (0..self.count)
                .map(|n| Ok(image::open(Self::frame_path(dir, n))?.to_rgba8()))
                .collect(),
        }
    }
}

/// Settings of the output container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputOptions {
    pub frame_rate: f64,
    /// Times an animation repeats; 0 loops forever
    pub loop_count: u16,
    /// Colour of the padding added around smaller frames
    pub background: Color,
}

/// Pad every frame to the size of the largest one
fn uniform(frames: &[RgbaImage], background: Color) -> Vec<RgbaImage> {
    let width = frames.iter().map(|f| f.width()).max().unwrap_or(0);
    let height = frames.iter().map(|f| f.height()).max().unwrap_or(0);
    frames
        .iter()
        .map(|frame| {
            if frame.dimensions() == (width, height) {
                return frame.clone();
            }
            let mut padded = RgbaImage::from_pixel(width, height, Rgba(background.to_array()));
            imageops::replace(&mut padded, frame, 0, 0);
            padded
        })
        .collect()
}

/// Write `frames` to `path`; nothing is written when there are no frames
pub fn write_frames(
    frames: &[RgbaImage],
    path: &Path,
    format: OutputFormat,
    options: &OutputOptions,
) -> Result<(), SceneError> {
    match frames {
        [] => {
            debug!(path = %path.display(), "no frames, skipping output");
            return Ok(());
        }
        [still] => {
            let container = match format {
                OutputFormat::Png | OutputFormat::Apng => ImageFormat::Png,
                OutputFormat::Gif => ImageFormat::Gif,
            };
            still.save_with_format(path, container)?;
        }
        _ => {
            let frames = uniform(frames, options.background);
            match format {
                OutputFormat::Png | OutputFormat::Apng => write_apng(&frames, path, options)?,
                OutputFormat::Gif => write_gif(frames, path, options)?,
            }
        }
    }
    info!(path = %path.display(), frames = frames.len(), ?format, "wrote output");
    Ok(())
}

fn frame_delay_ms(frame_rate: f64) -> u16 {
    (1000.0 / frame_rate).round().clamp(1.0, u16::MAX as f64) as u16
}

/// Per-frame GIF delay; matches the APNG delay for every frame rate
fn gif_delay(frame_rate: f64) -> Delay {
    Delay::from_numer_denom_ms(frame_delay_ms(frame_rate) as u32, 1)
}

fn write_apng(
    frames: &[RgbaImage],
    path: &Path,
    options: &OutputOptions,
) -> Result<(), SceneError> {
    let (width, height) = frames[0].dimensions();
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_animated(frames.len() as u32, options.loop_count as u32)?;
    encoder.set_frame_delay(frame_delay_ms(options.frame_rate), 1000)?;
    let mut writer = encoder.write_header()?;
    for frame in frames {
        writer.write_image_data(frame.as_raw())?;
    }
    writer.finish()?;
    Ok(())
}

fn write_gif(
    frames: Vec<RgbaImage>,
    path: &Path,
    options: &OutputOptions,
) -> Result<(), SceneError> {
    warn!(path = %path.display(), "GIF output drops partial transparency");
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(match options.loop_count {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    })?;
    let delay = gif_delay(options.frame_rate);
    encoder.encode_frames(frames.into_iter().map(|f| Frame::from_parts(f, 0, 0, delay)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.png")).unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path(Path::new("a.APNG")).unwrap(), OutputFormat::Apng);
        assert_eq!(OutputFormat::from_path(Path::new("a.gif")).unwrap(), OutputFormat::Gif);
        assert!(matches!(
            OutputFormat::from_path(Path::new("a.mp4")),
            Err(SceneError::UnsupportedFormat { .. })
        ));
        assert!(OutputFormat::from_path(Path::new("frames")).is_err());
    }

    #[test]
    fn test_frames_padded_to_largest() {
        let small = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let large = RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 255]));
        let padded = uniform(&[small, large], Color::WHITE);
        assert!(padded.iter().all(|f| f.dimensions() == (4, 3)));
        assert_eq!(padded[0].get_pixel(3, 2), &Rgba([255, 255, 255, 255]));
        assert_eq!(padded[0].get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_frame_delay() {
        assert_eq!(frame_delay_ms(5.0), 200);
        assert_eq!(frame_delay_ms(50.0), 20);
        assert_eq!(frame_delay_ms(3.0), 333);
    }

    #[test]
    fn test_gif_delay_handles_fractional_rates() {
        assert_eq!(gif_delay(0.5).numer_denom_ms(), (2000, 1));
        assert_eq!(gif_delay(2.5).numer_denom_ms(), (400, 1));
        assert_eq!(gif_delay(30.0).numer_denom_ms(), (33, 1));
    }

    #[test]
    fn test_directory_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = FrameBuffer::new(FrameStore::Directory(dir.path().to_path_buf()));
        buffer.clear().unwrap();
        buffer.push(RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]))).unwrap();
        buffer.push(RgbaImage::from_pixel(1, 1, Rgba([4, 5, 6, 255]))).unwrap();
        assert!(dir.path().join("frame-1.png").exists());

        let frames = buffer.read_back().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get_pixel(0, 0), &Rgba([4, 5, 6, 255]));

        buffer.clear().unwrap();
        assert_eq!(buffer.len(), 0);
        assert!(!dir.path().join("frame-0.png").exists());
    }

    #[test]
    fn test_no_frames_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let options = OutputOptions {
            frame_rate: 5.0,
            loop_count: 0,
            background: Color::WHITE,
        };
        write_frames(&[], &path, OutputFormat::Png, &options).unwrap();
        assert!(!path.exists());
    }
}
