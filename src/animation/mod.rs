//! Animations: time-driven edits of a canvas
//!
//! An [`Animation`] is an [`Effect`] plus a duration. Playing it at a frame
//! rate splits the duration into ticks; each tick applies the effect at a
//! normalized progress and hands the canvas to a frame callback. The first
//! tick shows the start value and the last tick the end value.

pub mod error;

pub use error::AnimationError;

use tracing::{debug, trace};

use crate::geometry::{Color, Point};
use crate::layout::{Canvas, Handle};
use crate::style::ColorAttribute;

/// Seconds an animation runs unless told otherwise
pub const DEFAULT_DURATION: f64 = 1.0;

const EPSILON: f64 = 1e-9;

/// Where a translation ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Absolute offset within the parent
    To(Point),
    /// Delta from the offset at the start of the animation
    By(Point),
}

/// What an animation does to the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing; holds the current picture for the duration
    Static,
    /// Linear alpha ramp
    Fade { target: Handle, start: u8, end: u8 },
    /// Per-channel linear blend of one colour attribute
    Recolor {
        target: Handle,
        attribute: ColorAttribute,
        from: Color,
        to: Color,
    },
    /// Linear move of the offset within the parent
    Translate {
        target: Handle,
        motion: Motion,
        start: Option<Point>,
    },
    /// Members stepped in lockstep; each stops at its own end
    Group(Vec<Animation>),
}

/// Lifecycle of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    effect: Effect,
    duration: f64,
    elapsed: f64,
    tick: usize,
}

impl Animation {
    fn new(effect: Effect) -> Self {
        Self {
            effect,
            duration: DEFAULT_DURATION,
            elapsed: 0.0,
            tick: 0,
        }
    }

    /// Hold the current picture
    pub fn wait(duration: f64) -> Self {
        Self::new(Effect::Static).with_duration(duration)
    }

    /// Alpha ramp between any two values
    pub fn fade(target: Handle, start: u8, end: u8) -> Self {
        Self::new(Effect::Fade { target, start, end })
    }

    /// Alpha ramp that must increase
    pub fn fade_in(target: Handle, start: u8, end: u8) -> Result<Self, AnimationError> {
        if start >= end {
            return Err(AnimationError::InvalidRange {
                kind: "fade in",
                expected: "below",
                start,
                end,
            });
        }
        Ok(Self::fade(target, start, end))
    }

    /// Alpha ramp that must decrease
    pub fn fade_out(target: Handle, start: u8, end: u8) -> Result<Self, AnimationError> {
        if start <= end {
            return Err(AnimationError::InvalidRange {
                kind: "fade out",
                expected: "above",
                start,
                end,
            });
        }
        Ok(Self::fade(target, start, end))
    }

    pub fn recolor(target: Handle, attribute: ColorAttribute, from: Color, to: Color) -> Self {
        Self::new(Effect::Recolor {
            target,
            attribute,
            from,
            to,
        })
    }

    /// Move to an absolute offset within the parent
    pub fn translate(target: Handle, destination: impl Into<Point>) -> Self {
        Self::new(Effect::Translate {
            target,
            motion: Motion::To(destination.into()),
            start: None,
        })
    }

    /// Move by `delta` from wherever the object is when the animation starts
    pub fn translate_by(target: Handle, delta: impl Into<Point>) -> Self {
        Self::new(Effect::Translate {
            target,
            motion: Motion::By(delta.into()),
            start: None,
        })
    }

    /// Run members together for as long as the longest of them
    pub fn group(members: Vec<Animation>) -> Self {
        let duration = members.iter().map(|m| m.duration).fold(0.0, f64::max);
        Self::new(Effect::Group(members)).with_duration(duration)
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn state(&self) -> AnimationState {
        if self.tick == 0 {
            AnimationState::Idle
        } else if self.elapsed + EPSILON >= self.duration {
            AnimationState::Finished
        } else {
            AnimationState::Running
        }
    }

    /// Number of frames the animation produces at `fps`; never zero
    pub fn ticks(&self, fps: f64) -> usize {
        ((self.duration * fps - EPSILON).ceil().max(1.0)) as usize
    }

    /// Rewind to the idle state
    ///
    /// A translation keeps the start offset it captured, so replaying it moves
    /// from the same origin again.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.tick = 0;
        if let Effect::Group(members) = &mut self.effect {
            members.iter_mut().for_each(Animation::reset);
        }
    }

    /// Point the effect at another object, forgetting any captured start
    ///
    /// Waits and groups have no single target and are left unchanged.
    pub fn retarget(&mut self, handle: Handle) {
        match &mut self.effect {
            Effect::Fade { target, .. } | Effect::Recolor { target, .. } => *target = handle,
            Effect::Translate { target, start, .. } => {
                *target = handle;
                *start = None;
            }
            Effect::Static | Effect::Group(_) => {}
        }
    }

    fn validate(&self, fps: f64) -> Result<(), AnimationError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(AnimationError::InvalidFrameRate(fps));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(AnimationError::InvalidDuration(self.duration));
        }
        if let Effect::Group(members) = &self.effect {
            members.iter().try_for_each(|m| m.validate(fps))?;
        }
        Ok(())
    }

    /// Apply the next tick and advance elapsed time by `1 / fps`
    pub fn step(&mut self, canvas: &mut Canvas, fps: f64) -> Result<(), AnimationError> {
        self.validate(fps)?;
        let tick = self.tick;
        self.apply(canvas, tick, fps)
    }

    fn apply(&mut self, canvas: &mut Canvas, tick: usize, fps: f64) -> Result<(), AnimationError> {
        let ticks = self.ticks(fps);
        let p = progress(tick.min(ticks - 1), ticks);
        trace!(tick, ticks, progress = p, "animation step");

        match &mut self.effect {
            Effect::Static => {}
            Effect::Fade { target, start, end } => {
                let alpha = lerp(*start as f64, *end as f64, p) as u8;
                canvas.style_mut(*target)?.alpha = Some(alpha);
            }
            Effect::Recolor {
                target,
                attribute,
                from,
                to,
            } => {
                canvas.style_mut(*target)?.set_color(*attribute, from.mix(*to, p));
            }
            Effect::Translate {
                target,
                motion,
                start,
            } => {
                let origin = match start {
                    Some(origin) => *origin,
                    None => {
                        let offset = canvas.offset(*target)?;
                        let origin =
                            Point::new(canvas.evaluate(&offset.x), canvas.evaluate(&offset.y));
                        *start = Some(origin);
                        origin
                    }
                };
                let destination = match motion {
                    Motion::To(point) => *point,
                    Motion::By(delta) => origin + *delta,
                };
                let position = Point::new(
                    lerp(origin.x, destination.x, p),
                    lerp(origin.y, destination.y, p),
                );
                canvas.set_offset(*target, position)?;
            }
            Effect::Group(members) => {
                for member in members.iter_mut() {
                    member.apply(canvas, tick, fps)?;
                }
            }
        }

        self.tick = tick + 1;
        self.elapsed = (self.tick as f64 / fps).min(self.duration.max(0.0));
        Ok(())
    }

    /// Run every tick, calling `frame` after each one
    ///
    /// Returns the number of frames produced. The animation is rewound first,
    /// so playing it twice replays it from its start values.
    pub fn play<E, F>(&mut self, canvas: &mut Canvas, fps: f64, mut frame: F) -> Result<usize, E>
    where
        E: From<AnimationError>,
        F: FnMut(&mut Canvas) -> Result<(), E>,
    {
        self.validate(fps)?;
        self.reset();
        let ticks = self.ticks(fps);
        debug!(duration = self.duration, fps, ticks, "playing animation");
        for _ in 0..ticks {
            self.step(canvas, fps)?;
            frame(canvas)?;
        }
        Ok(ticks)
    }
}

impl From<Vec<Animation>> for Animation {
    fn from(members: Vec<Animation>) -> Self {
        Animation::group(members)
    }
}

/// Normalized progress of tick `k` out of `n`
fn progress(k: usize, n: usize) -> f64 {
    if n <= 1 {
        1.0
    } else {
        k as f64 / (n - 1) as f64
    }
}

fn lerp(start: f64, end: f64, p: f64) -> f64 {
    start + (end - start) * p
}
