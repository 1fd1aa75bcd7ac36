use crate::{
    animation::ease::Ease,
    animation::proc::{ProcValue, Procedural},
    foundation::core::{Fps, FrameIndex, Transform2D, Vec2},
    foundation::error::{StackError, StackResult},
};

/// Sampling context handed to every animation.
#[derive(Clone, Copy, Debug)]
pub struct SampleCtx {
    /// Output timeline frame.
    pub frame: FrameIndex,
    /// Document frame rate.
    pub fps: Fps,
    /// Scene-local frame (0 at the first frame of the scene).
    pub local: FrameIndex,
    /// Deterministic per-layer seed for procedural sources.
    pub seed: u64,
}

impl SampleCtx {
    fn remapped(mut self, local: FrameIndex) -> Self {
        let delta = i128::from(local.0) - i128::from(self.local.0);
        self.frame = if delta >= 0 {
            FrameIndex(self.frame.0.saturating_add(delta as u64))
        } else {
            FrameIndex(self.frame.0.saturating_sub(delta.unsigned_abs() as u64))
        };
        self.local = local;
        self
    }
}

/// Values that can be interpolated between keyframes.
pub trait Lerp: Sized {
    /// Interpolate from `a` (t = 0) to `b` (t = 1).
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Transform2D {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            translate: a.translate.lerp(b.translate, t),
            rotation_rad: <f64 as Lerp>::lerp(&a.rotation_rad, &b.rotation_rad, t),
            scale: a.scale.lerp(b.scale, t),
            anchor: a.anchor.lerp(b.anchor, t),
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// An animated value: keyframes, a procedural source, or a time-remapping expression.
pub enum Anim<T> {
    /// Interpolated keyframes.
    Keyframes(Keyframes<T>),
    /// Procedural generator.
    Procedural(Procedural<T>),
    /// Time remapping around another animation.
    Expr(Expr<T>),
}

impl<T> Anim<T>
where
    T: Lerp + Clone + ProcValue,
{
    /// A value that never changes.
    pub fn constant(value: T) -> Self {
        Self::Keyframes(Keyframes {
            keys: vec![Keyframe {
                frame: FrameIndex(0),
                value,
                ease: Ease::Linear,
            }],
            mode: InterpMode::Hold,
            default: None,
        })
    }

    /// Two-key linear tween from `from` at frame `start` to `to` at frame `end`.
    pub fn tween(from: T, to: T, start: u64, end: u64, ease: Ease) -> Self {
        Self::Keyframes(Keyframes {
            keys: vec![
                Keyframe {
                    frame: FrameIndex(start),
                    value: from,
                    ease,
                },
                Keyframe {
                    frame: FrameIndex(end),
                    value: to,
                    ease: Ease::Linear,
                },
            ],
            mode: InterpMode::Linear,
            default: None,
        })
    }

    /// Sample at `ctx.local`.
    pub fn sample(&self, ctx: SampleCtx) -> StackResult<T> {
        match self {
            Self::Keyframes(kf) => kf.sample(ctx),
            Self::Procedural(p) => p.sample(ctx),
            Self::Expr(e) => e.sample(ctx),
        }
    }

    /// Reject structurally invalid animations before any sampling happens.
    pub fn validate(&self) -> StackResult<()> {
        match self {
            Self::Keyframes(kf) => kf.validate(),
            Self::Procedural(p) => p.validate(),
            Self::Expr(e) => e.validate(),
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Keyframe track.
pub struct Keyframes<T> {
    /// Keys sorted by frame.
    pub keys: Vec<Keyframe<T>>,
    /// Interpolation between keys.
    pub mode: InterpMode,
    /// Value used when `keys` is empty.
    #[serde(default = "Option::default")]
    pub default: Option<T>,
}

impl<T> Keyframes<T>
where
    T: Lerp + Clone,
{
    fn validate(&self) -> StackResult<()> {
        if self.keys.is_empty() && self.default.is_none() {
            return Err(StackError::animation(
                "keyframes need at least one key or a default value",
            ));
        }
        if self.keys.windows(2).any(|w| w[0].frame > w[1].frame) {
            return Err(StackError::animation("keyframes must be sorted by frame"));
        }
        Ok(())
    }

    fn sample(&self, ctx: SampleCtx) -> StackResult<T> {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return self
                .default
                .clone()
                .ok_or_else(|| StackError::animation("keyframes have no keys and no default"));
        };

        let f = ctx.local;
        let next = self.keys.partition_point(|k| k.frame <= f);
        if next == 0 {
            return Ok(first.value.clone());
        }
        if next == self.keys.len() {
            return Ok(last.value.clone());
        }

        let a = &self.keys[next - 1];
        let b = &self.keys[next];
        let span = b.frame.0 - a.frame.0;
        if span == 0 || matches!(self.mode, InterpMode::Hold) {
            return Ok(a.value.clone());
        }
        let t = a.ease.apply(((f.0 - a.frame.0) as f64) / (span as f64));
        Ok(T::lerp(&a.value, &b.value, t))
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// One key in a [`Keyframes`] track.
pub struct Keyframe<T> {
    /// Scene-local frame of the key.
    pub frame: FrameIndex,
    /// Value at the key.
    pub value: T,
    /// Ease applied on the way to the next key.
    #[serde(default)]
    pub ease: Ease,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Interpolation mode between keys.
pub enum InterpMode {
    /// Step: hold the previous key's value.
    Hold,
    /// Interpolate through the key's ease.
    Linear,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Time remapping wrapped around an inner animation.
pub enum Expr<T> {
    /// Start the inner animation `by` frames late (holding its first value before).
    Delay {
        /// Inner animation.
        inner: Box<Anim<T>>,
        /// Delay in frames.
        by: u64,
    },
    /// Play the inner animation `factor` times faster.
    Speed {
        /// Inner animation.
        inner: Box<Anim<T>>,
        /// Playback multiplier; must be > 0.
        factor: f64,
    },
    /// Repeat the first `period` frames of the inner animation.
    Loop {
        /// Inner animation.
        inner: Box<Anim<T>>,
        /// Loop length in frames; must be > 0.
        period: u64,
        /// Repeat or ping-pong.
        mode: LoopMode,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Looping strategy for [`Expr::Loop`].
pub enum LoopMode {
    /// `0, 1, .., p-1, 0, 1, ..`
    Repeat,
    /// `0, 1, .., p-1, p-2, .., 1, 0, 1, ..`
    PingPong,
}

impl<T> Expr<T>
where
    T: Lerp + Clone + ProcValue,
{
    fn validate(&self) -> StackResult<()> {
        match self {
            Self::Delay { inner, .. } => inner.validate(),
            Self::Speed { inner, factor } => {
                if !factor.is_finite() || *factor <= 0.0 {
                    return Err(StackError::animation("speed factor must be finite and > 0"));
                }
                inner.validate()
            }
            Self::Loop { inner, period, .. } => {
                if *period == 0 {
                    return Err(StackError::animation("loop period must be > 0"));
                }
                inner.validate()
            }
        }
    }

    fn sample(&self, ctx: SampleCtx) -> StackResult<T> {
        let f = ctx.local.0;
        match self {
            Self::Delay { inner, by } => {
                inner.sample(ctx.remapped(FrameIndex(f.saturating_sub(*by))))
            }
            Self::Speed { inner, factor } => {
                if !factor.is_finite() || *factor <= 0.0 {
                    return Err(StackError::animation("speed factor must be finite and > 0"));
                }
                let mapped = ((f as f64) * factor).floor().max(0.0) as u64;
                inner.sample(ctx.remapped(FrameIndex(mapped)))
            }
            Self::Loop {
                inner,
                period,
                mode,
            } => {
                if *period == 0 {
                    return Err(StackError::animation("loop period must be > 0"));
                }
                let mapped = match mode {
                    LoopMode::Repeat => f % period,
                    LoopMode::PingPong if *period == 1 => 0,
                    LoopMode::PingPong => {
                        let cycle = 2 * (period - 1);
                        let pos = f % cycle;
                        if pos < *period { pos } else { cycle - pos }
                    }
                };
                inner.sample(ctx.remapped(FrameIndex(mapped)))
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
