use crate::foundation::error::{StackError, StackResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
/// Zero-based frame index on the output timeline (or scene-local, depending on context).
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Half-open frame interval `[start, end)`.
pub struct FrameRange {
    /// First frame inside the range.
    pub start: FrameIndex,
    /// First frame past the range.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> StackResult<Self> {
        if start.0 > end.0 {
            return Err(StackError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames covered by the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// `true` when the range covers no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// `true` when `f` lies in `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Clamp `f` to the last frame inside the range (or `start` for empty ranges).
    pub fn clamp(self, f: FrameIndex) -> FrameIndex {
        if self.is_empty() {
            return self.start;
        }
        FrameIndex(f.0.clamp(self.start.0, self.end.0 - 1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Rational frame rate `num / den` frames per second.
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds); must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a frame rate, rejecting zero numerator or denominator.
    pub fn new(num: u32, den: u32) -> StackResult<Self> {
        if den == 0 {
            return Err(StackError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StackError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of a single frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert a frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to whole frames, rounding down.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Output canvas size in pixels.
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red, premultiplied.
    pub r: u8,
    /// Green, premultiplied.
    pub g: u8,
    /// Blue, premultiplied.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Premultiply a straight-alpha color.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: crate::foundation::math::mul_div255_u8(u16::from(r), u16::from(a)),
            g: crate::foundation::math::mul_div255_u8(u16::from(g), u16::from(a)),
            b: crate::foundation::math::mul_div255_u8(u16::from(b), u16::from(a)),
            a,
        }
    }

    /// Premultiply a straight-alpha `[r, g, b, a]` array.
    pub fn from_straight_array(rgba: [u8; 4]) -> Self {
        Self::from_straight_rgba(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Channels as `[r, g, b, a]`.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Decomposed 2D transform used by layer animation.
pub struct Transform2D {
    /// Translation in canvas pixels.
    pub translate: Vec2,
    /// Rotation in radians around `anchor`.
    pub rotation_rad: f64,
    /// Scale around `anchor`; identity is `(1, 1)`.
    pub scale: Vec2,
    /// Pivot point in layer-local space.
    pub anchor: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            rotation_rad: 0.0,
            scale: Vec2::new(1.0, 1.0),
            anchor: Vec2::ZERO,
        }
    }
}

impl Transform2D {
    /// Compose into an affine matrix.
    pub fn to_affine(self) -> Affine {
        // T(translate) * T(anchor) * R(rot) * S(scale) * T(-anchor)
        Affine::translate(self.translate)
            * Affine::translate(self.anchor)
            * Affine::rotate(self.rotation_rad)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::translate(-self.anchor)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
