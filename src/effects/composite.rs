use crate::{
    effects::transitions::{Direction, TransitionKind},
    foundation::error::{StackError, StackResult},
    foundation::math::{hash01, mul_div255_u8, smoothstep},
};

pub(crate) type PremulRgba8 = [u8; 4];

const TRANSPARENT: PremulRgba8 = [0, 0, 0, 0];

/// Source-over with an extra opacity multiplier.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = unit_to_u8(opacity);
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Per-channel linear blend; exact at `t = 0` and `t = 1`.
pub(crate) fn lerp_px(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let tt = unit_to_u8(t);
    let it = 255u16 - tt;
    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u8(u16::from(a[i]), it);
        let bv = mul_div255_u8(u16::from(b[i]), tt);
        out[i] = av.saturating_add(bv);
    }
    out
}

fn unit_to_u8(t: f32) -> u16 {
    ((t.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16
}

/// Read-only view of a premultiplied RGBA8 surface.
#[derive(Clone, Copy)]
pub(crate) struct SurfaceView<'a> {
    pub(crate) data: &'a [u8],
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl<'a> SurfaceView<'a> {
    pub(crate) fn new(data: &'a [u8], width: u32, height: u32) -> StackResult<Self> {
        if data.len() != expected_len(width, height)? {
            return Err(StackError::evaluation(
                "surface view expects width*height*4 bytes",
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    fn px(&self, x: u32, y: u32) -> PremulRgba8 {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    fn px_opt(&self, x: i64, y: i64) -> Option<PremulRgba8> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(self.px(x as u32, y as u32))
    }

    fn px_clamped(&self, x: i64, y: i64) -> PremulRgba8 {
        let x = x.clamp(0, i64::from(self.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.height) - 1) as u32;
        self.px(x, y)
    }
}

fn expected_len(width: u32, height: u32) -> StackResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| StackError::evaluation("surface size overflow"))
}

/// `dst = src over dst` for whole buffers.
pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> StackResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StackError::evaluation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend `a` (outgoing) into `b` (incoming) with `kind` at progress `t`, then composite the
/// result over `dst`.
pub(crate) fn transition_over_in_place(
    dst: &mut [u8],
    a: SurfaceView<'_>,
    b: SurfaceView<'_>,
    kind: &TransitionKind,
    t: f32,
) -> StackResult<()> {
    let (width, height) = (a.width, a.height);
    if (b.width, b.height) != (width, height) || dst.len() != expected_len(width, height)? {
        return Err(StackError::evaluation(
            "transition expects equally sized surfaces",
        ));
    }
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };

    let shader = Shader::new(kind, t, width, height);
    for y in 0..height {
        for x in 0..width {
            let blended = if t <= 0.0 {
                a.px(x, y)
            } else if t >= 1.0 {
                b.px(x, y)
            } else {
                shader.shade(&a, &b, x, y)
            };
            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            let dp = [dst[idx], dst[idx + 1], dst[idx + 2], dst[idx + 3]];
            dst[idx..idx + 4].copy_from_slice(&over(dp, blended, 1.0));
        }
    }
    Ok(())
}

/// Per-frame constants for one transition kind.
enum Shader {
    Crossfade {
        t: f32,
    },
    Wipe {
        dir: Direction,
        edge: f32,
        soft_px: f32,
    },
    Shift {
        dir: Direction,
        a_offset: i64,
        b_offset: i64,
    },
    Zoom {
        t: f32,
        a_scale: f64,
        b_scale: f64,
        cx: f64,
        cy: f64,
    },
    Dissolve {
        seed: u64,
        softness: f32,
        progress: f32,
    },
    Glitch {
        seed: u64,
        t: f32,
        amount: f32,
        band_h: u32,
        bucket: u64,
        max_shift: f32,
        split: i64,
    },
    FadeThrough {
        t: f32,
        color: PremulRgba8,
    },
}

impl Shader {
    fn new(kind: &TransitionKind, t: f32, width: u32, height: u32) -> Self {
        let axis_len = |dir: Direction| {
            if dir.is_horizontal() {
                width
            } else {
                height
            }
        };
        match *kind {
            TransitionKind::Crossfade => Self::Crossfade { t },
            TransitionKind::Wipe { dir, soft_edge } => {
                let axis = axis_len(dir) as f32;
                let soft_px = soft_edge.max(0.0) * axis;
                Self::Wipe {
                    dir,
                    edge: t * (axis + 2.0 * soft_px) - soft_px,
                    soft_px,
                }
            }
            TransitionKind::Slide { dir } | TransitionKind::Push { dir } => {
                let axis = i64::from(axis_len(dir));
                let travel = ((t as f64) * (axis as f64)).round() as i64;
                let push = matches!(kind, TransitionKind::Push { .. });
                Self::Shift {
                    dir,
                    a_offset: if push { travel } else { 0 },
                    b_offset: travel - axis,
                }
            }
            TransitionKind::Zoom { intensity } => {
                let s = f64::from(intensity);
                let t64 = f64::from(t);
                Self::Zoom {
                    t,
                    a_scale: 1.0 + s * t64,
                    b_scale: 1.0 / (1.0 + s * (1.0 - t64)),
                    cx: f64::from(width) / 2.0,
                    cy: f64::from(height) / 2.0,
                }
            }
            TransitionKind::Dissolve { seed, softness } => Self::Dissolve {
                seed,
                softness,
                progress: t * (1.0 + softness),
            },
            TransitionKind::Glitch { seed, intensity } => {
                let amount = intensity * (std::f32::consts::PI * t).sin().max(0.0);
                Self::Glitch {
                    seed,
                    t,
                    amount,
                    band_h: (height / 24).max(1),
                    bucket: (t * 16.0).floor() as u64,
                    max_shift: amount * (width as f32) * 0.1,
                    split: (amount * (width as f32) * 0.01).round() as i64,
                }
            }
            TransitionKind::FadeThrough { color } => Self::FadeThrough {
                t,
                color: color.to_array(),
            },
        }
    }

    fn shade(&self, a: &SurfaceView<'_>, b: &SurfaceView<'_>, x: u32, y: u32) -> PremulRgba8 {
        match *self {
            Self::Crossfade { t } => lerp_px(a.px(x, y), b.px(x, y), t),
            Self::Wipe { dir, edge, soft_px } => {
                let pos = match dir {
                    Direction::LeftToRight => x as f32,
                    Direction::RightToLeft => (a.width - 1 - x) as f32,
                    Direction::TopToBottom => y as f32,
                    Direction::BottomToTop => (a.height - 1 - y) as f32,
                };
                let m = if soft_px <= 0.0 {
                    if pos < edge { 1.0 } else { 0.0 }
                } else {
                    1.0 - smoothstep(edge - soft_px, edge + soft_px, pos)
                };
                lerp_px(a.px(x, y), b.px(x, y), m)
            }
            Self::Shift {
                dir,
                a_offset,
                b_offset,
            } => {
                let (bx, by) = shifted(dir, x, y, b_offset);
                if let Some(p) = b.px_opt(bx, by) {
                    return p;
                }
                let (ax, ay) = shifted(dir, x, y, a_offset);
                a.px_opt(ax, ay).unwrap_or(TRANSPARENT)
            }
            Self::Zoom {
                t,
                a_scale,
                b_scale,
                cx,
                cy,
            } => {
                let sample = |view: &SurfaceView<'_>, scale: f64| {
                    let sx = (cx + (f64::from(x) + 0.5 - cx) / scale - 0.5).round() as i64;
                    let sy = (cy + (f64::from(y) + 0.5 - cy) / scale - 0.5).round() as i64;
                    view.px_opt(sx, sy).unwrap_or(TRANSPARENT)
                };
                lerp_px(sample(a, a_scale), sample(b, b_scale), t)
            }
            Self::Dissolve {
                seed,
                softness,
                progress,
            } => {
                let h = hash01(seed, u64::from(x), u64::from(y));
                let m = smoothstep(h, h + softness, progress);
                lerp_px(a.px(x, y), b.px(x, y), m)
            }
            Self::Glitch {
                seed,
                t,
                amount,
                band_h,
                bucket,
                max_shift,
                split,
            } => {
                let src = if t < 0.5 { a } else { b };
                let band = u64::from(y / band_h);
                let active = hash01(seed ^ 0x5EED_6A1C, band, bucket) < amount;
                let dx = if active {
                    ((hash01(seed, band, bucket) * 2.0 - 1.0) * max_shift).round() as i64
                } else {
                    0
                };
                let sx = i64::from(x) + dx;
                let sy = i64::from(y);
                let mut p = src.px_clamped(sx, sy);
                if split != 0 {
                    p[0] = src.px_clamped(sx + split, sy)[0].min(p[3]);
                    p[2] = src.px_clamped(sx - split, sy)[2].min(p[3]);
                }
                p
            }
            Self::FadeThrough { t, color } => {
                if t < 0.5 {
                    lerp_px(a.px(x, y), color, t * 2.0)
                } else {
                    lerp_px(color, b.px(x, y), (t - 0.5) * 2.0)
                }
            }
        }
    }
}

/// Source coordinate for destination `(x, y)` of an image moved `offset` pixels along `dir`.
fn shifted(dir: Direction, x: u32, y: u32, offset: i64) -> (i64, i64) {
    let (x, y) = (i64::from(x), i64::from(y));
    match dir {
        Direction::LeftToRight => (x - offset, y),
        Direction::RightToLeft => (x + offset, y),
        Direction::TopToBottom => (x, y - offset),
        Direction::BottomToTop => (x, y + offset),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
