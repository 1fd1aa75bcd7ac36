use crate::{
    animation::anim::SampleCtx,
    foundation::core::{Fps, Transform2D, Vec2},
    foundation::error::{StackError, StackResult},
    foundation::math::Rng64,
};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Procedural animation source, typed by the value it produces.
pub struct Procedural<T> {
    /// Generator description.
    pub kind: ProceduralKind,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T> Procedural<T> {
    /// Wrap a generator description.
    pub fn new(kind: ProceduralKind) -> Self {
        Self {
            kind,
            _marker: std::marker::PhantomData,
        }
    }

    pub(crate) fn validate(&self) -> StackResult<()> {
        match &self.kind {
            ProceduralKind::Scalar(s) => s.validate(),
            ProceduralKind::Vec2 { x, y } => {
                x.validate()?;
                y.validate()
            }
        }
    }
}

/// Types that can be produced by a [`Procedural`] source.
pub trait ProcValue: Sized {
    /// Sample `kind` at `ctx`.
    fn from_procedural(kind: &ProceduralKind, ctx: SampleCtx) -> StackResult<Self>;
}

impl<T: ProcValue> Procedural<T> {
    /// Sample at `ctx.local`.
    pub fn sample(&self, ctx: SampleCtx) -> StackResult<T> {
        T::from_procedural(&self.kind, ctx)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
/// Shape of a procedural source.
pub enum ProceduralKind {
    /// One scalar channel.
    Scalar(ProcScalar),
    /// Two independent scalar channels.
    Vec2 {
        /// X channel.
        x: ProcScalar,
        /// Y channel.
        y: ProcScalar,
    },
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Scalar generators.
pub enum ProcScalar {
    /// `offset + amp * sin(2π·freq·t + phase)`.
    Sine {
        /// Amplitude.
        amp: f64,
        /// Frequency in Hz.
        freq_hz: f64,
        /// Phase in radians.
        #[serde(default)]
        phase: f64,
        /// Constant offset.
        #[serde(default)]
        offset: f64,
    },
    /// Seeded value noise, linearly interpolated between integer lattice points.
    Noise1D {
        /// Amplitude.
        amp: f64,
        /// Lattice frequency in Hz.
        freq_hz: f64,
        /// Constant offset.
        #[serde(default)]
        offset: f64,
    },
    /// Damped spring settling from `from` to `to`, starting `delay_frames` into the scene.
    Spring {
        /// Start value.
        from: f64,
        /// Rest value.
        to: f64,
        /// Spring constant; must be > 0.
        #[serde(default = "default_stiffness")]
        stiffness: f64,
        /// Damping coefficient; must be >= 0.
        #[serde(default = "default_damping")]
        damping: f64,
        /// Mass; must be > 0.
        #[serde(default = "default_mass")]
        mass: f64,
        /// Frames to hold `from` before release.
        #[serde(default)]
        delay_frames: u64,
    },
}

fn default_stiffness() -> f64 {
    100.0
}

fn default_damping() -> f64 {
    10.0
}

fn default_mass() -> f64 {
    1.0
}

impl ProcScalar {
    fn validate(&self) -> StackResult<()> {
        match *self {
            Self::Sine {
                amp,
                freq_hz,
                phase,
                offset,
            } => finite_all(&[amp, freq_hz, phase, offset], "sine"),
            Self::Noise1D {
                amp,
                freq_hz,
                offset,
            } => {
                finite_all(&[amp, freq_hz, offset], "noise")?;
                if freq_hz < 0.0 {
                    return Err(StackError::animation("noise freq_hz must be >= 0"));
                }
                Ok(())
            }
            Self::Spring {
                from,
                to,
                stiffness,
                damping,
                mass,
                ..
            } => {
                finite_all(&[from, to, stiffness, damping, mass], "spring")?;
                if stiffness <= 0.0 || mass <= 0.0 || damping < 0.0 {
                    return Err(StackError::animation(
                        "spring needs stiffness > 0, mass > 0 and damping >= 0",
                    ));
                }
                Ok(())
            }
        }
    }

    fn sample(&self, fps: Fps, local: u64, seed: u64) -> f64 {
        match *self {
            Self::Sine {
                amp,
                freq_hz,
                phase,
                offset,
            } => {
                let secs = fps.frames_to_secs(local);
                offset + amp * (std::f64::consts::TAU * freq_hz * secs + phase).sin()
            }
            Self::Noise1D {
                amp,
                freq_hz,
                offset,
            } => {
                let x = fps.frames_to_secs(local) * freq_hz;
                let i0 = x.floor().max(0.0) as u64;
                let t = x - x.floor();
                let a = lattice_noise(seed, i0) * 2.0 - 1.0;
                let b = lattice_noise(seed, i0 + 1) * 2.0 - 1.0;
                offset + amp * (a + (b - a) * t)
            }
            Self::Spring {
                from,
                to,
                stiffness,
                damping,
                mass,
                delay_frames,
            } => {
                let t = fps.frames_to_secs(local.saturating_sub(delay_frames));
                to + spring_displacement(from - to, stiffness, damping, mass, t)
            }
        }
    }
}

fn finite_all(values: &[f64], what: &str) -> StackResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(StackError::animation(format!(
            "{what} parameters must be finite"
        )))
    }
}

fn lattice_noise(seed: u64, x: u64) -> f64 {
    Rng64::new(seed ^ x.wrapping_mul(0xD6E8_FEB8_6659_FD93)).next_f64_01()
}

/// Closed-form displacement of a released spring with initial offset `x0` and zero velocity.
fn spring_displacement(x0: f64, stiffness: f64, damping: f64, mass: f64, t: f64) -> f64 {
    if x0 == 0.0 || t <= 0.0 {
        return x0;
    }
    let w0 = (stiffness / mass).sqrt();
    let zeta = damping / (2.0 * (stiffness * mass).sqrt());

    if (zeta - 1.0).abs() < 1e-6 {
        return (-w0 * t).exp() * (x0 + w0 * x0 * t);
    }
    if zeta < 1.0 {
        let wd = w0 * (1.0 - zeta * zeta).sqrt();
        let decay = (-zeta * w0 * t).exp();
        return decay * (x0 * (wd * t).cos() + (zeta * w0 * x0 / wd) * (wd * t).sin());
    }

    let root = (zeta * zeta - 1.0).sqrt();
    let r1 = -w0 * (zeta - root);
    let r2 = -w0 * (zeta + root);
    let c2 = -r1 * x0 / (r2 - r1);
    let c1 = x0 - c2;
    c1 * (r1 * t).exp() + c2 * (r2 * t).exp()
}

impl ProcValue for f64 {
    fn from_procedural(kind: &ProceduralKind, ctx: SampleCtx) -> StackResult<Self> {
        match kind {
            ProceduralKind::Scalar(s) => Ok(s.sample(ctx.fps, ctx.local.0, ctx.seed)),
            ProceduralKind::Vec2 { .. } => Err(StackError::animation(
                "procedural vec2 cannot be sampled as a scalar",
            )),
        }
    }
}

impl ProcValue for Vec2 {
    fn from_procedural(kind: &ProceduralKind, ctx: SampleCtx) -> StackResult<Self> {
        match kind {
            ProceduralKind::Scalar(_) => Err(StackError::animation(
                "procedural scalar cannot be sampled as vec2",
            )),
            ProceduralKind::Vec2 { x, y } => Ok(Vec2::new(
                x.sample(ctx.fps, ctx.local.0, ctx.seed),
                y.sample(ctx.fps, ctx.local.0, ctx.seed.rotate_left(17)),
            )),
        }
    }
}

impl ProcValue for Transform2D {
    fn from_procedural(_kind: &ProceduralKind, _ctx: SampleCtx) -> StackResult<Self> {
        Err(StackError::animation(
            "transforms cannot be sampled procedurally; animate them with keyframes",
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/proc.rs"]
mod tests;
