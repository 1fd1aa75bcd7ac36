use crate::{
    foundation::core::Rgba8Premul,
    foundation::error::{StackError, StackResult},
    foundation::math::seeded_hash64,
    scene::model::TransitionSpec,
};

/// Direction of motion (or of the reveal, for wipes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards +x.
    LeftToRight,
    /// Towards -x.
    RightToLeft,
    /// Towards +y.
    TopToBottom,
    /// Towards -y.
    BottomToTop,
}

impl Direction {
    fn parse(s: &str) -> StackResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left_to_right" | "lefttoright" | "ltr" | "right" => Ok(Self::LeftToRight),
            "right_to_left" | "righttoleft" | "rtl" | "left" => Ok(Self::RightToLeft),
            "top_to_bottom" | "toptobottom" | "ttb" | "down" => Ok(Self::TopToBottom),
            "bottom_to_top" | "bottomtotop" | "btt" | "up" => Ok(Self::BottomToTop),
            other => Err(StackError::validation(format!("unknown direction '{other}'"))),
        }
    }

    /// `true` for left/right motion.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftToRight | Self::RightToLeft)
    }
}

/// Parsed transition kind with its resolved parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionKind {
    /// Linear blend of both scenes.
    Crossfade,
    /// Moving edge reveals the incoming scene.
    Wipe {
        /// Reveal direction.
        dir: Direction,
        /// Edge softness as a fraction of the wipe axis, `[0, 1]`.
        soft_edge: f32,
    },
    /// Incoming scene slides in over the stationary outgoing scene.
    Slide {
        /// Motion direction.
        dir: Direction,
    },
    /// Incoming scene pushes the outgoing scene off the canvas.
    Push {
        /// Motion direction.
        dir: Direction,
    },
    /// Outgoing scene zooms in and fades; incoming scene settles from zoomed out.
    Zoom {
        /// Extra scale reached at the ends of the transition (> 0).
        intensity: f32,
    },
    /// Per-pixel random threshold reveal.
    Dissolve {
        /// Noise seed.
        seed: u64,
        /// Threshold softness, `[0, 1]`.
        softness: f32,
    },
    /// Row displacement and channel split, switching scenes at the midpoint.
    Glitch {
        /// Noise seed.
        seed: u64,
        /// Peak displacement strength, `[0, 1]`.
        intensity: f32,
    },
    /// Fade into a solid color, then out of it.
    FadeThrough {
        /// Intermediate color (premultiplied).
        color: Rgba8Premul,
    },
}

/// Seed used by seeded kinds when the document does not set one.
pub fn transition_seed(doc_seed: u64, index: usize) -> u64 {
    seeded_hash64(doc_seed, &format!("transition/{index}"))
}

/// Parse `spec` as the `index`-th transition of a document seeded with `doc_seed`.
pub fn parse_transition(
    spec: &TransitionSpec,
    doc_seed: u64,
    index: usize,
) -> StackResult<TransitionKind> {
    parse_transition_kind_params(&spec.kind, &spec.params, transition_seed(doc_seed, index))
        .map_err(|e| match e {
            StackError::Validation(msg) => {
                StackError::validation(format!("transition {index}: {msg}"))
            }
            other => other,
        })
}

/// Parse a kind tag and its parameter object.
pub fn parse_transition_kind_params(
    kind: &str,
    params: &serde_json::Value,
    default_seed: u64,
) -> StackResult<TransitionKind> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(StackError::validation("transition kind must be non-empty"));
    }
    let p = Params::new(&kind, params)?;

    match kind.as_str() {
        "crossfade" | "fade" => Ok(TransitionKind::Crossfade),
        "wipe" => Ok(TransitionKind::Wipe {
            dir: p.dir()?,
            soft_edge: p.f32("soft_edge")?.unwrap_or(0.0).clamp(0.0, 1.0),
        }),
        "slide" => Ok(TransitionKind::Slide { dir: p.dir()? }),
        "push" => Ok(TransitionKind::Push { dir: p.dir()? }),
        "zoom" => {
            let intensity = p.f32("intensity")?.unwrap_or(0.25);
            if intensity <= 0.0 {
                return Err(StackError::validation("zoom.intensity must be > 0"));
            }
            Ok(TransitionKind::Zoom { intensity })
        }
        "dissolve" => Ok(TransitionKind::Dissolve {
            seed: p.seed()?.unwrap_or(default_seed),
            softness: p.f32("softness")?.unwrap_or(0.1).clamp(0.0, 1.0),
        }),
        "glitch" => Ok(TransitionKind::Glitch {
            seed: p.seed()?.unwrap_or(default_seed),
            intensity: p.f32("intensity")?.unwrap_or(0.5).clamp(0.0, 1.0),
        }),
        "fade_through" | "fadethrough" | "dip" => Ok(TransitionKind::FadeThrough {
            color: p.color()?.unwrap_or(Rgba8Premul {
                r: 0,
                g: 0,
                b: 0,
                a: 255,
            }),
        }),
        _ => Err(StackError::validation(format!(
            "unknown transition kind '{kind}'"
        ))),
    }
}

struct Params<'a> {
    kind: &'a str,
    obj: Option<&'a serde_json::Map<String, serde_json::Value>>,
}

impl<'a> Params<'a> {
    fn new(kind: &'a str, params: &'a serde_json::Value) -> StackResult<Self> {
        let obj = if params.is_null() {
            None
        } else {
            Some(params.as_object().ok_or_else(|| {
                StackError::validation(format!("{kind} params must be an object"))
            })?)
        };
        Ok(Self { kind, obj })
    }

    fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.obj.and_then(|o| o.get(key)).filter(|v| !v.is_null())
    }

    fn f32(&self, key: &str) -> StackResult<Option<f32>> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        let f = v
            .as_f64()
            .map(|v| v as f32)
            .filter(|f| f.is_finite())
            .ok_or_else(|| {
                StackError::validation(format!("{}.{key} must be a finite number", self.kind))
            })?;
        Ok(Some(f))
    }

    fn dir(&self) -> StackResult<Direction> {
        match self.get("dir").or_else(|| self.get("direction")) {
            None => Ok(Direction::LeftToRight),
            Some(v) => {
                let s = v.as_str().ok_or_else(|| {
                    StackError::validation(format!("{}.dir must be a string", self.kind))
                })?;
                Direction::parse(s).map_err(|e| match e {
                    StackError::Validation(msg) => {
                        StackError::validation(format!("{}.dir: {msg}", self.kind))
                    }
                    other => other,
                })
            }
        }
    }

    fn seed(&self) -> StackResult<Option<u64>> {
        match self.get("seed") {
            None => Ok(None),
            Some(v) => v.as_u64().map(Some).ok_or_else(|| {
                StackError::validation(format!(
                    "{}.seed must be a non-negative integer",
                    self.kind
                ))
            }),
        }
    }

    fn color(&self) -> StackResult<Option<Rgba8Premul>> {
        let Some(v) = self.get("color") else {
            return Ok(None);
        };
        let bad = || {
            StackError::validation(format!(
                "{}.color must be an array of 3 or 4 integers in 0..=255",
                self.kind
            ))
        };
        let arr = v.as_array().ok_or_else(bad)?;
        if !(arr.len() == 3 || arr.len() == 4) {
            return Err(bad());
        }
        let mut rgba = [0u8, 0, 0, 255];
        for (slot, c) in rgba.iter_mut().zip(arr) {
            *slot = c
                .as_u64()
                .and_then(|c| u8::try_from(c).ok())
                .ok_or_else(bad)?;
        }
        Ok(Some(Rgba8Premul::from_straight_array(rgba)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
