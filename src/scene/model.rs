use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;

use crate::{
    animation::{anim::Anim, ease::Ease},
    assets::store::normalize_rel_path,
    effects::transitions::parse_transition,
    foundation::core::{Canvas, Fps, FrameRange, Transform2D},
    foundation::error::{StackError, StackResult},
};

/// A document: scenes played back to back, joined by optional transitions.
///
/// `transitions[i]` sits between `scenes[i]` and `scenes[i + 1]`. Gaps without a transition
/// are hard cuts.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneStack {
    /// Output frame rate.
    pub fps: Fps,
    /// Output size.
    pub canvas: Canvas,
    /// Straight-alpha background painted under every frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<[u8; 4]>,
    /// Global determinism seed.
    #[serde(default)]
    pub seed: u64,
    /// Scenes in playback order.
    pub scenes: Vec<Scene>,
    /// Transitions between consecutive scenes.
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

/// One scene on the stack.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    /// Unique scene id.
    pub id: String,
    /// Scene length in frames (>= 1).
    pub duration_frames: u64,
    /// Layers in painter's order (first is bottom-most).
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// One drawable layer inside a scene.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Id, unique within its scene.
    pub id: String,
    /// What the layer draws.
    pub content: LayerContent,
    /// Animated placement.
    #[serde(default = "default_transform")]
    pub transform: Anim<Transform2D>,
    /// Animated opacity, clamped to `[0, 1]` at evaluation.
    #[serde(default = "default_opacity")]
    pub opacity: Anim<f64>,
    /// Scene-local frames in which the layer is drawn; always visible when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<FrameRange>,
}

fn default_transform() -> Anim<Transform2D> {
    Anim::constant(Transform2D::default())
}

fn default_opacity() -> Anim<f64> {
    Anim::constant(1.0)
}

/// Layer payload. Colors are straight-alpha RGBA8.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerContent {
    /// Fill the whole canvas.
    Solid {
        /// Fill color.
        color: [u8; 4],
    },
    /// Axis-aligned rectangle at the layer origin.
    Rect {
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
        /// Corner radius; 0 for square corners.
        #[serde(default)]
        corner_radius: f64,
        /// Fill color.
        color: [u8; 4],
    },
    /// SVG path data, filled with the non-zero rule.
    Path {
        /// Path data (`d` attribute syntax).
        svg_path_d: String,
        /// Fill color.
        color: [u8; 4],
    },
    /// Raster image file relative to the asset root.
    Image {
        /// Relative path.
        source: String,
    },
    /// SVG document relative to the asset root.
    Svg {
        /// Relative path.
        source: String,
    },
}

/// A transition between two consecutive scenes.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TransitionSpec {
    /// Kind tag, e.g. `crossfade`, `wipe`, `push`.
    pub kind: String,
    /// Transition length in frames (>= 1).
    pub duration_frames: u64,
    /// Ease applied to the raw progress.
    #[serde(default)]
    pub ease: Ease,
    /// Kind-specific parameters (`null` or an object).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl SceneStack {
    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> StackResult<Self> {
        let stack: Self = serde_json::from_str(s)?;
        stack.validate()?;
        Ok(stack)
    }

    /// Read, parse and validate a JSON document from disk.
    pub fn from_path(path: &Path) -> StackResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read scene stack '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_string(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every structural rule of the document.
    pub fn validate(&self) -> StackResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(StackError::validation("fps must have num>0 and den>0"));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(StackError::validation("canvas width/height must be > 0"));
        }
        if self.scenes.is_empty() {
            return Err(StackError::validation("scene stack needs at least one scene"));
        }
        if self.transitions.len() > self.scenes.len() - 1 {
            return Err(StackError::validation(format!(
                "{} transitions for {} scenes (at most {} allowed)",
                self.transitions.len(),
                self.scenes.len(),
                self.scenes.len() - 1
            )));
        }

        let mut scene_ids = BTreeSet::new();
        for scene in &self.scenes {
            if scene.id.trim().is_empty() {
                return Err(StackError::validation("scene id must be non-empty"));
            }
            if !scene_ids.insert(scene.id.as_str()) {
                return Err(StackError::validation(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            scene.validate()?;
        }

        for (i, tr) in self.transitions.iter().enumerate() {
            tr.validate().map_err(|e| match e {
                StackError::Validation(msg) => {
                    StackError::validation(format!("transition {i}: {msg}"))
                }
                other => other,
            })?;
            parse_transition(tr, self.seed, i)?;
        }

        Ok(())
    }

    /// Index of the scene with `id`.
    pub fn scene_index(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }
}

impl Scene {
    fn validate(&self) -> StackResult<()> {
        if self.duration_frames == 0 {
            return Err(StackError::validation(format!(
                "scene '{}' duration_frames must be > 0",
                self.id
            )));
        }
        let mut layer_ids = BTreeSet::new();
        for layer in &self.layers {
            if layer.id.trim().is_empty() {
                return Err(StackError::validation(format!(
                    "scene '{}' has a layer with an empty id",
                    self.id
                )));
            }
            if !layer_ids.insert(layer.id.as_str()) {
                return Err(StackError::validation(format!(
                    "scene '{}' has duplicate layer id '{}'",
                    self.id, layer.id
                )));
            }
            layer.validate().map_err(|e| match e {
                StackError::Validation(msg) => StackError::validation(format!(
                    "scene '{}' layer '{}': {msg}",
                    self.id, layer.id
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}

impl Layer {
    fn validate(&self) -> StackResult<()> {
        if let Some(r) = self.visible
            && r.start.0 > r.end.0
        {
            return Err(StackError::validation("visible range start must be <= end"));
        }
        match &self.content {
            LayerContent::Solid { .. } => {}
            LayerContent::Rect {
                width,
                height,
                corner_radius,
                ..
            } => {
                if !(width.is_finite() && height.is_finite() && *width > 0.0 && *height > 0.0) {
                    return Err(StackError::validation("rect width/height must be finite and > 0"));
                }
                if !corner_radius.is_finite() || *corner_radius < 0.0 {
                    return Err(StackError::validation(
                        "rect corner_radius must be finite and >= 0",
                    ));
                }
            }
            LayerContent::Path { svg_path_d, .. } => {
                if svg_path_d.trim().is_empty() {
                    return Err(StackError::validation("path svg_path_d must be non-empty"));
                }
            }
            LayerContent::Image { source } | LayerContent::Svg { source } => {
                normalize_rel_path(source)?;
            }
        }
        self.opacity.validate()?;
        self.transform.validate()?;
        Ok(())
    }
}

impl TransitionSpec {
    /// Check the fields that do not depend on the kind.
    pub fn validate(&self) -> StackResult<()> {
        if self.kind.trim().is_empty() {
            return Err(StackError::validation("transition kind must be non-empty"));
        }
        if self.duration_frames == 0 {
            return Err(StackError::validation(
                "transition duration_frames must be > 0",
            ));
        }
        if !(self.params.is_null() || self.params.is_object()) {
            return Err(StackError::validation(
                "transition params must be null or an object",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
