use crate::{
    animation::anim::Anim,
    foundation::core::{Canvas, Fps, FrameRange, Transform2D},
    foundation::error::{StackError, StackResult},
    scene::model::{Layer, LayerContent, Scene, SceneStack, TransitionSpec},
};

/// Programmatic construction of a validated [`SceneStack`].
pub struct SceneStackBuilder {
    fps: Fps,
    canvas: Canvas,
    background: Option<[u8; 4]>,
    seed: u64,
    scenes: Vec<Scene>,
    transitions: Vec<TransitionSpec>,
}

impl SceneStackBuilder {
    /// Start an empty stack.
    pub fn new(fps: Fps, canvas: Canvas) -> Self {
        Self {
            fps,
            canvas,
            background: None,
            seed: 0,
            scenes: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Set the determinism seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set a straight-alpha background color.
    pub fn background(mut self, rgba: [u8; 4]) -> Self {
        self.background = Some(rgba);
        self
    }

    /// Append a scene.
    pub fn scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }

    /// Append a transition. The `n`-th call joins scene `n` and scene `n + 1`.
    pub fn transition(mut self, tr: TransitionSpec) -> Self {
        self.transitions.push(tr);
        self
    }

    /// Validate and return the document.
    pub fn build(self) -> StackResult<SceneStack> {
        let stack = SceneStack {
            fps: self.fps,
            canvas: self.canvas,
            background: self.background,
            seed: self.seed,
            scenes: self.scenes,
            transitions: self.transitions,
        };
        stack.validate()?;
        Ok(stack)
    }
}

/// Builder for one [`Scene`].
pub struct SceneBuilder {
    id: String,
    duration_frames: u64,
    layers: Vec<Layer>,
}

impl SceneBuilder {
    /// Start a scene of `duration_frames` frames.
    pub fn new(id: impl Into<String>, duration_frames: u64) -> Self {
        Self {
            id: id.into(),
            duration_frames,
            layers: Vec::new(),
        }
    }

    /// Append a layer on top of the existing ones.
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Check the scene-local rules and return the scene.
    pub fn build(self) -> StackResult<Scene> {
        if self.id.trim().is_empty() {
            return Err(StackError::validation("scene id must be non-empty"));
        }
        if self.duration_frames == 0 {
            return Err(StackError::validation(format!(
                "scene '{}' duration_frames must be > 0",
                self.id
            )));
        }
        Ok(Scene {
            id: self.id,
            duration_frames: self.duration_frames,
            layers: self.layers,
        })
    }
}

/// Builder for one [`Layer`].
pub struct LayerBuilder {
    id: String,
    content: LayerContent,
    transform: Anim<Transform2D>,
    opacity: Anim<f64>,
    visible: Option<FrameRange>,
}

impl LayerBuilder {
    /// Start a fully opaque, untransformed layer.
    pub fn new(id: impl Into<String>, content: LayerContent) -> Self {
        Self {
            id: id.into(),
            content,
            transform: Anim::constant(Transform2D::default()),
            opacity: Anim::constant(1.0),
            visible: None,
        }
    }

    /// Animated opacity.
    pub fn opacity(mut self, a: Anim<f64>) -> Self {
        self.opacity = a;
        self
    }

    /// Animated transform.
    pub fn transform(mut self, t: Anim<Transform2D>) -> Self {
        self.transform = t;
        self
    }

    /// Restrict drawing to `range` (scene-local frames).
    pub fn visible(mut self, range: FrameRange) -> Self {
        self.visible = Some(range);
        self
    }

    /// Validate the animations and return the layer.
    pub fn build(self) -> StackResult<Layer> {
        if self.id.trim().is_empty() {
            return Err(StackError::validation("layer id must be non-empty"));
        }
        self.opacity.validate()?;
        self.transform.validate()?;
        Ok(Layer {
            id: self.id,
            content: self.content,
            transform: self.transform,
            opacity: self.opacity,
            visible: self.visible,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/dsl.rs"]
mod tests;
