use crate::{
    animation::anim::SampleCtx,
    effects::transitions::TransitionKind,
    foundation::core::{Affine, FrameIndex},
    foundation::error::{StackError, StackResult},
    foundation::math::seeded_hash64,
    scene::model::{Layer, SceneStack},
    timeline::segment::{SegmentKind, Timeline},
};

/// Everything needed to draw one output frame.
#[derive(Clone, Debug, serde::Serialize)]
pub struct EvaluatedFrame {
    /// Output frame.
    pub frame: FrameIndex,
    /// Index of the active timeline segment.
    pub segment_index: usize,
    /// Scene content for the frame.
    pub content: FrameContent,
}

/// Content of an [`EvaluatedFrame`].
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameContent {
    /// One scene on its own.
    Scene(EvaluatedScene),
    /// Two scenes and the kernel that blends them.
    Transition {
        /// Scene being left.
        outgoing: EvaluatedScene,
        /// Scene being entered.
        incoming: EvaluatedScene,
        /// Blend kernel.
        kind: TransitionKind,
        /// Eased progress in `[0, 1]`.
        progress: f64,
    },
}

/// A scene sampled at one scene-local frame.
#[derive(Clone, Debug, serde::Serialize)]
pub struct EvaluatedScene {
    /// Index into `SceneStack::scenes`.
    pub scene_index: usize,
    /// Scene id.
    pub scene_id: String,
    /// Scene-local frame that was sampled.
    pub local_frame: FrameIndex,
    /// Visible layers, bottom-most first.
    pub layers: Vec<EvaluatedLayer>,
}

/// A layer with its animated properties resolved.
#[derive(Clone, Debug, serde::Serialize)]
pub struct EvaluatedLayer {
    /// Index into `Scene::layers`.
    pub layer_index: usize,
    /// Layer id.
    pub layer_id: String,
    /// Layer-to-canvas transform.
    pub transform: Affine,
    /// Opacity in `(0, 1]`.
    pub opacity: f64,
}

/// Samples a [`SceneStack`] at output frames.
pub struct Evaluator;

impl Evaluator {
    /// Evaluate the frame `frame` of `stack`, using `timeline` (built from the same stack) to
    /// find the active segment.
    ///
    /// During a transition from scene `a` to scene `b` at local frame `k`, scene `a` keeps
    /// playing (`duration(a) + k`) while scene `b` waits on its first frame.
    #[tracing::instrument(skip(stack, timeline))]
    pub fn eval_frame(
        stack: &SceneStack,
        timeline: &Timeline,
        frame: FrameIndex,
    ) -> StackResult<EvaluatedFrame> {
        let active = timeline.resolve(frame);

        let content = match &active.segment.kind {
            SegmentKind::Scene { scene } => {
                FrameContent::Scene(eval_scene(stack, *scene, active.local, frame)?)
            }
            SegmentKind::Transition { from, to, kind, .. } => {
                let from_len = stack
                    .scenes
                    .get(*from)
                    .map(|s| s.duration_frames)
                    .ok_or_else(|| missing_scene(*from))?;
                let outgoing_local = FrameIndex(from_len.saturating_add(active.local.0));
                FrameContent::Transition {
                    outgoing: eval_scene(stack, *from, outgoing_local, frame)?,
                    incoming: eval_scene(stack, *to, FrameIndex(0), frame)?,
                    kind: kind.clone(),
                    progress: active.eased_progress(),
                }
            }
        };

        Ok(EvaluatedFrame {
            frame,
            segment_index: active.index,
            content,
        })
    }
}

fn missing_scene(i: usize) -> StackError {
    StackError::evaluation(format!(
        "timeline references scene {i}, which the stack does not have"
    ))
}

pub(crate) fn eval_scene(
    stack: &SceneStack,
    scene_index: usize,
    local: FrameIndex,
    frame: FrameIndex,
) -> StackResult<EvaluatedScene> {
    let scene = stack
        .scenes
        .get(scene_index)
        .ok_or_else(|| missing_scene(scene_index))?;

    let mut layers = Vec::with_capacity(scene.layers.len());
    for (layer_index, layer) in scene.layers.iter().enumerate() {
        if let Some(range) = layer.visible
            && !range.contains(local)
        {
            continue;
        }
        if let Some(evaluated) = eval_layer(stack, &scene.id, layer_index, layer, local, frame)? {
            layers.push(evaluated);
        }
    }

    Ok(EvaluatedScene {
        scene_index,
        scene_id: scene.id.clone(),
        local_frame: local,
        layers,
    })
}

fn eval_layer(
    stack: &SceneStack,
    scene_id: &str,
    layer_index: usize,
    layer: &Layer,
    local: FrameIndex,
    frame: FrameIndex,
) -> StackResult<Option<EvaluatedLayer>> {
    let ctx = SampleCtx {
        frame,
        fps: stack.fps,
        local,
        seed: seeded_hash64(stack.seed, &format!("{scene_id}/{}", layer.id)),
    };

    let opacity = layer.opacity.sample(ctx)?;
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if opacity <= 0.0 {
        return Ok(None);
    }

    let transform = layer.transform.sample(ctx)?.to_affine();
    if !transform.is_finite() {
        return Err(StackError::evaluation(format!(
            "layer '{scene_id}/{}' has a non-finite transform at frame {}",
            layer.id, frame.0
        )));
    }

    Ok(Some(EvaluatedLayer {
        layer_index,
        layer_id: layer.id.clone(),
        transform,
        opacity,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/eval/evaluator.rs"]
mod tests;
