use crate::{
    assets::store::{AssetId, PreparedAsset, PreparedAssetStore, asset_id_for},
    effects::transitions::TransitionKind,
    eval::evaluator::{EvaluatedFrame, EvaluatedScene, FrameContent},
    foundation::core::{Affine, BezPath, Canvas, Rect, Rgba8Premul},
    foundation::error::{StackError, StackResult},
    scene::model::{LayerContent, SceneStack},
};

/// Surface holding the finished frame.
pub const FINAL_SURFACE: SurfaceId = SurfaceId(0);
/// Offscreen surface for the (outgoing) scene.
pub const SCENE_A_SURFACE: SurfaceId = SurfaceId(1);
/// Offscreen surface for the incoming scene of a transition.
pub const SCENE_B_SURFACE: SurfaceId = SurfaceId(2);

/// Backend-agnostic description of how to draw one frame.
///
/// A plan is a list of surface declarations, then passes that draw into or composite between
/// those surfaces. `final_surface` holds the result once every pass ran.
#[derive(Clone, Debug)]
pub struct RenderPlan {
    /// Output size.
    pub canvas: Canvas,
    /// Surface declarations, indexed by [`SurfaceId`].
    pub surfaces: Vec<SurfaceDesc>,
    /// Passes in execution order.
    pub passes: Vec<Pass>,
    /// Surface read back as the frame.
    pub final_surface: SurfaceId,
}

/// One step of a [`RenderPlan`].
#[derive(Clone, Debug)]
pub enum Pass {
    /// Draw vector/raster content into a surface.
    Scene(ScenePass),
    /// Combine surfaces.
    Composite(CompositePass),
}

/// Draw operations targeting one surface.
#[derive(Clone, Debug)]
pub struct ScenePass {
    /// Destination.
    pub target: SurfaceId,
    /// Operations in painter's order.
    pub ops: Vec<DrawOp>,
    /// Clear the target to transparent before drawing.
    pub clear_to_transparent: bool,
}

/// Index into [`RenderPlan::surfaces`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Pixel layout of a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit premultiplied RGBA.
    Rgba8Premul,
}

/// Surface declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
}

/// Composite operations targeting one surface.
#[derive(Clone, Debug)]
pub struct CompositePass {
    /// Destination.
    pub target: SurfaceId,
    /// Operations in order.
    pub ops: Vec<CompositeOp>,
}

/// A compositing operation between surfaces.
#[derive(Clone, Debug)]
pub enum CompositeOp {
    /// `target = src * opacity over target`.
    Over {
        /// Source surface.
        src: SurfaceId,
        /// Extra opacity multiplier.
        opacity: f32,
    },
    /// `target = kernel(a, b, t) over target`.
    Transition {
        /// Outgoing scene.
        a: SurfaceId,
        /// Incoming scene.
        b: SurfaceId,
        /// Eased progress.
        t: f32,
        /// Kernel.
        kind: TransitionKind,
    },
}

/// Draw operation emitted by the compiler.
#[derive(Clone, Debug)]
pub enum DrawOp {
    /// Fill a path (non-zero rule).
    FillPath {
        /// Geometry in layer space.
        path: BezPath,
        /// Layer-to-canvas transform.
        transform: Affine,
        /// Fill color.
        color: Rgba8Premul,
        /// Layer opacity.
        opacity: f32,
    },
    /// Draw a prepared raster image with its top-left corner at the layer origin.
    Image {
        /// Prepared image.
        asset: AssetId,
        /// Layer-to-canvas transform.
        transform: Affine,
        /// Layer opacity.
        opacity: f32,
    },
    /// Rasterize and draw a prepared SVG at the layer origin.
    Svg {
        /// Prepared SVG.
        asset: AssetId,
        /// Layer-to-canvas transform.
        transform: Affine,
        /// Layer opacity.
        opacity: f32,
    },
}

/// Lower an evaluated frame into a [`RenderPlan`].
///
/// Surface 0 receives the background (if any) and the final composite. A scene frame draws
/// into surface 1 and composites it over surface 0. A transition frame draws the outgoing
/// scene into surface 1 and the incoming scene into surface 2, then runs one transition
/// composite into surface 0.
pub fn compile_frame(
    stack: &SceneStack,
    eval: &EvaluatedFrame,
    assets: &PreparedAssetStore,
) -> StackResult<RenderPlan> {
    let canvas = stack.canvas;
    let desc = SurfaceDesc {
        width: canvas.width,
        height: canvas.height,
        format: PixelFormat::Rgba8Premul,
    };

    let mut passes = Vec::with_capacity(4);
    if let Some(bg) = stack.background {
        passes.push(Pass::Scene(ScenePass {
            target: FINAL_SURFACE,
            ops: vec![DrawOp::FillPath {
                path: canvas_path(canvas),
                transform: Affine::IDENTITY,
                color: Rgba8Premul::from_straight_array(bg),
                opacity: 1.0,
            }],
            clear_to_transparent: false,
        }));
    }

    let surface_count = match &eval.content {
        FrameContent::Scene(scene) => {
            passes.push(Pass::Scene(ScenePass {
                target: SCENE_A_SURFACE,
                ops: compile_scene(stack, scene, assets)?,
                clear_to_transparent: true,
            }));
            passes.push(Pass::Composite(CompositePass {
                target: FINAL_SURFACE,
                ops: vec![CompositeOp::Over {
                    src: SCENE_A_SURFACE,
                    opacity: 1.0,
                }],
            }));
            2
        }
        FrameContent::Transition {
            outgoing,
            incoming,
            kind,
            progress,
        } => {
            passes.push(Pass::Scene(ScenePass {
                target: SCENE_A_SURFACE,
                ops: compile_scene(stack, outgoing, assets)?,
                clear_to_transparent: true,
            }));
            passes.push(Pass::Scene(ScenePass {
                target: SCENE_B_SURFACE,
                ops: compile_scene(stack, incoming, assets)?,
                clear_to_transparent: true,
            }));
            passes.push(Pass::Composite(CompositePass {
                target: FINAL_SURFACE,
                ops: vec![CompositeOp::Transition {
                    a: SCENE_A_SURFACE,
                    b: SCENE_B_SURFACE,
                    t: (*progress as f32).clamp(0.0, 1.0),
                    kind: kind.clone(),
                }],
            }));
            3
        }
    };

    tracing::debug!(
        frame = eval.frame.0,
        passes = passes.len(),
        surfaces = surface_count,
        "compiled frame"
    );
    Ok(RenderPlan {
        canvas,
        surfaces: vec![desc; surface_count],
        passes,
        final_surface: FINAL_SURFACE,
    })
}

fn compile_scene(
    stack: &SceneStack,
    scene: &EvaluatedScene,
    assets: &PreparedAssetStore,
) -> StackResult<Vec<DrawOp>> {
    let layers = &stack
        .scenes
        .get(scene.scene_index)
        .ok_or_else(|| StackError::evaluation(format!("unknown scene {}", scene.scene_index)))?
        .layers;

    let mut ops = Vec::with_capacity(scene.layers.len());
    for ev in &scene.layers {
        let layer = layers.get(ev.layer_index).ok_or_else(|| {
            StackError::evaluation(format!(
                "scene '{}' has no layer {}",
                scene.scene_id, ev.layer_index
            ))
        })?;
        let opacity = ev.opacity as f32;

        let op = match &layer.content {
            LayerContent::Solid { color } => DrawOp::FillPath {
                path: canvas_path(stack.canvas),
                transform: Affine::IDENTITY,
                color: Rgba8Premul::from_straight_array(*color),
                opacity,
            },
            LayerContent::Rect {
                width,
                height,
                corner_radius,
                color,
            } => DrawOp::FillPath {
                path: rect_path(*width, *height, *corner_radius),
                transform: ev.transform,
                color: Rgba8Premul::from_straight_array(*color),
                opacity,
            },
            LayerContent::Path { color, .. } => {
                let PreparedAsset::Path(p) = assets.get(required_id(&layer.content)?)? else {
                    return Err(StackError::evaluation(format!(
                        "layer '{}' expected a prepared path",
                        layer.id
                    )));
                };
                DrawOp::FillPath {
                    path: p.path.clone(),
                    transform: ev.transform,
                    color: Rgba8Premul::from_straight_array(*color),
                    opacity,
                }
            }
            LayerContent::Image { .. } => DrawOp::Image {
                asset: required_id(&layer.content)?,
                transform: ev.transform,
                opacity,
            },
            LayerContent::Svg { .. } => DrawOp::Svg {
                asset: required_id(&layer.content)?,
                transform: ev.transform,
                opacity,
            },
        };
        ops.push(op);
    }
    Ok(ops)
}

fn required_id(content: &LayerContent) -> StackResult<AssetId> {
    asset_id_for(content)?
        .ok_or_else(|| StackError::evaluation("layer content has no asset id"))
}

fn canvas_path(canvas: Canvas) -> BezPath {
    use kurbo::Shape;
    Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height)).to_path(0.1)
}

fn rect_path(width: f64, height: f64, corner_radius: f64) -> BezPath {
    use kurbo::Shape;
    let rect = Rect::new(0.0, 0.0, width, height);
    if corner_radius > 0.0 {
        rect.to_rounded_rect(corner_radius.min(width.min(height) / 2.0))
            .to_path(0.1)
    } else {
        rect.to_path(0.1)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/plan.rs"]
mod tests;
