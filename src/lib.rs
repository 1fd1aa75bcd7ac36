//! scenestack renders a stack of scenes, joined by transitions, into frames and video.
//!
//! A [`SceneStack`] is an ordered list of fixed-length scenes. Each scene holds layers (solid
//! fills, rectangles, SVG paths, images, SVG documents) whose transform and opacity are
//! animated. Consecutive scenes are joined by a hard cut or by a transition such as a
//! crossfade, wipe, push or dissolve.
//!
//! # Pipeline overview
//!
//! 1. **Timeline**: `SceneStack -> Timeline` (contiguous scene and transition segments)
//! 2. **Evaluate**: `Timeline + FrameIndex -> EvaluatedFrame` (which scenes, which layers,
//!    sampled transforms and opacities, transition progress)
//! 3. **Compile**: `EvaluatedFrame -> RenderPlan` (passes over explicit surfaces)
//! 4. **Render**: `RenderPlan -> FrameRGBA` (CPU backend on `vello_cpu`)
//! 5. **Encode** (optional): stream frames to the system `ffmpeg` binary for MP4 output
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: the same document renders byte-identical frames, sequentially or in
//!   parallel.
//! - **No IO in renderers**: file access is front-loaded in [`PreparedAssetStore`].
//! - **Premultiplied RGBA8** end to end.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animation;
mod assets;
mod compile;
mod effects;
mod encode;
mod eval;
mod foundation;
mod render;
mod scene;
mod timeline;

pub use animation::anim::{
    Anim, Expr, InterpMode, Keyframe, Keyframes, Lerp, LoopMode, SampleCtx,
};
pub use animation::ease::Ease;
pub use animation::proc::{ProcScalar, ProcValue, Procedural, ProceduralKind};
pub use assets::store::{
    AssetId, PreparedAsset, PreparedAssetStore, PreparedImage, PreparedPath, PreparedSvg,
    asset_id_for, normalize_rel_path,
};
pub use compile::fingerprint::{FrameFingerprint, fingerprint_eval};
pub use compile::plan::{
    CompositeOp, CompositePass, DrawOp, FINAL_SURFACE, Pass, PixelFormat, RenderPlan,
    SCENE_A_SURFACE, SCENE_B_SURFACE, ScenePass, SurfaceDesc, SurfaceId, compile_frame,
};
pub use effects::transitions::{
    Direction, TransitionKind, parse_transition, parse_transition_kind_params, transition_seed,
};
pub use encode::ffmpeg::{EncodeConfig, FfmpegEncoder, ensure_parent_dir, is_ffmpeg_on_path};
pub use eval::evaluator::{
    EvaluatedFrame, EvaluatedLayer, EvaluatedScene, Evaluator, FrameContent,
};
pub use foundation::core::{
    Affine, BezPath, Canvas, Fps, FrameIndex, FrameRange, Point, Rect, Rgba8Premul, Transform2D,
    Vec2,
};
pub use foundation::error::{StackError, StackResult};
pub use render::backend::{BackendKind, FrameRGBA, RenderBackend, RenderSettings, create_backend};
pub use render::cpu::CpuBackend;
pub use render::passes::{PassBackend, execute_plan};
pub use render::pipeline::{
    RenderStats, RenderThreading, RenderToMp4Opts, render_frame, render_frames,
    render_frames_with_stats, render_to_mp4, render_to_mp4_with_stats,
};
pub use scene::dsl::{LayerBuilder, SceneBuilder, SceneStackBuilder};
pub use scene::model::{Layer, LayerContent, Scene, SceneStack, TransitionSpec};
pub use timeline::resolve::ActiveSegment;
pub use timeline::segment::{Segment, SegmentKind, Timeline};
