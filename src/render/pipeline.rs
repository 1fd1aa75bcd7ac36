use std::{collections::HashMap, path::PathBuf};

use rayon::prelude::*;

use crate::{
    assets::store::PreparedAssetStore,
    compile::fingerprint::{FrameFingerprint, fingerprint_eval},
    compile::plan::compile_frame,
    encode::ffmpeg::{EncodeConfig, FfmpegEncoder, is_ffmpeg_on_path},
    eval::evaluator::{EvaluatedFrame, Evaluator},
    foundation::core::{FrameIndex, FrameRange},
    foundation::error::{StackError, StackResult},
    render::backend::{FrameRGBA, RenderBackend, RenderSettings},
    render::cpu::CpuBackend,
    render::passes::execute_plan,
    scene::model::SceneStack,
    timeline::segment::Timeline,
};

/// Evaluate, compile and render a single frame.
///
/// Returns premultiplied RGBA8 pixels.
pub fn render_frame(
    stack: &SceneStack,
    timeline: &Timeline,
    frame: FrameIndex,
    backend: &mut dyn RenderBackend,
    assets: &PreparedAssetStore,
) -> StackResult<FrameRGBA> {
    let eval = Evaluator::eval_frame(stack, timeline, frame)?;
    let plan = compile_frame(stack, &eval, assets)?;
    execute_plan(backend, &plan, assets)
}

/// Render `range` sequentially on `backend`.
pub fn render_frames(
    stack: &SceneStack,
    timeline: &Timeline,
    range: FrameRange,
    backend: &mut dyn RenderBackend,
    assets: &PreparedAssetStore,
) -> StackResult<Vec<FrameRGBA>> {
    render_frames_with_stats(
        stack,
        timeline,
        range,
        backend,
        assets,
        &RenderThreading::default(),
    )
    .map(|(frames, _)| frames)
}

/// How a multi-frame render is split across threads.
#[derive(Clone, Debug)]
pub struct RenderThreading {
    /// Render chunks on a rayon pool, one `CpuBackend` per worker.
    pub parallel: bool,
    /// Frames evaluated (and, for MP4 output, buffered) per chunk.
    pub chunk_size: usize,
    /// Worker count; `None` lets rayon decide.
    pub threads: Option<usize>,
    /// Render frames with identical fingerprints once per chunk.
    pub static_frame_elision: bool,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
            static_frame_elision: false,
        }
    }
}

/// Frame counters reported by multi-frame renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames produced.
    pub frames_total: u64,
    /// Frames that went through a backend.
    pub frames_rendered: u64,
    /// Frames copied from an identical earlier frame.
    pub frames_elided: u64,
}

impl RenderStats {
    fn add(&mut self, other: Self) {
        self.frames_total += other.frames_total;
        self.frames_rendered += other.frames_rendered;
        self.frames_elided += other.frames_elided;
    }
}

/// Render `range`, sequentially or in parallel chunks, and report what was rendered.
#[tracing::instrument(skip(stack, timeline, backend, assets), fields(start = range.start.0, end = range.end.0))]
pub fn render_frames_with_stats(
    stack: &SceneStack,
    timeline: &Timeline,
    range: FrameRange,
    backend: &mut dyn RenderBackend,
    assets: &PreparedAssetStore,
    threading: &RenderThreading,
) -> StackResult<(Vec<FrameRGBA>, RenderStats)> {
    if range.is_empty() {
        return Err(StackError::validation("render range must be non-empty"));
    }

    let mut out = Vec::with_capacity(range.len_frames().min(4096) as usize);
    let mut stats = RenderStats::default();
    let mut renderer = ChunkRenderer::new(stack, timeline, assets, backend, threading)?;
    for chunk in chunks(range, threading.chunk_size)? {
        let (mut frames, chunk_stats) = renderer.render(chunk)?;
        out.append(&mut frames);
        stats.add(chunk_stats);
    }
    Ok((out, stats))
}

/// Options for [`render_to_mp4`].
#[derive(Clone, Debug)]
pub struct RenderToMp4Opts {
    /// Frames to encode (start inclusive, end exclusive).
    pub range: FrameRange,
    /// Straight-alpha color transparent pixels are flattened over.
    pub bg_rgba: [u8; 4],
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Threading and chunking.
    pub threading: RenderThreading,
}

impl Default for RenderToMp4Opts {
    fn default() -> Self {
        Self {
            range: FrameRange {
                start: FrameIndex(0),
                end: FrameIndex(1),
            },
            bg_rgba: [0, 0, 0, 255],
            overwrite: true,
            threading: RenderThreading::default(),
        }
    }
}

/// Render to an MP4 file through the system `ffmpeg` binary.
///
/// Requires an integer frame rate (`fps.den == 1`) and `ffmpeg` on `PATH`. Frames are encoded
/// chunk by chunk so memory stays bounded by `opts.threading.chunk_size`.
pub fn render_to_mp4(
    stack: &SceneStack,
    timeline: &Timeline,
    out_path: impl Into<PathBuf>,
    opts: RenderToMp4Opts,
    backend: &mut dyn RenderBackend,
    assets: &PreparedAssetStore,
) -> StackResult<()> {
    render_to_mp4_with_stats(stack, timeline, out_path, opts, backend, assets).map(|_| ())
}

/// [`render_to_mp4`], returning render statistics.
#[tracing::instrument(skip_all, fields(start = opts.range.start.0, end = opts.range.end.0))]
pub fn render_to_mp4_with_stats(
    stack: &SceneStack,
    timeline: &Timeline,
    out_path: impl Into<PathBuf>,
    opts: RenderToMp4Opts,
    backend: &mut dyn RenderBackend,
    assets: &PreparedAssetStore,
) -> StackResult<RenderStats> {
    if opts.range.is_empty() {
        return Err(StackError::validation(
            "render_to_mp4 range must be non-empty",
        ));
    }
    if opts.range.end.0 > timeline.total_frames() {
        return Err(StackError::validation(format!(
            "render_to_mp4 range end {} exceeds timeline length {}",
            opts.range.end.0,
            timeline.total_frames()
        )));
    }
    if stack.fps.den != 1 {
        return Err(StackError::validation(
            "render_to_mp4 requires an integer fps (fps.den == 1)",
        ));
    }
    if !is_ffmpeg_on_path() {
        return Err(StackError::evaluation(
            "ffmpeg is required for MP4 rendering, but was not found on PATH",
        ));
    }

    let cfg = EncodeConfig {
        width: stack.canvas.width,
        height: stack.canvas.height,
        fps: stack.fps.num,
        out_path: out_path.into(),
        overwrite: opts.overwrite,
    };
    let mut enc = FfmpegEncoder::new(cfg, opts.bg_rgba)?;
    let mut stats = RenderStats::default();
    let mut renderer = ChunkRenderer::new(stack, timeline, assets, backend, &opts.threading)?;
    for chunk in chunks(opts.range, opts.threading.chunk_size)? {
        let (frames, chunk_stats) = renderer.render(chunk)?;
        for frame in &frames {
            enc.encode_frame(frame)?;
        }
        stats.add(chunk_stats);
    }
    enc.finish()?;

    tracing::info!(
        frames = stats.frames_total,
        rendered = stats.frames_rendered,
        elided = stats.frames_elided,
        "render_to_mp4 finished"
    );
    Ok(stats)
}

/// Renders chunks either on the caller's backend or on a rayon pool.
struct ChunkRenderer<'a> {
    stack: &'a SceneStack,
    timeline: &'a Timeline,
    assets: &'a PreparedAssetStore,
    backend: &'a mut dyn RenderBackend,
    elide: bool,
    parallel: Option<(rayon::ThreadPool, RenderSettings)>,
}

impl<'a> ChunkRenderer<'a> {
    fn new(
        stack: &'a SceneStack,
        timeline: &'a Timeline,
        assets: &'a PreparedAssetStore,
        backend: &'a mut dyn RenderBackend,
        threading: &RenderThreading,
    ) -> StackResult<Self> {
        let parallel = if threading.parallel {
            let settings = backend.worker_render_settings().ok_or_else(|| {
                StackError::evaluation("parallel rendering requires a backend with worker settings")
            })?;
            Some((build_thread_pool(threading.threads)?, settings))
        } else {
            None
        };
        Ok(Self {
            stack,
            timeline,
            assets,
            backend,
            elide: threading.static_frame_elision,
            parallel,
        })
    }

    fn render(&mut self, range: FrameRange) -> StackResult<(Vec<FrameRGBA>, RenderStats)> {
        let evals = (range.start.0..range.end.0)
            .map(|f| Evaluator::eval_frame(self.stack, self.timeline, FrameIndex(f)))
            .collect::<StackResult<Vec<_>>>()?;
        let (unique, frame_to_unique) = dedupe(&evals, self.elide);

        let rendered = match &self.parallel {
            Some((pool, settings)) => {
                let (stack, assets) = (self.stack, self.assets);
                pool.install(|| {
                    unique
                        .par_iter()
                        .map_init(
                            || CpuBackend::new(settings.clone()),
                            |worker, &idx| -> StackResult<FrameRGBA> {
                                let plan = compile_frame(stack, &evals[idx], assets)?;
                                worker.render_plan(&plan, assets)
                            },
                        )
                        .collect::<StackResult<Vec<_>>>()
                })?
            }
            None => unique
                .iter()
                .map(|&idx| {
                    let plan = compile_frame(self.stack, &evals[idx], self.assets)?;
                    execute_plan(&mut *self.backend, &plan, self.assets)
                })
                .collect::<StackResult<Vec<_>>>()?,
        };

        let out = expand(rendered, &frame_to_unique)?;
        let total = out.len() as u64;
        let rendered_count = unique.len() as u64;
        Ok((
            out,
            RenderStats {
                frames_total: total,
                frames_rendered: rendered_count,
                frames_elided: total - rendered_count,
            },
        ))
    }
}

/// Indices of frames to render, and for every frame the slot of its rendered twin.
fn dedupe(evals: &[EvaluatedFrame], elide: bool) -> (Vec<usize>, Vec<usize>) {
    if !elide {
        return ((0..evals.len()).collect(), (0..evals.len()).collect());
    }

    let mut unique = Vec::new();
    let mut first = HashMap::<FrameFingerprint, usize>::new();
    let frame_to_unique = evals
        .iter()
        .enumerate()
        .map(|(idx, eval)| {
            *first.entry(fingerprint_eval(eval)).or_insert_with(|| {
                unique.push(idx);
                unique.len() - 1
            })
        })
        .collect();
    (unique, frame_to_unique)
}

fn expand(rendered: Vec<FrameRGBA>, frame_to_unique: &[usize]) -> StackResult<Vec<FrameRGBA>> {
    let mut remaining = vec![0usize; rendered.len()];
    for &u in frame_to_unique {
        remaining[u] += 1;
    }

    let mut slots = rendered.into_iter().map(Some).collect::<Vec<_>>();
    let mut out = Vec::with_capacity(frame_to_unique.len());
    for &u in frame_to_unique {
        remaining[u] -= 1;
        let frame = if remaining[u] == 0 {
            slots[u].take()
        } else {
            slots[u].clone()
        };
        out.push(frame.ok_or_else(|| StackError::evaluation("rendered frame slot is empty"))?);
    }
    Ok(out)
}

fn chunks(range: FrameRange, chunk_size: usize) -> StackResult<Vec<FrameRange>> {
    let step = chunk_size.max(1) as u64;
    let mut out = Vec::new();
    let mut start = range.start.0;
    while start < range.end.0 {
        let end = start.saturating_add(step).min(range.end.0);
        out.push(FrameRange::new(FrameIndex(start), FrameIndex(end))?);
        start = end;
    }
    Ok(out)
}

fn build_thread_pool(threads: Option<usize>) -> StackResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(StackError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StackError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
