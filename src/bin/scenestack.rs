use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use scenestack::{
    BackendKind, FrameIndex, PreparedAssetStore, RenderSettings, RenderThreading,
    RenderToMp4Opts, SceneStack, Timeline,
};

const CHUNK_SIZE_ENV: &str = "SCENESTACK_CHUNK_SIZE";

#[derive(Parser, Debug)]
#[command(name = "scenestack", version, about = "Render scene stacks to PNG frames or MP4")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved timeline as JSON.
    Timeline(TimelineArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render the whole timeline to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct TimelineArgs {
    /// Input scene stack JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene stack JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene stack JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Render frames on a rayon pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Frames per render chunk; defaults to $SCENESTACK_CHUNK_SIZE or 64.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Render identical frames once per chunk.
    #[arg(long, default_value_t = false)]
    static_frame_elision: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Timeline(args) => cmd_timeline(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load(in_path: &Path) -> anyhow::Result<(SceneStack, Timeline)> {
    let stack = SceneStack::from_path(in_path)
        .with_context(|| format!("load scene stack '{}'", in_path.display()))?;
    let timeline = Timeline::build(&stack).context("build timeline")?;
    Ok((stack, timeline))
}

fn prepare_assets(stack: &SceneStack, in_path: &Path) -> anyhow::Result<PreparedAssetStore> {
    let root = in_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    PreparedAssetStore::prepare(stack, root)
        .with_context(|| format!("prepare assets under '{}'", root.display()))
}

fn cmd_timeline(args: TimelineArgs) -> anyhow::Result<()> {
    let (_, timeline) = load(&args.in_path)?;
    let json = serde_json::to_string_pretty(&timeline).context("serialize timeline")?;
    println!("{json}");
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (stack, timeline) = load(&args.in_path)?;
    let assets = prepare_assets(&stack, &args.in_path)?;

    let mut backend = scenestack::create_backend(BackendKind::Cpu, &RenderSettings::default())?;
    let frame = scenestack::render_frame(
        &stack,
        &timeline,
        FrameIndex(args.frame),
        backend.as_mut(),
        &assets,
    )
    .with_context(|| format!("render frame {}", args.frame))?;

    scenestack::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (stack, timeline) = load(&args.in_path)?;
    let assets = prepare_assets(&stack, &args.in_path)?;

    let chunk_size = match args.chunk_size {
        Some(n) => n,
        None => chunk_size_from_env()?,
    };
    let opts = RenderToMp4Opts {
        range: timeline.full_range(),
        bg_rgba: stack.background.unwrap_or([0, 0, 0, 255]),
        overwrite: args.overwrite,
        threading: RenderThreading {
            parallel: args.parallel,
            chunk_size,
            threads: args.threads,
            static_frame_elision: args.static_frame_elision,
        },
    };

    let mut backend = scenestack::create_backend(BackendKind::Cpu, &RenderSettings::default())?;
    let stats = scenestack::render_to_mp4_with_stats(
        &stack,
        &timeline,
        &args.out,
        opts,
        backend.as_mut(),
        &assets,
    )
    .with_context(|| format!("render '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {} rendered, {} elided)",
        args.out.display(),
        stats.frames_total,
        stats.frames_rendered,
        stats.frames_elided
    );
    Ok(())
}

fn chunk_size_from_env() -> anyhow::Result<usize> {
    match std::env::var(CHUNK_SIZE_ENV) {
        Ok(v) => v
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{CHUNK_SIZE_ENV} must be a positive integer, got '{v}'")),
        Err(_) => Ok(RenderThreading::default().chunk_size),
    }
}
