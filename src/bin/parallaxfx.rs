use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use parallaxfx::{
    AnimationKind, DepthConvention, DepthEstimator as _, DepthMap, ExportEvent, FileExportSink,
    Fps, FrameCompositor, FrameOutcome, InMemoryExportSink, LuminanceDepthEstimator,
    ParallaxImage, ParallaxSettings, Size2,
};

#[derive(Parser, Debug)]
#[command(name = "parallaxfx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Export the diffuse and depth stills as PNGs.
    Still(StillArgs),
    /// Export one looping MP4 of the animation (requires `ffmpeg` on PATH).
    Video(VideoArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Diffuse (color) image.
    #[arg(long)]
    diffuse: PathBuf,

    /// Depth image. Estimated from luminance when omitted.
    #[arg(long)]
    depth: Option<PathBuf>,

    /// Which end of the depth range is near. Overrides the settings file.
    #[arg(long, value_enum)]
    depth_convention: Option<ConventionChoice>,

    /// Settings JSON. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Animation shape.
    #[arg(long, value_enum)]
    animation: Option<AnimationChoice>,

    /// Depth that stays still and sharp, 0..=1.
    #[arg(long)]
    focal_point: Option<f32>,

    /// Depth-of-field strength, 0..=3.
    #[arg(long)]
    blur: Option<f32>,

    /// Output width in pixels (defaults to the image width).
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (defaults to the image height).
    #[arg(long)]
    height: Option<u32>,

    /// Treat width/height as a container the image fills while keeping its aspect ratio.
    #[arg(long)]
    fill: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Seconds since the animation started.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Render the reprojected depth instead of the color image.
    #[arg(long)]
    show_depth: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct StillArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// File name stem; writes `<stem>_diffuse.png` and `<stem>_depth.png`.
    #[arg(long, default_value = "parallax")]
    stem: String,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// File name stem; writes `<stem>.mp4`.
    #[arg(long, default_value = "parallax")]
    stem: String,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Approximate length in seconds, rounded down to whole animation cycles.
    #[arg(long)]
    seconds: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConventionChoice {
    NearIsOne,
    NearIsZero,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnimationChoice {
    TurnTable,
    HorizontalSwitch,
    VerticalSwitch,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Still(args) => cmd_still(args),
        Command::Video(args) => cmd_video(args),
    }
}

fn load_settings(input: &InputArgs) -> anyhow::Result<ParallaxSettings> {
    let mut settings = match &input.config {
        Some(path) => ParallaxSettings::from_path(path)?,
        None => ParallaxSettings::default(),
    };
    if let Some(c) = input.depth_convention {
        settings.depth_convention = match c {
            ConventionChoice::NearIsOne => DepthConvention::NearIsOne,
            ConventionChoice::NearIsZero => DepthConvention::NearIsZero,
        };
    }
    if let Some(a) = input.animation {
        settings.animation = match a {
            AnimationChoice::TurnTable => AnimationKind::TurnTable,
            AnimationChoice::HorizontalSwitch => AnimationKind::HorizontalSwitch,
            AnimationChoice::VerticalSwitch => AnimationKind::VerticalSwitch,
        };
    }
    if let Some(f) = input.focal_point {
        settings.focal_point = f;
    }
    if let Some(b) = input.blur {
        settings.blur_intensity = b;
    }
    settings.validate()?;
    Ok(settings)
}

fn load_image(input: &InputArgs, convention: DepthConvention) -> anyhow::Result<ParallaxImage> {
    let image = match &input.depth {
        Some(depth) => ParallaxImage::open(&input.diffuse, depth, convention)?,
        None => {
            let diffuse = image::open(&input.diffuse)
                .with_context(|| format!("open diffuse image '{}'", input.diffuse.display()))?
                .to_rgba8();
            let mut estimator = LuminanceDepthEstimator { convention };
            let depth: DepthMap = estimator.estimate(&diffuse)?;
            ParallaxImage::from_depth_sources(diffuse, None, Some(depth))?
        }
    };
    Ok(image)
}

fn prepare(
    input: &InputArgs,
    settings: &ParallaxSettings,
    sink: Box<dyn parallaxfx::ExportSink>,
) -> anyhow::Result<FrameCompositor> {
    let image = load_image(input, settings.depth_convention)?;
    let size = Size2::new(
        input.width.unwrap_or(image.size().width),
        input.height.unwrap_or(image.size().height),
    );
    let mut comp = FrameCompositor::new(settings, sink)?;
    comp.set_image(Arc::new(image))?;
    if input.fill {
        comp.resize_to_fill(size)?;
    } else {
        comp.resize(size)?;
    }
    Ok(comp)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.input)?;
    let mut comp = prepare(&args.input, &settings, Box::new(InMemoryExportSink::new()))?;
    comp.set_show_depth(args.show_depth);

    if let FrameOutcome::Skipped(reason) = comp.draw(args.time) {
        anyhow::bail!("frame was not rendered: {reason:?}");
    }
    let frame = comp.snapshot().context("compositor has no drawable")?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.input)?;
    let sink = FileExportSink::new(&args.out_dir, &args.stem);
    let mut comp = prepare(&args.input, &settings, Box::new(sink))?;
    if !comp.begin_still_export() {
        anyhow::bail!("still export did not start");
    }
    run_export(&mut comp, settings.display_fps)?;
    eprintln!("wrote {}", args.out_dir.join(format!("{}_diffuse.png", args.stem)).display());
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.input)?;
    if let Some(fps) = args.fps {
        settings.export_fps = Fps::new(fps, 1)?;
    }
    if let Some(secs) = args.seconds {
        settings.export_target_secs = secs;
    }
    settings.validate()?;

    let sink = FileExportSink::new(&args.out_dir, &args.stem);
    let mut comp = prepare(&args.input, &settings, Box::new(sink))?;
    if !comp.begin_video_export() {
        anyhow::bail!("video export did not start");
    }
    run_export(&mut comp, settings.export_fps)?;
    eprintln!("wrote {}", args.out_dir.join(format!("{}.mp4", args.stem)).display());
    Ok(())
}

/// Draw frames until the running export reaches a terminal event.
fn run_export(comp: &mut FrameCompositor, fps: Fps) -> anyhow::Result<()> {
    let last = Arc::new(Mutex::new(None::<ExportEvent>));
    let seen = Arc::clone(&last);
    comp.set_export_observer(Some(Box::new(move |e: &ExportEvent| {
        if let ExportEvent::Rendering(pct) = e {
            tracing::info!(pct = format!("{pct:.0}"), "rendering");
        }
        *seen.lock() = Some(e.clone());
    })));

    let dt = fps.frame_duration_secs();
    let mut t = 0.0;
    while comp.is_saving_to_photos() || comp.is_saving_to_video() {
        if let FrameOutcome::Skipped(reason) = comp.draw(t) {
            anyhow::bail!("export frame was not rendered: {reason:?}");
        }
        t += dt;
    }

    match last.lock().take() {
        Some(ExportEvent::Finished) => Ok(()),
        Some(ExportEvent::Failed(reason)) => anyhow::bail!("export failed: {reason}"),
        other => anyhow::bail!("export ended without a result: {other:?}"),
    }
}
