use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use lightstage::{ChannelContainer, RecordingHost, RigSpec, VideoFrame};

#[derive(Parser, Debug)]
#[command(name = "lightstage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine a raw depth EXR and its alpha EXR into a .npy array.
    Depth(DepthArgs),
    /// Convert an RGBA normal-map EXR into a .npy array.
    Normal(NormalArgs),
    /// Decompose a lighting-pass EXR into intrinsic images.
    Passes(PassesArgs),
    /// Assemble still images into an MP4 (requires `ffmpeg` on PATH).
    Video(VideoArgs),
    /// Validate a JSON rig and print the scene operations it would perform.
    Rig(RigArgs),
}

#[derive(Parser, Debug)]
struct DepthArgs {
    /// EXR holding the raw depth map (three identical channels).
    #[arg(long)]
    depth_exr: PathBuf,

    /// EXR holding the anti-aliased alpha map (three identical channels).
    #[arg(long)]
    alpha_exr: PathBuf,

    /// Output .npy path.
    #[arg(long)]
    out: PathBuf,

    /// Also write a grayscale visualization next to the array.
    #[arg(long)]
    vis: bool,
}

#[derive(Parser, Debug)]
struct NormalArgs {
    /// Input RGBA normal-map EXR.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output .npy path.
    #[arg(long)]
    out: PathBuf,

    /// Also write an RGB visualization next to the array.
    #[arg(long)]
    vis: bool,
}

#[derive(Parser, Debug)]
struct PassesArgs {
    /// Input lighting-pass EXR (diffuse/glossy color, direct/indirect,
    /// composite, each as <pass>.R/G/B/A).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory for the five output arrays.
    #[arg(long)]
    outdir: PathBuf,

    /// Also write an RGBA PNG per array.
    #[arg(long)]
    vis: bool,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Still images, in order.
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// Frame rate.
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RigArgs {
    /// Input rig JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Library diagnostics (radian sanity warnings, pack failures) go to
    // stderr; stdout stays reserved for command output like rig summaries.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Depth(args) => cmd_depth(args),
        Command::Normal(args) => cmd_normal(args),
        Command::Passes(args) => cmd_passes(args),
        Command::Video(args) => cmd_video(args),
        Command::Rig(args) => cmd_rig(args),
    }
}

fn vis_path(out: &Path, enabled: bool) -> Option<PathBuf> {
    enabled.then(|| out.with_extension("png"))
}

fn cmd_depth(args: DepthArgs) -> anyhow::Result<()> {
    let depth = ChannelContainer::from_exr_file(&args.depth_exr)?;
    let alpha = ChannelContainer::from_exr_file(&args.alpha_exr)?;
    let png = vis_path(&args.out, args.vis);
    lightstage::extract_depth(&depth, &alpha, &args.out, png.as_deref())?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_normal(args: NormalArgs) -> anyhow::Result<()> {
    let container = ChannelContainer::from_exr_file(&args.in_path)?;
    let png = vis_path(&args.out, args.vis);
    lightstage::extract_normal(&container, &args.out, png.as_deref())?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_passes(args: PassesArgs) -> anyhow::Result<()> {
    let container = ChannelContainer::from_exr_file(&args.in_path)?;
    lightstage::extract_intrinsic_images(&container, &args.outdir, args.vis)?;
    eprintln!("wrote intrinsic images to {}", args.outdir.display());
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let mut frames = Vec::with_capacity(args.frames.len());
    for path in &args.frames {
        let img = image::open(path)
            .with_context(|| format!("open frame '{}'", path.display()))?
            .into_rgb8();
        let (w, h) = img.dimensions();
        let arr =
            ndarray::Array3::from_shape_vec((h as usize, w as usize, 3), img.into_raw())
                .with_context(|| format!("frame '{}' buffer shape", path.display()))?;
        frames.push(VideoFrame::Rgb8(arr));
    }

    lightstage::frames_to_video(&frames, args.fps, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_rig(args: RigArgs) -> anyhow::Result<()> {
    let f = std::fs::File::open(&args.in_path)
        .with_context(|| format!("open rig '{}'", args.in_path.display()))?;
    let rig: RigSpec = serde_json::from_reader(std::io::BufReader::new(f))
        .with_context(|| "parse rig JSON")?;

    let mut host = RecordingHost::default();
    rig.apply(&mut host)?;

    for line in host.summary() {
        println!("{line}");
    }
    eprintln!("rig ok: {} light(s)", host.lights.len());
    Ok(())
}
