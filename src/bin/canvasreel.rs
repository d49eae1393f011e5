use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "canvasreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay command batches onto a CPU canvas and write the result as a PNG.
    Render(RenderArgs),
    /// Decode a command file and report what it contains.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input JSON: one batch (array of commands) or an array of batches.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Directory of PNG/JPEG files, registered in the image cache under their file stem.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Font registration as FAMILY=PATH. Repeatable.
    #[arg(long = "font", value_parser = parse_font_arg)]
    fonts: Vec<(String, PathBuf)>,

    /// Render only the first N batches.
    #[arg(long)]
    frames: Option<usize>,

    /// CSS color the canvas starts out filled with.
    #[arg(long)]
    background: Option<String>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input JSON: one batch (array of commands) or an array of batches.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn parse_font_arg(s: &str) -> Result<(String, PathBuf), String> {
    let (family, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FAMILY=PATH, got '{s}'"))?;
    if family.trim().is_empty() || path.trim().is_empty() {
        return Err(format!("expected FAMILY=PATH, got '{s}'"));
    }
    Ok((family.trim().to_owned(), PathBuf::from(path.trim())))
}

fn read_frames(path: &Path) -> anyhow::Result<Vec<Vec<canvasreel::DrawCommand>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read commands '{}'", path.display()))?;
    let frames = canvasreel::decode_frames_str(&text)
        .with_context(|| format!("decode commands '{}'", path.display()))?;
    Ok(frames)
}

fn load_images(cache: &canvasreel::ImageCache, dir: &Path) -> anyhow::Result<usize> {
    let mut loaded = 0;
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read image dir '{}'", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if !matches!(ext.as_deref(), Some("png" | "jpg" | "jpeg")) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let bytes =
            std::fs::read(&path).with_context(|| format!("read image '{}'", path.display()))?;
        cache
            .load(stem, &bytes)
            .with_context(|| format!("decode image '{}'", path.display()))?;
        loaded += 1;
    }
    Ok(loaded)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let frames = read_frames(&args.in_path)?;

    let mut opts = canvasreel::SurfaceOpts::default();
    if let Some(bg) = &args.background {
        let c = csscolorparser::parse(bg).with_context(|| format!("parse background '{bg}'"))?;
        opts = opts.with_clear_rgba(c.to_rgba8());
    }
    let mut surface = canvasreel::PixelSurface::new(args.width, args.height).with_opts(opts);
    for (family, path) in &args.fonts {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        surface = surface
            .with_font(family, bytes)
            .with_context(|| format!("register font '{family}'"))?;
    }

    let mut session = canvasreel::Session::new(&mut surface, canvasreel::SessionOpts::default())
        .with_context(|| format!("create {}x{} canvas", args.width, args.height))?;
    if let Some(dir) = &args.images {
        let n = load_images(session.images(), dir)?;
        eprintln!("loaded {n} images from {}", dir.display());
    }

    let limit = args.frames.unwrap_or(frames.len());
    let mut rendered = 0usize;
    for batch in frames.iter().take(limit) {
        if session.submit(batch) {
            rendered += 1;
        }
    }

    let renderer = session
        .renderer()
        .context("session stopped before the canvas could be read")?;
    let pixels = renderer.get_image_data(0, 0, args.width, args.height);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &pixels.data,
        pixels.width,
        pixels.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("rendered {rendered} batches, wrote {}", args.out.display());
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let frames = read_frames(&args.in_path)?;
    let commands: usize = frames.iter().map(Vec::len).sum();
    let unknown = frames
        .iter()
        .flatten()
        .filter(|c| matches!(c, canvasreel::DrawCommand::Unknown))
        .count();
    println!("batches: {}", frames.len());
    println!("commands: {commands}");
    println!("unknown: {unknown}");
    Ok(())
}
