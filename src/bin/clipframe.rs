use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use clipframe::{
    CAPTURE_FPS, CaptureDriver, CapturePorts, EditSession, Editor, FfmpegAudioLoader,
    FfmpegFrameReader, FfmpegPlayer, FfmpegRecorder, FfmpegRecorderOpts, Fps, ManualClock,
    MediaClock, PacedTicks, PreviewRenderer, PreviewTier, SteppedTicks, TickSource, WallClock,
};

#[derive(Parser, Debug)]
#[command(name = "clipframe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the session's trim window as an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single composited frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Session JSON.
    #[arg(long)]
    session: PathBuf,

    /// Output MP4 path. Defaults to `<video stem>_edited.mp4` next to the session.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pace the export in real time instead of stepping the clock.
    #[arg(long)]
    realtime: bool,

    /// Font file for text watermarks.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Session JSON.
    #[arg(long)]
    session: PathBuf,

    /// Source time in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Render at the export resolution instead of the preview resolution.
    #[arg(long)]
    export_tier: bool,

    /// Font file for text watermarks.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn open_editor(session_path: &Path, font: Option<PathBuf>) -> anyhow::Result<Editor> {
    let session = EditSession::from_json_file(session_path)
        .with_context(|| format!("load session '{}'", session_path.display()))?;
    Ok(Editor::from_session(session, font)?)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let editor = open_editor(&args.session, args.font)?;
    let media = editor
        .media()
        .cloned()
        .context("session has no video to export")?;

    let out = match args.out {
        Some(out) => out,
        None => args
            .session
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(editor.suggested_output_name()),
    };

    let mut last_decile = 0u32;
    let driver = CaptureDriver::new().with_progress(move |p| {
        let decile = (p * 10.0).floor() as u32;
        if decile > last_decile {
            last_decile = decile;
            tracing::info!(progress = format!("{:.0}%", p * 100.0), "exporting");
        }
    });
    let mut editor = editor.with_driver(driver);

    let fps: Fps = CAPTURE_FPS;
    let (clock, mut ticks): (Box<dyn MediaClock>, Box<dyn TickSource>) = if args.realtime {
        (Box::new(WallClock::new()), Box::new(PacedTicks::new(fps)))
    } else {
        let clock = ManualClock::new();
        (
            Box::new(clock.clone()),
            Box::new(SteppedTicks::new(clock, fps)),
        )
    };

    let mut player = FfmpegPlayer::from_media(media, clock);
    let mut recorder = FfmpegRecorder::new(FfmpegRecorderOpts::new(out.clone()));
    let output = editor.export(CapturePorts {
        player: &mut player,
        audio_loader: &FfmpegAudioLoader,
        recorder: &mut recorder,
        ticks: ticks.as_mut(),
    })?;

    eprintln!(
        "wrote {} ({} frames, {:.2}s)",
        out.display(),
        output.frames,
        output.duration_secs
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let editor = open_editor(&args.session, args.font)?;

    let video_frame = match editor.media() {
        Some(media) => {
            let at = args.at.clamp(0.0, media.duration_sec);
            FfmpegFrameReader::open(media, at)?.frame_at(at)?
        }
        None => None,
    };

    let tier = if args.export_tier {
        PreviewTier::Export
    } else {
        PreviewTier::Preview
    };
    let frame = PreviewRenderer::new().render(
        editor.session(),
        editor.assets(),
        video_frame.as_ref(),
        tier,
    )?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.save_png(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
