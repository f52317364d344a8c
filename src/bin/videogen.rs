use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::Level;

use videogen::{
    CancelToken, OutputFormat, OutputSink, PanicError, Scene, StreamSession, StreamSettings,
};

#[derive(Parser, Debug)]
#[command(name = "videogen", version, about = "Generate a synthetic test video on stdout")]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream the animation to stdout, raw or through ffmpeg.
    #[command(disable_help_flag = true)]
    Stream(StreamArgs),
    /// Render a single animation frame as a PNG.
    #[command(disable_help_flag = true)]
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct Geometry {
    /// Width of the video.
    #[arg(short = 'w', long, default_value_t = 256)]
    width: u32,

    /// Height of the video.
    #[arg(short = 'h', long, default_value_t = 256)]
    height: u32,

    /// Frame rate of the video.
    #[arg(short = 'r', long, default_value_t = 10)]
    rate: u32,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Args, Debug)]
struct StreamArgs {
    #[command(flatten)]
    geometry: Geometry,

    /// Output format: raw, avi, webm.
    #[arg(short = 'f', long, default_value_t = OutputFormat::Avi)]
    format: OutputFormat,

    /// Duration of the output video (e.g. 10s, 1.5s, 500ms, 1m).
    #[arg(short = 'd', long, default_value = "10s", value_parser = parse_duration)]
    duration: Duration,

    /// Stop after this much wall-clock time, even if the video is not complete.
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    geometry: Geometry,

    /// Frame index (0-based).
    #[arg(long, default_value_t = 0)]
    index: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    videogen::parse_duration(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let res = match cli.cmd {
        Command::Stream(args) => cmd_stream(args),
        Command::Frame(args) => cmd_frame(args),
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if err.chain().any(|e| e.is::<PanicError>()) {
                // Give the worker's panic report time to reach stderr.
                std::thread::sleep(Duration::from_secs(1));
            }
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_stream(args: StreamArgs) -> anyhow::Result<()> {
    let settings = StreamSettings {
        width: args.geometry.width,
        height: args.geometry.height,
        rate: args.geometry.rate,
        duration: args.duration,
        format: args.format,
    };
    settings.validate()?;
    eprintln!("{settings}");

    let root = CancelToken::new();
    let token = match args.timeout {
        Some(limit) => root.with_timeout(limit),
        None => root.child(),
    };

    let sink = OutputSink::open(
        settings.format,
        settings.width,
        settings.height,
        settings.rate,
    )?;
    let (stats, sink) = StreamSession::run(&settings, sink, &token)?;
    sink.close().context("close output")?;

    tracing::info!(
        frames = stats.frames_sent,
        emissions = stats.emissions,
        "stream complete"
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let g = &args.geometry;
    let scene = Scene::at(g.width, g.height, g.rate, args.index)?;
    let image = scene.frame()?.to_rgba_image()?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image
        .save(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
