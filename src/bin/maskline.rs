use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "maskline", version)]
struct Cli {
    /// Log level for diagnostics on stderr.
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Engine config JSON; its storage root resolves `--session`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the regions visible at one frame.
    Project(ProjectArgs),
    /// List the frames carrying edits, with a change summary for each.
    Keyframes(LogArgs),
    /// Print the per-frame region plan for a frame range.
    Plan(PlanArgs),
    /// Validate a serialized log (and the config, if given) and print its statistics.
    Check(LogArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct LogArgs {
    /// Serialized region log (JSON).
    #[arg(long = "log")]
    log_path: Option<PathBuf>,

    /// Session whose saved log is read from the configured storage root.
    #[arg(long)]
    session: Option<String>,
}

#[derive(Parser, Debug)]
struct ProjectArgs {
    #[command(flatten)]
    log: LogArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Include regions deleted at exactly this frame.
    #[arg(long, value_enum, default_value_t = ModeChoice::Active)]
    mode: ModeChoice,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    log: LogArgs,

    /// First frame (inclusive).
    #[arg(long)]
    start: u64,

    /// Last frame (exclusive).
    #[arg(long)]
    end: u64,

    /// Clip regions to this frame width (requires --height).
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Clip regions to this frame height (requires --width).
    #[arg(long, requires = "width")]
    height: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Active,
    Complete,
}

impl From<ModeChoice> for maskline::ProjectionMode {
    fn from(m: ModeChoice) -> Self {
        match m {
            ModeChoice::Active => Self::Active,
            ModeChoice::Complete => Self::Complete,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level)
        .init();

    let cfg = match &cli.config {
        Some(path) => maskline::EngineConfig::from_path(path)?,
        None => maskline::EngineConfig::default(),
    };

    match cli.cmd {
        Command::Project(args) => cmd_project(args, &cfg),
        Command::Keyframes(args) => cmd_keyframes(args, &cfg),
        Command::Plan(args) => cmd_plan(args, &cfg),
        Command::Check(args) => cmd_check(args, &cfg),
    }
}

fn load_log(
    args: &LogArgs,
    cfg: &maskline::EngineConfig,
) -> anyhow::Result<maskline::RegionEventLog> {
    match (&args.log_path, &args.session) {
        (Some(path), _) => read_log(path),
        (None, Some(session)) => {
            let session = maskline::SessionId::new(session.as_str())?;
            let store = maskline::FsLogStore::from_opts(&cfg.storage);
            let log = maskline::open_log(&store, &session)
                .with_context(|| format!("load session '{session}'"))?;
            tracing::debug!(
                session = %session,
                path = %store.path_for(&session).display(),
                events = log.event_count(),
                "session log loaded"
            );
            Ok(log)
        }
        (None, None) => anyhow::bail!("one of --log or --session is required"),
    }
}

fn read_log(path: &Path) -> anyhow::Result<maskline::RegionEventLog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read region log '{}'", path.display()))?;
    let log = maskline::decode_json(&text)
        .with_context(|| format!("decode region log '{}'", path.display()))?;
    tracing::debug!(events = log.event_count(), frames = log.frame_count(), "log loaded");
    Ok(log)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{s}");
    Ok(())
}

fn cmd_project(args: ProjectArgs, cfg: &maskline::EngineConfig) -> anyhow::Result<()> {
    let log = load_log(&args.log, cfg)?;
    let frame = maskline::FrameIndex(args.frame);
    let projection = maskline::project(&log, frame, args.mode.into());
    print_json(&projection)
}

fn cmd_keyframes(args: LogArgs, cfg: &maskline::EngineConfig) -> anyhow::Result<()> {
    let log = load_log(&args, cfg)?;
    let out: Vec<_> = maskline::frames_with_changes(&log)
        .into_iter()
        .map(|frame| {
            let summary = maskline::ChangeSummary::at(&log, frame);
            serde_json::json!({
                "frame": frame,
                "summary": summary,
                "label": summary.to_string(),
            })
        })
        .collect();
    print_json(&out)
}

fn cmd_plan(args: PlanArgs, cfg: &maskline::EngineConfig) -> anyhow::Result<()> {
    let log = load_log(&args.log, cfg)?;
    let range = maskline::FrameRange::new(
        maskline::FrameIndex(args.start),
        maskline::FrameIndex(args.end),
    )?;
    let clip = match (args.width, args.height) {
        (Some(width), Some(height)) => Some(maskline::FrameSize { width, height }),
        _ => None,
    };
    let plan = maskline::RegionPlan::build(&log, range, clip);
    eprintln!(
        "{} frames with regions, {} region instances",
        plan.frame_count(),
        plan.region_count()
    );
    print_json(&plan)
}

fn cmd_check(args: LogArgs, cfg: &maskline::EngineConfig) -> anyhow::Result<()> {
    let log = load_log(&args, cfg)?;
    let keyframes = maskline::frames_with_changes(&log);
    print_json(&serde_json::json!({
        "events": log.event_count(),
        "frames": log.frame_count(),
        "regions": log.region_ids().len(),
        "first_keyframe": keyframes.first(),
        "last_keyframe": keyframes.last(),
    }))
}
