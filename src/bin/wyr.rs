use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};

use wyr::{
    CommandSynthesizer, CompositorWorker, FfmpegCodec, ImageSource, JobState, NarrationSpec,
    OptionInput, Orchestrator, OrchestratorConfig, PercentageSpec, RenderConfig,
    SpeechSynthesizer, VideoRequest,
};

#[derive(Parser, Debug)]
#[command(name = "wyr", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Request JSON; overrides the per-option flags.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Upper option image.
    #[arg(long, required_unless_present = "in_path")]
    upper_image: Option<PathBuf>,

    /// Upper option caption.
    #[arg(long, required_unless_present = "in_path")]
    upper_caption: Option<String>,

    /// Lower option image.
    #[arg(long, required_unless_present = "in_path")]
    lower_image: Option<PathBuf>,

    /// Lower option caption.
    #[arg(long, required_unless_present = "in_path")]
    lower_caption: Option<String>,

    /// Show results: `auto` or `UPPER:LOWER` (e.g. `60:40`).
    #[arg(long)]
    percentages: Option<String>,

    /// Render config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Add spoken narration.
    #[arg(long, default_value_t = false)]
    narrate: bool,

    /// Fail instead of continuing silently when narration cannot be synthesized.
    #[arg(long, default_value_t = false)]
    require_narration: bool,

    /// TTS voice.
    #[arg(long)]
    voice: Option<String>,

    /// TTS program; `{text}`, `{out}` and `{voice}` in `--tts-arg` are substituted.
    /// Defaults to espeak-ng.
    #[arg(long)]
    tts_program: Option<PathBuf>,

    /// TTS argument (repeatable).
    #[arg(long = "tts-arg", allow_hyphen_values = true)]
    tts_args: Vec<String>,

    /// Job deadline in seconds.
    #[arg(long, default_value_t = 600)]
    deadline_secs: u64,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Timestamp in seconds.
    #[arg(long, default_value_t = 5.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn parse_percentages(s: &str) -> anyhow::Result<PercentageSpec> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(PercentageSpec::Auto);
    }
    let Some((a, b)) = s.split_once(':') else {
        bail!("percentages must be `auto` or `UPPER:LOWER`, got '{s}'");
    };
    Ok(PercentageSpec::Manual {
        value1: a.trim().parse().context("upper percentage")?,
        value2: b.trim().parse().context("lower percentage")?,
    })
}

fn build_request(args: &RequestArgs) -> anyhow::Result<VideoRequest> {
    let mut req = match &args.in_path {
        Some(p) => VideoRequest::from_path(p)?,
        None => {
            let opt = |image: &Option<PathBuf>, caption: &Option<String>| OptionInput {
                image: ImageSource::referenced(image.clone().unwrap_or_default()),
                caption: caption.clone().unwrap_or_default(),
            };
            VideoRequest::new(
                opt(&args.upper_image, &args.upper_caption),
                opt(&args.lower_image, &args.lower_caption),
            )
        }
    };
    if let Some(p) = &args.percentages {
        req.percentages = Some(parse_percentages(p)?);
    }
    if let Some(c) = &args.config {
        req.render = Some(RenderConfig::from_path(c)?);
    }
    req.validate()?;
    Ok(req)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut req = build_request(&args.request)?;
    if args.narrate {
        req.narration = Some(NarrationSpec {
            enabled: true,
            required: args.require_narration,
            voice: args.voice.clone(),
        });
    }

    let out_dir = args
        .out
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let cfg = OrchestratorConfig {
        worker_count: 1,
        backlog: 1,
        job_deadline: Some(Duration::from_secs(args.deadline_secs.max(1))),
        output_dir: out_dir,
        ..OrchestratorConfig::default()
    };

    let synth: Option<Arc<dyn SpeechSynthesizer>> = req.narration_enabled().then(|| {
        let s = match &args.tts_program {
            Some(p) => CommandSynthesizer::new(p.clone(), args.tts_args.clone()),
            None => CommandSynthesizer::espeak(),
        };
        Arc::new(CommandSynthesizer {
            timeout: cfg.synthesis_timeout,
            ..s
        }) as Arc<dyn SpeechSynthesizer>
    });
    let orch = Orchestrator::new(cfg, Arc::new(FfmpegCodec::default()), synth)?;
    let handle = orch.submit(req)?;

    let mut last = u8::MAX;
    let status = loop {
        let st = orch.poll(handle)?;
        if st.progress != last {
            eprintln!("[{:>3}%] {}", st.progress, st.stage);
            last = st.progress;
        }
        if st.state.is_terminal() {
            break st;
        }
        std::thread::sleep(Duration::from_millis(200));
    };

    match status.state {
        JobState::Completed => {
            let produced = status.output.context("completed job has no output path")?;
            std::fs::rename(&produced, &args.out).with_context(|| {
                format!("move '{}' to '{}'", produced.display(), args.out.display())
            })?;
            eprintln!("wrote {}", args.out.display());
            Ok(())
        }
        JobState::Cancelled => bail!("job cancelled"),
        _ => {
            let f = status.failure.context("failed job has no failure detail")?;
            bail!("{:?}: {}", f.kind, f.message)
        }
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let req = build_request(&args.request)?;
    let cfg = req.render.clone().unwrap_or_default();
    let scene = Arc::new(wyr::build_scene(&req, &cfg, None)?);
    let mut worker = CompositorWorker::new(scene)?;
    let frame = worker.render_at_secs(args.at)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .to_rgba_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {} (frame {})", args.out.display(), frame.index().0);
    Ok(())
}
