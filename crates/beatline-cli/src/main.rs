use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use beatline_timeline::gesture::PointerPosition;
use beatline_timeline::ruler::ruler_ticks;
use beatline_timeline::{
    downsample_peaks, ArrangementSession, MenuAnchor, MenuItem, TimelineAction, TimelineConfig,
    TimelineEngine, TimelineLayout, WaveformRequest,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Peaks kept per waveform preview.
const WAVEFORM_BUCKETS: usize = 256;
const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay(args) => execute_replay(args),
        Commands::Ruler(args) => execute_ruler(args),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Arrangement timeline tools for Beatline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a pointer script against a saved arrangement.
    Replay(ReplayArgs),
    /// Print the ruler ticks for a time range.
    Ruler(RulerArgs),
}

#[derive(Args)]
struct ReplayArgs {
    /// Path to the arrangement session (JSON).
    #[arg(long)]
    session: PathBuf,
    /// Path to the interaction script (JSON).
    #[arg(long)]
    script: PathBuf,
    /// Timeline configuration file. Defaults to the user configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the resulting session back to this path.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Emit a JSON report instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RulerArgs {
    /// First second of the range.
    #[arg(long, default_value_t = 0.0)]
    start: f64,
    /// Last second of the range.
    #[arg(long)]
    end: f64,
    /// Tempo for bar/beat ticks; seconds are used when omitted.
    #[arg(long)]
    bpm: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    viewport_width: Option<f64>,
    /// Raw samples per audio URL, standing in for a decoder.
    #[serde(default)]
    waveforms: HashMap<String, Vec<f32>>,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Press {
        x: f64,
        y: f64,
    },
    Drag {
        x: f64,
        y: f64,
    },
    Release {
        x: f64,
        y: f64,
    },
    Wheel {
        x: f64,
        delta: f64,
        #[serde(default)]
        modifier: bool,
    },
    Scroll {
        left: f64,
    },
    ZoomIn,
    ZoomOut,
    ContextMenu {
        x: f64,
        y: f64,
    },
    Menu {
        item: MenuItem,
    },
    DismissMenu,
    TogglePlayback,
    ToggleLoop,
    AddVocalLane,
    Advance {
        seconds: f64,
    },
}

#[derive(Debug, Serialize)]
struct StepReport {
    index: usize,
    step: Step,
    actions: Vec<TimelineAction>,
}

#[derive(Debug, Serialize)]
struct ReplayReport<'a> {
    steps: Vec<StepReport>,
    session: &'a ArrangementSession,
    layout: TimelineLayout,
}

fn execute_replay(args: ReplayArgs) -> Result<()> {
    let mut session: ArrangementSession = read_json(&args.session, "session")?;
    let script: ReplayScript = read_json(&args.script, "script")?;
    let config = match &args.config {
        Some(path) => TimelineConfig::from_path(path)
            .with_context(|| format!("failed to load timeline config {}", path.display()))?,
        None => TimelineConfig::load(),
    };

    let peaks = script.waveforms;
    let mut engine = TimelineEngine::new(config, move |url: &str| match peaks.get(url) {
        Some(samples) => WaveformRequest::ready(downsample_peaks(samples, WAVEFORM_BUCKETS)),
        None => WaveformRequest::failed(format!("no waveform data for {url}")),
    });
    engine.set_viewport_width(script.viewport_width.unwrap_or(DEFAULT_VIEWPORT_WIDTH));

    let mut reports = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.into_iter().enumerate() {
        engine.layout(&session.props());
        let actions = run_step(&mut engine, &mut session, &step);
        for action in &actions {
            session
                .apply(action)
                .with_context(|| format!("step {index}: cannot apply {action:?}"))?;
        }
        if let Some(scroll) = engine.take_scroll_correction() {
            debug!(index, scroll, "applied scroll correction");
        }
        reports.push(StepReport {
            index,
            step,
            actions,
        });
    }
    let layout = engine.layout(&session.props());
    engine.dispose();
    info!(steps = reports.len(), "replay finished");

    if let Some(path) = &args.output {
        let data = serde_json::to_string_pretty(&session)?;
        fs::write(path, data)
            .with_context(|| format!("failed to write session {}", path.display()))?;
    }

    let report = ReplayReport {
        steps: reports,
        session: &session,
        layout,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report)?;
    }
    Ok(())
}

fn run_step(
    engine: &mut TimelineEngine,
    session: &mut ArrangementSession,
    step: &Step,
) -> Vec<TimelineAction> {
    let props = session.props();
    match *step {
        Step::Press { x, y } => {
            let pointer = PointerPosition::new(x, y);
            let Some(target) = engine.hit_test(&props, pointer) else {
                return Vec::new();
            };
            match engine.pointer_down(target, pointer, &props) {
                Ok(actions) => actions,
                Err(err) => {
                    debug!(%err, "press ignored");
                    Vec::new()
                }
            }
        }
        Step::Drag { x, y } => engine
            .pointer_move(PointerPosition::new(x, y), &props)
            .into_iter()
            .collect(),
        Step::Release { x, y } => engine
            .pointer_up(PointerPosition::new(x, y), &props)
            .into_iter()
            .collect(),
        Step::Wheel { x, delta, modifier } => {
            engine.wheel(delta, x, modifier);
            Vec::new()
        }
        Step::Scroll { left } => {
            engine.set_scroll_left(left);
            Vec::new()
        }
        Step::ZoomIn => {
            engine.zoom_in(props.current_time);
            Vec::new()
        }
        Step::ZoomOut => {
            engine.zoom_out(props.current_time);
            Vec::new()
        }
        Step::ContextMenu { x, y } => {
            let pointer = PointerPosition::new(x, y);
            match engine.hit_test(&props, pointer) {
                Some(target) => {
                    engine.open_context_menu(target, MenuAnchor { x, y }, &props);
                }
                None => engine.dismiss_context_menu(),
            }
            Vec::new()
        }
        Step::Menu { item } => engine.menu_action(item),
        Step::DismissMenu => {
            engine.dismiss_context_menu();
            Vec::new()
        }
        Step::TogglePlayback => vec![engine.toggle_playback(props.playing)],
        Step::ToggleLoop => vec![engine.toggle_loop()],
        Step::AddVocalLane => vec![engine.add_vocal_lane()],
        Step::Advance { seconds } => {
            session.advance(seconds);
            Vec::new()
        }
    }
}

fn print_report(report: &ReplayReport<'_>) -> Result<()> {
    for step in &report.steps {
        if step.actions.is_empty() {
            continue;
        }
        println!("step {} ({}):", step.index, serde_json::to_string(&step.step)?);
        for action in &step.actions {
            println!("  {}", serde_json::to_string(action)?);
        }
    }

    let session = report.session;
    println!(
        "Playhead at {:.3}s ({})",
        session.current_time,
        if session.playing { "playing" } else { "stopped" }
    );
    if let Some((start, end)) = session.loop_region().active_range() {
        println!("Loop {start:.3}s - {end:.3}s");
    }
    println!("Zoom {:.3} ({:.1} px/s)", report.layout.zoom, report.layout.pixels_per_second);
    for lane in &report.layout.lanes {
        let flags = [
            (lane.muted, "muted"),
            (lane.solo, "solo"),
            (lane.selected, "selected"),
        ]
        .iter()
        .filter_map(|(set, name)| set.then_some(*name))
        .collect::<Vec<_>>()
        .join(", ");
        match &lane.clip {
            Some(clip) => println!(
                "  {:<16} {:>8.3}s + {:<8.3}s vol {:.2} [{flags}]",
                lane.name, clip.start_sec, clip.duration_sec, lane.volume
            ),
            None => println!("  {:<16} (empty) vol {:.2} [{flags}]", lane.name, lane.volume),
        }
    }
    Ok(())
}

fn execute_ruler(args: RulerArgs) -> Result<()> {
    if !(args.end >= args.start) {
        bail!("ruler end {} is before start {}", args.end, args.start);
    }
    if let Some(bpm) = args.bpm {
        if !(bpm > 0.0) {
            bail!("tempo must be positive, got {bpm}");
        }
    }
    for tick in ruler_ticks(args.start, args.end, args.bpm) {
        let marker = if tick.major { '|' } else { '\'' };
        match tick.label {
            Some(label) => println!("{:>10.3}s {marker} {label}", tick.time_sec),
            None => println!("{:>10.3}s {marker}", tick.time_sec),
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} is not a valid {what} file", path.display()))
}
