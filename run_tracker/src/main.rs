use std::{fs::OpenOptions, path::{Path, PathBuf}};

use clap::{Parser, Subcommand};
use run_tracker::{
    configuration::TrackerConfig,
    gpx_util,
    location::ReplayLocationSource,
    renderer::TracingRenderer,
    summary::summarize,
    RunController,
};
use run_tracker_lib::{
    accumulator::TrackSnapshot,
    format::{format_distance, format_pace, format_time},
    track::CompletedRun,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "run_tracker")]
#[command(about = "Track runs from a stream of GPS samples", long_about = None)]
struct Cli {
    /// Config file, defaults to config/run_tracker.conf when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a GPX track through a live run session, in real time
    Replay {
        gpx_file: PathBuf,
        /// Playback speed multiplier, overrides replay_speed from the config
        #[arg(long)]
        speed: Option<f64>,
        /// Write the recorded run to this GPX file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute distance, time and pace of a GPX track without waiting
    Summary {
        gpx_file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Serialize)]
struct RunReport<'a> {
    snapshot: TrackSnapshot,
    points: usize,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    distance: String,
    time: String,
    pace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a CompletedRun>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file.as_deref())?;

    let config = TrackerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay { gpx_file, speed, export, json } => {
            replay(&config, &gpx_file, speed, export.as_deref(), json).await
        },
        Commands::Summary { gpx_file, json } => {
            let samples = gpx_util::read_gpx(&gpx_file, config.default_accuracy)?;
            let (snapshot, run) = summarize(&samples, config.accumulator_settings());
            print_report(&config, snapshot, &run, json)
        },
        Commands::Config => {
            println!("{:#?}", config);
            Ok(())
        },
    }
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn replay(config: &TrackerConfig, gpx_file: &Path, speed: Option<f64>, export: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let samples = gpx_util::read_gpx(gpx_file, config.default_accuracy)?;
    tracing::info!("Replaying {} samples from {:?}", samples.len(), gpx_file);

    let source = ReplayLocationSource::new(samples, speed.unwrap_or(config.replay_speed));
    let finished = source.finished();

    let controller = RunController::spawn(source, TracingRenderer::new(), config.session_settings());
    controller.start().await?;

    let display = tokio::spawn(show_progress(controller.subscribe(), config.clone()));

    tokio::select! {
        _ = finished.notified() => tracing::info!("Replay complete"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, stopping run"),
    }

    // Samples still queued when the replay ends are part of the stopped run
    let run = controller.stop().await?;
    display.abort();
    controller.shutdown().await;

    let Some(run) = run else {
        anyhow::bail!("Run was not active when stopping");
    };

    if let Some(path) = export {
        let name = gpx_file.file_stem().and_then(|stem| stem.to_str()).unwrap_or("Run");
        gpx_util::write_gpx(&run, name, path)?;
        tracing::info!("Exported run to {:?}", path);
    }

    print_report(config, TrackSnapshot::of_run(&run), &run, json)
}

/// Logs the display values once per elapsed second, like the run screen.
async fn show_progress(mut snapshots: watch::Receiver<TrackSnapshot>, config: TrackerConfig) {
    let mut last_second = None;
    while snapshots.changed().await.is_ok() {
        let snapshot = *snapshots.borrow_and_update();
        if last_second == Some(snapshot.elapsed_seconds) {
            continue;
        }
        last_second = Some(snapshot.elapsed_seconds);

        tracing::info!(
            "Distance: {}  Time: {}  Pace: {}",
            format_distance(snapshot.distance_meters, config.distance_unit),
            format_time(snapshot.elapsed_seconds),
            format_pace(snapshot.pace, config.pace_unit)
        );
    }
}

fn print_report(config: &TrackerConfig, snapshot: TrackSnapshot, run: &CompletedRun, json: bool) -> anyhow::Result<()> {
    let report = RunReport {
        snapshot,
        points: run.path.len(),
        started_at: run.started_at,
        distance: format_distance(snapshot.distance_meters, config.distance_unit),
        time: format_time(snapshot.elapsed_seconds),
        pace: format_pace(snapshot.pace, config.pace_unit),
        path: json.then_some(run),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Points:    {}", report.points);
        println!("Distance:  {}", report.distance);
        println!("Time:      {}", report.time);
        println!("Pace:      {}", report.pace);
    }

    Ok(())
}
