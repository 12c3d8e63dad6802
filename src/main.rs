//! HomeScout - BLE tracker classification service
//!
//! ## Usage
//!
//! ```bash
//! # Track sightings piped from the simulator
//! simulation | homescout run --stdin --exit-on-eof
//!
//! # Replay a recording into an ephemeral store
//! homescout run --replay walk.jsonl --in-memory
//!
//! # One-shot evaluation of the persisted store
//! homescout evaluate
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use homescout::config::defaults::DEFAULT_REPLAY_DELAY_MS;
use homescout::config::watcher::run_config_watcher;
use homescout::config::{ConfigEvent, PreferenceSource, ScoutConfig, SharedPreferences};
use homescout::pipeline::{
    run_ingest, ClassificationScheduler, CycleOutcome, EventSink, FanoutSink, JsonLinesSink,
    LogSink, RecordingSink, ReplaySource, SightingSource, StdinSource,
};
use homescout::storage::{InMemorySightingStore, SightingStore, SledSightingStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "homescout")]
#[command(about = "HomeScout BLE tracker classification engine")]
#[command(version)]
struct CliArgs {
    /// Config file (default: $HOMESCOUT_CONFIG, then ./homescout.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Start tracking and ingest sightings until Ctrl+C
    Run {
        /// Read JSON sightings from stdin, one per line
        /// Use with simulator: simulation | homescout run --stdin
        #[arg(long, conflicts_with = "replay")]
        stdin: bool,

        /// Replay a JSONL recording of sightings
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,

        /// Delay between replayed sightings (ms)
        #[arg(long, default_value_t = DEFAULT_REPLAY_DELAY_MS)]
        replay_delay_ms: u64,

        /// Keep sightings in memory instead of the sled store
        #[arg(long)]
        in_memory: bool,

        /// Stop once the input is exhausted
        #[arg(long)]
        exit_on_eof: bool,

        /// Override scheduler.interval_secs
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Run one classification cycle against the store and print detections as JSON
    Evaluate,

    /// Delete every stored sighting
    Clear,
}

// ============================================================================
// Setup helpers
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs on stderr so stdout stays clean for JSON output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(explicit: Option<&Path>) -> Result<(ScoutConfig, Option<PathBuf>)> {
    match explicit {
        Some(path) => {
            let config = ScoutConfig::load_from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            info!(path = %path.display(), "Loaded config");
            Ok((config, Some(path.to_path_buf())))
        }
        None => Ok((ScoutConfig::load(), ScoutConfig::resolve_path())),
    }
}

fn open_sled(config: &ScoutConfig) -> Result<SledSightingStore> {
    let path = &config.storage.path;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    SledSightingStore::open(path).with_context(|| format!("opening store {}", path.display()))
}

fn build_sink(config: &ScoutConfig) -> Result<FanoutSink> {
    let mut sink = FanoutSink::new().with(LogSink);
    if let Some(path) = &config.sink.jsonl_path {
        let file_sink = JsonLinesSink::open(path)
            .with_context(|| format!("opening event file {}", path.display()))?;
        info!(path = %path.display(), "Appending detections as JSON lines");
        sink = sink.with(file_sink);
    }
    Ok(sink)
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_tracking(
    config: ScoutConfig,
    config_path: Option<PathBuf>,
    source: Option<Box<dyn SightingSource>>,
    in_memory: bool,
    exit_on_eof: bool,
) -> Result<()> {
    let sled = if in_memory {
        None
    } else {
        Some(open_sled(&config)?)
    };
    let store: Arc<dyn SightingStore> = match &sled {
        Some(s) => Arc::new(s.clone()),
        None => Arc::new(InMemorySightingStore::new()),
    };

    if config.storage.clear_on_start {
        store.clear_all().context("clearing store on start")?;
    }

    let prefs = Arc::new(SharedPreferences::new(config.tracking));
    if let Err(reason) = prefs.current().complete() {
        warn!(%reason, "Classification paused until tracking preferences are set");
    }

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, shutting down");
        shutdown_token.cancel();
    });

    if let Some(path) = config_path {
        let (tx, mut rx) = mpsc::channel::<ConfigEvent>(8);
        tokio::spawn(run_config_watcher(
            path,
            Arc::clone(&prefs),
            tx,
            cancel_token.child_token(),
        ));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(?event, "Config watcher event");
            }
        });
    }

    let scheduler = ClassificationScheduler::new(
        Arc::clone(&store),
        prefs,
        Arc::new(build_sink(&config)?),
        Duration::from_secs(config.scheduler.interval_secs),
    );
    scheduler.start_tracking().await;

    match source {
        Some(mut source) => {
            let stats = run_ingest(source.as_mut(), Arc::clone(&store), cancel_token.clone()).await;
            if exit_on_eof {
                // One last pass over everything ingested
                if let Err(e) = scheduler.run_once().await {
                    warn!(error = %e, "Final classification cycle failed");
                }
            } else if !cancel_token.is_cancelled() {
                info!(stored = stats.stored, "Input exhausted, tracking continues until Ctrl+C");
                cancel_token.cancelled().await;
            }
        }
        None => cancel_token.cancelled().await,
    }

    scheduler.stop_tracking().await?;
    cancel_token.cancel();

    let stats = scheduler.stats();
    info!(
        cycles = stats.cycles_completed,
        skipped = stats.cycles_skipped,
        failed = stats.cycles_failed,
        detections = stats.detections,
        "Tracking session summary"
    );

    if let Some(sled) = sled {
        sled.flush().context("flushing store")?;
    }
    Ok(())
}

async fn run_evaluate(config: ScoutConfig) -> Result<()> {
    let store: Arc<dyn SightingStore> = Arc::new(open_sled(&config)?);
    let recorder = Arc::new(RecordingSink::new());

    let scheduler = ClassificationScheduler::new(
        store,
        Arc::new(SharedPreferences::new(config.tracking)),
        Arc::clone(&recorder) as Arc<dyn EventSink>,
        Duration::from_secs(config.scheduler.interval_secs),
    );

    match scheduler.run_once().await? {
        CycleOutcome::Completed(report) => {
            for event in recorder.drain() {
                println!("{}", serde_json::to_string(&event)?);
            }
            info!(
                sightings = report.sightings,
                groups = report.groups,
                detections = report.detections,
                "Evaluation complete"
            );
        }
        CycleOutcome::Skipped { reason, .. } => {
            warn!(%reason, "Evaluation skipped");
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let (config, config_path) = load_config(args.config.as_deref())?;

    match args.command {
        SubCommand::Run {
            stdin,
            replay,
            replay_delay_ms,
            in_memory,
            exit_on_eof,
            interval_secs,
        } => {
            let mut config = config;
            if let Some(secs) = interval_secs {
                config.scheduler.interval_secs = secs;
                config.validate()?;
            }

            let source: Option<Box<dyn SightingSource>> = if stdin {
                info!("Input: stdin (JSON sightings)");
                Some(Box::new(StdinSource::new()))
            } else if let Some(path) = replay {
                info!(path = %path.display(), "Input: replay");
                Some(Box::new(ReplaySource::from_jsonl_file(&path, replay_delay_ms)?))
            } else {
                info!("Input: none (waiting for Ctrl+C)");
                None
            };

            run_tracking(config, config_path, source, in_memory, exit_on_eof).await
        }
        SubCommand::Evaluate => run_evaluate(config).await,
        SubCommand::Clear => {
            let store = open_sled(&config)?;
            let removed = store.count();
            store.clear_all()?;
            info!(removed, "Store cleared");
            Ok(())
        }
    }
}
