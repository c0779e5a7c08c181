//! Verse Watch - live game log classification into typed game state events.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use verse_watch::config::{ConfigError, ConfigLoader, WatchConfig};
use verse_watch::display;
use verse_watch::pipeline::{Emitted, Pipeline, PipelineError};
use verse_watch::watcher::{
    candidate_paths, find_log_file, LogTailer, LogWatcher, WatchEvent, WatcherError,
};

#[derive(Parser)]
#[command(
    name = "verse-watch",
    about = "Turn a live Game.log into typed game state events",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to .verse-watch.toml, then the user config dir).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the log and print events as they happen.
    Watch {
        /// Log file to watch instead of the discovered one.
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Poll interval in milliseconds.
        #[arg(long)]
        poll_ms: Option<u64>,
        /// Classify this many trailing lines of the existing file first.
        #[arg(long)]
        backfill: Option<usize>,
        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
        /// Do not truncate long values.
        #[arg(long)]
        raw: bool,
        /// Print unknown line snapshots when they are published.
        #[arg(long)]
        unknowns: bool,
    },
    /// Classify a whole file once and report unmatched line groups.
    Scan {
        file: PathBuf,
        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
        /// Do not truncate long values.
        #[arg(long)]
        raw: bool,
        /// Number of unknown groups to list.
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Show which recognizer patterns match a line.
    Explain { line: String },
    /// Print the discovered log path.
    Locate,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    #[error(transparent)]
    Pattern(#[from] PipelineError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<WatchConfig, ConfigError> {
    match path {
        Some(path) => ConfigLoader::with_path(path).load(),
        None => ConfigLoader::new().load(),
    }
}

fn print(emitted: &Emitted, json: bool, raw: bool) {
    if json {
        display::print_event_json(emitted);
    } else {
        display::print_event(emitted, raw);
    }
}

async fn watch(config: WatchConfig, json: bool, raw: bool, unknowns: bool) -> Result<(), AppError> {
    let (handle, mut events) = LogWatcher::spawn(config)?;
    let mut status = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping watcher");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if !json {
                    display::print_status(&current);
                }
            }
            event = events.recv() => match event {
                Some(WatchEvent::Game(emitted)) => print(&emitted, json, raw),
                Some(WatchEvent::Rotated(path)) => {
                    if !json {
                        display::print_rotated(&path);
                    }
                }
                Some(WatchEvent::Unknowns(snapshot)) => {
                    if unknowns && !json {
                        display::print_unknowns(&snapshot, 10, raw);
                    }
                }
                None => break,
            },
        }
    }

    handle.stop().await;
    Ok(())
}

async fn scan(config: &WatchConfig, file: PathBuf, json: bool, raw: bool, top: usize) -> Result<(), AppError> {
    let mut pipeline = Pipeline::new(config)?;
    let mut tailer = LogTailer::new(file).with_max_read(config.max_read_bytes);
    let mut matched = 0_u64;
    let mut total = 0_u64;

    loop {
        let batch = tailer.read_new_lines().await?;
        let mut lines = batch.lines;
        if batch.remaining == 0 {
            lines.extend(tailer.take_partial());
        }
        for line in &lines {
            let outcome = pipeline.process_line(&line.text, Instant::now());
            total += 1;
            if outcome.matched {
                matched += 1;
            }
            for emitted in &outcome.events {
                print(emitted, json, raw);
            }
        }
        if batch.remaining == 0 {
            break;
        }
    }

    tracing::info!(total, matched, faults = pipeline.faults(), "Scan complete");
    if !json {
        display::print_unknowns(&pipeline.unknown_snapshot(), top, raw);
    }
    Ok(())
}

fn explain(config: &WatchConfig, line: &str) -> Result<(), AppError> {
    let pipeline = Pipeline::new(config)?;
    display::print_explain(line, &pipeline.explain(line));
    Ok(())
}

fn locate() -> Result<(), AppError> {
    match find_log_file() {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(WatcherError::NotFound {
            searched: candidate_paths().len(),
        }
        .into()),
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = load_config(cli.config)?;

    match cli.command {
        Commands::Watch {
            path,
            poll_ms,
            backfill,
            json,
            raw,
            unknowns,
        } => {
            if path.is_some() {
                config.log_path = path;
            }
            if let Some(ms) = poll_ms {
                config.poll_interval_ms = ms;
            }
            if let Some(lines) = backfill {
                config.backfill_lines = lines;
            }
            tracing::info!(
                path = ?config.log_path,
                poll_ms = config.poll_interval_ms,
                custom_patterns = config.custom_patterns.len(),
                "Starting log watcher"
            );
            watch(config, json, raw, unknowns).await
        }
        Commands::Scan { file, json, raw, top } => scan(&config, file, json, raw, top).await,
        Commands::Explain { line } => explain(&config, &line),
        Commands::Locate => locate(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
