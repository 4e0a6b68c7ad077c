use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use flate2::read::GzDecoder;
use serde::Deserialize;

use haptic_helm::config::StationConfig;
use haptic_helm::dispatch::{Dispatcher, RecordingSink};
use haptic_helm::engine::HapticEngine;
use haptic_helm::types::{RawTelemetry, Timestamp};

#[derive(Parser, Debug)]
struct Args {
    /// Recorded telemetry, *.json or *.json.gz
    #[arg(long)]
    log: PathBuf,

    /// Scenario to replay against (defaults to the config's)
    #[arg(long)]
    scenario: Option<String>,

    /// Station config (JSON). Missing file means built-in defaults
    #[arg(long, default_value = "haptic_helm.json")]
    config: PathBuf,

    /// Where the session CSV is written
    #[arg(long, default_value = "haptic_sessions")]
    output_dir: PathBuf,

    /// Frame spacing for frames without a timestamp
    #[arg(long, default_value = "50")]
    frame_interval_ms: i64,
}

/// Either a bare array of frames or `{"frames": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum LogFile {
    Frames(Vec<RawTelemetry>),
    Wrapped { frames: Vec<RawTelemetry> },
}

impl LogFile {
    fn into_frames(self) -> Vec<RawTelemetry> {
        match self {
            LogFile::Frames(frames) | LogFile::Wrapped { frames } => frames,
        }
    }
}

fn load_log(path: &Path) -> anyhow::Result<Vec<RawTelemetry>> {
    let file = File::open(path)?;
    let log: LogFile = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        serde_json::from_reader(BufReader::new(gz))?
    } else {
        serde_json::from_reader(BufReader::new(file))?
    };
    Ok(log.into_frames())
}

fn print_commands(at: Timestamp, commands: &[haptic_helm::HapticCommand]) -> anyhow::Result<()> {
    for command in commands {
        println!("{} {}", at.to_rfc3339(), command.to_json()?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = StationConfig::load(&args.config)?;
    let scenario = args
        .scenario
        .clone()
        .unwrap_or_else(|| config.default_scenario.clone());
    let frames = load_log(&args.log).with_context(|| format!("reading {}", args.log.display()))?;
    log::info!("[REPLAY] {} frames from {}", frames.len(), args.log.display());

    let start = Utc::now();
    let mut engine = HapticEngine::new(config.catalog()?, config.feedback.clone(), &scenario, start)?;
    let mut dispatcher = Dispatcher::new(RecordingSink::default());

    let mut clock = start;
    for (i, frame) in frames.iter().enumerate() {
        // Untimed frames advance a synthetic clock
        let received_at = start + Duration::milliseconds(args.frame_interval_ms * i as i64);
        clock = frame
            .timestamp
            .and_then(chrono::DateTime::from_timestamp_millis)
            .unwrap_or(received_at);

        let commands = engine.process(frame, received_at);
        print_commands(clock, &commands)?;
        dispatcher.dispatch_all(&commands);
    }

    // Let a pending decay run out
    if let Some(deadline) = engine.next_deadline() {
        let commands = engine.fire_due(deadline.max(clock));
        print_commands(deadline, &commands)?;
        dispatcher.dispatch_all(&commands);
    }

    let stats = engine.stats();
    let export = engine.end_session(clock);
    let path = export.write_to_dir(&args.output_dir)?;

    log::info!(
        "[REPLAY] accepted={} rejected={} commands={} log entries={}",
        stats.samples_accepted,
        stats.samples_rejected,
        dispatcher.sent_count(),
        export.entries.len()
    );
    println!("Session log written to {}", path.display());
    Ok(())
}
