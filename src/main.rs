use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tokio::time::Duration;

use haptic_helm::config::StationConfig;
use haptic_helm::engine::HapticEngine;
use haptic_helm::health::{telemetry_health_task, TelemetryHealth};
use haptic_helm::server::{start_server, AppState};

#[derive(Parser, Debug)]
#[command(name = "haptic_helm")]
#[command(about = "Operator station: alert zones in, haptic commands out", long_about = None)]
struct Args {
    /// Port to serve the bridge socket and control API on
    #[arg(long, default_value = "8090")]
    port: u16,

    /// Station config (JSON). Missing file means built-in defaults
    #[arg(long, default_value = "haptic_helm.json")]
    config: PathBuf,

    /// Scenario to start on (overrides the config file)
    #[arg(long)]
    scenario: Option<String>,

    /// Where session CSV exports and live_status.json go
    #[arg(long, default_value = "haptic_sessions")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = StationConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let scenario = args
        .scenario
        .clone()
        .unwrap_or_else(|| config.default_scenario.clone());
    let catalog = config.catalog()?;

    log::info!("Haptic Helm starting");
    log::info!("  Scenario: {}", scenario);
    log::info!(
        "  Scenarios available: {}",
        catalog.scenarios().collect::<Vec<_>>().join(", ")
    );
    log::info!("  Output Dir: {}", args.output_dir.display());

    std::fs::create_dir_all(&args.output_dir)?;

    let engine = HapticEngine::new(catalog, config.feedback.clone(), &scenario, Utc::now())?;
    let health = TelemetryHealth::new(config.telemetry_silence_secs);
    tokio::spawn(telemetry_health_task(health.clone(), Duration::from_secs(2)));

    let state = AppState::new(engine, health, args.output_dir);
    start_server(state, args.port).await
}
