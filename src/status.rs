use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::HapticEngine;
use crate::health::HealthReport;
use crate::types::{Axis, ZoneKind};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    pub scenario: String,
    pub zone_set_version: u64,
    pub ready: bool,
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub zone_events: u64,
    pub commands_emitted: u64,
    pub commands_sent: u64,
    pub commands_failed: u64,
    pub log_entries: usize,
    // Occupancy, as "<axis>:<kind>"
    pub active_zones: Vec<String>,
    pub thrust_zone_type: Option<ZoneKind>,
    pub angle_zone_type: Option<ZoneKind>,
    // Health monitoring
    pub telemetry_seen: bool,
    pub telemetry_healthy: bool,
    pub telemetry_silence_secs: f64,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            ..Self::default()
        }
    }

    /// Snapshot the engine. Dispatch counters are filled in by the caller
    /// that owns the dispatcher.
    pub fn capture(engine: &HapticEngine, health: &HealthReport, uptime_seconds: u64) -> Self {
        let stats = engine.stats();
        let classification = engine.last_classification();
        Self {
            timestamp: current_timestamp(),
            uptime_seconds,
            scenario: stats.scenario,
            zone_set_version: stats.zone_set_version,
            ready: stats.ready,
            samples_accepted: stats.samples_accepted,
            samples_rejected: stats.samples_rejected,
            zone_events: stats.zone_events,
            commands_emitted: stats.commands_emitted,
            commands_sent: 0,
            commands_failed: 0,
            log_entries: stats.log_entries,
            active_zones: engine
                .tracker()
                .active_pairs()
                .map(|(axis, kind)| format!("{}:{}", axis, kind))
                .collect(),
            thrust_zone_type: classification.axis(Axis::Thrust).zone_type,
            angle_zone_type: classification.axis(Axis::Angle).zone_type,
            telemetry_seen: health.telemetry_seen,
            telemetry_healthy: health.telemetry_healthy,
            telemetry_silence_secs: health.silence_duration_secs,
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
