use serde::Serialize;

use crate::classifier::{classify, Classification};
use crate::config::FeedbackConfig;
use crate::dispatch::HapticCommand;
use crate::error::{ConfigResult, TelemetryError};
use crate::export::SessionExport;
use crate::feedback::{BoundaryController, DetentController, FrictionController, VibrationController};
use crate::occupancy::{OccupancyTracker, ZoneEvent};
use crate::reaction::{EventLogger, LogEntry};
use crate::types::{RawTelemetry, Setpoint, TelemetrySample, Timestamp};
use crate::zones::{ScenarioCatalog, ZoneSet};

/// Counters exposed through the status endpoint
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EngineStats {
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub zone_events: u64,
    pub commands_emitted: u64,
    pub log_entries: usize,
    pub ready: bool,
    pub scenario: String,
    pub zone_set_version: u64,
}

/// Alert-zone and haptic-feedback coordination engine.
///
/// Driven synchronously, one sample at a time in arrival order. Every
/// controller and the logger see the same transitions before the next
/// sample is looked at. Commands are returned, not sent.
pub struct HapticEngine {
    catalog: ScenarioCatalog,
    zones: ZoneSet,
    /// Bumped on every scenario switch and on every effective reload
    version: u64,
    configured_version: Option<u64>,
    /// At least one valid sample has arrived
    ready: bool,
    tracker: OccupancyTracker,
    vibration: VibrationController,
    friction: FrictionController,
    detent: DetentController,
    boundary: BoundaryController,
    logger: EventLogger,
    session_started_at: Timestamp,
    last_classification: Classification,
    stats: EngineStats,
}

impl HapticEngine {
    pub fn new(
        catalog: ScenarioCatalog,
        feedback: FeedbackConfig,
        scenario: &str,
        now: Timestamp,
    ) -> ConfigResult<Self> {
        let zones = catalog.get(scenario)?.clone();
        log::info!(
            "[ZONE] Engine starting on scenario {} ({} zones)",
            zones.scenario,
            zones.zones.len()
        );

        Ok(Self {
            catalog,
            zones,
            version: 1,
            configured_version: None,
            ready: false,
            tracker: OccupancyTracker::new(),
            vibration: VibrationController::new(feedback.vibration),
            friction: FrictionController::new(feedback.friction),
            detent: DetentController::new(feedback.detent),
            boundary: BoundaryController::new(feedback.boundary),
            logger: EventLogger::new(),
            session_started_at: now,
            last_classification: Classification::default(),
            stats: EngineStats::default(),
        })
    }

    /// Validate and process one inbound frame. Malformed frames only bump a
    /// counter; pending decay still fires.
    pub fn process(&mut self, raw: &RawTelemetry, received_at: Timestamp) -> Vec<HapticCommand> {
        match TelemetrySample::from_raw(raw, received_at) {
            Ok(sample) => self.process_sample(&sample),
            Err(e) => {
                self.reject(&e);
                self.fire_due(received_at)
            }
        }
    }

    /// Parse and process a JSON text frame
    pub fn process_json(&mut self, text: &str, received_at: Timestamp) -> Vec<HapticCommand> {
        match serde_json::from_str::<RawTelemetry>(text) {
            Ok(raw) => self.process(&raw, received_at),
            Err(e) => {
                self.reject(&TelemetryError::Malformed(e.to_string()));
                self.fire_due(received_at)
            }
        }
    }

    pub fn process_sample(&mut self, sample: &TelemetrySample) -> Vec<HapticCommand> {
        let mut out = Vec::new();
        let now = sample.timestamp;

        // A decay that came due before this sample goes out first
        self.vibration.fire_due(now, &mut out);

        if !self.ready {
            log::info!("[ZONE] Telemetry ready (first valid sample)");
            self.ready = true;
        }
        self.configure(&mut out);

        let classification = classify(sample, &self.zones);
        self.logger.detect_responses(&mut self.tracker, sample);
        let events = self.tracker.update(&classification, now);
        for event in &events {
            log_event(event);
        }

        self.vibration.on_sample(&classification, now, &mut out);
        self.friction.on_events(&events, &mut out);
        self.logger.on_events(&events, sample, &self.zones.scenario);

        self.last_classification = classification;
        self.stats.samples_accepted += 1;
        self.stats.zone_events += events.len() as u64;
        self.stats.commands_emitted += out.len() as u64;
        out
    }

    /// Atomically replace the active zone set with another scenario's.
    ///
    /// Open episodes are discarded without log rows and every channel is
    /// re-armed; `clear_haptics` precedes any new detent or boundary.
    pub fn switch_scenario(&mut self, scenario: &str) -> ConfigResult<Vec<HapticCommand>> {
        let zones = self.catalog.get(scenario)?.clone();
        log::info!("[ZONE] Switching scenario {} -> {}", self.zones.scenario, zones.scenario);

        self.tracker.reset();
        self.logger.reset_episodes();
        self.vibration.reset();
        self.friction.reset();
        self.detent.reset();
        self.boundary.reset();
        self.last_classification = Classification::default();

        self.zones = zones;
        self.bump_version();

        let mut out = vec![HapticCommand::ClearHaptics];
        if self.ready {
            self.configure(&mut out);
        }
        self.stats.commands_emitted += out.len() as u64;
        Ok(out)
    }

    /// Replace the zones of the active scenario. A structurally identical
    /// set is a no-op.
    pub fn reload_zones(&mut self, zones: ZoneSet) -> ConfigResult<Vec<HapticCommand>> {
        let mut zones = zones;
        zones.scenario = self.zones.scenario.clone();
        let zones = zones.validated()?;

        if zones == self.zones {
            log::debug!("[ZONE] Reload of {} is unchanged", zones.scenario);
            return Ok(Vec::new());
        }

        log::info!("[ZONE] Reloaded {} ({} zones)", zones.scenario, zones.zones.len());
        self.catalog.insert(zones.clone())?;
        self.zones = zones;
        self.bump_version();

        let mut out = Vec::new();
        if self.ready {
            self.configure(&mut out);
        }
        self.stats.commands_emitted += out.len() as u64;
        Ok(out)
    }

    /// Commands due from scheduled tasks at `now`
    pub fn fire_due(&mut self, now: Timestamp) -> Vec<HapticCommand> {
        let mut out = Vec::new();
        self.vibration.fire_due(now, &mut out);
        self.stats.commands_emitted += out.len() as u64;
        out
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.vibration.next_deadline()
    }

    pub fn set_setpoint(&mut self, setpoint: Setpoint) {
        self.logger.set_setpoint(setpoint);
    }

    /// Throw away the current batch and start logging afresh
    pub fn start_session(&mut self, now: Timestamp) {
        let dropped = self.logger.take_log().len();
        if dropped > 0 {
            log::warn!("[LOGGER] New session discards {} unexported entries", dropped);
        }
        self.session_started_at = now;
    }

    /// Close the session and hand over its ordered log
    pub fn end_session(&mut self, now: Timestamp) -> SessionExport {
        let export = SessionExport {
            scenario: self.zones.scenario.clone(),
            started_at: self.session_started_at,
            ended_at: now,
            entries: self.logger.take_log(),
        };
        self.session_started_at = now;
        export
    }

    /// The open session as it stands, without draining it
    pub fn session_snapshot(&self, now: Timestamp) -> SessionExport {
        SessionExport {
            scenario: self.zones.scenario.clone(),
            started_at: self.session_started_at,
            ended_at: now,
            entries: self.logger.entries().to_vec(),
        }
    }

    pub fn log(&self) -> &[LogEntry] {
        self.logger.entries()
    }

    pub fn take_log(&mut self) -> Vec<LogEntry> {
        self.logger.take_log()
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    pub fn scenario(&self) -> &str {
        &self.zones.scenario
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn tracker(&self) -> &OccupancyTracker {
        &self.tracker
    }

    pub fn last_classification(&self) -> &Classification {
        &self.last_classification
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            log_entries: self.logger.entries().len(),
            ready: self.ready,
            scenario: self.zones.scenario.clone(),
            zone_set_version: self.version,
            ..self.stats.clone()
        }
    }

    fn bump_version(&mut self) {
        self.version += 1;
        self.configured_version = None;
    }

    /// Config-driven channels, once per zone-set version
    fn configure(&mut self, out: &mut Vec<HapticCommand>) {
        if self.configured_version == Some(self.version) {
            return;
        }
        self.configured_version = Some(self.version);
        self.detent.on_zone_set(&self.zones, self.version, out);
        self.boundary.on_zone_set(&self.zones, out);
    }

    fn reject(&mut self, error: &TelemetryError) {
        self.stats.samples_rejected += 1;
        log::debug!("[ZONE] Rejected telemetry frame: {}", error);
    }
}

fn log_event(event: &ZoneEvent) {
    match event {
        ZoneEvent::Entered { axis, kind, .. } => {
            log::info!("[ZONE] {} entered {} zone", axis, kind);
        }
        ZoneEvent::Exited {
            axis,
            kind,
            exit_duration_ms,
            ..
        } => {
            log::info!("[ZONE] {} left {} zone after {}ms", axis, kind, exit_duration_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Axis, ZoneKind};
    use crate::zones::Zone;
    use chrono::{Duration, TimeZone, Utc};

    fn t(ms: i64) -> Timestamp {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(ms)
    }

    fn engine() -> HapticEngine {
        HapticEngine::new(ScenarioCatalog::builtin(), FeedbackConfig::default(), "default", t(0))
            .unwrap()
    }

    #[test]
    fn test_unknown_start_scenario() {
        let result = HapticEngine::new(
            ScenarioCatalog::builtin(),
            FeedbackConfig::default(),
            "nope",
            t(0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejected_frames_do_not_advance() {
        let mut engine = engine();
        let out = engine.process_json(r#"{"position_pri": 25}"#, t(0));
        assert!(out.is_empty());
        let out = engine.process_json("not json", t(10));
        assert!(out.is_empty());
        assert!(!engine.is_ready());
        assert_eq!(engine.stats().samples_rejected, 2);
        assert_eq!(engine.tracker().active_pairs().count(), 0);
    }

    #[test]
    fn test_first_sample_configures_detents_once() {
        let mut engine = engine();
        let out = engine.process_sample(&TelemetrySample::new(0.0, 0.0, t(0)));
        let detents: Vec<_> = out
            .iter()
            .filter(|c| matches!(c, HapticCommand::SetDetents { .. }))
            .collect();
        assert_eq!(detents.len(), 2);

        let out = engine.process_sample(&TelemetrySample::new(0.0, 0.0, t(100)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_switch_before_ready_only_clears() {
        let mut engine = engine();
        let out = engine.switch_scenario("maintain-speed").unwrap();
        assert_eq!(out, vec![HapticCommand::ClearHaptics]);
        assert_eq!(engine.scenario(), "maintain-speed");
    }

    #[test]
    fn test_unknown_switch_leaves_engine_untouched() {
        let mut engine = engine();
        engine.process_sample(&TelemetrySample::new(25.0, 0.0, t(0)));
        assert!(engine.switch_scenario("nope").is_err());
        assert_eq!(engine.scenario(), "default");
        assert!(engine.tracker().is_active(Axis::Thrust, ZoneKind::Advice));
    }

    #[test]
    fn test_reload_identical_is_noop() {
        let mut engine = engine();
        engine.process_sample(&TelemetrySample::new(0.0, 0.0, t(0)));
        let same = engine.zones().clone();
        assert!(engine.reload_zones(same).unwrap().is_empty());
        assert_eq!(engine.stats().zone_set_version, 1);
    }

    #[test]
    fn test_reload_changed_resends_detents() {
        let mut engine = engine();
        engine.process_sample(&TelemetrySample::new(0.0, 0.0, t(0)));
        let mut changed = engine.zones().clone();
        changed.zones.push(Zone::advice(Axis::Angle, -5.0, 5.0));
        let out = engine.reload_zones(changed).unwrap();
        assert!(out
            .iter()
            .any(|c| matches!(c, HapticCommand::SetDetents { axis: Axis::Angle, .. })));
        assert!(!out.contains(&HapticCommand::ClearHaptics));
        assert_eq!(engine.stats().zone_set_version, 2);
    }

    #[test]
    fn test_end_session_drains_log() {
        let mut engine = engine();
        engine.process_sample(&TelemetrySample::new(25.0, 0.0, t(0)));
        engine.process_sample(&TelemetrySample::new(55.0, 0.0, t(500)));

        let export = engine.end_session(t(1000));
        assert_eq!(export.scenario, "default");
        assert_eq!(export.started_at, t(0));
        assert_eq!(export.entries.len(), 1);
        assert!(engine.log().is_empty());
    }
}
