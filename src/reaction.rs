use serde::{Deserialize, Serialize};

use crate::occupancy::{OccupancyTracker, ZoneEvent};
use crate::types::{Axis, Setpoint, TelemetrySample, Timestamp, ZoneKind};

/// One row of the reaction log. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub thrust: f64,
    pub angle: f64,
    pub reaction_time_ms: Option<i64>,
    pub exit_duration_ms: Option<i64>,
    pub alert_type: Option<ZoneKind>,
    pub axis: Option<Axis>,
    pub scenario: String,
}

/// Timestamps zone entry (T1), first operator response (T2) and exit (T3).
///
/// The operator has responded once the live lever position differs from
/// the commanded setpoint. Without a known setpoint, the position captured
/// at entry stands in for it.
#[derive(Clone, Debug, Default)]
pub struct EventLogger {
    entries: Vec<LogEntry>,
    setpoint: Option<Setpoint>,
    entry_reference: [[Option<Setpoint>; 3]; 2],
}

impl EventLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_setpoint(&mut self, setpoint: Setpoint) {
        self.setpoint = Some(setpoint);
    }

    pub fn setpoint(&self) -> Option<Setpoint> {
        self.setpoint
    }

    /// Stamp T2 on every active episode this sample counts as a response
    /// for. Call before the tracker sees the sample so the entry sample
    /// itself never counts.
    pub fn detect_responses(
        &mut self,
        tracker: &mut OccupancyTracker,
        sample: &TelemetrySample,
    ) -> usize {
        if let Some(setpoint) = sample.setpoint {
            self.setpoint = Some(setpoint);
        }

        let mut stamped = 0;
        for (axis, kind) in Axis::ALL
            .into_iter()
            .flat_map(|a| ZoneKind::ALL.into_iter().map(move |k| (a, k)))
        {
            let state = tracker.state(axis, kind);
            if !state.active || state.first_response_at.is_some() {
                continue;
            }
            let reference = self
                .setpoint
                .or(self.entry_reference[axis.index()][kind.index()]);
            let responded = match reference {
                Some(r) => sample.thrust != r.thrust || sample.angle != r.angle,
                None => false,
            };
            if responded && tracker.mark_response(axis, kind, sample.timestamp) {
                log::debug!("[LOGGER] {} {} response at {}", axis, kind, sample.timestamp);
                stamped += 1;
            }
        }
        stamped
    }

    /// Append log rows for this tick's transitions
    pub fn on_events(&mut self, events: &[ZoneEvent], sample: &TelemetrySample, scenario: &str) {
        for event in events {
            match *event {
                ZoneEvent::Entered { axis, kind, at, .. } => {
                    self.entry_reference[axis.index()][kind.index()] = Some(Setpoint {
                        thrust: sample.thrust,
                        angle: sample.angle,
                    });
                    // Boundary containment is itself the event of interest
                    if kind == ZoneKind::Boundary {
                        self.append(LogEntry {
                            timestamp: at,
                            thrust: sample.thrust,
                            angle: sample.angle,
                            reaction_time_ms: None,
                            exit_duration_ms: None,
                            alert_type: Some(kind),
                            axis: Some(axis),
                            scenario: scenario.to_string(),
                        });
                    }
                }
                ZoneEvent::Exited {
                    axis,
                    kind,
                    reaction_time_ms,
                    exit_duration_ms,
                    at,
                    ..
                } => {
                    self.entry_reference[axis.index()][kind.index()] = None;
                    self.append(LogEntry {
                        timestamp: at,
                        thrust: sample.thrust,
                        angle: sample.angle,
                        reaction_time_ms,
                        exit_duration_ms: Some(exit_duration_ms),
                        alert_type: Some(kind),
                        axis: Some(axis),
                        scenario: scenario.to_string(),
                    });
                }
            }
        }
    }

    fn append(&mut self, entry: LogEntry) {
        log::info!(
            "[LOGGER] {} {} reaction={:?}ms exit={:?}ms",
            entry.axis.map(|a| a.as_str()).unwrap_or("-"),
            entry.alert_type.map(|k| k.as_str()).unwrap_or("-"),
            entry.reaction_time_ms,
            entry.exit_duration_ms
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Hand the ordered batch over and start an empty one
    pub fn take_log(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Drop open-episode references. Appended rows are kept.
    pub fn reset_episodes(&mut self) {
        self.entry_reference = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::zones::{Zone, ZoneSet};
    use chrono::{Duration, TimeZone, Utc};

    fn t(ms: i64) -> Timestamp {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(ms)
    }

    fn zones() -> ZoneSet {
        ZoneSet::new(
            "logger",
            vec![
                Zone::advice(Axis::Thrust, 20.0, 50.0),
                Zone::boundary(Axis::Angle, -10.0, 10.0, 1),
            ],
        )
    }

    struct Rig {
        tracker: OccupancyTracker,
        logger: EventLogger,
        zones: ZoneSet,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                tracker: OccupancyTracker::new(),
                logger: EventLogger::new(),
                zones: zones(),
            }
        }

        fn feed(&mut self, sample: TelemetrySample) {
            self.logger.detect_responses(&mut self.tracker, &sample);
            let c = classify(&sample, &self.zones);
            let events = self.tracker.update(&c, sample.timestamp);
            self.logger.on_events(&events, &sample, "logger");
        }
    }

    #[test]
    fn test_reaction_against_entry_position() {
        let mut rig = Rig::new();
        rig.feed(TelemetrySample::new(25.0, 30.0, t(0)));
        rig.feed(TelemetrySample::new(25.0, 30.0, t(100)));
        rig.feed(TelemetrySample::new(27.0, 30.0, t(400)));
        rig.feed(TelemetrySample::new(55.0, 30.0, t(1000)));

        let log = rig.logger.entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].reaction_time_ms, Some(400));
        assert_eq!(log[0].exit_duration_ms, Some(1000));
        assert_eq!(log[0].alert_type, Some(ZoneKind::Advice));
        assert_eq!(log[0].axis, Some(Axis::Thrust));
        assert_eq!(log[0].thrust, 55.0);
    }

    #[test]
    fn test_reaction_against_setpoint() {
        let mut rig = Rig::new();
        rig.logger.set_setpoint(Setpoint {
            thrust: 25.0,
            angle: 30.0,
        });
        rig.feed(TelemetrySample::new(25.0, 30.0, t(0)));
        // Live value lags the setpoint: that is the response
        rig.feed(TelemetrySample::new(24.0, 30.0, t(200)));
        rig.feed(TelemetrySample::new(60.0, 30.0, t(500)));
        assert_eq!(rig.logger.entries()[0].reaction_time_ms, Some(200));
    }

    #[test]
    fn test_entry_sample_is_not_a_response() {
        let mut rig = Rig::new();
        rig.logger.set_setpoint(Setpoint {
            thrust: 0.0,
            angle: 30.0,
        });
        rig.feed(TelemetrySample::new(25.0, 30.0, t(0)));
        let state = rig.tracker.state(Axis::Thrust, ZoneKind::Advice);
        assert!(state.active);
        assert!(state.first_response_at.is_none());
    }

    #[test]
    fn test_no_response_logs_null_reaction() {
        let mut rig = Rig::new();
        rig.feed(TelemetrySample::new(25.0, 30.0, t(0)));
        rig.feed(TelemetrySample::new(25.0, 30.0, t(300)));
        rig.logger.set_setpoint(Setpoint {
            thrust: 70.0,
            angle: 30.0,
        });
        rig.feed(TelemetrySample::new(70.0, 30.0, t(600)));
        let entry = &rig.logger.entries()[0];
        assert_eq!(entry.reaction_time_ms, None);
        assert_eq!(entry.exit_duration_ms, Some(600));
    }

    #[test]
    fn test_boundary_logs_at_entry_and_exit() {
        let mut rig = Rig::new();
        rig.feed(TelemetrySample::new(0.0, 5.0, t(0)));
        assert_eq!(rig.logger.entries().len(), 1);
        assert_eq!(rig.logger.entries()[0].exit_duration_ms, None);
        assert_eq!(rig.logger.entries()[0].alert_type, Some(ZoneKind::Boundary));

        rig.feed(TelemetrySample::new(0.0, 8.0, t(100)));
        assert_eq!(rig.logger.entries().len(), 1);

        rig.feed(TelemetrySample::new(0.0, 20.0, t(300)));
        assert_eq!(rig.logger.entries().len(), 2);
        assert_eq!(rig.logger.entries()[1].exit_duration_ms, Some(300));
    }

    #[test]
    fn test_log_entry_field_names() {
        let entry = LogEntry {
            timestamp: t(0),
            thrust: 1.0,
            angle: 2.0,
            reaction_time_ms: None,
            exit_duration_ms: Some(5),
            alert_type: Some(ZoneKind::Caution),
            axis: Some(Axis::Angle),
            scenario: "s".into(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "alertType",
                "angle",
                "axis",
                "exitDurationMs",
                "reactionTimeMs",
                "scenario",
                "thrust",
                "timestamp"
            ]
        );
        assert_eq!(value["alertType"], "caution");
    }

    #[test]
    fn test_take_log_drains() {
        let mut rig = Rig::new();
        rig.feed(TelemetrySample::new(0.0, 5.0, t(0)));
        assert_eq!(rig.logger.take_log().len(), 1);
        assert!(rig.logger.entries().is_empty());
    }
}
