use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::Timestamp;
use crate::error::TelemetryError;

/// Telemetry frame as it arrives from the controller bridge.
///
/// Only the thruster position fields are required; everything else the
/// bridge sends along (rpm, heading, fuel...) is kept in `extra` and ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawTelemetry {
    pub position_pri: Option<f64>,
    pub position_sec: Option<f64>,
    #[serde(default)]
    pub pos_setpoint_pri: Option<f64>,
    #[serde(default)]
    pub pos_setpoint_sec: Option<f64>,
    /// Epoch milliseconds stamped by the bridge, if any
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Operator's commanded lever position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    pub thrust: f64,
    pub angle: f64,
}

/// A validated telemetry sample. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySample {
    pub thrust: f64,
    pub angle: f64,
    pub timestamp: Timestamp,
    pub setpoint: Option<Setpoint>,
}

impl TelemetrySample {
    pub fn new(thrust: f64, angle: f64, timestamp: Timestamp) -> Self {
        Self {
            thrust,
            angle,
            timestamp,
            setpoint: None,
        }
    }

    pub fn with_setpoint(mut self, setpoint: Setpoint) -> Self {
        self.setpoint = Some(setpoint);
        self
    }

    /// Validate a raw frame. `received_at` is used when the frame carries no
    /// timestamp of its own.
    pub fn from_raw(raw: &RawTelemetry, received_at: Timestamp) -> Result<Self, TelemetryError> {
        let thrust = finite_field("position_pri", raw.position_pri)?;
        let angle = finite_field("position_sec", raw.position_sec)?;

        let timestamp = match raw.timestamp {
            Some(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or(TelemetryError::InvalidTimestamp(ms))?,
            None => received_at,
        };

        // Setpoints are optional, but a half-present or non-finite pair is ignored
        let setpoint = match (raw.pos_setpoint_pri, raw.pos_setpoint_sec) {
            (Some(t), Some(a)) if t.is_finite() && a.is_finite() => Some(Setpoint {
                thrust: t,
                angle: a,
            }),
            _ => None,
        };

        Ok(Self {
            thrust,
            angle,
            timestamp,
            setpoint,
        })
    }
}

fn finite_field(name: &'static str, value: Option<f64>) -> Result<f64, TelemetryError> {
    match value {
        None => Err(TelemetryError::MissingField(name)),
        Some(v) if !v.is_finite() => Err(TelemetryError::NonFinite(name)),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_parse_bridge_frame() {
        let raw: RawTelemetry = serde_json::from_str(
            r#"{"position_pri": 25.0, "position_sec": -10.5, "rpm": 900, "heading": 90}"#,
        )
        .unwrap();
        let sample = TelemetrySample::from_raw(&raw, now()).unwrap();
        assert_eq!(sample.thrust, 25.0);
        assert_eq!(sample.angle, -10.5);
        assert_eq!(sample.timestamp, now());
        assert!(sample.setpoint.is_none());
        assert!(raw.extra.contains_key("rpm"));
    }

    #[test]
    fn test_missing_field_rejected() {
        let raw: RawTelemetry = serde_json::from_str(r#"{"position_pri": 25.0}"#).unwrap();
        assert_eq!(
            TelemetrySample::from_raw(&raw, now()),
            Err(TelemetryError::MissingField("position_sec"))
        );
    }

    #[test]
    fn test_nan_rejected() {
        let raw = RawTelemetry {
            position_pri: Some(f64::NAN),
            position_sec: Some(0.0),
            ..Default::default()
        };
        assert_eq!(
            TelemetrySample::from_raw(&raw, now()),
            Err(TelemetryError::NonFinite("position_pri"))
        );
    }

    #[test]
    fn test_frame_timestamp_and_setpoint() {
        let raw: RawTelemetry = serde_json::from_str(
            r#"{"position_pri": 1, "position_sec": 2, "pos_setpoint_pri": 3, "pos_setpoint_sec": 4, "timestamp": 1000}"#,
        )
        .unwrap();
        let sample = TelemetrySample::from_raw(&raw, now()).unwrap();
        assert_eq!(sample.timestamp.timestamp_millis(), 1000);
        assert_eq!(
            sample.setpoint,
            Some(Setpoint {
                thrust: 3.0,
                angle: 4.0
            })
        );
    }
}
