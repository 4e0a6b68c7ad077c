pub mod telemetry;

pub use telemetry::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock instant used for every timestamp in the engine.
pub type Timestamp = DateTime<Utc>;

/// Control axis of the azimuth thruster lever.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Thrust,
    Angle,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Thrust, Axis::Angle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Thrust => "thrust",
            Axis::Angle => "angle",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Axis::Thrust => 0,
            Axis::Angle => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a zone means to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// Recommended operating band (soft guidance)
    Advice,
    /// Undesirable operating band (stronger feedback)
    Caution,
    /// Hard containment range enforced by a wall
    Boundary,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 3] = [ZoneKind::Advice, ZoneKind::Caution, ZoneKind::Boundary];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Advice => "advice",
            ZoneKind::Caution => "caution",
            ZoneKind::Boundary => "boundary",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ZoneKind::Advice => 0,
            ZoneKind::Caution => 1,
            ZoneKind::Boundary => 2,
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-axis pair of values (thrust, angle).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerAxis<T> {
    pub thrust: T,
    pub angle: T,
}

impl<T> PerAxis<T> {
    pub fn new(thrust: T, angle: T) -> Self {
        Self { thrust, angle }
    }

    pub fn get(&self, axis: Axis) -> &T {
        match axis {
            Axis::Thrust => &self.thrust,
            Axis::Angle => &self.angle,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Thrust => &mut self.thrust,
            Axis::Angle => &mut self.angle,
        }
    }
}

/// Milliseconds elapsed from `earlier` to `later`, clamped at zero.
pub fn millis_between(earlier: Timestamp, later: Timestamp) -> i64 {
    later
        .signed_duration_since(earlier)
        .num_milliseconds()
        .max(0)
}
