use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Axis, ZoneKind};

/// Maximum number of boundary definitions in a single zone set
pub const MAX_BOUNDARIES: usize = 64;

/// Scenario used when nothing else is selected
pub const DEFAULT_SCENARIO: &str = "default";

/// One interval on one axis. The range test is inclusive at both ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub axis: Axis,
    pub lower: f64,
    pub upper: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Wall stiffness (1-3), boundaries only
    #[serde(default = "default_boundary_strength")]
    pub strength: u8,
}

fn default_enabled() -> bool {
    true
}

fn default_boundary_strength() -> u8 {
    1
}

impl Zone {
    pub fn new(kind: ZoneKind, axis: Axis, lower: f64, upper: f64) -> Self {
        Self {
            kind,
            axis,
            lower,
            upper,
            enabled: true,
            strength: default_boundary_strength(),
        }
    }

    pub fn advice(axis: Axis, lower: f64, upper: f64) -> Self {
        Self::new(ZoneKind::Advice, axis, lower, upper)
    }

    pub fn caution(axis: Axis, lower: f64, upper: f64) -> Self {
        Self::new(ZoneKind::Caution, axis, lower, upper)
    }

    pub fn boundary(axis: Axis, lower: f64, upper: f64, strength: u8) -> Self {
        Self {
            strength,
            ..Self::new(ZoneKind::Boundary, axis, lower, upper)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.enabled && self.lower <= value && value <= self.upper
    }
}

/// The zones of one scenario, in definition order.
///
/// Compared structurally: two sets with the same zones are equal no matter
/// where they came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneSet {
    pub scenario: String,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

impl ZoneSet {
    pub fn new(scenario: impl Into<String>, zones: Vec<Zone>) -> Self {
        Self {
            scenario: scenario.into(),
            zones,
        }
    }

    pub fn empty(scenario: impl Into<String>) -> Self {
        Self::new(scenario, Vec::new())
    }

    pub fn boundaries(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.kind == ZoneKind::Boundary)
    }

    pub fn on_axis(&self, axis: Axis) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.axis == axis)
    }

    /// Repair what can be repaired and reject what cannot.
    ///
    /// Reversed intervals are swapped, boundary strengths are clamped into
    /// 1-3 and zones with non-finite bounds are dropped. Only an oversized
    /// boundary list is an error.
    pub fn validated(mut self) -> ConfigResult<Self> {
        let scenario = self.scenario.clone();
        self.zones.retain(|z| {
            let finite = z.lower.is_finite() && z.upper.is_finite();
            if !finite {
                log::warn!(
                    "[ZONE] {}: dropping {} {} zone with non-finite bounds",
                    scenario,
                    z.axis,
                    z.kind
                );
            }
            finite
        });

        for zone in &mut self.zones {
            if zone.lower > zone.upper {
                log::warn!(
                    "[ZONE] {}: {} {} zone [{}, {}] is reversed, swapping",
                    scenario,
                    zone.axis,
                    zone.kind,
                    zone.lower,
                    zone.upper
                );
                std::mem::swap(&mut zone.lower, &mut zone.upper);
            }
            if zone.kind == ZoneKind::Boundary {
                zone.strength = zone.strength.clamp(1, 3);
            }
        }

        let count = self.boundaries().count();
        if count > MAX_BOUNDARIES {
            return Err(ConfigError::TooManyBoundaries {
                scenario,
                count,
                max: MAX_BOUNDARIES,
            });
        }

        Ok(self)
    }
}

/// Zone sets keyed by scenario identifier
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioCatalog {
    sets: BTreeMap<String, ZoneSet>,
}

impl ScenarioCatalog {
    pub fn new() -> Self {
        Self {
            sets: BTreeMap::new(),
        }
    }

    /// Build a catalog from validated sets. Later sets with the same key win.
    pub fn from_sets(sets: impl IntoIterator<Item = ZoneSet>) -> ConfigResult<Self> {
        let mut catalog = Self::new();
        for set in sets {
            catalog.insert(set)?;
        }
        Ok(catalog)
    }

    /// The scenarios the operator station ships with
    pub fn builtin() -> Self {
        let mut sets = BTreeMap::new();
        for set in builtin_sets() {
            sets.insert(set.scenario.clone(), set);
        }
        Self { sets }
    }

    pub fn insert(&mut self, set: ZoneSet) -> ConfigResult<()> {
        let set = set.validated()?;
        self.sets.insert(set.scenario.clone(), set);
        Ok(())
    }

    pub fn get(&self, scenario: &str) -> ConfigResult<&ZoneSet> {
        self.sets
            .get(scenario)
            .ok_or_else(|| ConfigError::UnknownScenario(scenario.to_string()))
    }

    pub fn contains(&self, scenario: &str) -> bool {
        self.sets.contains_key(scenario)
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_sets() -> Vec<ZoneSet> {
    use Axis::{Angle, Thrust};

    vec![
        ZoneSet::new(
            DEFAULT_SCENARIO,
            vec![
                Zone::advice(Thrust, 20.0, 50.0),
                Zone::caution(Thrust, 60.0, 100.0),
                Zone::advice(Angle, 20.0, 50.0),
                Zone::caution(Angle, 75.0, 100.0),
            ],
        ),
        // Thruster only: advice band with caution right behind it
        ZoneSet::new(
            "maintain-speed",
            vec![
                Zone::advice(Thrust, 10.0, 40.0),
                Zone::caution(Thrust, 41.0, 100.0),
            ],
        ),
        // Turn the vessel around, but not too quickly
        ZoneSet::new(
            "turn-around",
            vec![
                Zone::advice(Angle, -40.0, -1.0),
                Zone::advice(Angle, 1.0, 40.0),
                Zone::caution(Angle, -179.0, -41.0),
                Zone::caution(Angle, 41.0, 180.0),
                Zone::advice(Thrust, 10.0, 30.0),
            ],
        ),
        ZoneSet::new(
            "navigate-buoys",
            vec![
                Zone::advice(Angle, -40.0, 40.0),
                Zone::caution(Angle, 60.0, 180.0),
                Zone::caution(Angle, -180.0, -60.0),
                Zone::advice(Thrust, 20.0, 60.0),
                Zone::caution(Thrust, 80.0, 100.0),
            ],
        ),
        // Harbor speed limit: thrust is walled in below the caution band
        ZoneSet::new(
            "depart-harbor",
            vec![
                Zone::advice(Angle, -40.0, 40.0),
                Zone::caution(Angle, 60.0, 180.0),
                Zone::caution(Angle, -180.0, -60.0),
                Zone::advice(Thrust, 0.0, 40.0),
                Zone::caution(Thrust, 41.0, 100.0),
                Zone::boundary(Thrust, 1.0, 41.0, 2),
            ],
        ),
    ]
}
