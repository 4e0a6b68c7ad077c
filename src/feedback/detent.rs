use crate::config::DetentConfig;
use crate::dispatch::HapticCommand;
use crate::types::{Axis, ZoneKind};
use crate::zones::ZoneSet;

/// Detents placed on the interval ends of advice/caution zones.
///
/// Derived only from the zone set and sent once per zone-set version;
/// telemetry never re-arms it.
#[derive(Clone, Debug)]
pub struct DetentController {
    config: DetentConfig,
    sent_version: Option<u64>,
}

impl DetentController {
    pub fn new(config: DetentConfig) -> Self {
        Self {
            config,
            sent_version: None,
        }
    }

    /// Sorted, de-duplicated positions and the strongest contributing
    /// strength for one axis. `None` when the axis gets no detents.
    pub fn detents_for(&self, zones: &ZoneSet, axis: Axis) -> Option<(Vec<f64>, u8)> {
        let mut positions = Vec::new();
        let mut strength = 0u8;

        for zone in zones.on_axis(axis).filter(|z| z.enabled) {
            if zone.kind == ZoneKind::Boundary {
                continue;
            }
            let kind_strength = self.config.strengths.for_kind(zone.kind);
            if kind_strength == 0 {
                continue;
            }
            strength = strength.max(kind_strength);
            positions.push(zone.lower.round());
            positions.push(zone.upper.round());
        }

        if positions.is_empty() {
            return None;
        }
        positions.sort_by(f64::total_cmp);
        positions.dedup();
        Some((positions, strength))
    }

    pub fn on_zone_set(&mut self, zones: &ZoneSet, version: u64, out: &mut Vec<HapticCommand>) {
        if !self.config.enabled || self.sent_version == Some(version) {
            return;
        }
        self.sent_version = Some(version);

        for axis in Axis::ALL {
            if let Some((detents, detent)) = self.detents_for(zones, axis) {
                log::info!(
                    "[DETENT] {} {}: {:?} (strength {})",
                    zones.scenario,
                    axis,
                    detents,
                    detent
                );
                out.push(HapticCommand::SetDetents {
                    axis,
                    detents,
                    detent,
                });
            }
        }
    }

    pub fn sent_version(&self) -> Option<u64> {
        self.sent_version
    }

    pub fn reset(&mut self) {
        self.sent_version = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetentStrengths;
    use crate::zones::Zone;

    fn zones() -> ZoneSet {
        ZoneSet::new(
            "detents",
            vec![
                Zone::advice(Axis::Thrust, 20.0, 50.0),
                Zone::caution(Axis::Thrust, 60.0, 100.0),
                Zone::advice(Axis::Thrust, 49.6, 55.2),
                Zone::boundary(Axis::Thrust, 1.0, 41.0, 2),
                Zone::advice(Axis::Angle, -40.0, 40.0).disabled(),
            ],
        )
    }

    #[test]
    fn test_positions_from_advice_zones() {
        let detent = DetentController::new(DetentConfig::default());
        let (positions, strength) = detent.detents_for(&zones(), Axis::Thrust).unwrap();
        assert_eq!(positions, vec![20.0, 50.0, 55.0]);
        assert_eq!(strength, 1);
        assert!(detent.detents_for(&zones(), Axis::Angle).is_none());
    }

    #[test]
    fn test_caution_strength_table() {
        let config = DetentConfig {
            enabled: true,
            strengths: DetentStrengths {
                advice: 1,
                caution: 3,
            },
        };
        let detent = DetentController::new(config);
        let (positions, strength) = detent.detents_for(&zones(), Axis::Thrust).unwrap();
        assert_eq!(positions, vec![20.0, 50.0, 55.0, 60.0, 100.0]);
        assert_eq!(strength, 3);
    }

    #[test]
    fn test_once_per_version() {
        let mut detent = DetentController::new(DetentConfig::default());
        let mut out = Vec::new();
        detent.on_zone_set(&zones(), 1, &mut out);
        detent.on_zone_set(&zones(), 1, &mut out);
        assert_eq!(out.len(), 1);

        detent.on_zone_set(&zones(), 2, &mut out);
        assert_eq!(out.len(), 2);

        detent.reset();
        detent.on_zone_set(&zones(), 2, &mut out);
        assert_eq!(out.len(), 3);
    }
}
