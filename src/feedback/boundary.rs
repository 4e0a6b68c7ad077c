use crate::config::BoundaryConfig;
use crate::dispatch::HapticCommand;
use crate::zones::ZoneSet;

/// Hard walls, driven by configuration rather than telemetry.
///
/// The full command list is resent only when it differs structurally from
/// the last list sent.
#[derive(Clone, Debug)]
pub struct BoundaryController {
    config: BoundaryConfig,
    last_sent: Option<Vec<HapticCommand>>,
}

impl BoundaryController {
    pub fn new(config: BoundaryConfig) -> Self {
        Self {
            config,
            last_sent: None,
        }
    }

    /// One command per boundary definition. Disabled definitions are sent
    /// with `enable: false` so a reload can take a wall down.
    pub fn commands_for(zones: &ZoneSet) -> Vec<HapticCommand> {
        zones
            .boundaries()
            .map(|b| HapticCommand::SetBoundary {
                enable: b.enabled,
                boundary: b.strength,
                axis: b.axis,
                lower: b.lower,
                upper: b.upper,
            })
            .collect()
    }

    pub fn on_zone_set(&mut self, zones: &ZoneSet, out: &mut Vec<HapticCommand>) {
        if !self.config.enabled {
            return;
        }
        let commands = Self::commands_for(zones);
        if self.last_sent.as_ref() == Some(&commands) {
            return;
        }
        if !commands.is_empty() {
            log::info!(
                "[BOUNDARY] {}: sending {} boundary command(s)",
                zones.scenario,
                commands.len()
            );
        }
        out.extend(commands.iter().cloned());
        self.last_sent = Some(commands);
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Axis;
    use crate::zones::Zone;

    fn harbor() -> ZoneSet {
        ZoneSet::new(
            "harbor",
            vec![
                Zone::advice(Axis::Thrust, 0.0, 40.0),
                Zone::boundary(Axis::Thrust, 1.0, 41.0, 2),
            ],
        )
    }

    #[test]
    fn test_sent_once_per_config() {
        let mut boundary = BoundaryController::new(BoundaryConfig::default());
        let mut out = Vec::new();
        boundary.on_zone_set(&harbor(), &mut out);
        boundary.on_zone_set(&harbor(), &mut out);
        assert_eq!(
            out,
            vec![HapticCommand::SetBoundary {
                enable: true,
                boundary: 2,
                axis: Axis::Thrust,
                lower: 1.0,
                upper: 41.0,
            }]
        );
    }

    #[test]
    fn test_changed_config_resends() {
        let mut boundary = BoundaryController::new(BoundaryConfig::default());
        let mut out = Vec::new();
        boundary.on_zone_set(&harbor(), &mut out);

        let mut changed = harbor();
        changed.zones[1].enabled = false;
        boundary.on_zone_set(&changed, &mut out);
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], HapticCommand::SetBoundary { enable: false, .. }));
    }

    #[test]
    fn test_non_boundary_change_is_ignored() {
        let mut boundary = BoundaryController::new(BoundaryConfig::default());
        let mut out = Vec::new();
        boundary.on_zone_set(&harbor(), &mut out);

        let mut changed = harbor();
        changed.zones[0].upper = 35.0;
        boundary.on_zone_set(&changed, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_reset_rearms() {
        let mut boundary = BoundaryController::new(BoundaryConfig::default());
        let mut out = Vec::new();
        boundary.on_zone_set(&harbor(), &mut out);
        boundary.reset();
        boundary.on_zone_set(&harbor(), &mut out);
        assert_eq!(out.len(), 2);
    }
}
