use crate::config::FrictionConfig;
use crate::dispatch::HapticCommand;
use crate::occupancy::ZoneEvent;
use crate::types::{Axis, PerAxis, ZoneKind};

/// Resistance channel shared by both axes.
///
/// Each axis keeps its own "inside an advice zone" flag; the command follows
/// the OR of the two, so leaving on one axis never drops the resistance
/// while the other axis is still inside.
#[derive(Clone, Debug)]
pub struct FrictionController {
    config: FrictionConfig,
    inside: PerAxis<bool>,
    combined: bool,
}

impl FrictionController {
    pub fn new(config: FrictionConfig) -> Self {
        Self {
            config,
            inside: PerAxis::default(),
            combined: false,
        }
    }

    pub fn on_events(&mut self, events: &[ZoneEvent], out: &mut Vec<HapticCommand>) {
        for event in events {
            if event.kind() != ZoneKind::Advice {
                continue;
            }
            let entered = matches!(event, ZoneEvent::Entered { .. });
            *self.inside.get_mut(event.axis()) = entered;
            log::debug!(
                "[FRICTION] {} advice zone {}",
                event.axis(),
                if entered { "entered" } else { "exited" }
            );
        }

        let combined = self.inside.thrust || self.inside.angle;
        if combined == self.combined {
            return;
        }
        self.combined = combined;

        if !self.config.enabled {
            return;
        }
        let friction = if combined {
            self.config.inside
        } else {
            self.config.outside
        };
        log::info!("[FRICTION] resistance -> {}", friction);
        out.push(HapticCommand::SetFrictionStrength { friction });
    }

    pub fn is_inside(&self, axis: Axis) -> bool {
        *self.inside.get(axis)
    }

    pub fn reset(&mut self) {
        self.inside = PerAxis::default();
        self.combined = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entered(axis: Axis, kind: ZoneKind) -> ZoneEvent {
        ZoneEvent::Entered {
            axis,
            kind,
            zone_type: Some(kind),
            at: Utc::now(),
        }
    }

    fn exited(axis: Axis, kind: ZoneKind) -> ZoneEvent {
        let now = Utc::now();
        ZoneEvent::Exited {
            axis,
            kind,
            zone_type: Some(kind),
            entered_at: now,
            reaction_time_ms: None,
            exit_duration_ms: 0,
            at: now,
        }
    }

    #[test]
    fn test_entry_and_exit() {
        let mut friction = FrictionController::new(FrictionConfig::default());
        let mut out = Vec::new();

        friction.on_events(&[entered(Axis::Thrust, ZoneKind::Advice)], &mut out);
        friction.on_events(&[], &mut out);
        friction.on_events(&[exited(Axis::Thrust, ZoneKind::Advice)], &mut out);

        assert_eq!(
            out,
            vec![
                HapticCommand::SetFrictionStrength { friction: 3 },
                HapticCommand::SetFrictionStrength { friction: 1 },
            ]
        );
    }

    #[test]
    fn test_other_axis_keeps_resistance() {
        let mut friction = FrictionController::new(FrictionConfig::default());
        let mut out = Vec::new();

        friction.on_events(&[entered(Axis::Thrust, ZoneKind::Advice)], &mut out);
        friction.on_events(&[entered(Axis::Angle, ZoneKind::Advice)], &mut out);
        friction.on_events(&[exited(Axis::Thrust, ZoneKind::Advice)], &mut out);
        assert_eq!(out, vec![HapticCommand::SetFrictionStrength { friction: 3 }]);
        assert!(friction.is_inside(Axis::Angle));

        friction.on_events(&[exited(Axis::Angle, ZoneKind::Advice)], &mut out);
        assert_eq!(out.last(), Some(&HapticCommand::SetFrictionStrength { friction: 1 }));
    }

    #[test]
    fn test_caution_events_ignored() {
        let mut friction = FrictionController::new(FrictionConfig::default());
        let mut out = Vec::new();
        friction.on_events(&[entered(Axis::Thrust, ZoneKind::Caution)], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_disabled_channel_still_tracks() {
        let config = FrictionConfig {
            enabled: false,
            ..Default::default()
        };
        let mut friction = FrictionController::new(config);
        let mut out = Vec::new();
        friction.on_events(&[entered(Axis::Angle, ZoneKind::Advice)], &mut out);
        assert!(out.is_empty());
        assert!(friction.is_inside(Axis::Angle));
    }
}
