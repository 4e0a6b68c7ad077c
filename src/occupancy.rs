use serde::Serialize;

use crate::classifier::Classification;
use crate::types::{millis_between, Axis, Timestamp, ZoneKind};

/// Occupancy of one (axis, kind) pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OccupancyState {
    pub active: bool,
    pub entered_at: Option<Timestamp>,
    pub first_response_at: Option<Timestamp>,
    /// Axis zone type reported by the classifier at entry
    pub last_type: Option<ZoneKind>,
}

/// Edge emitted exactly once per state change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ZoneEvent {
    Entered {
        axis: Axis,
        kind: ZoneKind,
        zone_type: Option<ZoneKind>,
        at: Timestamp,
    },
    Exited {
        axis: Axis,
        kind: ZoneKind,
        zone_type: Option<ZoneKind>,
        entered_at: Timestamp,
        reaction_time_ms: Option<i64>,
        exit_duration_ms: i64,
        at: Timestamp,
    },
}

impl ZoneEvent {
    pub fn axis(&self) -> Axis {
        match self {
            ZoneEvent::Entered { axis, .. } | ZoneEvent::Exited { axis, .. } => *axis,
        }
    }

    pub fn kind(&self) -> ZoneKind {
        match self {
            ZoneEvent::Entered { kind, .. } | ZoneEvent::Exited { kind, .. } => *kind,
        }
    }
}

/// Per (axis, kind) Idle/Active state machine.
///
/// Total over (state, classification): it never fails, and only ever
/// alternates entry and exit for a pair.
#[derive(Clone, Debug, Default)]
pub struct OccupancyTracker {
    states: [[OccupancyState; 3]; 2],
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, axis: Axis, kind: ZoneKind) -> &OccupancyState {
        &self.states[axis.index()][kind.index()]
    }

    fn state_mut(&mut self, axis: Axis, kind: ZoneKind) -> &mut OccupancyState {
        &mut self.states[axis.index()][kind.index()]
    }

    pub fn is_active(&self, axis: Axis, kind: ZoneKind) -> bool {
        self.state(axis, kind).active
    }

    /// Active pairs, in axis then kind order
    pub fn active_pairs(&self) -> impl Iterator<Item = (Axis, ZoneKind)> + '_ {
        Axis::ALL.into_iter().flat_map(move |axis| {
            ZoneKind::ALL
                .into_iter()
                .filter(move |kind| self.is_active(axis, *kind))
                .map(move |kind| (axis, kind))
        })
    }

    /// Advance every pair against a fresh classification.
    ///
    /// All exits of the tick are emitted before any entry, so a hand-off
    /// between adjacent zones reads as "left A, entered B".
    pub fn update(&mut self, classification: &Classification, now: Timestamp) -> Vec<ZoneEvent> {
        let mut events = Vec::new();

        for axis in Axis::ALL {
            for kind in ZoneKind::ALL {
                let occupied = classification.axis(axis).is_active(kind);
                let state = self.state_mut(axis, kind);
                if state.active && !occupied {
                    // An active state always carries its entry time; fall back
                    // to a zero-length episode rather than panic
                    let entered_at = state.entered_at.unwrap_or(now);
                    events.push(ZoneEvent::Exited {
                        axis,
                        kind,
                        zone_type: state.last_type,
                        entered_at,
                        reaction_time_ms: state
                            .first_response_at
                            .map(|t| millis_between(entered_at, t)),
                        exit_duration_ms: millis_between(entered_at, now),
                        at: now,
                    });
                    *state = OccupancyState::default();
                }
            }
        }

        for axis in Axis::ALL {
            let zone_type = classification.axis(axis).zone_type;
            for kind in ZoneKind::ALL {
                let occupied = classification.axis(axis).is_active(kind);
                let state = self.state_mut(axis, kind);
                if occupied && !state.active {
                    // Boundary episodes carry their own kind; advice and caution
                    // take the axis's last matching zone type
                    let last_type = match kind {
                        ZoneKind::Boundary => Some(ZoneKind::Boundary),
                        _ => zone_type,
                    };
                    *state = OccupancyState {
                        active: true,
                        entered_at: Some(now),
                        first_response_at: None,
                        last_type,
                    };
                    events.push(ZoneEvent::Entered {
                        axis,
                        kind,
                        zone_type: last_type,
                        at: now,
                    });
                }
            }
        }

        events
    }

    /// Stamp the first response of an active episode. Returns true when the
    /// stamp was taken; later calls within the same episode are ignored.
    pub fn mark_response(&mut self, axis: Axis, kind: ZoneKind, now: Timestamp) -> bool {
        let state = self.state_mut(axis, kind);
        if !state.active || state.first_response_at.is_some() {
            return false;
        }
        // Never earlier than the entry, so reaction time stays >= 0
        let at = match state.entered_at {
            Some(entered) if now < entered => entered,
            _ => now,
        };
        state.first_response_at = Some(at);
        true
    }

    /// Force every pair back to idle without emitting exits.
    pub fn reset(&mut self) {
        self.states = Default::default();
    }
}
