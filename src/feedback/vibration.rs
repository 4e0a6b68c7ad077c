use chrono::Duration;

use crate::classifier::Classification;
use crate::config::VibrationConfig;
use crate::dispatch::HapticCommand;
use crate::types::{Axis, Timestamp, ZoneKind};

/// A scheduled strength-zero command. Only one exists at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecayHandle {
    pub id: u64,
    pub deadline: Timestamp,
}

/// Scalar vibration channel.
///
/// A command goes out only when the computed target strength changes. With
/// decay configured, weak pulses are followed by a strength-zero command;
/// scheduling a new decay replaces the pending one.
#[derive(Clone, Debug)]
pub struct VibrationController {
    config: VibrationConfig,
    last_target: u8,
    last_sent: u8,
    pending_decay: Option<DecayHandle>,
    next_handle_id: u64,
}

impl VibrationController {
    pub fn new(config: VibrationConfig) -> Self {
        Self {
            config,
            last_target: 0,
            last_sent: 0,
            pending_decay: None,
            next_handle_id: 0,
        }
    }

    /// Max configured strength over every active advice/caution pair
    pub fn target_strength(&self, classification: &Classification) -> u8 {
        let mut strength = 0;
        for axis in Axis::ALL {
            let status = classification.axis(axis);
            for kind in [ZoneKind::Advice, ZoneKind::Caution] {
                if status.is_active(kind) {
                    strength = strength.max(self.config.strength(axis, kind));
                }
            }
        }
        strength
    }

    pub fn on_sample(
        &mut self,
        classification: &Classification,
        now: Timestamp,
        out: &mut Vec<HapticCommand>,
    ) {
        if !self.config.enabled {
            return;
        }

        let target = self.target_strength(classification);
        if target == self.last_target {
            return;
        }

        self.last_target = target;
        // A fired decay may already have put this payload on the wire
        if target != self.last_sent {
            log::info!("[VIBRATION] strength {} -> {}", self.last_sent, target);
            self.last_sent = target;
            out.push(HapticCommand::SetVibration { strength: target });
        }

        match self.config.decay {
            Some(decay) if target > 0 && target < decay.sustained_strength => {
                self.schedule_decay(now + Duration::milliseconds(decay.after_ms as i64));
            }
            _ => self.cancel_decay(),
        }
    }

    /// Emit the strength-zero command if the pending decay is due
    pub fn fire_due(&mut self, now: Timestamp, out: &mut Vec<HapticCommand>) {
        let due = matches!(self.pending_decay, Some(handle) if handle.deadline <= now);
        if !due {
            return;
        }
        if let Some(handle) = self.pending_decay.take() {
            log::debug!("[VIBRATION] decay #{} fired", handle.id);
        }
        if self.last_sent != 0 {
            self.last_sent = 0;
            out.push(HapticCommand::SetVibration { strength: 0 });
        }
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pending_decay.map(|h| h.deadline)
    }

    pub fn pending_decay(&self) -> Option<DecayHandle> {
        self.pending_decay
    }

    pub fn last_sent(&self) -> u8 {
        self.last_sent
    }

    /// Forget all channel state. The device is assumed cleared.
    pub fn reset(&mut self) {
        self.cancel_decay();
        self.last_target = 0;
        self.last_sent = 0;
    }

    fn schedule_decay(&mut self, deadline: Timestamp) {
        // Replace, never stack
        self.next_handle_id += 1;
        if let Some(old) = self.pending_decay.replace(DecayHandle {
            id: self.next_handle_id,
            deadline,
        }) {
            log::debug!("[VIBRATION] decay #{} cancelled", old.id);
        }
    }

    fn cancel_decay(&mut self) {
        if let Some(old) = self.pending_decay.take() {
            log::debug!("[VIBRATION] decay #{} cancelled", old.id);
        }
    }
}
