use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::DispatchError;
use crate::types::Axis;

/// Outbound actuation command, serialized as the controller bridge expects
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HapticCommand {
    SetVibration {
        strength: u8,
    },
    SetFrictionStrength {
        friction: u8,
    },
    SetDetents {
        #[serde(rename = "type")]
        axis: Axis,
        detents: Vec<f64>,
        detent: u8,
    },
    SetBoundary {
        enable: bool,
        boundary: u8,
        #[serde(rename = "type")]
        axis: Axis,
        lower: f64,
        upper: f64,
    },
    ClearHaptics,
}

impl HapticCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HapticCommand::SetVibration { .. } => "set_vibration",
            HapticCommand::SetFrictionStrength { .. } => "set_friction_strength",
            HapticCommand::SetDetents { .. } => "set_detents",
            HapticCommand::SetBoundary { .. } => "set_boundary",
            HapticCommand::ClearHaptics => "clear_haptics",
        }
    }

    pub fn to_json(&self) -> Result<String, DispatchError> {
        serde_json::to_string(self).map_err(|e| DispatchError::Serialization(e.to_string()))
    }
}

/// Where serialized commands go. Delivery is fire-and-forget.
pub trait CommandSink {
    fn send(&mut self, json: &str) -> Result<(), DispatchError>;
}

/// Fans commands out to every connected bridge socket
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: broadcast::Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl CommandSink for ChannelSink {
    fn send(&mut self, json: &str) -> Result<(), DispatchError> {
        // No receivers means no bridge is connected right now
        self.tx
            .send(json.to_string())
            .map(|_| ())
            .map_err(|_| DispatchError::ChannelClosed)
    }
}

/// Keeps every command in memory
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub sent: Vec<String>,
}

impl CommandSink for RecordingSink {
    fn send(&mut self, json: &str) -> Result<(), DispatchError> {
        self.sent.push(json.to_string());
        Ok(())
    }
}

/// Serializes commands into a sink and keeps delivery counters.
///
/// Failures are logged and counted, never returned: the engine's
/// de-duplication state tracks what was attempted, not what was delivered.
pub struct Dispatcher<S: CommandSink> {
    sink: S,
    sent_count: u64,
    failed_count: u64,
}

impl<S: CommandSink> Dispatcher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            sent_count: 0,
            failed_count: 0,
        }
    }

    pub fn dispatch(&mut self, command: &HapticCommand) {
        let result = command.to_json().and_then(|json| {
            log::debug!("[DISPATCH] {}", json);
            self.sink.send(&json)
        });
        match result {
            Ok(()) => self.sent_count += 1,
            Err(e) => {
                self.failed_count += 1;
                log::warn!("[DISPATCH] {} not delivered: {}", command.name(), e);
            }
        }
    }

    pub fn dispatch_all(&mut self, commands: &[HapticCommand]) {
        for command in commands {
            self.dispatch(command);
        }
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(command: &HapticCommand) -> Value {
        serde_json::from_str(&command.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_wire_shapes() {
        assert_eq!(
            as_value(&HapticCommand::SetVibration { strength: 2 }),
            json!({"command": "set_vibration", "strength": 2})
        );
        assert_eq!(
            as_value(&HapticCommand::SetFrictionStrength { friction: 3 }),
            json!({"command": "set_friction_strength", "friction": 3})
        );
        assert_eq!(
            as_value(&HapticCommand::SetDetents {
                axis: Axis::Angle,
                detents: vec![20.0, 50.0],
                detent: 1
            }),
            json!({"command": "set_detents", "type": "angle", "detents": [20.0, 50.0], "detent": 1})
        );
        assert_eq!(
            as_value(&HapticCommand::SetBoundary {
                enable: true,
                boundary: 2,
                axis: Axis::Thrust,
                lower: 1.0,
                upper: 41.0
            }),
            json!({"command": "set_boundary", "enable": true, "boundary": 2, "type": "thrust", "lower": 1.0, "upper": 41.0})
        );
        assert_eq!(
            as_value(&HapticCommand::ClearHaptics),
            json!({"command": "clear_haptics"})
        );
    }

    #[test]
    fn test_recording_dispatch() {
        let mut dispatcher = Dispatcher::new(RecordingSink::default());
        dispatcher.dispatch_all(&[
            HapticCommand::ClearHaptics,
            HapticCommand::SetVibration { strength: 0 },
        ]);
        assert_eq!(dispatcher.sent_count(), 2);
        assert_eq!(dispatcher.sink().sent[0], r#"{"command":"clear_haptics"}"#);
    }

    #[test]
    fn test_failed_send_is_counted_not_raised() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut dispatcher = Dispatcher::new(ChannelSink::new(tx));
        dispatcher.dispatch(&HapticCommand::SetVibration { strength: 1 });
        assert_eq!(dispatcher.sent_count(), 0);
        assert_eq!(dispatcher.failed_count(), 1);
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut dispatcher = Dispatcher::new(ChannelSink::new(tx));
        dispatcher.dispatch(&HapticCommand::SetFrictionStrength { friction: 1 });
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"{"command":"set_friction_strength","friction":1}"#
        );
    }
}
