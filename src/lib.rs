//! Alert-zone and haptic-feedback coordination for a remote operator
//! station.
//!
//! Telemetry samples go into [`engine::HapticEngine`]; actuation commands
//! for the haptic controller bridge come out, alongside a reaction-time log.

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod export;
pub mod feedback;
pub mod health;
pub mod occupancy;
pub mod reaction;
pub mod server;
pub mod status;
pub mod types;
pub mod zones;

pub use dispatch::HapticCommand;
pub use engine::HapticEngine;
pub use error::{ConfigError, DispatchError, TelemetryError};
