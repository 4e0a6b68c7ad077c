use thiserror::Error;

/// Reasons a telemetry frame is rejected before classification
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("Missing telemetry field: {0}")]
    MissingField(&'static str),

    #[error("Non-finite telemetry field: {0}")]
    NonFinite(&'static str),

    #[error("Invalid frame timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Malformed telemetry frame: {0}")]
    Malformed(String),
}

/// Station configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Scenario {scenario} defines {count} boundaries (max {max})")]
    TooManyBoundaries {
        scenario: String,
        count: usize,
        max: usize,
    },

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outbound command delivery errors. Never fatal to the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Command channel closed")]
    ChannelClosed,

    #[error("Failed to serialize command: {0}")]
    Serialization(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
