use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigResult;
use crate::types::{Axis, PerAxis, ZoneKind};
use crate::zones::{ScenarioCatalog, ZoneSet, DEFAULT_SCENARIO};

/// Vibration strength per zone kind on one axis
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindStrengths {
    pub advice: u8,
    pub caution: u8,
}

impl Default for KindStrengths {
    fn default() -> Self {
        // Advice zones are silent unless configured
        Self {
            advice: 0,
            caution: 1,
        }
    }
}

impl KindStrengths {
    pub fn for_kind(&self, kind: ZoneKind) -> u8 {
        match kind {
            ZoneKind::Advice => self.advice,
            ZoneKind::Caution => self.caution,
            ZoneKind::Boundary => 0,
        }
    }
}

/// Fade-out of short vibration pulses
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VibrationDecay {
    /// Delay before the strength-zero command (ms)
    pub after_ms: u64,
    /// Strengths at or above this level vibrate until the zone is left
    pub sustained_strength: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VibrationConfig {
    pub enabled: bool,
    pub strengths: PerAxis<KindStrengths>,
    pub decay: Option<VibrationDecay>,
}

impl Default for VibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strengths: PerAxis::default(),
            decay: None,
        }
    }
}

impl VibrationConfig {
    pub fn strength(&self, axis: Axis, kind: ZoneKind) -> u8 {
        self.strengths.get(axis).for_kind(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrictionConfig {
    pub enabled: bool,
    /// Level while either axis sits in an advice zone
    pub inside: u8,
    /// Level everywhere else
    pub outside: u8,
}

impl Default for FrictionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inside: 3,
            outside: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetentConfig {
    pub enabled: bool,
    /// Detent strength per zone kind; 0 means the kind places no detents
    pub strengths: DetentStrengths,
}

impl Default for DetentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strengths: DetentStrengths::default(),
        }
    }
}

/// Detent strength per zone kind. Separate from `KindStrengths` because
/// the defaults are reversed: advice zones place detents, caution zones don't.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetentStrengths {
    pub advice: u8,
    pub caution: u8,
}

impl Default for DetentStrengths {
    fn default() -> Self {
        Self {
            advice: 1,
            caution: 0,
        }
    }
}

impl DetentStrengths {
    pub fn for_kind(&self, kind: ZoneKind) -> u8 {
        match kind {
            ZoneKind::Advice => self.advice,
            ZoneKind::Caution => self.caution,
            ZoneKind::Boundary => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub enabled: bool,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Settings for the four feedback channels
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub vibration: VibrationConfig,
    pub friction: FrictionConfig,
    pub detent: DetentConfig,
    pub boundary: BoundaryConfig,
}

/// Everything the station reads from its config file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub feedback: FeedbackConfig,
    /// Extra or overriding scenarios on top of the built-in ones
    pub scenarios: Vec<ZoneSet>,
    pub default_scenario: String,
    pub telemetry_silence_secs: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            feedback: FeedbackConfig::default(),
            scenarios: Vec::new(),
            default_scenario: DEFAULT_SCENARIO.to_string(),
            telemetry_silence_secs: 5,
        }
    }
}

impl StationConfig {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from disk; a missing file means built-in defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            log::warn!(
                "[CONFIG] {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!(
            "[CONFIG] Loaded {} ({} custom scenario(s))",
            path.display(),
            config.scenarios.len()
        );
        Ok(config)
    }

    /// Built-in scenarios overlaid with the configured ones
    pub fn catalog(&self) -> ConfigResult<ScenarioCatalog> {
        let mut catalog = ScenarioCatalog::builtin();
        for set in &self.scenarios {
            catalog.insert(set.clone())?;
        }
        Ok(catalog)
    }
}
