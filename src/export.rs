use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::reaction::LogEntry;
use crate::types::Timestamp;

/// Column order of the tabular export; matches the `LogEntry` field names.
pub const CSV_HEADER: [&str; 8] = [
    "timestamp",
    "thrust",
    "angle",
    "reactionTimeMs",
    "exitDurationMs",
    "alertType",
    "axis",
    "scenario",
];

/// One operator session's reaction log, exported as a single batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub scenario: String,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    pub entries: Vec<LogEntry>,
}

impl SessionExport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render the entries as CSV. Null fields become empty cells.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(&CSV_HEADER.join(","));
        csv.push('\n');

        for entry in &self.entries {
            let row = [
                entry.timestamp.to_rfc3339(),
                entry.thrust.to_string(),
                entry.angle.to_string(),
                opt_cell(entry.reaction_time_ms),
                opt_cell(entry.exit_duration_ms),
                entry
                    .alert_type
                    .map(|k| k.as_str().to_string())
                    .unwrap_or_default(),
                entry.axis.map(|a| a.as_str().to_string()).unwrap_or_default(),
                escape_cell(&entry.scenario),
            ];
            csv.push_str(&row.join(","));
            csv.push('\n');
        }

        csv
    }

    /// `log-<end time>-<scenario>.csv`
    pub fn file_name(&self) -> String {
        let stamp = self.ended_at.format("%Y%m%dT%H%M%SZ");
        let scenario: String = self
            .scenario
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("log-{}-{}.csv", stamp, scenario)
    }

    /// Write the CSV into `dir`, creating it if needed
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.to_csv())?;
        Ok(path)
    }
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn escape_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
