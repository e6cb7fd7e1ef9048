//! # Telemetry Module
//!
//! Periodic snapshots of the object dictionary and link counters, written
//! to rotating files.
//!
//! This module handles:
//! - Formatting snapshots as JSONL or CSV
//! - Rotating to a new file after N records
//! - Retaining only the newest M files

pub mod logger;

pub use logger::TelemetryLogger;

use serde::Deserialize;

/// On-disk record format
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line; unknown measurements are `null`
    #[default]
    Jsonl,
    /// Header line plus one comma-separated row per record
    Csv,
}

impl LogFormat {
    pub fn extension(self) -> &'static str {
        match self {
            LogFormat::Jsonl => "jsonl",
            LogFormat::Csv => "csv",
        }
    }
}
