//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::capsule::encoder::capsule_len;
use crate::error::{PropLinkError, Result};
use crate::link::packet::{MAX_PACKET_SIZE, PROP_BOARD_ID};
use crate::telemetry::LogFormat;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Which end of the link this process runs
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    #[default]
    Avionics,
    Propulsion,
}

/// Packet pump configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default)]
    pub role: RoleKind,

    #[serde(default = "default_packet_id")]
    pub packet_id: u8,

    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    #[serde(default = "default_stale_timeout_ms")]
    pub stale_timeout_ms: u64,

    #[serde(default = "default_tx_buffer_size")]
    pub tx_buffer_size: usize,

    #[serde(default = "default_rx_buffer_size")]
    pub rx_buffer_size: usize,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default)]
    pub format: LogFormat,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_baud_rate() -> u32 { 115200 }

fn default_packet_id() -> u8 { PROP_BOARD_ID }
fn default_tick_rate_hz() -> u32 { 100 }
fn default_stale_timeout_ms() -> u64 { 500 }
fn default_tx_buffer_size() -> usize { 64 }
fn default_rx_buffer_size() -> usize { 256 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

/// Baud rates the boards' UARTs are known to run at
const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 57600, 115200, 230400, 460800, 500000, 921600];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            role: RoleKind::default(),
            packet_id: default_packet_id(),
            tick_rate_hz: default_tick_rate_hz(),
            stale_timeout_ms: default_stale_timeout_ms(),
            tx_buffer_size: default_tx_buffer_size(),
            rx_buffer_size: default_rx_buffer_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: LogFormat::default(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> PropLinkError {
    PropLinkError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use prop_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.link.tick_rate_hz == 0 || self.link.tick_rate_hz > 1000 {
            return Err(invalid("tick_rate_hz must be between 1 and 1000"));
        }

        if self.link.stale_timeout_ms == 0 || self.link.stale_timeout_ms > 60000 {
            return Err(invalid("stale_timeout_ms must be between 1 and 60000"));
        }

        // Either role must be able to hold one whole capsule
        let min_fifo = capsule_len(MAX_PACKET_SIZE);
        if self.link.tx_buffer_size < min_fifo || self.link.tx_buffer_size > 4096 {
            return Err(invalid(format!(
                "tx_buffer_size must be between {} and 4096",
                min_fifo
            )));
        }

        if self.link.rx_buffer_size < min_fifo || self.link.rx_buffer_size > 65536 {
            return Err(invalid(format!(
                "rx_buffer_size must be between {} and 65536",
                min_fifo
            )));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}
