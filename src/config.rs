//! Configuration management
//!
//! Config file is `config.toml` in the working directory, or wherever
//! `--config` points. The implicit file falls back to defaults with a
//! warning when missing or invalid; an explicitly given path must load.

use crate::constants::{
    COMMAND_TIMEOUT_MS, DEFAULT_BAUD_RATE, DEFAULT_TELEMETRY_HOST, DEFAULT_TELEMETRY_PORT,
    PING_INTERVAL_SECS,
};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub telemetry: TelemetryConfig,
    pub policy: PolicyConfig,
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Serial device link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Candidate serial ports, tried in rotation (empty = enumerate all)
    pub ports: Vec<String>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Time to wait for a command response (milliseconds)
    pub command_timeout_ms: u64,
    /// Interval between keep-alive pings (seconds)
    pub ping_interval_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            command_timeout_ms: COMMAND_TIMEOUT_MS,
            ping_interval_secs: PING_INTERVAL_SECS,
        }
    }
}

// =============================================================================
// Telemetry Configuration
// =============================================================================

/// Where decoded telemetry is published
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Telemetry host address
    pub host: String,
    /// Telemetry UDP port
    pub port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TELEMETRY_HOST.to_string(),
            port: DEFAULT_TELEMETRY_PORT,
        }
    }
}

impl TelemetryConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Motion Policy Configuration
// =============================================================================

/// Thresholds for the gyro-driven motion policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Window average below which the orb is considered idle
    pub idle_below: f64,
    /// Instantaneous gyro magnitude above which the orb is active
    pub active_above: i32,
    /// Magnitude cap when scaling the activity level
    pub magnitude_cap: i32,
    /// Rolling window length (frames)
    pub window: usize,
    /// Streaming rate while idle (samples per second)
    pub idle_sps: u16,
    /// Streaming rate while active (samples per second)
    pub active_sps: u16,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            idle_below: 150.0,
            active_above: 300,
            magnitude_cap: 10_000,
            window: 5,
            idle_sps: 1,
            active_sps: 10,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load config
///
/// An explicitly given path must exist and parse; the implicit
/// `./config.toml` falls back to defaults so the bridge always starts.
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| BridgeError::ConfigValidation {
                field: "config",
                reason: e.to_string(),
            })
        }
        None => Ok(load_default()),
    }
}

fn load_default() -> Config {
    let path = Path::new("config.toml");
    if !path.exists() {
        return Config::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config parse error in {:?}: {}, using defaults", path, e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config {:?}: {}, using defaults", path, e);
            Config::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
