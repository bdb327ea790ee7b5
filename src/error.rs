//! Centralized error types for the bridge
//!
//! All bridge errors are represented by the `BridgeError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, BridgeError>`.
//!
//! Frame-level decode errors live in [`crate::codec::DecodeError`]; they
//! are link noise, not bridge failures, and never escalate to here.

use std::fmt;
use std::path::PathBuf;

/// All bridge errors
#[derive(Debug)]
pub enum BridgeError {
    // === Transport ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// Failed to bind the telemetry UDP socket
    UdpBind {
        addr: String,
        source: std::io::Error,
    },
    /// Telemetry target address did not parse
    InvalidAddress { addr: String },

    // === Device ===
    /// Command was sent but no response arrived in time
    CommandTimeout { seq: u8 },
    /// Device answered with a non-zero response code
    CommandFailed { code: u8 },
    /// Serial link went away while a command was in flight
    DeviceGone,
    /// Color string is not a 6-digit hex triplet
    InvalidColor { value: String },

    // === IO / Config ===
    /// Failed to read a config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::UdpBind { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, .. } => write!(f, "Cannot open serial port: {}", port),
            Self::UdpBind { addr, .. } => write!(f, "Cannot bind telemetry socket: {}", addr),
            Self::InvalidAddress { addr } => write!(f, "Invalid telemetry address: {}", addr),
            Self::CommandTimeout { seq } => {
                write!(f, "No response for command (seq {})", seq)
            }
            Self::CommandFailed { code } => {
                write!(f, "Device rejected command (response code {:#04X})", code)
            }
            Self::DeviceGone => write!(f, "Device connection lost"),
            Self::InvalidColor { value } => write!(f, "Invalid color: {}", value),
            Self::ConfigRead { path, .. } => {
                write!(f, "Cannot read config: {}", path.display())
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
