//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Network
// =============================================================================

/// Default UDP port for telemetry publishing
pub const DEFAULT_TELEMETRY_PORT: u16 = 9060;

/// Default telemetry host
pub const DEFAULT_TELEMETRY_HOST: &str = "127.0.0.1";

// =============================================================================
// Timing - Connection
// =============================================================================

/// Delay between connection attempts (seconds)
pub const RECONNECT_DELAY_SECS: u64 = 3;

/// Delay after connection loss before retry (seconds)
pub const POST_DISCONNECT_DELAY_SECS: u64 = 3;

/// Interval between keep-alive pings (seconds)
pub const PING_INTERVAL_SECS: u64 = 10;

// =============================================================================
// Timing - Commands
// =============================================================================

/// Time to wait for a command response (milliseconds)
pub const COMMAND_TIMEOUT_MS: u64 = 500;

/// Attempts before a command is abandoned
pub const COMMAND_RETRY_LIMIT: u32 = 10;

/// Delay between command retries (milliseconds)
pub const COMMAND_RETRY_DELAY_MS: u64 = 500;

// =============================================================================
// Buffers
// =============================================================================

/// Serial read buffer size
pub const SERIAL_BUFFER_SIZE: usize = 4096;

/// Channel capacity for async message passing
pub const CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Serial
// =============================================================================

/// Serial device baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Consecutive read errors before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

// =============================================================================
// Streaming
// =============================================================================

/// The device's base sensor sampling rate; the streaming divisor is
/// derived from this and the requested samples per second
pub const SENSOR_BASE_RATE_HZ: u16 = 400;
