//! Orb Bridge - Serial to UDP telemetry bridge for a spherical robot
//!
//! Connects to the robot over a serial link, decodes its binary
//! command/telemetry protocol, and republishes decoded telemetry as JSON
//! datagrams to a host UDP endpoint.
//!
//! - [`codec`]: wire protocol (frame assembly, decoding, field layouts)
//! - [`device`]: command construction and response matching
//! - [`bridge`]: connection loop, telemetry publishing, motion policy
//! - [`transport`]: byte-level I/O (serial device link, UDP publisher)

pub mod bridge;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod transport;
