//! Device command layer
//!
//! Builds request frames for the orb's command set and matches response
//! frames back to the commands that caused them. Framing itself lives in
//! [`crate::codec`]; this layer only decides what goes in the payload.

pub mod client;
pub mod commands;

pub use client::DeviceClient;
pub use commands::{PermOptionFlags, Request, Rgb};
