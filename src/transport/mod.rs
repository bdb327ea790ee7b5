//! Transport abstraction for byte-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: how bytes flow (serial device link, UDP publisher)
//! - **Codec**: how frames are assembled/decoded (handled separately)
//!
//! Each transport manages its own execution model internally:
//! - Serial: blocking threads for low latency
//! - UDP: async tokio tasks

pub mod serial;
pub mod udp;

pub use serial::SerialTransport;
pub use udp::UdpPublisher;

use bytes::Bytes;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

/// Channels for bidirectional communication with a transport
///
/// The transport owns the underlying I/O (socket, serial port) and
/// communicates via these channels. When the transport stops (shutdown
/// or error), it closes the channels.
pub struct TransportChannels {
    /// Receive raw bytes from the transport
    ///
    /// Returns `None` when the transport has stopped.
    pub rx: mpsc::Receiver<Bytes>,

    /// Send raw bytes to the transport
    pub tx: mpsc::Sender<Bytes>,
}

/// Trait for spawnable transports
///
/// A transport abstracts byte-level I/O. It does NOT handle frame
/// assembly (the codec's job) or reconnection (the bridge's job).
///
/// # Lifecycle
///
/// 1. Create transport with configuration
/// 2. Call `spawn()` to start I/O in background
/// 3. Use returned channels for communication
/// 4. Transport runs until `shutdown` is set or a fatal error occurs,
///    then closes its channels
pub trait Transport: Send + 'static {
    /// Spawn the transport in background
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be initialized
    /// (port not found, bind failed).
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels>;
}
