//! Serial transport for the device link
//!
//! Uses blocking threads for low-latency I/O:
//! - Reader thread: reads from the serial port, sends chunks to channel
//! - Writer thread: receives from channel, writes to the serial port
//!
//! The transport stops when:
//! - `shutdown` flag is set
//! - The port disconnects (detected via consecutive read errors)
//! - A write error occurs

use super::{Transport, TransportChannels};
use crate::constants::{CHANNEL_CAPACITY, SERIAL_BUFFER_SIZE, SERIAL_DISCONNECT_THRESHOLD};
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Serial transport for the device link
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
        }
    }

    /// Names of all serial ports currently present on the system
    pub fn available_ports() -> Vec<String> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.port_name)
            .collect()
    }

    fn open(&self) -> Result<Box<dyn serialport::SerialPort>> {
        serialport::new(&self.port_name, self.baud_rate)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| BridgeError::SerialOpen {
                port: self.port_name.clone(),
                source: std::io::Error::other(e.to_string()),
            })
    }
}

impl Transport for SerialTransport {
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let reader = self.open()?;
        let writer = reader.try_clone().map_err(|e| BridgeError::SerialOpen {
            port: self.port_name.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;

        let (in_tx, in_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        let port_name = self.port_name.clone();
        let shutdown_rx = shutdown.clone();
        std::thread::spawn(move || read_loop(reader, in_tx, shutdown_rx, &port_name));

        let port_name = self.port_name;
        let shutdown_tx = shutdown;
        std::thread::spawn(move || write_loop(writer, out_rx, shutdown_tx, &port_name));

        Ok(TransportChannels {
            rx: in_rx,
            tx: out_tx,
        })
    }
}

/// Read chunks until shutdown or the port disappears
fn read_loop(
    mut port: Box<dyn serialport::SerialPort>,
    in_tx: mpsc::Sender<Bytes>,
    shutdown: Arc<AtomicBool>,
    port_name: &str,
) {
    let mut buf = [0u8; SERIAL_BUFFER_SIZE];
    let mut consecutive_errors = 0u32;

    while !shutdown.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                consecutive_errors = 0;
                if in_tx.blocking_send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    // Receiver dropped, session is over
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= SERIAL_DISCONNECT_THRESHOLD {
                    tracing::info!(port = port_name, "serial port lost: {}", e);
                    break;
                }
            }
        }
    }
    // Dropping in_tx closes the channel, signalling the session to end.
}

/// Write outgoing frames until shutdown or a write error
fn write_loop(
    mut port: Box<dyn serialport::SerialPort>,
    mut out_rx: mpsc::Receiver<Bytes>,
    shutdown: Arc<AtomicBool>,
    port_name: &str,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match out_rx.blocking_recv() {
            Some(data) => {
                if let Err(e) = port.write_all(&data).and_then(|_| port.flush()) {
                    tracing::info!(port = port_name, "serial write failed: {}", e);
                    break;
                }
            }
            None => break,
        }
    }
}
