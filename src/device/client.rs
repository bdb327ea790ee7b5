//! Device command client
//!
//! Owns the write half of the device link. Encodes requests with a
//! wrapping sequence number, transmits them, and completes the matching
//! waiter when the response frame comes back through the read loop.

use super::commands::{self, PermOptionFlags, Request, Rgb};
use crate::codec::{decode_record, frame, DecodedPayload, Frame, FrameHeader, ParserTable, SensorMask};
use crate::constants::{COMMAND_RETRY_DELAY_MS, COMMAND_RETRY_LIMIT};
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Shared handle to the streaming mask recorded by the last streaming
/// command; the session's decoder reads it for sensor-data frames
pub type SharedMask = Arc<Mutex<Option<SensorMask>>>;

/// Sends commands and matches responses by sequence number
pub struct DeviceClient {
    tx: mpsc::Sender<Bytes>,
    seq: AtomicU8,
    pending: Mutex<HashMap<u8, oneshot::Sender<Frame>>>,
    streaming_mask: SharedMask,
    command_timeout: Duration,
}

impl DeviceClient {
    pub fn new(tx: mpsc::Sender<Bytes>, streaming_mask: SharedMask, command_timeout: Duration) -> Self {
        Self {
            tx,
            seq: AtomicU8::new(0),
            pending: Mutex::new(HashMap::new()),
            streaming_mask,
            command_timeout,
        }
    }

    /// The mask recorded by the last streaming command
    pub fn streaming_mask(&self) -> Option<SensorMask> {
        *self.streaming_mask.lock()
    }

    /// Route an inbound response frame to its waiting command
    ///
    /// Returns false when no command was waiting on that sequence
    /// number (stale or unsolicited response).
    pub fn complete(&self, frame: &Frame) -> bool {
        let FrameHeader::Response { seq, .. } = frame.header else {
            return false;
        };
        match self.pending.lock().remove(&seq) {
            Some(waiter) => waiter.send(frame.clone()).is_ok(),
            None => false,
        }
    }

    /// Send one command and await its response frame
    pub async fn execute(&self, req: &Request) -> Result<Frame> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = oneshot::channel();
        self.pending.lock().insert(seq, done_tx);

        let bytes = frame::encode(req.did, req.cid, seq, &req.data);
        if self.tx.send(Bytes::from(bytes)).await.is_err() {
            self.pending.lock().remove(&seq);
            return Err(BridgeError::DeviceGone);
        }

        let frame = match tokio::time::timeout(self.command_timeout, done_rx).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(_)) | Err(_) => {
                self.pending.lock().remove(&seq);
                return Err(BridgeError::CommandTimeout { seq });
            }
        };

        match frame.header {
            FrameHeader::Response { code: 0x00, .. } => Ok(frame),
            FrameHeader::Response { code, .. } => Err(BridgeError::CommandFailed { code }),
            FrameHeader::Async { .. } => unreachable!("complete() only accepts responses"),
        }
    }

    /// Send one command, retrying on timeout
    pub async fn execute_retrying(&self, req: &Request) -> Result<Frame> {
        let mut attempt = 0;
        loop {
            match self.execute(req).await {
                Ok(frame) => return Ok(frame),
                Err(e @ BridgeError::DeviceGone) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > COMMAND_RETRY_LIMIT {
                        return Err(e);
                    }
                    tracing::warn!(attempt, "command failed ({}), retrying", e);
                    tokio::time::sleep(Duration::from_millis(COMMAND_RETRY_DELAY_MS)).await;
                }
            }
        }
    }

    /// Send a command and decode the response payload through the
    /// parser entry registered for it
    pub async fn query(&self, req: &Request) -> Result<DecodedPayload> {
        let frame = self.execute(req).await?;
        let entry = ParserTable::standard().response(req.did, req.cid);
        Ok(decode_record(entry, &frame, None))
    }

    // =========================================================================
    // Convenience commands
    // =========================================================================

    pub async fn ping(&self) -> Result<()> {
        self.execute(&commands::ping()).await.map(|_| ())
    }

    pub async fn set_color(&self, color: Rgb) -> Result<()> {
        self.execute(&commands::set_rgb_led(color, false)).await.map(|_| ())
    }

    pub async fn set_stabilization(&self, enabled: bool) -> Result<()> {
        self.execute(&commands::set_stabilization(enabled)).await.map(|_| ())
    }

    pub async fn set_power_notification(&self, enabled: bool) -> Result<()> {
        self.execute(&commands::set_power_notification(enabled))
            .await
            .map(|_| ())
    }

    pub async fn set_perm_option_flags(&self, flags: PermOptionFlags) -> Result<()> {
        self.execute(&commands::set_perm_option_flags(flags))
            .await
            .map(|_| ())
    }

    pub async fn get_power_state(&self) -> Result<DecodedPayload> {
        self.query(&commands::get_power_state()).await
    }

    /// Start gyro streaming and record the mask for the decoder
    pub async fn stream_gyroscope(&self, sps: u16) -> Result<()> {
        let (req, mask) = commands::stream_gyroscope(sps);
        self.execute(&req).await?;
        *self.streaming_mask.lock() = Some(mask);
        Ok(())
    }

    pub async fn sleep(&self, wakeup: u16, macro_id: u8, orb_basic_line: u16) -> Result<()> {
        self.execute(&commands::sleep(wakeup, macro_id, orb_basic_line))
            .await
            .map(|_| ())
    }
}
