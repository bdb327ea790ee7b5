//! Stateful frame assembly from a chunked byte stream
//!
//! Serial reads deliver bytes in chunks of arbitrary size and alignment:
//! a chunk may hold half a frame, exactly one, or one and a half. The
//! assembler owns the carry-over buffer for one connection and emits at
//! most one frame per ingested chunk, keeping surplus bytes for the next
//! call.

use super::frame::Frame;
use super::{DecodeError, MIN_FRAME_SIZE};

/// Reassembles frames from inbound byte chunks
///
/// One assembler per connection; its buffer must only ever be touched by
/// one ingest call at a time. Never share one across connections.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    partial: Vec<u8>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one inbound chunk
    ///
    /// Returns `Ok(Some(frame))` when the chunk completes a frame,
    /// `Ok(None)` when more bytes are needed or garbage was dropped, and
    /// `Err` when a structurally complete frame failed its checksum.
    /// The assembler remains usable after every outcome.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<Option<Frame>, DecodeError> {
        // A fresh complete frame always wins over a stale fragment: at
        // most one frame is reconstructed at a time.
        if is_complete(chunk) {
            self.partial.clear();
            return self.extract(chunk.to_vec());
        }

        let mut buffer = std::mem::take(&mut self.partial);
        buffer.extend_from_slice(chunk);

        if is_garbage(&buffer) {
            tracing::debug!(len = buffer.len(), "dropping bytes without a valid SOP pair");
            return Ok(None);
        }

        if is_complete(&buffer) {
            return self.extract(buffer);
        }

        // Valid prefix, not enough bytes yet.
        self.partial = buffer;
        Ok(None)
    }

    /// Decode the frame at the head of `buffer`, keeping any surplus
    /// trailing bytes as the next partial
    fn extract(&mut self, buffer: Vec<u8>) -> Result<Option<Frame>, DecodeError> {
        let size = Frame::expected_size(&buffer);
        if buffer.len() > size {
            self.partial = buffer[size..].to_vec();
        }

        match Frame::decode(&buffer) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                self.partial.clear();
                Err(e)
            }
        }
    }
}

/// Structurally complete: minimum size, valid SOP pair, and at least as
/// many bytes as the declared length requires
fn is_complete(buffer: &[u8]) -> bool {
    buffer.len() >= MIN_FRAME_SIZE
        && Frame::kind(buffer).is_some()
        && buffer.len() >= Frame::expected_size(buffer)
}

/// Two or more bytes that do not begin with a valid SOP pair are
/// unrecoverable garbage; shorter prefixes may still grow into a frame
fn is_garbage(buffer: &[u8]) -> bool {
    buffer.len() >= 2 && Frame::kind(buffer).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameHeader;

    const RESPONSE: [u8; 6] = [0xFF, 0xFF, 0x00, 0x01, 0x01, 0xFD];
    const ASYNC: [u8; 8] = [0xFF, 0xFE, 0x03, 0x00, 0x03, 0xAA, 0xBB, 0x94];

    #[test]
    fn whole_frame_in_one_chunk() {
        let mut asm = FrameAssembler::new();
        let frame = asm.ingest(&RESPONSE).unwrap().expect("frame");
        assert_eq!(frame.header, FrameHeader::Response { code: 0, seq: 1 });
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.ingest(&ASYNC[..3]).unwrap(), None);
        assert_eq!(asm.ingest(&ASYNC[3..5]).unwrap(), None);
        let frame = asm.ingest(&ASYNC[5..]).unwrap().expect("frame");
        assert_eq!(frame.payload.as_ref(), &[0xAA, 0xBB]);
    }

    #[test]
    fn byte_at_a_time() {
        let mut asm = FrameAssembler::new();
        let mut decoded = None;
        for &b in &ASYNC {
            if let Some(frame) = asm.ingest(&[b]).unwrap() {
                decoded = Some(frame);
            }
        }
        assert_eq!(decoded.expect("frame").payload.as_ref(), &[0xAA, 0xBB]);
    }

    #[test]
    fn garbage_is_dropped_silently() {
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.ingest(&[0x12, 0x34, 0x56]).unwrap(), None);
        // Assembler still works afterwards
        assert!(asm.ingest(&RESPONSE).unwrap().is_some());
    }

    #[test]
    fn garbage_discards_pending_fragment() {
        let mut asm = FrameAssembler::new();
        // A lone 0xFF could still become a frame...
        assert_eq!(asm.ingest(&[0xFF]).unwrap(), None);
        // ...but a bad SOP2 proves the accumulation is garbage.
        assert_eq!(asm.ingest(&[0x42]).unwrap(), None);
        // Buffer was cleared: the next frame decodes cleanly.
        assert!(asm.ingest(&ASYNC).unwrap().is_some());
    }

    #[test]
    fn fresh_frame_wins_over_stale_fragment() {
        let mut asm = FrameAssembler::new();
        // Leave a valid-looking fragment behind
        assert_eq!(asm.ingest(&RESPONSE[..4]).unwrap(), None);
        // A complete frame in its own chunk drops the stale fragment
        let frame = asm.ingest(&ASYNC).unwrap().expect("frame");
        assert_eq!(frame.header, FrameHeader::Async { id_code: 0x03 });
    }

    #[test]
    fn surplus_bytes_carry_over() {
        let mut asm = FrameAssembler::new();
        // One full frame plus the start of the next
        let mut stream = RESPONSE.to_vec();
        stream.extend_from_slice(&ASYNC[..4]);

        let first = asm.ingest(&stream).unwrap().expect("frame");
        assert_eq!(first.header, FrameHeader::Response { code: 0, seq: 1 });

        // Remainder of the second frame completes it
        let second = asm.ingest(&ASYNC[4..]).unwrap().expect("frame");
        assert_eq!(second.header, FrameHeader::Async { id_code: 0x03 });
    }

    #[test]
    fn checksum_failure_surfaces_and_resets() {
        let mut corrupt = ASYNC;
        corrupt[5] = 0xAB; // flip one payload byte
        let mut asm = FrameAssembler::new();
        assert!(asm.ingest(&corrupt).is_err());
        // Assembler recovered: next frame decodes
        assert!(asm.ingest(&RESPONSE).unwrap().is_some());
    }

    #[test]
    fn short_fragment_is_retained() {
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.ingest(&RESPONSE[..2]).unwrap(), None);
        assert_eq!(asm.ingest(&RESPONSE[2..]).unwrap().is_some(), true);
    }
}
