//! Frame decoding and construction
//!
//! Wire format (all integers big-endian):
//!
//! | Offset | Response frame       | Async frame        |
//! |--------|----------------------|--------------------|
//! | 0      | SOP1 = 0xFF          | 0xFF               |
//! | 1      | SOP2 = 0xFF          | 0xFE               |
//! | 2      | response code        | event id code      |
//! | 3      | sequence number      | length high byte   |
//! | 4      | length (1 byte)      | length low byte    |
//! | 5..    | payload              | payload            |
//! | last   | checksum             | checksum           |
//!
//! The declared length (DLEN) counts the payload plus the checksum byte,
//! so the total frame size is always `HEADER_SIZE + DLEN`. The checksum
//! covers bytes 2 through the end of the payload.

use super::{checksum, DecodeError, HEADER_SIZE, SOP1, SOP2_ASYNC, SOP2_RESPONSE};
use bytes::Bytes;

/// Which of the two frame shapes a buffer carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Reply to a previously issued command
    Response,
    /// Unsolicited event (telemetry, notifications)
    Async,
}

/// Kind-specific header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeader {
    /// Response code and the sequence number of the command it answers
    Response { code: u8, seq: u8 },
    /// Event id code identifying the async event type
    Async { id_code: u8 },
}

/// A complete, checksum-verified frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub sop1: u8,
    pub sop2: u8,
    pub header: FrameHeader,
    /// Declared length: payload plus checksum byte
    pub dlen: usize,
    pub payload: Bytes,
    pub checksum: u8,
}

impl Frame {
    /// Frame kind from the SOP pair, or None if the buffer does not
    /// start with a valid header
    pub fn kind(buffer: &[u8]) -> Option<FrameKind> {
        if buffer.first() != Some(&SOP1) {
            return None;
        }
        match buffer.get(1) {
            Some(&SOP2_RESPONSE) => Some(FrameKind::Response),
            Some(&SOP2_ASYNC) => Some(FrameKind::Async),
            _ => None,
        }
    }

    /// Declared length for a buffer holding at least a full header
    ///
    /// Response frames carry a single length byte; async frames spread
    /// a 16-bit length across offsets 3 and 4.
    pub fn declared_len(buffer: &[u8]) -> usize {
        if buffer[1] == SOP2_RESPONSE {
            buffer[4] as usize
        } else {
            u16::from_be_bytes([buffer[3], buffer[4]]) as usize
        }
    }

    /// Total frame size in bytes for a buffer holding a full header
    pub fn expected_size(buffer: &[u8]) -> usize {
        HEADER_SIZE + Self::declared_len(buffer)
    }

    /// Decode one frame from the start of `buffer`
    ///
    /// The buffer must already be known to hold a complete frame (the
    /// [`FrameAssembler`](super::FrameAssembler) guarantees this). The
    /// only failure mode is a checksum mismatch, which callers treat as
    /// link noise rather than a hard error.
    pub fn decode(buffer: &[u8]) -> Result<Frame, DecodeError> {
        // DLEN counts the checksum byte, so a zero DLEN is never
        // well-formed; clamp it to keep the slices below in range.
        let dlen = Self::declared_len(buffer).max(1);
        let payload_end = HEADER_SIZE + dlen - 1;

        let claimed = buffer[payload_end];
        let expected = checksum::sum(&buffer[2..payload_end]);
        if expected != claimed {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                actual: claimed,
            });
        }

        let header = if buffer[1] == SOP2_RESPONSE {
            FrameHeader::Response {
                code: buffer[2],
                seq: buffer[3],
            }
        } else {
            FrameHeader::Async { id_code: buffer[2] }
        };

        Ok(Frame {
            sop1: buffer[0],
            sop2: buffer[1],
            header,
            dlen,
            payload: Bytes::copy_from_slice(&buffer[HEADER_SIZE..payload_end]),
            checksum: claimed,
        })
    }
}

/// Build an outgoing command frame
///
/// Assembles `[SOP1, SOP2, did, cid, seq, dlen, data.., checksum]` where
/// `dlen = data.len() + 1` and the checksum covers everything after the
/// SOP bytes. Outgoing frames always use the response-sync SOP2 marker.
pub fn encode(did: u8, cid: u8, seq: u8, data: &[u8]) -> Vec<u8> {
    let dlen = data.len() + 1;
    debug_assert!(dlen <= 0xFF, "command payload exceeds one-byte DLEN");

    let mut frame = Vec::with_capacity(HEADER_SIZE + dlen);
    frame.push(SOP1);
    frame.push(SOP2_RESPONSE);
    frame.push(did);
    frame.push(cid);
    frame.push(seq);
    frame.push(dlen as u8);
    frame.extend_from_slice(data);
    frame.push(checksum::sum(&frame[2..]));
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_dispatch() {
        assert_eq!(Frame::kind(&[0xFF, 0xFF]), Some(FrameKind::Response));
        assert_eq!(Frame::kind(&[0xFF, 0xFE]), Some(FrameKind::Async));
        assert_eq!(Frame::kind(&[0xFF, 0xFD]), None);
        assert_eq!(Frame::kind(&[0xFE, 0xFF]), None);
        assert_eq!(Frame::kind(&[0xFF]), None);
        assert_eq!(Frame::kind(&[]), None);
    }

    #[test]
    fn declared_len_response_vs_async() {
        // Response: single length byte at offset 4
        assert_eq!(Frame::declared_len(&[0xFF, 0xFF, 0x00, 0x01, 0x05]), 5);
        // Async: 16-bit big-endian across offsets 3-4
        assert_eq!(Frame::declared_len(&[0xFF, 0xFE, 0x03, 0x01, 0x05]), 0x0105);
    }

    #[test]
    fn decode_empty_response() {
        let frame = Frame::decode(&[0xFF, 0xFF, 0x00, 0x01, 0x01, 0xFD]).unwrap();
        assert_eq!(frame.sop1, 0xFF);
        assert_eq!(frame.sop2, 0xFF);
        assert_eq!(frame.header, FrameHeader::Response { code: 0x00, seq: 0x01 });
        assert_eq!(frame.dlen, 1);
        assert!(frame.payload.is_empty());
        assert_eq!(frame.checksum, 0xFD);
    }

    #[test]
    fn decode_async_with_payload() {
        let frame = Frame::decode(&[0xFF, 0xFE, 0x03, 0x00, 0x03, 0xAA, 0xBB, 0x94]).unwrap();
        assert_eq!(frame.sop2, 0xFE);
        assert_eq!(frame.header, FrameHeader::Async { id_code: 0x03 });
        assert_eq!(frame.dlen, 3);
        assert_eq!(frame.payload.as_ref(), &[0xAA, 0xBB]);
        assert_eq!(frame.checksum, 0x94);
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let err = Frame::decode(&[0xFF, 0xFF, 0x00, 0x01, 0x01, 0xFC]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ChecksumMismatch {
                expected: 0xFD,
                actual: 0xFC
            }
        );
    }

    #[test]
    fn encode_ping_shape() {
        // did=0x00 cid=0x01 seq=0x01, no data
        let bytes = encode(0x00, 0x01, 0x01, &[]);
        assert_eq!(bytes, vec![0xFF, 0xFF, 0x00, 0x01, 0x01, 0x01, 0xFC]);
    }

    #[test]
    fn encode_with_data_roundtrips() {
        let bytes = encode(0x02, 0x20, 0x05, &[0x00, 0xFF, 0x00, 0x01]);
        assert_eq!(bytes[5] as usize, 5); // dlen = 4 data + 1 checksum
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.payload.as_ref(), &[0x00, 0xFF, 0x00, 0x01]);
    }

    #[test]
    fn encode_checksum_verifies() {
        let bytes = encode(0x00, 0x01, 0x34, &[]);
        let end = bytes.len() - 1;
        assert!(super::checksum::verify(&bytes[2..end], bytes[end]));
    }
}
