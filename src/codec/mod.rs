//! Orb wire protocol codec
//!
//! The robot speaks a binary framed protocol over its serial link. Every
//! frame starts with a fixed SOP1 byte; the SOP2 byte distinguishes the
//! two frame shapes:
//! - **Response frames** (SOP2 = 0xFF): replies to issued commands,
//!   carrying a response code and the echoed sequence number.
//! - **Async frames** (SOP2 = 0xFE): unsolicited events (telemetry,
//!   battery notifications, collisions), carrying an event id code.
//!
//! Inbound bytes arrive in chunks of arbitrary size and alignment; the
//! [`FrameAssembler`] reassembles them into complete frames, the frame
//! decoder verifies integrity, and the field codec interprets payloads
//! through the static [`ParserTable`].

pub mod assembler;
pub mod checksum;
pub mod field;
pub mod frame;
pub mod table;

pub use assembler::FrameAssembler;
pub use field::{decode_record, DecodedPayload, DecodedRecord, FieldValue, SensorMask};
pub use frame::{Frame, FrameHeader, FrameKind};
pub use table::{ParserEntry, ParserTable};

use std::fmt;

/// First start-of-packet byte, fixed for every frame
pub const SOP1: u8 = 0xFF;

/// Second start-of-packet byte for command responses
pub const SOP2_RESPONSE: u8 = 0xFF;

/// Second start-of-packet byte for asynchronous events
pub const SOP2_ASYNC: u8 = 0xFE;

/// Bytes before the payload: SOP1, SOP2 and three kind-specific bytes
pub const HEADER_SIZE: usize = 5;

/// Smallest possible frame: full header plus the checksum byte
pub const MIN_FRAME_SIZE: usize = 6;

/// Frame-level decode errors
///
/// None of these are fatal to the decoder: the assembler resets its
/// buffer and stays usable after any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is structurally valid but the checksum does not match.
    /// Expected on a noisy link; the frame is discarded.
    ChecksumMismatch { expected: u8, actual: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: computed {:#04X}, frame claims {:#04X}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for DecodeError {}
