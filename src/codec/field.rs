//! Typed field decoding
//!
//! A parser entry lists field descriptors; decoding walks the list over a
//! frame payload. Two addressing modes coexist:
//! - **Fixed-offset**: each field reads its own static byte range.
//! - **Mask-driven**: the caller-supplied streaming mask selects which
//!   sensor fields are present. A running cursor consumes two bytes per
//!   active field, and the field list repeats as a ring until the payload
//!   is exhausted, yielding one sample per cycle per active field.
//!
//! Descriptors are shared, read-only state: the running cursor lives on
//! the decode loop's stack, never on the descriptor.

use super::frame::Frame;
use super::table::ParserEntry;
use bytes::Bytes;

/// Which bit register of the streaming mask a sensor field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRegister {
    Mask1,
    Mask2,
}

/// Active-sensor bit registers for streaming decode
///
/// Supplied by whichever component issued the streaming command; not part
/// of the frame itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorMask {
    pub mask1: u32,
    pub mask2: u32,
}

impl SensorMask {
    fn register(&self, reg: MaskRegister) -> u32 {
        match reg {
            MaskRegister::Mask1 => self.mask1,
            MaskRegister::Mask2 => self.mask2,
        }
    }
}

/// Display range for a sensor field; samples above `top` are reinterpreted
/// as negative two's-complement values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRange {
    pub bottom: i32,
    pub top: i32,
}

/// How a field's bytes are located within the payload
#[derive(Debug, Clone, Copy)]
pub enum FieldLayout {
    /// Static byte range `[from, to)`; `to = None` reads to payload end
    Fixed { from: usize, to: Option<usize> },
    /// Present only when `bit` is set in the streaming mask register;
    /// consumes two bytes at the running cursor
    Masked {
        register: MaskRegister,
        bit: u32,
        sensor: &'static str,
        range: SensorRange,
        units: &'static str,
    },
}

/// Semantic type of a field value
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Unsigned big-endian integer
    Number,
    /// Unsigned integer rendered as an uppercase `0x` string
    HexNumber,
    /// Text; embedded NUL bytes are replaced with the character `0`
    Text,
    /// Owned copy of the raw bytes
    Raw,
    /// Integer looked up in a value table, optionally masked first
    Predefined {
        mask: Option<u64>,
        values: &'static [(u64, &'static str)],
    },
    /// Two's-complement signed integer over the field width
    Signed,
    /// Accumulating 16-bit sensor sample (mask-driven entries only)
    Sample,
}

/// Read-only field descriptor, shared across concurrent decodes
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub layout: FieldLayout,
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(u64),
    Hex(String),
    Text(String),
    Raw(Bytes),
    Predefined(&'static str),
    /// Predefined code with no table entry
    Unknown(u64),
    Signed(i64),
    /// Accumulated sensor samples, one per cycle within the frame
    Samples {
        sensor: &'static str,
        range: SensorRange,
        units: &'static str,
        values: Vec<i32>,
    },
    /// The field's byte range could not be read; siblings still decode
    Unparseable,
}

/// Outcome of payload decoding
#[derive(Debug, Clone)]
pub enum DecodedPayload {
    /// Structured record decoded through a parser entry
    Record(DecodedRecord),
    /// Payload passed through undecoded: empty payload, no registered
    /// entry, or a streaming entry with no mask supplied
    Raw(Bytes),
}

/// Field name to value mapping plus entry metadata and the source frame
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub desc: &'static str,
    pub event: Option<&'static str>,
    pub fields: Vec<(&'static str, FieldValue)>,
    pub frame: Frame,
}

impl DecodedRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// First sample of an accumulating sensor field, if present
    pub fn sample(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            FieldValue::Samples { values, .. } => values.first().copied(),
            _ => None,
        }
    }

    fn push_sample(
        &mut self,
        name: &'static str,
        sensor: &'static str,
        range: SensorRange,
        units: &'static str,
        value: i32,
    ) {
        for (n, v) in self.fields.iter_mut() {
            if *n == name {
                if let FieldValue::Samples { values, .. } = v {
                    values.push(value);
                }
                return;
            }
        }
        self.fields.push((
            name,
            FieldValue::Samples {
                sensor,
                range,
                units,
                values: vec![value],
            },
        ));
    }
}

/// Decode a frame payload through a parser entry
///
/// `mask` is consulted only by the sensor-streaming entry; a streaming
/// payload without a mask is returned untouched, since there is not
/// enough context to decode it.
pub fn decode_record(
    entry: Option<&ParserEntry>,
    frame: &Frame,
    mask: Option<SensorMask>,
) -> DecodedPayload {
    let Some(entry) = entry else {
        return DecodedPayload::Raw(frame.payload.clone());
    };
    if frame.payload.is_empty() {
        return DecodedPayload::Raw(frame.payload.clone());
    }
    if entry.requires_mask() && mask.is_none() {
        return DecodedPayload::Raw(frame.payload.clone());
    }
    // The mask applies only to the streaming entry; other entries always
    // use their fixed offsets.
    let mask = if entry.requires_mask() { mask } else { None };

    let mut record = DecodedRecord {
        desc: entry.desc,
        event: entry.event,
        fields: Vec::new(),
        frame: frame.clone(),
    };

    match mask {
        Some(ds) => decode_masked(entry, &frame.payload, ds, &mut record),
        None => {
            for desc in &entry.fields {
                record
                    .fields
                    .push((desc.name, decode_fixed(desc, &frame.payload)));
            }
        }
    }

    DecodedPayload::Record(record)
}

/// Decode one fixed-offset field from the payload
fn decode_fixed(desc: &FieldDescriptor, payload: &[u8]) -> FieldValue {
    let FieldLayout::Fixed { from, to } = desc.layout else {
        // A sample descriptor inside a fixed-offset walk is a table bug.
        tracing::warn!(field = desc.name, "sample field outside mask-driven decode");
        return FieldValue::Unparseable;
    };

    let to = to.unwrap_or(payload.len());
    let Some(slice) = payload.get(from..to) else {
        tracing::warn!(field = desc.name, from, to, "field range outside payload");
        return FieldValue::Unparseable;
    };
    if slice.is_empty() {
        return FieldValue::Unparseable;
    }

    decode_slice(&desc.kind, slice)
}

/// Interpret a byte slice according to the field kind
fn decode_slice(kind: &FieldKind, slice: &[u8]) -> FieldValue {
    let raw = be_uint(slice);
    match kind {
        FieldKind::Number => FieldValue::Number(raw),
        FieldKind::HexNumber => FieldValue::Hex(format!("0x{:X}", raw)),
        FieldKind::Text => {
            FieldValue::Text(String::from_utf8_lossy(slice).replace('\0', "0"))
        }
        FieldKind::Raw => FieldValue::Raw(Bytes::copy_from_slice(slice)),
        FieldKind::Predefined { mask, values } => {
            let code = mask.map_or(raw, |m| raw & m);
            match values.iter().find(|(c, _)| *c == code) {
                Some(&(_, name)) => FieldValue::Predefined(name),
                None => FieldValue::Unknown(code),
            }
        }
        FieldKind::Signed => {
            let width = 8 * slice.len() as u32;
            let value = raw as i64;
            if width < 64 && value >= 1i64 << (width - 1) {
                FieldValue::Signed(value - (1i64 << width))
            } else {
                FieldValue::Signed(value)
            }
        }
        // Samples only occur under a mask; reaching here is a table bug.
        FieldKind::Sample => FieldValue::Unparseable,
    }
}

/// Mask-driven decode: repeat the field list as a ring, consuming two
/// bytes per active field, until the payload runs out
fn decode_masked(entry: &ParserEntry, payload: &[u8], ds: SensorMask, record: &mut DecodedRecord) {
    let mut cursor = 0usize;
    while cursor < payload.len() {
        let before = cursor;
        for desc in &entry.fields {
            let FieldLayout::Masked {
                register,
                bit,
                sensor,
                range,
                units,
            } = desc.layout
            else {
                continue;
            };
            if ds.register(register) & bit == 0 {
                continue;
            }
            let Some(slice) = payload.get(cursor..cursor + 2) else {
                // Trailing odd byte cannot form a sample.
                return;
            };
            cursor += 2;
            record.push_sample(desc.name, sensor, range, units, sample_value(slice, range));
        }
        // Zero-bit mask: nothing consumed this cycle, stop instead of
        // looping forever.
        if cursor == before {
            break;
        }
    }
}

/// A 16-bit sample, reinterpreted as negative when above the range top
fn sample_value(slice: &[u8], range: SensorRange) -> i32 {
    let raw = i32::from(u16::from_be_bytes([slice[0], slice[1]]));
    if raw > range.top {
        raw - 0x1_0000
    } else {
        raw
    }
}

/// Big-endian unsigned integer over an arbitrary-width slice
fn be_uint(slice: &[u8]) -> u64 {
    slice.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::table::ParserTable;
    use crate::codec::{Frame, FrameHeader};

    fn async_frame(id_code: u8, payload: &[u8]) -> Frame {
        Frame {
            sop1: 0xFF,
            sop2: 0xFE,
            header: FrameHeader::Async { id_code },
            dlen: payload.len() + 1,
            payload: Bytes::copy_from_slice(payload),
            checksum: 0,
        }
    }

    fn response_frame(payload: &[u8]) -> Frame {
        Frame {
            sop1: 0xFF,
            sop2: 0xFF,
            header: FrameHeader::Response { code: 0, seq: 1 },
            dlen: payload.len() + 1,
            payload: Bytes::copy_from_slice(payload),
            checksum: 0,
        }
    }

    #[test]
    fn signed_one_byte() {
        assert_eq!(decode_slice(&FieldKind::Signed, &[0xFF]), FieldValue::Signed(-1));
        assert_eq!(decode_slice(&FieldKind::Signed, &[0x7F]), FieldValue::Signed(127));
    }

    #[test]
    fn signed_two_bytes() {
        assert_eq!(
            decode_slice(&FieldKind::Signed, &[0x80, 0x00]),
            FieldValue::Signed(-32768)
        );
        assert_eq!(
            decode_slice(&FieldKind::Signed, &[0x7F, 0xFF]),
            FieldValue::Signed(32767)
        );
    }

    #[test]
    fn hex_renders_uppercase() {
        assert_eq!(
            decode_slice(&FieldKind::HexNumber, &[0x0A, 0xBC]),
            FieldValue::Hex("0xABC".into())
        );
    }

    #[test]
    fn text_replaces_nul() {
        assert_eq!(
            decode_slice(&FieldKind::Text, b"Orb\0\0"),
            FieldValue::Text("Orb00".into())
        );
    }

    #[test]
    fn predefined_lookup_and_miss() {
        const STATES: &[(u64, &str)] = &[(1, "Charging"), (2, "OK")];
        let kind = FieldKind::Predefined {
            mask: None,
            values: STATES,
        };
        assert_eq!(decode_slice(&kind, &[0x02]), FieldValue::Predefined("OK"));
        assert_eq!(decode_slice(&kind, &[0x09]), FieldValue::Unknown(9));
    }

    #[test]
    fn predefined_applies_mask() {
        const BITS: &[(u64, &str)] = &[(0x04, "flag")];
        let kind = FieldKind::Predefined {
            mask: Some(0x0F),
            values: BITS,
        };
        // High nibble masked away before lookup
        assert_eq!(decode_slice(&kind, &[0xF4]), FieldValue::Predefined("flag"));
    }

    #[test]
    fn out_of_range_field_is_unparseable() {
        let desc = FieldDescriptor {
            name: "beyond",
            kind: FieldKind::Number,
            layout: FieldLayout::Fixed {
                from: 10,
                to: Some(12),
            },
        };
        assert_eq!(decode_fixed(&desc, &[0x01, 0x02]), FieldValue::Unparseable);
    }

    #[test]
    fn unparseable_field_does_not_abort_siblings() {
        // Power state response is 8 bytes; feed only 2 so later fields
        // fall outside the payload.
        let table = ParserTable::standard();
        let entry = table.response(0x00, 0x20);
        let frame = response_frame(&[0x01, 0x02]);
        let DecodedPayload::Record(record) = decode_record(entry, &frame, None) else {
            panic!("expected record");
        };
        assert_eq!(record.get("recVer"), Some(&FieldValue::Number(1)));
        assert_eq!(record.get("batteryVoltage"), Some(&FieldValue::Unparseable));
    }

    #[test]
    fn no_entry_passes_payload_through() {
        let frame = async_frame(0x7E, &[0x01, 0x02]);
        match decode_record(None, &frame, None) {
            DecodedPayload::Raw(raw) => assert_eq!(raw.as_ref(), &[0x01, 0x02]),
            _ => panic!("expected raw pass-through"),
        }
    }

    #[test]
    fn empty_payload_passes_through() {
        let table = ParserTable::standard();
        let frame = async_frame(0x01, &[]);
        match decode_record(table.event(0x01), &frame, None) {
            DecodedPayload::Raw(raw) => assert!(raw.is_empty()),
            _ => panic!("expected raw pass-through"),
        }
    }

    #[test]
    fn streaming_without_mask_passes_through() {
        let table = ParserTable::standard();
        let frame = async_frame(0x03, &[0x00, 0x10, 0x00, 0x20]);
        match decode_record(table.event(0x03), &frame, None) {
            DecodedPayload::Raw(raw) => assert_eq!(raw.len(), 4),
            _ => panic!("expected raw pass-through"),
        }
    }

    #[test]
    fn mask_selects_and_accumulates() {
        let table = ParserTable::standard();
        // xGyro (0x1000) and zGyro (0x0400) active, two sample cycles.
        let mask = SensorMask {
            mask1: 0x0000_1400,
            mask2: 0,
        };
        let payload = [
            0x00, 0x0A, // xGyro cycle 1
            0xFF, 0xFF, // zGyro cycle 1 (-1)
            0x00, 0x0B, // xGyro cycle 2
            0x00, 0x2A, // zGyro cycle 2
        ];
        let frame = async_frame(0x03, &payload);
        let DecodedPayload::Record(record) = decode_record(table.event(0x03), &frame, Some(mask))
        else {
            panic!("expected record");
        };

        match record.get("xGyro") {
            Some(FieldValue::Samples { values, units, .. }) => {
                assert_eq!(values, &vec![10, 11]);
                assert_eq!(*units, "0.1dps");
            }
            other => panic!("xGyro: {:?}", other),
        }
        match record.get("zGyro") {
            Some(FieldValue::Samples { values, .. }) => assert_eq!(values, &vec![-1, 42]),
            other => panic!("zGyro: {:?}", other),
        }
        // Inactive fields never appear
        assert!(record.get("yGyro").is_none());
    }

    #[test]
    fn zero_bit_mask_terminates() {
        let table = ParserTable::standard();
        let mask = SensorMask { mask1: 0, mask2: 0 };
        let frame = async_frame(0x03, &[0x01, 0x02, 0x03, 0x04]);
        let DecodedPayload::Record(record) = decode_record(table.event(0x03), &frame, Some(mask))
        else {
            panic!("expected record");
        };
        assert!(record.fields.is_empty());
    }

    #[test]
    fn sample_above_range_top_goes_negative() {
        let range = SensorRange {
            bottom: -32768,
            top: 32767,
        };
        assert_eq!(sample_value(&[0x00, 0x10], range), 16);
        let narrow = SensorRange {
            bottom: -2048,
            top: 2047,
        };
        // 0xFFFF > 2047, reinterpreted as -1
        assert_eq!(sample_value(&[0xFF, 0xFF], narrow), -1);
    }
}
