//! Static parser table
//!
//! Maps command identifiers (device-id:command-id pairs, lowercase hex)
//! and async event id codes to ordered field layouts. Built once and
//! shared read-only across all decodes; descriptors are never mutated at
//! decode time.

use super::field::{FieldDescriptor, FieldKind, FieldLayout, MaskRegister, SensorRange};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Event id code of the sensor data streaming event, the only entry that
/// needs a caller-supplied mask to decode
pub const DATA_STREAMING_EVENT: u8 = 0x03;

/// Ordered field layout plus metadata for one command or event
#[derive(Debug)]
pub struct ParserEntry {
    pub desc: &'static str,
    /// Async event id code, for event entries
    pub id_code: Option<u8>,
    /// Issuing device/command ids, for response entries
    pub did: Option<u8>,
    pub cid: Option<u8>,
    /// Event name tag surfaced to the application
    pub event: Option<&'static str>,
    pub fields: Vec<FieldDescriptor>,
}

impl ParserEntry {
    /// Whether decoding this entry needs the active-sensor mask
    pub fn requires_mask(&self) -> bool {
        self.id_code == Some(DATA_STREAMING_EVENT)
    }
}

/// Lookup structure for parser entries
///
/// Response entries are keyed by `"did:cid"` in lowercase hex; async
/// entries by their event id code.
pub struct ParserTable {
    responses: HashMap<String, ParserEntry>,
    events: HashMap<u8, ParserEntry>,
}

impl ParserTable {
    /// The built-in table for the orb's command set
    pub fn standard() -> &'static ParserTable {
        static TABLE: OnceLock<ParserTable> = OnceLock::new();
        TABLE.get_or_init(build_standard)
    }

    pub fn response(&self, did: u8, cid: u8) -> Option<&ParserEntry> {
        self.responses.get(&response_key(did, cid))
    }

    pub fn event(&self, id_code: u8) -> Option<&ParserEntry> {
        self.events.get(&id_code)
    }
}

/// Response entries are keyed by the issuing command pair
pub fn response_key(did: u8, cid: u8) -> String {
    format!("{:x}:{:x}", did, cid)
}

// =============================================================================
// Descriptor constructors
// =============================================================================

fn fixed(name: &'static str, kind: FieldKind, from: usize, to: usize) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind,
        layout: FieldLayout::Fixed {
            from,
            to: Some(to),
        },
    }
}

/// Field reading from `from` to the end of the payload
fn tail(name: &'static str, kind: FieldKind, from: usize) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind,
        layout: FieldLayout::Fixed { from, to: None },
    }
}

fn sensor(
    name: &'static str,
    register: MaskRegister,
    bit: u32,
    sensor: &'static str,
    range: (i32, i32),
    units: &'static str,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind: FieldKind::Sample,
        layout: FieldLayout::Masked {
            register,
            bit,
            sensor,
            range: SensorRange {
                bottom: range.0,
                top: range.1,
            },
            units,
        },
    }
}

// =============================================================================
// Standard table contents
// =============================================================================

/// Battery state codes shared by the power state response and the power
/// notification event
const BATTERY_STATES: &[(u64, &str)] = &[
    (0x01, "Battery Charging"),
    (0x02, "Battery OK"),
    (0x03, "Battery Low"),
    (0x04, "Battery Critical"),
];

fn build_standard() -> ParserTable {
    let mut responses = HashMap::new();
    let mut events = HashMap::new();

    let mut response = |did: u8, cid: u8, desc: &'static str, fields: Vec<FieldDescriptor>| {
        responses.insert(
            response_key(did, cid),
            ParserEntry {
                desc,
                id_code: None,
                did: Some(did),
                cid: Some(cid),
                event: None,
                fields,
            },
        );
    };

    response(
        0x00,
        0x02,
        "Version Info",
        vec![
            fixed("recv", FieldKind::Number, 0, 1),
            fixed("model", FieldKind::HexNumber, 1, 2),
            fixed("hardware", FieldKind::Number, 2, 3),
            fixed("mainAppVersion", FieldKind::Number, 3, 4),
            fixed("mainAppRevision", FieldKind::Number, 4, 5),
            fixed("bootloaderVersion", FieldKind::HexNumber, 5, 6),
            fixed("apiMajor", FieldKind::Number, 6, 7),
            fixed("apiMinor", FieldKind::Number, 7, 8),
        ],
    );

    response(
        0x00,
        0x11,
        "Bluetooth Info",
        vec![
            fixed("name", FieldKind::Text, 0, 16),
            fixed("btAddress", FieldKind::Text, 16, 28),
            fixed("idColors", FieldKind::Raw, 29, 32),
        ],
    );

    response(
        0x00,
        0x20,
        "Power State",
        vec![
            fixed("recVer", FieldKind::Number, 0, 1),
            fixed(
                "batteryState",
                FieldKind::Predefined {
                    mask: None,
                    values: BATTERY_STATES,
                },
                1,
                2,
            ),
            fixed("batteryVoltage", FieldKind::Number, 2, 4),
            fixed("chargeCount", FieldKind::Number, 4, 6),
            fixed("secondsSinceCharge", FieldKind::Number, 6, 8),
        ],
    );

    response(
        0x02,
        0x15,
        "Read Locator",
        vec![
            fixed("xPos", FieldKind::Signed, 0, 2),
            fixed("yPos", FieldKind::Signed, 2, 4),
            fixed("xVel", FieldKind::Signed, 4, 6),
            fixed("yVel", FieldKind::Signed, 6, 8),
            fixed("sog", FieldKind::Number, 8, 10),
        ],
    );

    response(
        0x02,
        0x22,
        "RGB LED Color",
        vec![
            fixed("color", FieldKind::HexNumber, 0, 3),
            fixed("red", FieldKind::Number, 0, 1),
            fixed("green", FieldKind::Number, 1, 2),
            fixed("blue", FieldKind::Number, 2, 3),
        ],
    );

    let mut event =
        |id_code: u8, desc: &'static str, name: &'static str, fields: Vec<FieldDescriptor>| {
            events.insert(
                id_code,
                ParserEntry {
                    desc,
                    id_code: Some(id_code),
                    did: None,
                    cid: None,
                    event: Some(name),
                    fields,
                },
            );
        };

    event(
        0x01,
        "Power Notification",
        "battery",
        vec![fixed(
            "state",
            FieldKind::Predefined {
                mask: None,
                values: BATTERY_STATES,
            },
            0,
            1,
        )],
    );

    event(
        0x02,
        "Level 1 Diagnostic",
        "level1Diagnostic",
        vec![tail("report", FieldKind::Raw, 0)],
    );

    event(
        DATA_STREAMING_EVENT,
        "Sensor Data Streaming",
        "sensorData",
        sensor_fields(),
    );

    event(
        0x05,
        "Pre-Sleep Warning",
        "preSleepWarning",
        vec![tail("body", FieldKind::Raw, 0)],
    );

    event(
        0x07,
        "Collision Detected",
        "collision",
        vec![
            fixed("xImpact", FieldKind::Signed, 0, 2),
            fixed("yImpact", FieldKind::Signed, 2, 4),
            fixed("zImpact", FieldKind::Signed, 4, 6),
            fixed("axis", FieldKind::Number, 6, 7),
            fixed("xMagnitude", FieldKind::Number, 7, 9),
            fixed("yMagnitude", FieldKind::Number, 9, 11),
            fixed("speed", FieldKind::Number, 11, 12),
            fixed("timestamp", FieldKind::Number, 12, 16),
        ],
    );

    event(
        0x09,
        "orbBasic Print Message",
        "obPrint",
        vec![tail("message", FieldKind::Text, 0)],
    );

    event(
        0x0A,
        "orbBasic ASCII Error",
        "asciiError",
        vec![tail("message", FieldKind::Text, 0)],
    );

    ParserTable { responses, events }
}

/// Sensor fields for the streaming event, in wire order
///
/// The bit positions and display ranges come from the device's streaming
/// mask registers; fields are emitted on the wire in exactly this order
/// for whichever bits are active.
fn sensor_fields() -> Vec<FieldDescriptor> {
    use MaskRegister::{Mask1, Mask2};

    vec![
        sensor("xAccelRaw", Mask1, 0x8000_0000, "accelerometer axis X, raw", (-2048, 2047), "4mg"),
        sensor("yAccelRaw", Mask1, 0x4000_0000, "accelerometer axis Y, raw", (-2048, 2047), "4mg"),
        sensor("zAccelRaw", Mask1, 0x2000_0000, "accelerometer axis Z, raw", (-2048, 2047), "4mg"),
        sensor("xGyroRaw", Mask1, 0x1000_0000, "gyro axis X, raw", (-32768, 32767), "0.068degrees"),
        sensor("yGyroRaw", Mask1, 0x0800_0000, "gyro axis Y, raw", (-32768, 32767), "0.068degrees"),
        sensor("zGyroRaw", Mask1, 0x0400_0000, "gyro axis Z, raw", (-32768, 32767), "0.068degrees"),
        sensor("rMotorBackEmfRaw", Mask1, 0x0040_0000, "right motor back EMF, raw", (-32768, 32767), "22.5cm"),
        sensor("lMotorBackEmfRaw", Mask1, 0x0020_0000, "left motor back EMF, raw", (-32768, 32767), "22.5cm"),
        sensor("lMotorPwmRaw", Mask1, 0x0010_0000, "left motor PWM, raw", (-2048, 2047), "dutyCycle"),
        sensor("rMotorPwmRaw", Mask1, 0x0008_0000, "right motor PWM, raw", (-2048, 2047), "dutyCycle"),
        sensor("pitch", Mask1, 0x0004_0000, "IMU pitch angle, filtered", (-179, 180), "degrees"),
        sensor("roll", Mask1, 0x0002_0000, "IMU roll angle, filtered", (-179, 180), "degrees"),
        sensor("yaw", Mask1, 0x0001_0000, "IMU yaw angle, filtered", (-179, 180), "degrees"),
        sensor("xAccel", Mask1, 0x0000_8000, "accelerometer axis X, filtered", (-32768, 32767), "1/4096G"),
        sensor("yAccel", Mask1, 0x0000_4000, "accelerometer axis Y, filtered", (-32768, 32767), "1/4096G"),
        sensor("zAccel", Mask1, 0x0000_2000, "accelerometer axis Z, filtered", (-32768, 32767), "1/4096G"),
        sensor("xGyro", Mask1, 0x0000_1000, "gyro axis X, filtered", (-20000, 20000), "0.1dps"),
        sensor("yGyro", Mask1, 0x0000_0800, "gyro axis Y, filtered", (-20000, 20000), "0.1dps"),
        sensor("zGyro", Mask1, 0x0000_0400, "gyro axis Z, filtered", (-20000, 20000), "0.1dps"),
        sensor("rMotorBackEmf", Mask1, 0x0000_0040, "right motor back EMF, filtered", (-32768, 32767), "22.5cm"),
        sensor("lMotorBackEmf", Mask1, 0x0000_0020, "left motor back EMF, filtered", (-32768, 32767), "22.5cm"),
        sensor("quaternion0", Mask2, 0x8000_0000, "quaternion Q0", (-10000, 10000), "1/10000Q"),
        sensor("quaternion1", Mask2, 0x4000_0000, "quaternion Q1", (-10000, 10000), "1/10000Q"),
        sensor("quaternion2", Mask2, 0x2000_0000, "quaternion Q2", (-10000, 10000), "1/10000Q"),
        sensor("quaternion3", Mask2, 0x1000_0000, "quaternion Q3", (-10000, 10000), "1/10000Q"),
        sensor("xOdometer", Mask2, 0x0800_0000, "odometer X", (-32768, 32767), "cm"),
        sensor("yOdometer", Mask2, 0x0400_0000, "odometer Y", (-32768, 32767), "cm"),
        sensor("accelOne", Mask2, 0x0200_0000, "acceleration magnitude", (0, 8000), "1mg"),
        sensor("xVelocity", Mask2, 0x0100_0000, "velocity X", (-32768, 32767), "mm/s"),
        sensor("yVelocity", Mask2, 0x0080_0000, "velocity Y", (-32768, 32767), "mm/s"),
    ]
}

/// Streaming mask selecting the three filtered gyro axes
pub const GYRO_AXES_MASK: u32 = 0x0000_1C00;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_lookup_by_hex_key() {
        let table = ParserTable::standard();
        assert!(table.response(0x00, 0x02).is_some());
        assert!(table.response(0x02, 0x15).is_some());
        assert!(table.response(0x7F, 0x7F).is_none());
    }

    #[test]
    fn key_is_lowercase_hex() {
        assert_eq!(response_key(0x00, 0x02), "0:2");
        assert_eq!(response_key(0x02, 0x1A), "2:1a");
    }

    #[test]
    fn event_lookup() {
        let table = ParserTable::standard();
        assert!(table.event(0x01).is_some());
        assert!(table.event(0x03).is_some());
        assert!(table.event(0x6E).is_none());
    }

    #[test]
    fn only_streaming_entry_requires_mask() {
        let table = ParserTable::standard();
        assert!(table.event(DATA_STREAMING_EVENT).unwrap().requires_mask());
        assert!(!table.event(0x01).unwrap().requires_mask());
        assert!(!table.response(0x00, 0x20).unwrap().requires_mask());
    }

    #[test]
    fn streaming_fields_are_mask_driven() {
        let table = ParserTable::standard();
        let entry = table.event(DATA_STREAMING_EVENT).unwrap();
        assert!(!entry.fields.is_empty());
        for field in &entry.fields {
            assert!(matches!(field.layout, FieldLayout::Masked { .. }), "{}", field.name);
        }
    }

    #[test]
    fn gyro_axes_mask_matches_field_bits() {
        let table = ParserTable::standard();
        let entry = table.event(DATA_STREAMING_EVENT).unwrap();
        let mut combined = 0u32;
        for field in &entry.fields {
            if let FieldLayout::Masked { register: MaskRegister::Mask1, bit, .. } = field.layout {
                if matches!(field.name, "xGyro" | "yGyro" | "zGyro") {
                    combined |= bit;
                }
            }
        }
        assert_eq!(combined, GYRO_AXES_MASK);
    }

    #[test]
    fn table_is_shared() {
        let a = ParserTable::standard() as *const _;
        let b = ParserTable::standard() as *const _;
        assert_eq!(a, b);
    }
}
