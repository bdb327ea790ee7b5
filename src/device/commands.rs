//! Command payload construction
//!
//! Each function returns a [`Request`] holding the device id, command id
//! and payload bytes; the client wraps it in a frame with the next
//! sequence number. Commands live on one of two virtual devices: the
//! core (power, sleep, versioning) and the orb itself (LEDs, motion,
//! streaming).

use crate::codec::SensorMask;
use crate::codec::table::GYRO_AXES_MASK;
use crate::constants::SENSOR_BASE_RATE_HZ;
use crate::error::BridgeError;

/// Core virtual device id
pub const DID_CORE: u8 = 0x00;
/// Orb virtual device id
pub const DID_ORB: u8 = 0x02;

// Core command ids
pub const CID_PING: u8 = 0x01;
pub const CID_VERSION: u8 = 0x02;
pub const CID_GET_BT_INFO: u8 = 0x11;
pub const CID_GET_POWER_STATE: u8 = 0x20;
pub const CID_SET_POWER_NOTIFICATION: u8 = 0x21;
pub const CID_SLEEP: u8 = 0x22;

// Orb command ids
pub const CID_SET_STABILIZATION: u8 = 0x02;
pub const CID_SET_DATA_STREAMING: u8 = 0x11;
pub const CID_READ_LOCATOR: u8 = 0x15;
pub const CID_SET_RGB_LED: u8 = 0x20;
pub const CID_SET_BACK_LED: u8 = 0x21;
pub const CID_GET_RGB_LED: u8 = 0x22;
pub const CID_SET_PERM_OPTION_FLAGS: u8 = 0x35;

/// An un-sequenced command: device id, command id and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub did: u8,
    pub cid: u8,
    pub data: Vec<u8>,
}

impl Default for Request {
    /// A bare request is a ping to the core device
    fn default() -> Self {
        Self {
            did: 0x00,
            cid: 0x00,
            data: Vec::new(),
        }
    }
}

impl Request {
    fn new(did: u8, cid: u8, data: Vec<u8>) -> Self {
        Self { did, cid, data }
    }
}

/// An RGB color triplet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const GREEN: Rgb = Rgb { r: 0, g: 0xFF, b: 0 };

    /// Parse a 6-digit hex triplet like `"00FF00"`
    pub fn from_hex(value: &str) -> Result<Rgb, BridgeError> {
        let invalid = || BridgeError::InvalidColor {
            value: value.to_string(),
        };
        if value.len() != 6 {
            return Err(invalid());
        }
        let r = u8::from_str_radix(&value[0..2], 16).map_err(|_| invalid())?;
        let g = u8::from_str_radix(&value[2..4], 16).map_err(|_| invalid())?;
        let b = u8::from_str_radix(&value[4..6], 16).map_err(|_| invalid())?;
        Ok(Rgb { r, g, b })
    }
}

/// Permanent option flags, written as a 32-bit register
///
/// Several flags are inverted on the wire relative to their names here;
/// the field names follow the behavior the caller asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermOptionFlags {
    /// Do not sleep while sitting on the charger
    pub no_sleep_on_charger: bool,
    /// Use vector drive for heading changes
    pub vector_drive: bool,
    /// Skip self-leveling when placed on the charger
    pub no_self_level_on_charger: bool,
    /// Keep the tail LED lit at all times
    pub tail_led_always_on: bool,
    /// Enable motion timeouts
    pub motion_timeouts: bool,
    /// Retail demo mode
    pub retail_demo: bool,
    /// Light sensitivity while asleep
    pub awake_sensitivity_light: bool,
    /// Heavy sensitivity while asleep
    pub awake_sensitivity_heavy: bool,
    /// Send a gyro-max async message on rotation limit
    pub gyro_max_async_msg: bool,
}

impl PermOptionFlags {
    pub fn bits(&self) -> u32 {
        let mut bits = 0u32;
        let mut set = |on: bool, bit: u32| {
            if on {
                bits |= bit;
            }
        };
        set(self.no_sleep_on_charger, 0x0000_0001);
        set(self.vector_drive, 0x0000_0002);
        set(self.no_self_level_on_charger, 0x0000_0004);
        set(self.tail_led_always_on, 0x0000_0008);
        set(self.motion_timeouts, 0x0000_0010);
        set(self.retail_demo, 0x0000_0020);
        set(self.awake_sensitivity_light, 0x0000_0040);
        set(self.awake_sensitivity_heavy, 0x0000_0080);
        set(self.gyro_max_async_msg, 0x0000_0100);
        bits
    }
}

// =============================================================================
// Core commands
// =============================================================================

pub fn ping() -> Request {
    Request::new(DID_CORE, CID_PING, Vec::new())
}

pub fn version() -> Request {
    Request::new(DID_CORE, CID_VERSION, Vec::new())
}

pub fn get_bluetooth_info() -> Request {
    Request::new(DID_CORE, CID_GET_BT_INFO, Vec::new())
}

pub fn get_power_state() -> Request {
    Request::new(DID_CORE, CID_GET_POWER_STATE, Vec::new())
}

pub fn set_power_notification(enabled: bool) -> Request {
    Request::new(DID_CORE, CID_SET_POWER_NOTIFICATION, vec![enabled as u8])
}

/// Put the device to sleep
///
/// `wakeup` seconds until it wakes itself (0 = indefinitely), `macro_id`
/// to run on wake, `orb_basic_line` to resume an orbBasic program at.
pub fn sleep(wakeup: u16, macro_id: u8, orb_basic_line: u16) -> Request {
    let mut data = Vec::with_capacity(5);
    data.extend_from_slice(&wakeup.to_be_bytes());
    data.push(macro_id);
    data.extend_from_slice(&orb_basic_line.to_be_bytes());
    Request::new(DID_CORE, CID_SLEEP, data)
}

// =============================================================================
// Orb commands
// =============================================================================

pub fn set_stabilization(enabled: bool) -> Request {
    Request::new(DID_ORB, CID_SET_STABILIZATION, vec![enabled as u8])
}

pub fn set_rgb_led(color: Rgb, persist: bool) -> Request {
    Request::new(
        DID_ORB,
        CID_SET_RGB_LED,
        vec![color.r, color.g, color.b, persist as u8],
    )
}

pub fn get_rgb_led() -> Request {
    Request::new(DID_ORB, CID_GET_RGB_LED, Vec::new())
}

pub fn set_back_led(brightness: u8) -> Request {
    Request::new(DID_ORB, CID_SET_BACK_LED, vec![brightness])
}

pub fn read_locator() -> Request {
    Request::new(DID_ORB, CID_READ_LOCATOR, Vec::new())
}

pub fn set_perm_option_flags(flags: PermOptionFlags) -> Request {
    Request::new(
        DID_ORB,
        CID_SET_PERM_OPTION_FLAGS,
        flags.bits().to_be_bytes().to_vec(),
    )
}

/// Configure sensor streaming
///
/// `n` is the base-rate divisor, `m` samples per frame, `pcnt` packet
/// count (0 = unlimited). Returns the request together with the mask
/// pair the caller must hold on to for decoding the resulting frames.
pub fn set_data_streaming(
    n: u16,
    m: u16,
    mask1: u32,
    pcnt: u8,
    mask2: u32,
) -> (Request, SensorMask) {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&n.to_be_bytes());
    data.extend_from_slice(&m.to_be_bytes());
    data.extend_from_slice(&mask1.to_be_bytes());
    data.push(pcnt);
    data.extend_from_slice(&mask2.to_be_bytes());
    (
        Request::new(DID_ORB, CID_SET_DATA_STREAMING, data),
        SensorMask { mask1, mask2 },
    )
}

/// Stream the three filtered gyro axes at `sps` samples per second
pub fn stream_gyroscope(sps: u16) -> (Request, SensorMask) {
    let n = SENSOR_BASE_RATE_HZ / sps.max(1);
    set_data_streaming(n, 1, GYRO_AXES_MASK, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_is_ping_shaped() {
        let req = Request::default();
        assert_eq!(req.did, 0x00);
        assert_eq!(req.cid, 0x00);
        assert!(req.data.is_empty());
    }

    #[test]
    fn ping_has_no_payload() {
        let req = ping();
        assert_eq!((req.did, req.cid), (DID_CORE, CID_PING));
        assert!(req.data.is_empty());
    }

    #[test]
    fn rgb_from_hex() {
        assert_eq!(Rgb::from_hex("00FF00").unwrap(), Rgb::GREEN);
        assert_eq!(
            Rgb::from_hex("a01020").unwrap(),
            Rgb { r: 0xA0, g: 0x10, b: 0x20 }
        );
        assert!(Rgb::from_hex("12345").is_err());
        assert!(Rgb::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn set_rgb_led_payload() {
        let req = set_rgb_led(Rgb { r: 1, g: 2, b: 3 }, true);
        assert_eq!(req.data, vec![1, 2, 3, 1]);
    }

    #[test]
    fn sleep_payload_is_big_endian() {
        let req = sleep(0x0102, 0x03, 0x0405);
        assert_eq!(req.data, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    fn perm_option_flags_bits() {
        let flags = PermOptionFlags {
            no_sleep_on_charger: true,
            motion_timeouts: true,
            awake_sensitivity_light: true,
            gyro_max_async_msg: true,
            ..Default::default()
        };
        assert_eq!(flags.bits(), 0x0000_0151);
        assert_eq!(PermOptionFlags::default().bits(), 0);
    }

    #[test]
    fn data_streaming_payload_layout() {
        let (req, mask) = set_data_streaming(400, 1, 0xAABB_CCDD, 0, 0x1122_3344);
        assert_eq!(req.data.len(), 13);
        assert_eq!(&req.data[0..2], &[0x01, 0x90]); // n = 400
        assert_eq!(&req.data[2..4], &[0x00, 0x01]); // m = 1
        assert_eq!(&req.data[4..8], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(req.data[8], 0);
        assert_eq!(&req.data[9..13], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(mask.mask1, 0xAABB_CCDD);
        assert_eq!(mask.mask2, 0x1122_3344);
    }

    #[test]
    fn stream_gyroscope_divides_base_rate() {
        let (req, mask) = stream_gyroscope(10);
        assert_eq!(&req.data[0..2], &[0x00, 0x28]); // 400 / 10
        assert_eq!(mask.mask1, GYRO_AXES_MASK);
        assert_eq!(mask.mask2, 0);
    }
}
