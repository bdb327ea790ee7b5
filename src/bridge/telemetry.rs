//! Telemetry records published to the host
//!
//! Decoded device events are republished as JSON datagrams, one record
//! per datagram, tagged by type.

use bytes::Bytes;
use serde::Serialize;

/// A published telemetry record (serializable for UDP fan-out)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryRecord {
    /// One gyro sample per axis, in 0.1 deg/s
    Gyro {
        timestamp: String,
        x: i32,
        y: i32,
        z: i32,
    },
    /// Battery state change notification
    Battery { timestamp: String, state: String },
    /// Collision event with impact components
    Collision {
        timestamp: String,
        axis: u64,
        speed: u64,
        x: i64,
        y: i64,
        z: i64,
    },
}

impl TelemetryRecord {
    /// Current timestamp as HH:MM:SS.mmm
    #[inline]
    fn now() -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }

    pub fn gyro(x: i32, y: i32, z: i32) -> Self {
        Self::Gyro {
            timestamp: Self::now(),
            x,
            y,
            z,
        }
    }

    pub fn battery(state: impl Into<String>) -> Self {
        Self::Battery {
            timestamp: Self::now(),
            state: state.into(),
        }
    }

    pub fn collision(axis: u64, speed: u64, x: i64, y: i64, z: i64) -> Self {
        Self::Collision {
            timestamp: Self::now(),
            axis,
            speed,
            x,
            y,
            z,
        }
    }

    /// Serialize to a JSON datagram
    pub fn to_datagram(&self) -> Bytes {
        // All variants are plain data; serialization cannot fail
        Bytes::from(serde_json::to_vec(self).expect("telemetry serialization"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gyro_record_shape() {
        let datagram = TelemetryRecord::gyro(1, -2, 3).to_datagram();
        let value: serde_json::Value = serde_json::from_slice(&datagram).unwrap();
        assert_eq!(value["type"], "gyro");
        assert_eq!(value["x"], 1);
        assert_eq!(value["y"], -2);
        assert_eq!(value["z"], 3);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn battery_record_shape() {
        let datagram = TelemetryRecord::battery("Battery OK").to_datagram();
        let value: serde_json::Value = serde_json::from_slice(&datagram).unwrap();
        assert_eq!(value["type"], "battery");
        assert_eq!(value["state"], "Battery OK");
    }

    #[test]
    fn collision_record_shape() {
        let datagram = TelemetryRecord::collision(1, 37, 100, -5, 0).to_datagram();
        let value: serde_json::Value = serde_json::from_slice(&datagram).unwrap();
        assert_eq!(value["type"], "collision");
        assert_eq!(value["speed"], 37);
        assert_eq!(value["y"], -5);
    }
}
