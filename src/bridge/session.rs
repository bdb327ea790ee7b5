//! Per-connection session
//!
//! Owns the frame assembler for one device connection, decodes inbound
//! chunks, republishes telemetry, answers to decoded events and feeds
//! the motion policy. Outgoing policy commands run in spawned tasks so
//! frame processing never blocks on a command round-trip.

use super::policy::{activity_color, MotionPolicy, PolicyAction};
use super::stats::Stats;
use super::telemetry::TelemetryRecord;
use crate::codec::{
    decode_record, DecodedPayload, DecodedRecord, FieldValue, Frame, FrameAssembler, FrameHeader,
    ParserTable,
};
use crate::config::PolicyConfig;
use crate::device::{DeviceClient, Rgb};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Battery states that do not warrant a warning
const BATTERY_OK_STATES: [&str; 2] = ["Battery OK", "Battery Charging"];

pub struct Session {
    assembler: FrameAssembler,
    client: Arc<DeviceClient>,
    policy: MotionPolicy,
    policy_cfg: PolicyConfig,
    stats: Arc<Stats>,
    telemetry_tx: mpsc::Sender<Bytes>,
    /// Streaming rate last requested; avoids re-issuing the same command
    current_sps: u16,
}

impl Session {
    pub fn new(
        client: Arc<DeviceClient>,
        policy_cfg: PolicyConfig,
        stats: Arc<Stats>,
        telemetry_tx: mpsc::Sender<Bytes>,
    ) -> Self {
        let current_sps = policy_cfg.idle_sps;
        Self {
            assembler: FrameAssembler::new(),
            client,
            policy: MotionPolicy::new(policy_cfg.clone()),
            policy_cfg,
            stats,
            telemetry_tx,
            current_sps,
        }
    }

    /// Consume inbound chunks until the transport closes its channel
    pub async fn run(mut self, mut rx: mpsc::Receiver<Bytes>) {
        while let Some(chunk) = rx.recv().await {
            self.stats.add_rx(chunk.len());
            match self.assembler.ingest(&chunk) {
                Ok(Some(frame)) => {
                    self.stats.add_frame();
                    self.handle_frame(frame).await;
                }
                Ok(None) => {}
                Err(e) => {
                    // Link noise, not a session failure
                    self.stats.add_checksum_error();
                    debug!("corrupt frame dropped: {}", e);
                }
            }
        }
        info!("session ended: {}", self.stats.summary());
    }

    async fn handle_frame(&mut self, frame: Frame) {
        match frame.header {
            FrameHeader::Response { .. } => {
                if !self.client.complete(&frame) {
                    debug!(header = ?frame.header, "response with no waiting command");
                }
            }
            FrameHeader::Async { id_code } => {
                let entry = ParserTable::standard().event(id_code);
                let mask = self.client.streaming_mask();
                match decode_record(entry, &frame, mask) {
                    DecodedPayload::Record(record) => self.handle_record(record).await,
                    DecodedPayload::Raw(raw) => {
                        debug!(id_code, len = raw.len(), "undecoded async frame");
                    }
                }
            }
        }
    }

    async fn handle_record(&mut self, record: DecodedRecord) {
        match record.event {
            Some("battery") => self.handle_battery(&record).await,
            Some("sensorData") => self.handle_sensor_data(&record).await,
            Some("collision") => self.handle_collision(&record).await,
            _ => debug!(desc = record.desc, "unhandled event"),
        }
    }

    async fn handle_battery(&mut self, record: &DecodedRecord) {
        let state = match record.get("state") {
            Some(FieldValue::Predefined(name)) => (*name).to_string(),
            Some(FieldValue::Unknown(code)) => format!("Unknown({})", code),
            _ => return,
        };
        if !BATTERY_OK_STATES.contains(&state.as_str()) {
            warn!("Battery state: {}", state);
        }
        self.publish(TelemetryRecord::battery(state)).await;
    }

    async fn handle_sensor_data(&mut self, record: &DecodedRecord) {
        let (Some(x), Some(y), Some(z)) = (
            record.sample("xGyro"),
            record.sample("yGyro"),
            record.sample("zGyro"),
        ) else {
            debug!("sensor frame without gyro axes");
            return;
        };

        self.publish(TelemetryRecord::gyro(x, y, z)).await;

        let gyro_max = x.abs().max(y.abs()).max(z.abs());
        debug!(gyro_max, "stream data");
        match self.policy.observe(gyro_max) {
            Some(PolicyAction::Idle) => {
                self.apply_color(Rgb::BLACK);
                self.apply_sps(self.policy_cfg.idle_sps);
            }
            Some(PolicyAction::Active { level }) => {
                self.apply_color(activity_color(level));
                self.apply_sps(self.policy_cfg.active_sps);
            }
            None => {}
        }
    }

    async fn handle_collision(&mut self, record: &DecodedRecord) {
        let number = |name: &str| match record.get(name) {
            Some(FieldValue::Number(v)) => *v,
            _ => 0,
        };
        let signed = |name: &str| match record.get(name) {
            Some(FieldValue::Signed(v)) => *v,
            _ => 0,
        };
        self.publish(TelemetryRecord::collision(
            number("axis"),
            number("speed"),
            signed("xImpact"),
            signed("yImpact"),
            signed("zImpact"),
        ))
        .await;
    }

    async fn publish(&self, record: TelemetryRecord) {
        if self.telemetry_tx.send(record.to_datagram()).await.is_ok() {
            self.stats.add_record();
        }
    }

    /// Fire an LED command without blocking frame processing
    fn apply_color(&self, color: Rgb) {
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.set_color(color).await {
                debug!("color command failed: {}", e);
            }
        });
    }

    /// Change the streaming rate when it differs from the current one
    fn apply_sps(&mut self, sps: u16) {
        if self.current_sps == sps {
            return;
        }
        self.current_sps = sps;
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.stream_gyroscope(sps).await {
                debug!("streaming rate change failed: {}", e);
            }
        });
    }
}
