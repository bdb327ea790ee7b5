//! Bridge runner
//!
//! Connects to the orb over the configured candidate ports with retry,
//! performs the initial device setup, keeps the link alive with periodic
//! pings, and reconnects when a session ends.

use super::session::Session;
use super::stats::Stats;
use crate::config::Config;
use crate::constants::{POST_DISCONNECT_DELAY_SECS, RECONNECT_DELAY_SECS};
use crate::device::client::SharedMask;
use crate::device::{commands, DeviceClient, PermOptionFlags, Rgb};
use crate::error::Result;
use crate::transport::{SerialTransport, Transport, UdpPublisher};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Run the bridge until shutdown
pub async fn run(config: &Config, shutdown: Arc<AtomicBool>) -> Result<()> {
    let stats = Arc::new(Stats::new());

    // One publisher outlives every device session
    let publisher = UdpPublisher::new(config.telemetry.addr()).spawn(shutdown.clone())?;
    let telemetry_tx = publisher.tx;
    spawn_host_listener(publisher.rx);
    info!("Publishing telemetry to {}", config.telemetry.addr());

    let mut attempt = 0usize;
    while !shutdown.load(Ordering::Relaxed) {
        let Some(port) = candidate_port(config, attempt) else {
            warn!("No serial ports available, waiting...");
            tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
            continue;
        };
        attempt += 1;

        info!("Connecting to {}...", port);
        let channels = match SerialTransport::new(&port, config.device.baud_rate)
            .spawn(shutdown.clone())
        {
            Ok(c) => c,
            Err(e) => {
                warn!("{}", e);
                tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
                continue;
            }
        };

        let mask: SharedMask = Arc::new(Mutex::new(None));
        let client = Arc::new(DeviceClient::new(
            channels.tx.clone(),
            mask,
            Duration::from_millis(config.device.command_timeout_ms),
        ));

        // The session must be draining frames before setup commands can
        // see their responses.
        let session = Session::new(
            client.clone(),
            config.policy.clone(),
            stats.clone(),
            telemetry_tx.clone(),
        );
        let mut session_task = tokio::spawn(session.run(channels.rx));

        match setup(&client, config).await {
            Ok(()) => {
                info!("Connected to orb on {}", port);
                keepalive(&client, config, &mut session_task, &shutdown).await;
            }
            Err(e) => {
                warn!("Device setup failed: {}", e);
                session_task.abort();
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        info!("Connection lost, reconnecting...");
        tokio::time::sleep(Duration::from_secs(POST_DISCONNECT_DELAY_SECS)).await;
    }

    info!("Bridge stopped: {}", stats.summary());
    Ok(())
}

/// Pick the next candidate port, rotating through the configured list
/// (or everything the system reports when none are configured)
fn candidate_port(config: &Config, attempt: usize) -> Option<String> {
    let ports = if config.device.ports.is_empty() {
        SerialTransport::available_ports()
    } else {
        config.device.ports.clone()
    };
    if ports.is_empty() {
        return None;
    }
    Some(ports[attempt % ports.len()].clone())
}

/// Initial device setup, mirroring the startup handshake:
/// ping, green LED, notifications on, stabilization off, slow gyro
/// streaming, and the permanent option flags.
async fn setup(client: &DeviceClient, config: &Config) -> Result<()> {
    client.execute_retrying(&commands::ping()).await?;
    client.set_color(Rgb::GREEN).await?;
    client.set_power_notification(true).await?;
    client.set_stabilization(false).await?;
    client.stream_gyroscope(config.policy.idle_sps).await?;
    client
        .set_perm_option_flags(PermOptionFlags {
            no_sleep_on_charger: true,
            motion_timeouts: true,
            awake_sensitivity_light: true,
            gyro_max_async_msg: true,
            ..Default::default()
        })
        .await?;

    match client.get_power_state().await {
        Ok(crate::codec::DecodedPayload::Record(record)) => {
            if let Some(state) = record.get("batteryState") {
                info!("Battery state: {:?}", state);
            }
        }
        Ok(_) => {}
        Err(e) => warn!("Power state query failed: {}", e),
    }
    Ok(())
}

/// Ping the device on an interval until the session ends
///
/// A failed ping ends the session so the outer loop reconnects, rather
/// than taking the whole bridge down.
async fn keepalive(
    client: &Arc<DeviceClient>,
    config: &Config,
    session_task: &mut tokio::task::JoinHandle<()>,
    shutdown: &Arc<AtomicBool>,
) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.device.ping_interval_secs));
    interval.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            _ = &mut *session_task => break,
            _ = interval.tick() => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                if let Err(e) = client.execute_retrying(&commands::ping()).await {
                    warn!("Cannot ping the device: {}", e);
                    session_task.abort();
                    break;
                }
            }
        }
    }
}

/// Log datagrams the host sends back on the telemetry socket
fn spawn_host_listener(mut rx: mpsc::Receiver<bytes::Bytes>) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match std::str::from_utf8(&msg) {
                Ok(text) => info!("Host message: {}", text.trim_end()),
                Err(_) => debug!(len = msg.len(), "host sent binary datagram"),
            }
        }
    });
}
