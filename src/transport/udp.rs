//! UDP publisher for telemetry fan-out
//!
//! Operates in "client" mode: binds an ephemeral local port and sends
//! datagrams to the configured host endpoint. Datagrams arriving from
//! the host (e.g. raw command frames) are surfaced on the rx channel.
//!
//! Uses async tokio tasks for I/O.

use super::{Transport, TransportChannels};
use crate::constants::{CHANNEL_CAPACITY, SERIAL_BUFFER_SIZE};
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// UDP publisher for telemetry datagrams
pub struct UdpPublisher {
    target: String,
}

impl UdpPublisher {
    /// Create a publisher for `host:port`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Transport for UdpPublisher {
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let target: SocketAddr = self
            .target
            .parse()
            .map_err(|_| BridgeError::InvalidAddress {
                addr: self.target.clone(),
            })?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let std_socket = std::net::UdpSocket::bind(bind_addr).map_err(|e| BridgeError::UdpBind {
            addr: bind_addr.to_string(),
            source: e,
        })?;
        std_socket
            .set_nonblocking(true)
            .map_err(|e| BridgeError::UdpBind {
                addr: bind_addr.to_string(),
                source: e,
            })?;
        let socket = Arc::new(
            UdpSocket::from_std(std_socket).map_err(|e| BridgeError::UdpBind {
                addr: bind_addr.to_string(),
                source: e,
            })?,
        );

        let (in_tx, in_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        // TX task: forward telemetry datagrams to the target
        let socket_tx = socket.clone();
        let shutdown_tx = shutdown.clone();
        tokio::spawn(async move {
            while !shutdown_tx.load(Ordering::Relaxed) {
                match tokio::time::timeout(Duration::from_millis(100), out_rx.recv()).await {
                    Ok(Some(data)) => {
                        if let Err(e) = socket_tx.send_to(&data, target).await {
                            tracing::debug!("telemetry send failed: {}", e);
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {}
                }
            }
        });

        // RX task: surface datagrams sent back by the host
        let shutdown_rx = shutdown;
        tokio::spawn(async move {
            let mut buf = [0u8; SERIAL_BUFFER_SIZE];
            while !shutdown_rx.load(Ordering::Relaxed) {
                match tokio::time::timeout(Duration::from_millis(100), socket.recv_from(&mut buf))
                    .await
                {
                    Ok(Ok((len, _addr))) => {
                        if in_tx.send(Bytes::copy_from_slice(&buf[..len])).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::debug!("telemetry recv failed: {}", e);
                    }
                    Err(_) => {}
                }
            }
        });

        Ok(TransportChannels {
            rx: in_rx,
            tx: out_tx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_datagrams_to_target() {
        // Listen on an ephemeral port to act as the host
        let host = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = host.local_addr().unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let channels = UdpPublisher::new(addr.to_string())
            .spawn(shutdown.clone())
            .unwrap();

        channels.tx.send(Bytes::from_static(b"{\"x\":1}")).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), host.recv_from(&mut buf))
            .await
            .expect("datagram timeout")
            .unwrap();
        assert_eq!(&buf[..len], b"{\"x\":1}");

        shutdown.store(true, Ordering::Relaxed);
    }

    #[tokio::test]
    async fn surfaces_host_datagrams() {
        let host = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let host_addr = host.local_addr().unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut channels = UdpPublisher::new(host_addr.to_string())
            .spawn(shutdown.clone())
            .unwrap();

        // Publisher sends first so the host learns its address
        channels.tx.send(Bytes::from_static(b"hello")).await.unwrap();
        let mut buf = [0u8; 64];
        let (_, publisher_addr) =
            tokio::time::timeout(Duration::from_secs(1), host.recv_from(&mut buf))
                .await
                .expect("datagram timeout")
                .unwrap();

        host.send_to(b"cmd", publisher_addr).await.unwrap();
        let received = tokio::time::timeout(Duration::from_secs(1), channels.rx.recv())
            .await
            .expect("rx timeout")
            .expect("channel open");
        assert_eq!(received.as_ref(), b"cmd");

        shutdown.store(true, Ordering::Relaxed);
    }

    #[test]
    fn rejects_bad_address() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let result = UdpPublisher::new("not-an-addr").spawn(shutdown);
        assert!(matches!(result, Err(BridgeError::InvalidAddress { .. })));
    }
}
