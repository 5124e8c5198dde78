//! Network presence discovery for Gale.
//!
//! Devices announce themselves by broadcasting a small JSON beacon on a
//! fixed UDP port and learn about each other by listening on the same
//! port. There is no acknowledgement, retry, or ordering: a beacon is a
//! best-effort presence signal, and liveness comes from the
//! [`PeerRegistry`](crate::registry::PeerRegistry) expiring names that
//! stop beaconing.
//!
//! ## Wire format
//!
//! ```json
//! {"name": "Marcus-Laptop"}
//! ```
//!
//! broadcast to 255.255.255.255 on the discovery port (17257 by default)
//! every few seconds. The sender's address is taken from the datagram
//! itself, never from the payload.
//!
//! Both background loops shut down cooperatively: `stop()` signals the
//! task and returns only after it has actually exited. The listener's
//! one-second receive timeout exists solely to bound that shutdown
//! latency.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::registry::{Peer, PeerRegistry};

/// Maximum accepted beacon datagram size.
const MAX_BEACON_BYTES: usize = 1024;

/// Presence beacon announced by a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceBeacon {
    /// Device display name
    pub name: String,
}

impl PresenceBeacon {
    /// Create a beacon for the given display name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Build a broadcast-capable UDP socket bound to an ephemeral port.
fn broadcast_socket() -> Result<UdpSocket> {
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    socket.set_broadcast(true)?;
    socket.set_reuse_address(true)?;

    #[cfg(target_os = "macos")]
    socket.set_reuse_port(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&addr.into())?;

    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

/// Build a listening UDP socket bound to the discovery port.
fn listen_socket(port: u16) -> Result<UdpSocket> {
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    socket.set_reuse_address(true)?;

    #[cfg(target_os = "macos")]
    socket.set_reuse_port(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket
        .bind(&addr.into())
        .map_err(|source| Error::BindFailed { port, source })?;

    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

/// Broadcaster announcing this device's presence.
#[derive(Debug)]
pub struct Announcer {
    socket: Arc<UdpSocket>,
    port: u16,
    shutdown_tx: broadcast::Sender<()>,
    is_active: Arc<Mutex<bool>>,
}

impl Announcer {
    /// Create an announcer targeting the given discovery port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created.
    pub fn new(port: u16) -> Result<Self> {
        let socket = broadcast_socket()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            socket: Arc::new(socket),
            port,
            shutdown_tx,
            is_active: Arc::new(Mutex::new(false)),
        })
    }

    /// Start broadcasting the beacon every `interval`.
    ///
    /// Send failures are logged and retried on the next tick; they are
    /// never fatal.
    pub async fn start(&self, beacon: PresenceBeacon, interval: Duration) {
        let mut is_active = self.is_active.lock().await;
        if *is_active {
            return;
        }
        *is_active = true;
        drop(is_active);

        let socket = Arc::clone(&self.socket);
        let port = self.port;
        let is_active = Arc::clone(&self.is_active);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let broadcast_addr = SocketAddrV4::new(Ipv4Addr::BROADCAST, port);

            loop {
                match serde_json::to_vec(&beacon) {
                    Ok(payload) => {
                        if let Err(e) = socket.send_to(&payload, broadcast_addr).await {
                            tracing::warn!("failed to send presence beacon: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize presence beacon: {}", e);
                        break;
                    }
                }

                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("announcer received shutdown signal");
                        break;
                    }
                }
            }

            *is_active.lock().await = false;
        });
    }

    /// Stop broadcasting. Returns once the loop has exited.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        while *self.is_active.lock().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Check if currently broadcasting.
    pub async fn is_broadcasting(&self) -> bool {
        *self.is_active.lock().await
    }
}

/// Listener feeding inbound beacons into a [`PeerRegistry`].
#[derive(Debug)]
pub struct PeerListener {
    socket: Arc<UdpSocket>,
    shutdown_tx: broadcast::Sender<()>,
    is_active: Arc<Mutex<bool>>,
}

impl PeerListener {
    /// Bind the discovery port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindFailed`] if the port is already taken. This
    /// is fatal to discovery only; file serving works without it.
    pub fn bind(port: u16) -> Result<Self> {
        let socket = listen_socket(port)?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            socket: Arc::new(socket),
            shutdown_tx,
            is_active: Arc::new(Mutex::new(false)),
        })
    }

    /// Start the receive loop, upserting every well-formed beacon into
    /// `registry`. Malformed datagrams are dropped, not fatal.
    pub async fn start(&self, registry: Arc<PeerRegistry>) {
        let mut is_active = self.is_active.lock().await;
        if *is_active {
            return;
        }
        *is_active = true;
        drop(is_active);

        let socket = Arc::clone(&self.socket);
        let is_active = Arc::clone(&self.is_active);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut buf = [0u8; MAX_BEACON_BYTES];

            loop {
                use tokio::sync::broadcast::error::TryRecvError;
                match shutdown_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Closed) => {
                        tracing::debug!("peer listener received shutdown signal");
                        break;
                    }
                    Err(TryRecvError::Empty | TryRecvError::Lagged(_)) => {}
                }

                // Bounded wait so the shutdown check above runs at least
                // once a second.
                let received = tokio::time::timeout(
                    crate::DISCOVERY_RECV_TIMEOUT,
                    socket.recv_from(&mut buf),
                )
                .await;

                match received {
                    Ok(Ok((len, source))) => {
                        match serde_json::from_slice::<PresenceBeacon>(&buf[..len]) {
                            Ok(beacon) => {
                                registry.upsert(&beacon.name, source.ip()).await;
                            }
                            Err(e) => {
                                tracing::debug!("dropping malformed beacon from {}: {}", source, e);
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("error receiving beacon: {}", e);
                    }
                    Err(_) => {}
                }
            }

            *is_active.lock().await = false;
        });
    }

    /// Stop listening. Returns once the loop has exited (bounded by the
    /// receive timeout).
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        while *self.is_active.lock().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Check if the receive loop is running.
    pub async fn is_listening(&self) -> bool {
        *self.is_active.lock().await
    }
}

/// Passively collect beacons for `duration`, deduplicated by name.
///
/// # Errors
///
/// Returns [`Error::BindFailed`] if the discovery port cannot be bound.
pub async fn scan(port: u16, duration: Duration) -> Result<Vec<Peer>> {
    let socket = listen_socket(port)?;
    let deadline = Instant::now() + duration;
    let mut peers: HashMap<String, IpAddr> = HashMap::new();
    let mut buf = [0u8; MAX_BEACON_BYTES];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, source))) => {
                if let Ok(beacon) = serde_json::from_slice::<PresenceBeacon>(&buf[..len]) {
                    peers.insert(beacon.name, source.ip());
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("error receiving beacon: {}", e);
            }
            Err(_) => break,
        }
    }

    Ok(peers
        .into_iter()
        .map(|(name, address)| Peer { name, address })
        .collect())
}

/// The discovery service: one announcer, one listener, one registry.
///
/// Starting spawns both background loops; stopping signals them and
/// returns only after both have exited.
#[derive(Debug)]
pub struct DiscoveryService {
    announcer: Announcer,
    listener: PeerListener,
    registry: Arc<PeerRegistry>,
}

impl DiscoveryService {
    /// Bind sockets and start both loops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindFailed`] when the discovery port is taken;
    /// the caller decides whether to continue without discovery.
    pub async fn start(
        device_name: &str,
        port: u16,
        interval: Duration,
        registry: Arc<PeerRegistry>,
    ) -> Result<Self> {
        let listener = PeerListener::bind(port)?;
        let announcer = Announcer::new(port)?;

        listener.start(Arc::clone(&registry)).await;
        announcer
            .start(PresenceBeacon::new(device_name), interval)
            .await;

        tracing::info!("discovery running on udp/{}", port);

        Ok(Self {
            announcer,
            listener,
            registry,
        })
    }

    /// The registry both loops feed.
    #[must_use]
    pub fn registry(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Stop both loops cooperatively.
    pub async fn stop(&self) {
        self.announcer.stop().await;
        self.listener.stop().await;
        tracing::info!("discovery stopped");
    }
}
