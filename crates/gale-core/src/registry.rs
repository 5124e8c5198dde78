//! Liveness-filtered table of discovered peers.
//!
//! The registry is the only state shared between the discovery listener
//! (single writer) and peer-list queries (concurrent readers). A device's
//! display name is its durable identity; its address is ephemeral, so the
//! last writer for a name wins even when the address changed.
//!
//! Expiry is lazy: records are never deleted, they simply stop passing the
//! liveness filter once their last beacon is older than the window. Stale
//! entries therefore accumulate over a long process lifetime — fine at
//! LAN scale (tens of peers), a bound to revisit for anything larger.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A peer visible within the liveness window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    /// Display name announced by the peer
    pub name: String,
    /// Address the last beacon arrived from
    pub address: IpAddr,
}

#[derive(Debug, Clone)]
struct PeerRecord {
    address: IpAddr,
    last_seen: Instant,
}

/// Thread-safe map of known peers keyed by display name.
///
/// The lock is held only for the duration of a single map operation,
/// never across I/O.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Mutex<HashMap<String, PeerRecord>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a beacon: overwrite-or-insert the peer with a fresh
    /// last-seen stamp.
    pub async fn upsert(&self, name: &str, address: IpAddr) {
        let mut peers = self.peers.lock().await;
        peers.insert(
            name.to_string(),
            PeerRecord {
                address,
                last_seen: Instant::now(),
            },
        );
    }

    /// All peers seen within `liveness_window`, in unspecified order.
    ///
    /// Expired records fail the filter but are not purged.
    pub async fn snapshot(&self, liveness_window: Duration) -> Vec<Peer> {
        let now = Instant::now();
        let peers = self.peers.lock().await;
        peers
            .iter()
            .filter(|(_, record)| now.duration_since(record.last_seen) <= liveness_window)
            .map(|(name, record)| Peer {
                name: name.clone(),
                address: record.address,
            })
            .collect()
    }

    /// Total record count including expired entries. Test/diagnostic aid.
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15);

    fn ip(s: &str) -> IpAddr {
        s.parse().expect("valid IP")
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_visible_within_window() {
        let registry = PeerRegistry::new();
        registry.upsert("Alice", ip("192.168.1.2")).await;

        tokio::time::advance(Duration::from_secs(10)).await;

        let peers = registry.snapshot(WINDOW).await;
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].name, "Alice");
        assert_eq!(peers[0].address, ip("192.168.1.2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_expires_without_delete() {
        let registry = PeerRegistry::new();
        registry.upsert("Alice", ip("192.168.1.2")).await;

        tokio::time::advance(Duration::from_secs(20)).await;

        assert!(registry.snapshot(WINDOW).await.is_empty());
        // Lazy expiry: the record is still stored.
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_beacon_refreshes_liveness() {
        let registry = PeerRegistry::new();
        registry.upsert("Alice", ip("192.168.1.2")).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        registry.upsert("Alice", ip("192.168.1.2")).await;
        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(registry.snapshot(WINDOW).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_writer_wins_for_a_name() {
        let registry = PeerRegistry::new();
        registry.upsert("Alice", ip("192.168.1.2")).await;
        registry.upsert("Alice", ip("192.168.1.77")).await;

        let peers = registry.snapshot(WINDOW).await;
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].address, ip("192.168.1.77"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_mixes_fresh_and_stale() {
        let registry = PeerRegistry::new();
        registry.upsert("Old", ip("192.168.1.2")).await;
        tokio::time::advance(Duration::from_secs(20)).await;
        registry.upsert("Fresh", ip("192.168.1.3")).await;

        let peers = registry.snapshot(WINDOW).await;
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].name, "Fresh");
    }
}
