use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use cl_core::{InstanceId, PeerInfo};

/// Peers learned through ping/pong discovery and inbound traffic.
///
/// Bounded by `max_peers`: a full registry still refreshes known peers but
/// ignores new ones.
#[derive(Debug)]
pub struct PeerRegistry {
    max_peers: usize,
    peers: Vec<PeerInfo>,
}

impl PeerRegistry {
    pub fn new(max_peers: usize) -> Self {
        Self {
            max_peers,
            peers: Vec::new(),
        }
    }

    /// Record traffic from `address`.
    ///
    /// Returns the new entry when the peer was not known before.
    pub fn observe(
        &mut self,
        address: SocketAddr,
        instance_id: Option<InstanceId>,
        now: DateTime<Utc>,
    ) -> Option<PeerInfo> {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.address == address) {
            peer.last_seen = now;
            if instance_id.is_some() {
                peer.instance_id = instance_id;
            }
            return None;
        }

        if self.peers.len() >= self.max_peers {
            return None;
        }

        let peer = PeerInfo {
            address,
            instance_id,
            discovered_at: now,
            last_seen: now,
        };
        self.peers.push(peer.clone());
        Some(peer)
    }

    pub fn remove(&mut self, address: SocketAddr) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| p.address != address);
        self.peers.len() != before
    }

    pub fn contains(&self, address: SocketAddr) -> bool {
        self.peers.iter().any(|p| p.address == address)
    }

    /// Addresses in discovery order.
    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.peers.iter().map(|p| p.address).collect()
    }

    pub fn snapshot(&self) -> Vec<PeerInfo> {
        self.peers.clone()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
