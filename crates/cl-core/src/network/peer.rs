use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::InstanceId;

/// A peer known to this instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub address: SocketAddr,
    /// Known once the peer has sent us something itself; peers learned from
    /// another peer's `Pong` start without one.
    pub instance_id: Option<InstanceId>,
    pub discovered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
