use std::net::SocketAddr;

use cl_app::BroadcastReceipt;
use cl_core::{ClipboardEntry, LiaisonSession, PeerInfo};
use serde::{Deserialize, Serialize};

/// Clipboard entry DTO for frontend API.
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntryDto {
    pub content: String,
    pub origin: String,
    pub origin_address: Option<String>,
    pub is_local: bool,
    pub sequence: u64,
    pub received_at: i64,
}

impl From<ClipboardEntry> for ClipboardEntryDto {
    fn from(entry: ClipboardEntry) -> Self {
        Self {
            origin: entry.origin.instance_id().to_string(),
            origin_address: entry.origin.address().map(|addr| addr.to_string()),
            is_local: entry.origin.is_local(),
            sequence: entry.sequence,
            received_at: entry.received_at.timestamp_millis(),
            content: entry.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiaisonStatusDto {
    pub instance_id: String,
    /// `idle`, `listening` or `stopped`
    pub state: String,
    pub bound_address: Option<String>,
    /// Bound address with a wildcard IP replaced by the LAN IP.
    pub advertised_address: Option<String>,
    pub started_at: Option<i64>,
    pub peer_count: usize,
    pub history_len: usize,
}

impl LiaisonStatusDto {
    pub fn new(
        instance_id: String,
        session: &LiaisonSession,
        advertised_address: Option<SocketAddr>,
        peer_count: usize,
        history_len: usize,
    ) -> Self {
        Self {
            instance_id,
            state: session.state.as_str().to_string(),
            bound_address: session.bound_address.map(|addr| addr.to_string()),
            advertised_address: advertised_address.map(|addr| addr.to_string()),
            started_at: session.started_at.map(|at| at.timestamp_millis()),
            peer_count,
            history_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDto {
    pub address: String,
    pub instance_id: Option<String>,
    pub discovered_at: i64,
    pub last_seen: i64,
}

impl From<PeerInfo> for PeerDto {
    fn from(peer: PeerInfo) -> Self {
        Self {
            address: peer.address.to_string(),
            instance_id: peer.instance_id.map(|id| id.into_inner()),
            discovered_at: peer.discovered_at.timestamp_millis(),
            last_seen: peer.last_seen.timestamp_millis(),
        }
    }
}

/// Acknowledgment returned by `clipboard_broadcast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastAckDto {
    pub sequence: u64,
    pub delivered: usize,
    pub failed: usize,
}

impl From<BroadcastReceipt> for BroadcastAckDto {
    fn from(receipt: BroadcastReceipt) -> Self {
        Self {
            sequence: receipt.sequence,
            delivered: receipt.delivered,
            failed: receipt.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cl_core::InstanceId;

    #[test]
    fn test_remote_entry_dto_serializes_for_frontend() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let entry = ClipboardEntry::remote(
            "hi",
            InstanceId::from("B"),
            "192.168.1.20:1699".parse().unwrap(),
            77,
            4,
            at,
        );

        let json = serde_json::to_value(ClipboardEntryDto::from(entry)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "content": "hi",
                "origin": "B",
                "origin_address": "192.168.1.20:1699",
                "is_local": false,
                "sequence": 4,
                "received_at": 1_700_000_000_123i64,
            })
        );
    }

    #[test]
    fn test_idle_status_has_no_address() {
        let status = LiaisonStatusDto::new("A".into(), &LiaisonSession::idle(), None, 0, 3);

        assert_eq!(status.state, "idle");
        assert_eq!(status.bound_address, None);
        assert_eq!(status.started_at, None);
        assert_eq!(status.history_len, 3);
    }
}
