use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::InstanceId;

/// Who produced a clipboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryOrigin {
    /// Broadcast by this instance.
    Local { instance_id: InstanceId },
    /// Received from a peer at `address`.
    Remote {
        instance_id: InstanceId,
        address: SocketAddr,
    },
}

impl EntryOrigin {
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            EntryOrigin::Local { instance_id } => instance_id,
            EntryOrigin::Remote { instance_id, .. } => instance_id,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, EntryOrigin::Local { .. })
    }

    /// Network address of a remote origin, `None` for local entries.
    pub fn address(&self) -> Option<SocketAddr> {
        match self {
            EntryOrigin::Local { .. } => None,
            EntryOrigin::Remote { address, .. } => Some(*address),
        }
    }
}

/// One item of the shared clipboard history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    /// UTF-8 clipboard text.
    pub content: String,
    pub origin: EntryOrigin,
    /// Process epoch of the producing instance.
    pub epoch: u64,
    /// Per-origin sequence number assigned by the producing instance.
    pub sequence: u64,
    /// Local arrival time.
    pub received_at: DateTime<Utc>,
}

impl ClipboardEntry {
    pub fn local(
        content: impl Into<String>,
        instance_id: InstanceId,
        epoch: u64,
        sequence: u64,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content: content.into(),
            origin: EntryOrigin::Local { instance_id },
            epoch,
            sequence,
            received_at,
        }
    }

    pub fn remote(
        content: impl Into<String>,
        instance_id: InstanceId,
        address: SocketAddr,
        epoch: u64,
        sequence: u64,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content: content.into(),
            origin: EntryOrigin::Remote {
                instance_id,
                address,
            },
            epoch,
            sequence,
            received_at,
        }
    }

    /// Deduplication key of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            origin: self.origin.instance_id().clone(),
            epoch: self.epoch,
            sequence: self.sequence,
        }
    }
}

/// Identifies one broadcast across the LAN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub origin: InstanceId,
    pub epoch: u64,
    pub sequence: u64,
}
