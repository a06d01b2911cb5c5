use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::clipboard::ClipboardEntry;
use crate::network::PeerInfo;

/// Change notifications pushed to subscribers, so front-ends do not have to
/// poll the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LiaisonEvent {
    SessionStarted { bound_address: SocketAddr },
    SessionStopped,
    EntryAdded(ClipboardEntry),
    PeerDiscovered(PeerInfo),
}

impl LiaisonEvent {
    /// Stable event name, also used as the webview event suffix.
    pub fn name(&self) -> &'static str {
        match self {
            LiaisonEvent::SessionStarted { .. } => "session-started",
            LiaisonEvent::SessionStopped => "session-stopped",
            LiaisonEvent::EntryAdded(_) => "entry-added",
            LiaisonEvent::PeerDiscovered(_) => "peer-discovered",
        }
    }
}
