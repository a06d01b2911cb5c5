//! # cl-core
//!
//! Core domain models and business rules for ClipLiaison.
//!
//! This crate holds the clipboard entry model, the peer wire codec, the
//! liaison session model and the port traits implemented by the network and
//! platform layers. It performs no I/O of its own.

pub mod clipboard;
pub mod config;
pub mod ids;
pub mod liaison;
pub mod network;
pub mod ports;

// Re-export commonly used types at the crate root
pub use clipboard::{ClipboardEntry, EntryKey, EntryOrigin};
pub use config::LiaisonConfig;
pub use ids::InstanceId;
pub use liaison::{LiaisonEvent, LiaisonSession, SessionState};
pub use network::{ClipboardEnvelope, Envelope, PeerInfo};
pub use ports::{ClockPort, PeerTransportPort, TransportError};
