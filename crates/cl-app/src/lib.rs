//! ClipLiaison Application Layer
//!
//! Owns the clipboard history and the liaison session. The coordinator is the
//! single writer of the history: local broadcasts and inbound datagrams both
//! go through it, and the transport only hands decoded envelopes back.

pub mod history;
pub mod liaison;
pub mod usecases;

pub use history::{HistoryStore, SeenSet};
pub use liaison::{BroadcastReceipt, LiaisonCoordinator, LiaisonError, PeerRegistry};
pub use usecases::{ApplyLatestEntry, ShareClipboardError, ShareLocalClipboard};
