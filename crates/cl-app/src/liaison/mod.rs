//! Liaison session: listening, broadcasting and ingesting clipboard entries.

mod coordinator;
mod error;
mod ingest;
mod peers;

pub use coordinator::{BroadcastReceipt, LiaisonCoordinator};
pub use error::LiaisonError;
pub use peers::PeerRegistry;
