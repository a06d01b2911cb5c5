//! Port interfaces for the application layer
//!
//! Ports define the contract between the liaison use cases and the
//! infrastructure implementations (UDP sockets, system clipboard, clock).
//! The application layer only ever holds `Arc<dyn Port>`.

mod clock;
mod system_clipboard;
pub mod transport;

pub use clock::{ClockPort, FixedClock};
pub use system_clipboard::SystemClipboardPort;
pub use transport::{
    DatagramEndpoint, InboundEnvelopeHandler, ListenHandle, PeerTransportPort, TransportError,
};
