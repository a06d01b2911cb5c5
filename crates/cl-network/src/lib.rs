//! # cl-network
//!
//! Datagram transport layer for ClipLiaison.
//!
//! This crate implements [`cl_core::ports::PeerTransportPort`] twice:
//! - [`UdpTransport`]: broadcast-capable UDP sockets for real LANs
//! - [`MemoryTransport`]: an in-process network with the same datagram
//!   semantics, for tests and embedding without sockets
//!
//! Both share one receive loop that decodes frames and drops malformed ones.

pub mod memory;
pub mod receiver;
pub mod udp;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use receiver::{run_receive_loop, ReceiveStats};
pub use udp::UdpTransport;
