//! Peer transport port - moves encoded envelopes across the network.
//!
//! The transport owns no application state. It binds an endpoint, sends raw
//! frames, and runs a receive loop that decodes inbound datagrams and hands
//! them to an [`InboundEnvelopeHandler`] supplied by the application layer.
//! Delivery is best-effort datagram semantics: unordered, unacknowledged and
//! never retried.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::network::Envelope;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("address {addr} is already in use")]
    AddressInUse { addr: SocketAddr },

    #[error("permission denied while binding {addr}")]
    Permission { addr: SocketAddr },

    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },

    #[error("failed to send to {destination}: {reason}")]
    Send {
        destination: SocketAddr,
        reason: String,
    },

    #[error("failed to receive: {0}")]
    Receive(String),
}

/// A bound datagram socket.
#[async_trait]
pub trait DatagramEndpoint: Send + Sync {
    fn local_addr(&self) -> SocketAddr;

    async fn send_to(&self, bytes: &[u8], destination: SocketAddr) -> Result<(), TransportError>;

    /// Wait for the next datagram, returning its length and sender.
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError>;
}

/// Handle to a bound endpoint returned by [`PeerTransportPort::start`].
///
/// Cloning shares the underlying socket; the socket is released once every
/// clone is dropped.
#[derive(Clone)]
pub struct ListenHandle {
    local_addr: SocketAddr,
    endpoint: Arc<dyn DatagramEndpoint>,
}

impl ListenHandle {
    pub fn new(endpoint: Arc<dyn DatagramEndpoint>) -> Self {
        Self {
            local_addr: endpoint.local_addr(),
            endpoint,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn endpoint(&self) -> &Arc<dyn DatagramEndpoint> {
        &self.endpoint
    }
}

impl fmt::Debug for ListenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenHandle")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

/// Callback invoked by the receive loop for every decoded envelope.
///
/// Transport layer calls this; the application layer implements it.
#[async_trait]
pub trait InboundEnvelopeHandler: Send + Sync {
    async fn on_envelope(&self, envelope: Envelope, source: SocketAddr);
}

#[async_trait]
pub trait PeerTransportPort: Send + Sync {
    /// Bind a broadcast-capable endpoint.
    async fn start(&self, bind_addr: SocketAddr) -> Result<ListenHandle, TransportError>;

    /// Best-effort send of one frame.
    async fn send(
        &self,
        handle: &ListenHandle,
        bytes: &[u8],
        destination: SocketAddr,
    ) -> Result<(), TransportError>;

    /// Receive, decode and dispatch datagrams until `shutdown` turns `true`
    /// or its sender is dropped. Malformed datagrams are logged and dropped.
    async fn receive_loop(
        &self,
        handle: ListenHandle,
        shutdown: watch::Receiver<bool>,
        on_message: Arc<dyn InboundEnvelopeHandler>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_are_object_safe() {
        fn assert_transport(_port: &dyn PeerTransportPort) {}
        fn assert_endpoint(_endpoint: &dyn DatagramEndpoint) {}
        fn assert_handler(_handler: &dyn InboundEnvelopeHandler) {}
        let _ = (assert_transport, assert_endpoint, assert_handler);
    }

    #[test]
    fn test_transport_errors_render_addresses() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let err = TransportError::AddressInUse { addr };
        assert_eq!(err.to_string(), "address 0.0.0.0:1699 is already in use");
    }
}
