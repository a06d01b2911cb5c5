//! UDP transport.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use cl_core::ports::{
    DatagramEndpoint, InboundEnvelopeHandler, ListenHandle, PeerTransportPort, TransportError,
};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::receiver::run_receive_loop;

/// Broadcast-capable UDP transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Bound UDP socket.
pub struct UdpEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpEndpoint {
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| map_bind_error(bind_addr, e))?;

        // Without SO_BROADCAST, sends to a broadcast address fail with EACCES.
        if let Err(err) = socket.set_broadcast(true) {
            warn!(%bind_addr, error = %err, "Failed to enable SO_BROADCAST");
        }

        let local_addr = socket.local_addr().map_err(|e| TransportError::Bind {
            addr: bind_addr,
            reason: e.to_string(),
        })?;

        Ok(Self { socket, local_addr })
    }
}

#[async_trait]
impl DatagramEndpoint for UdpEndpoint {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send_to(&self, bytes: &[u8], destination: SocketAddr) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(bytes, destination)
            .await
            .map_err(|e| TransportError::Send {
                destination,
                reason: e.to_string(),
            })?;

        if sent != bytes.len() {
            return Err(TransportError::Send {
                destination,
                reason: format!("short write: {sent} of {} bytes", bytes.len()),
            });
        }
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        self.socket
            .recv_from(buf)
            .await
            .map_err(|e| TransportError::Receive(e.to_string()))
    }
}

#[async_trait]
impl PeerTransportPort for UdpTransport {
    async fn start(&self, bind_addr: SocketAddr) -> Result<ListenHandle, TransportError> {
        let endpoint = UdpEndpoint::bind(bind_addr).await?;
        info!(bind_addr = %bind_addr, local_addr = %endpoint.local_addr, "UDP endpoint bound");
        Ok(ListenHandle::new(Arc::new(endpoint)))
    }

    async fn send(
        &self,
        handle: &ListenHandle,
        bytes: &[u8],
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
        debug!(%destination, len = bytes.len(), "Sending datagram");
        handle.endpoint().send_to(bytes, destination).await
    }

    async fn receive_loop(
        &self,
        handle: ListenHandle,
        shutdown: watch::Receiver<bool>,
        on_message: Arc<dyn InboundEnvelopeHandler>,
    ) {
        run_receive_loop(handle.endpoint().clone(), shutdown, on_message).await;
    }
}

fn map_bind_error(addr: SocketAddr, err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::AddrInUse => TransportError::AddressInUse { addr },
        io::ErrorKind::PermissionDenied => TransportError::Permission { addr },
        _ => TransportError::Bind {
            addr,
            reason: err.to_string(),
        },
    }
}
