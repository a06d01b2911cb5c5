//! In-process datagram network.
//!
//! `MemoryNetwork` mimics the parts of UDP the liaison relies on: bind
//! conflicts, ephemeral ports, limited broadcast (which also loops back to
//! the sender) and silent loss for unknown destinations. Several
//! coordinators can share one network inside a single test process.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cl_core::ports::{
    DatagramEndpoint, InboundEnvelopeHandler, ListenHandle, PeerTransportPort, TransportError,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::receiver::run_receive_loop;

const FIRST_EPHEMERAL_PORT: u16 = 40_000;

type Datagram = (Vec<u8>, SocketAddr);

struct Hub {
    endpoints: HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>,
    unreachable: HashSet<SocketAddr>,
    next_port: u16,
}

impl Hub {
    fn conflicts(&self, addr: SocketAddr) -> bool {
        self.endpoints.keys().any(|bound| {
            bound.port() == addr.port()
                && (bound.ip() == addr.ip() || bound.ip().is_unspecified() || addr.ip().is_unspecified())
        })
    }

    fn allocate_port(&mut self, ip: IpAddr) -> u16 {
        loop {
            let port = self.next_port;
            self.next_port = self.next_port.checked_add(1).unwrap_or(FIRST_EPHEMERAL_PORT);
            if !self.conflicts(SocketAddr::new(ip, port)) {
                return port;
            }
        }
    }

    fn deliver(&self, bytes: &[u8], from: SocketAddr, to: SocketAddr) -> usize {
        if to.ip() == IpAddr::V4(Ipv4Addr::BROADCAST) {
            let mut delivered = 0;
            for (addr, tx) in &self.endpoints {
                if addr.port() == to.port() && tx.send((bytes.to_vec(), from)).is_ok() {
                    delivered += 1;
                }
            }
            return delivered;
        }

        let target = self.endpoints.get(&to).or_else(|| {
            let wildcard = match to.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
            };
            self.endpoints.get(&SocketAddr::new(wildcard, to.port()))
        });

        match target {
            Some(tx) if tx.send((bytes.to_vec(), from)).is_ok() => 1,
            _ => 0,
        }
    }
}

/// Shared in-process network. Clones refer to the same network.
#[derive(Clone)]
pub struct MemoryNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub {
                endpoints: HashMap::new(),
                unreachable: HashSet::new(),
                next_port: FIRST_EPHEMERAL_PORT,
            })),
        }
    }

    /// A transport whose endpoints live on this network.
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            network: self.clone(),
        }
    }

    /// Bind an endpoint. Port `0` picks a free port.
    pub fn bind(&self, addr: SocketAddr) -> Result<MemoryEndpoint, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let local_addr = {
            let mut hub = self.lock();
            let local_addr = if addr.port() == 0 {
                let port = hub.allocate_port(addr.ip());
                SocketAddr::new(addr.ip(), port)
            } else {
                addr
            };
            if hub.conflicts(local_addr) {
                return Err(TransportError::AddressInUse { addr: local_addr });
            }
            hub.endpoints.insert(local_addr, tx);
            local_addr
        };

        debug!(%local_addr, "Memory endpoint bound");
        Ok(MemoryEndpoint {
            network: self.clone(),
            local_addr,
            inbox: tokio::sync::Mutex::new(rx),
        })
    }

    /// Deliver raw bytes to `to` as if they were sent from `from`.
    ///
    /// Returns how many endpoints received a copy.
    pub fn inject(&self, from: SocketAddr, to: SocketAddr, bytes: &[u8]) -> usize {
        self.lock().deliver(bytes, from, to)
    }

    pub fn is_bound(&self, addr: SocketAddr) -> bool {
        self.lock().endpoints.contains_key(&addr)
    }

    /// Make sends to `addr` fail (or succeed again).
    pub fn set_unreachable(&self, addr: SocketAddr, unreachable: bool) {
        let mut hub = self.lock();
        if unreachable {
            hub.unreachable.insert(addr);
        } else {
            hub.unreachable.remove(&addr);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Endpoint on a [`MemoryNetwork`]. Unbinds itself when dropped.
pub struct MemoryEndpoint {
    network: MemoryNetwork,
    local_addr: SocketAddr,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

#[async_trait]
impl DatagramEndpoint for MemoryEndpoint {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send_to(&self, bytes: &[u8], destination: SocketAddr) -> Result<(), TransportError> {
        let hub = self.network.lock();
        if hub.unreachable.contains(&destination) {
            return Err(TransportError::Send {
                destination,
                reason: "network unreachable".to_string(),
            });
        }
        let delivered = hub.deliver(bytes, self.local_addr, destination);
        trace!(from = %self.local_addr, %destination, delivered, "Memory datagram sent");
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        let mut inbox = self.inbox.lock().await;
        let (bytes, source) = inbox
            .recv()
            .await
            .ok_or_else(|| TransportError::Receive("endpoint closed".to_string()))?;

        // Oversized datagrams are truncated, as with a real socket.
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok((len, source))
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        self.network.lock().endpoints.remove(&self.local_addr);
        debug!(local_addr = %self.local_addr, "Memory endpoint released");
    }
}

/// [`PeerTransportPort`] over a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryTransport {
    network: MemoryNetwork,
}

impl MemoryTransport {
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

#[async_trait]
impl PeerTransportPort for MemoryTransport {
    async fn start(&self, bind_addr: SocketAddr) -> Result<ListenHandle, TransportError> {
        let endpoint = self.network.bind(bind_addr)?;
        Ok(ListenHandle::new(Arc::new(endpoint)))
    }

    async fn send(
        &self,
        handle: &ListenHandle,
        bytes: &[u8],
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
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
