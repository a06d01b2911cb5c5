use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cl_core::config::NetworkConfig;
use cl_core::network::{encode, ClipboardEnvelope, Envelope, PingEnvelope};
use cl_core::ids::random_epoch;
use cl_core::ports::{InboundEnvelopeHandler, ListenHandle};
use cl_core::{
    ClipboardEntry, ClockPort, InstanceId, LiaisonConfig, LiaisonEvent, LiaisonSession,
    PeerInfo, PeerTransportPort, SessionState,
};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::error::LiaisonError;
use super::ingest::IngestHandler;
use super::peers::PeerRegistry;
use crate::history::{HistoryStore, SeenSet};

/// Buffered events per subscriber before old ones are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Outcome of a [`LiaisonCoordinator::broadcast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReceipt {
    /// Sequence number assigned to the local entry.
    pub sequence: u64,
    /// Destinations the frame was handed to.
    pub delivered: usize,
    /// Destinations whose send failed.
    pub failed: usize,
}

/// Owns the liaison session and the clipboard history.
///
/// `Idle --start--> Listening --stop--> Stopped`. Cloning is cheap and every
/// clone drives the same session.
///
/// 联络协调器：管理监听会话，并且是历史记录的唯一写入者。
#[derive(Clone)]
pub struct LiaisonCoordinator {
    inner: Arc<CoordinatorInner>,
}

pub(super) struct CoordinatorInner {
    pub(super) network: NetworkConfig,
    pub(super) instance_id: InstanceId,
    epoch: u64,
    pub(super) transport: Arc<dyn PeerTransportPort>,
    pub(super) clock: Arc<dyn ClockPort>,
    history: HistoryStore,
    seen: Mutex<SeenSet>,
    peers: Mutex<PeerRegistry>,
    /// Source addresses our own envelopes came back from.
    own_addresses: Mutex<HashSet<SocketAddr>>,
    next_sequence: AtomicU64,
    session: tokio::sync::Mutex<SessionSlot>,
    events: broadcast::Sender<LiaisonEvent>,
}

struct SessionSlot {
    session: LiaisonSession,
    listener: Option<ActiveListener>,
}

/// The bound endpoint plus the task reading from it.
struct ActiveListener {
    handle: ListenHandle,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LiaisonCoordinator {
    pub fn new(
        config: &LiaisonConfig,
        transport: Arc<dyn PeerTransportPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                network: config.network.clone(),
                instance_id: config.resolve_instance_id(),
                epoch: random_epoch(),
                transport,
                clock,
                history: HistoryStore::new(config.history.capacity_limit()),
                seen: Mutex::new(SeenSet::new(config.history.dedup_window)),
                peers: Mutex::new(PeerRegistry::new(config.network.max_peers)),
                own_addresses: Mutex::new(HashSet::new()),
                next_sequence: AtomicU64::new(1),
                session: tokio::sync::Mutex::new(SessionSlot {
                    session: LiaisonSession::idle(),
                    listener: None,
                }),
                events,
            }),
        }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.inner.instance_id
    }

    /// Bind the transport and start the receive loop.
    ///
    /// Calling this while already listening returns the existing bound
    /// address without binding again. A bind failure leaves the session
    /// `Idle`; after [`stop`](Self::stop) it fails with
    /// [`LiaisonError::Stopped`].
    pub async fn start(&self) -> Result<SocketAddr, LiaisonError> {
        let span = info_span!("liaison.start", instance_id = %self.inner.instance_id);

        async {
            let mut slot = self.inner.session.lock().await;
            match slot.session.state {
                SessionState::Listening => {
                    if let Some(bound) = slot.session.bound_address {
                        debug!(%bound, "Already listening");
                        return Ok(bound);
                    }
                }
                SessionState::Stopped => return Err(LiaisonError::Stopped),
                SessionState::Idle => {}
            }

            let bind_addr = self.inner.network.bind_addr;
            let handle = self.inner.transport.start(bind_addr).await.map_err(|err| {
                warn!(%bind_addr, error = %err, "Failed to bind liaison endpoint");
                err
            })?;
            let bound = handle.local_addr();
            slot.session.start(bound, self.inner.clock.now())?;

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let handler: Arc<dyn InboundEnvelopeHandler> =
                Arc::new(IngestHandler::new(Arc::downgrade(&self.inner), handle.clone()));
            let transport = self.inner.transport.clone();
            let loop_handle = handle.clone();
            let task = tokio::spawn(
                async move {
                    transport
                        .receive_loop(loop_handle, shutdown_rx, handler)
                        .await
                }
                .instrument(info_span!("liaison.receive_loop", %bound)),
            );

            slot.listener = Some(ActiveListener {
                handle: handle.clone(),
                shutdown: shutdown_tx,
                task,
            });
            drop(slot);

            info!(%bound, "Liaison listening");
            self.inner.emit(LiaisonEvent::SessionStarted {
                bound_address: bound,
            });

            if self.inner.network.announce_on_start {
                self.announce(&handle).await;
            }

            Ok(bound)
        }
        .instrument(span)
        .await
    }

    /// Append `content` to the local history and send it to the LAN.
    ///
    /// The local append happens exactly once, before any send; network echoes
    /// of the same message are dropped by deduplication. When the session is
    /// not listening the entry is only kept locally. Fails when the content
    /// does not fit in one datagram (nothing is appended) or when every
    /// destination failed.
    pub async fn broadcast(
        &self,
        content: impl Into<String>,
    ) -> Result<BroadcastReceipt, LiaisonError> {
        let content = content.into();
        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::SeqCst);
        let span = info_span!("liaison.broadcast", sequence, len = content.len());

        async {
            let frame = encode(&Envelope::Data(ClipboardEnvelope {
                origin: self.inner.instance_id.clone(),
                epoch: self.inner.epoch,
                sequence,
                content: content.clone(),
            }))?;

            let entry = ClipboardEntry::local(
                content,
                self.inner.instance_id.clone(),
                self.inner.epoch,
                sequence,
                self.inner.clock.now(),
            );
            self.inner.record(entry);

            let mut receipt = BroadcastReceipt {
                sequence,
                delivered: 0,
                failed: 0,
            };

            let Some(handle) = self.listen_handle().await else {
                debug!("Not listening, entry kept locally");
                return Ok(receipt);
            };

            let broadcast_destination = self.inner.network.broadcast_destination();
            let mut destinations: Vec<SocketAddr> = broadcast_destination.into_iter().collect();
            if self.inner.network.peer_fanout {
                let peer_addresses = self.inner.peers().addresses();
                for peer in peer_addresses {
                    if !destinations.contains(&peer) {
                        destinations.push(peer);
                    }
                }
            }

            let mut last_error = None;
            for destination in destinations {
                match self
                    .inner
                    .transport
                    .send(&handle, &frame, destination)
                    .await
                {
                    Ok(()) => receipt.delivered += 1,
                    Err(err) => {
                        receipt.failed += 1;
                        warn!(%destination, error = %err, "Broadcast send failed");
                        if Some(destination) != broadcast_destination
                            && self.inner.peers().remove(destination)
                        {
                            info!(%destination, "Removed unreachable peer");
                        }
                        last_error = Some(err);
                    }
                }
            }

            match last_error {
                Some(err) if receipt.delivered == 0 => Err(err.into()),
                _ => {
                    debug!(
                        delivered = receipt.delivered,
                        failed = receipt.failed,
                        "Broadcast sent"
                    );
                    Ok(receipt)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// History in arrival order, oldest first.
    pub fn get_history(&self) -> Vec<ClipboardEntry> {
        self.inner.history.snapshot()
    }

    pub fn latest_entry(&self) -> Option<ClipboardEntry> {
        self.inner.history.latest()
    }

    /// Stop listening and release the socket.
    ///
    /// Waits for the receive loop to exit. `Stopped` is terminal; calling
    /// this again is a no-op.
    pub async fn stop(&self) {
        let span = info_span!("liaison.stop", instance_id = %self.inner.instance_id);

        async {
            let mut slot = self.inner.session.lock().await;
            if slot.session.state == SessionState::Stopped {
                debug!("Already stopped");
                return;
            }

            slot.session.stop();
            if let Some(listener) = slot.listener.take() {
                let ActiveListener {
                    handle,
                    shutdown,
                    task,
                } = listener;
                let _ = shutdown.send(true);
                if let Err(err) = task.await {
                    warn!(error = %err, "Receive loop ended abnormally");
                }
                drop(handle);
            }
            drop(slot);

            info!("Liaison stopped");
            self.inner.emit(LiaisonEvent::SessionStopped);
        }
        .instrument(span)
        .await
    }

    pub async fn session(&self) -> LiaisonSession {
        self.inner.session.lock().await.session.clone()
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        self.inner.peers().snapshot()
    }

    /// Push notifications for history, session and peer changes.
    ///
    /// Slow subscribers lose the oldest events; [`get_history`](Self::get_history)
    /// remains the source of truth.
    pub fn subscribe(&self) -> broadcast::Receiver<LiaisonEvent> {
        self.inner.events.subscribe()
    }

    async fn listen_handle(&self) -> Option<ListenHandle> {
        let slot = self.inner.session.lock().await;
        slot.listener.as_ref().map(|listener| listener.handle.clone())
    }

    async fn announce(&self, handle: &ListenHandle) {
        let Some(destination) = self.inner.network.broadcast_destination() else {
            return;
        };
        let ping = Envelope::Ping(PingEnvelope {
            origin: self.inner.instance_id.clone(),
        });

        match encode(&ping) {
            Ok(frame) => {
                if let Err(err) = self.inner.transport.send(handle, &frame, destination).await {
                    warn!(%destination, error = %err, "Discovery ping failed");
                } else {
                    debug!(%destination, "Discovery ping sent");
                }
            }
            Err(err) => warn!(error = %err, "Failed to encode discovery ping"),
        }
    }
}

impl CoordinatorInner {
    /// Dedup check and append, as one step.
    ///
    /// Returns the history position, or `None` for an already seen
    /// `(origin, epoch, sequence)` key.
    pub(super) fn record(&self, entry: ClipboardEntry) -> Option<u64> {
        let position = {
            let mut seen = lock(&self.seen);
            if !seen.insert(entry.key()) {
                return None;
            }
            self.history.append(entry.clone())
        };
        self.emit(LiaisonEvent::EntryAdded(entry));
        Some(position)
    }

    /// Register `address` as a peer, announcing it when new.
    ///
    /// Addresses known to be our own are never registered.
    pub(super) fn observe_peer(&self, address: SocketAddr, instance_id: Option<InstanceId>) {
        if lock(&self.own_addresses).contains(&address) {
            return;
        }
        let discovered = self
            .peers()
            .observe(address, instance_id, self.clock.now());
        if let Some(peer) = discovered {
            info!(address = %peer.address, "Peer discovered");
            self.emit(LiaisonEvent::PeerDiscovered(peer));
        }
    }

    /// Remember `address` as one of ours and drop it from the registry.
    ///
    /// A wildcard bind does not know the LAN address peers see; the source of
    /// an echoed own envelope does.
    pub(super) fn note_own_address(&self, address: SocketAddr) {
        if !lock(&self.own_addresses).insert(address) {
            return;
        }
        debug!(%address, "Learned own address");
        if self.peers().remove(address) {
            info!(%address, "Removed own address from peers");
        }
    }

    pub(super) fn peers(&self) -> MutexGuard<'_, PeerRegistry> {
        lock(&self.peers)
    }

    pub(super) fn emit(&self, event: LiaisonEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cl_core::ports::{FixedClock, TransportError};
    use chrono::Utc;

    /// Transport whose bind always fails.
    struct FailingTransport {
        error: TransportError,
    }

    #[async_trait]
    impl PeerTransportPort for FailingTransport {
        async fn start(&self, _bind_addr: SocketAddr) -> Result<ListenHandle, TransportError> {
            Err(self.error.clone())
        }

        async fn send(
            &self,
            _handle: &ListenHandle,
            _bytes: &[u8],
            _destination: SocketAddr,
        ) -> Result<(), TransportError> {
            unreachable!("nothing is ever bound")
        }

        async fn receive_loop(
            &self,
            _handle: ListenHandle,
            _shutdown: watch::Receiver<bool>,
            _on_message: Arc<dyn InboundEnvelopeHandler>,
        ) {
        }
    }

    fn coordinator(error: TransportError) -> LiaisonCoordinator {
        let mut config = LiaisonConfig::default();
        config.instance_id = Some("A".to_string());
        LiaisonCoordinator::new(
            &config,
            Arc::new(FailingTransport { error }),
            Arc::new(FixedClock(Utc::now())),
        )
    }

    #[tokio::test]
    async fn test_bind_failure_leaves_session_idle() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let coordinator = coordinator(TransportError::AddressInUse { addr });

        let err = coordinator.start().await.unwrap_err();

        assert_eq!(
            err,
            LiaisonError::Transport(TransportError::AddressInUse { addr })
        );
        assert_eq!(coordinator.session().await.state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_permission_error_is_surfaced() {
        let addr: SocketAddr = "0.0.0.0:80".parse().unwrap();
        let coordinator = coordinator(TransportError::Permission { addr });

        assert!(matches!(
            coordinator.start().await,
            Err(LiaisonError::Transport(TransportError::Permission { .. }))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_while_idle_keeps_entry_locally() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let coordinator = coordinator(TransportError::AddressInUse { addr });

        let receipt = coordinator.broadcast("offline").await.unwrap();

        assert_eq!(
            receipt,
            BroadcastReceipt {
                sequence: 1,
                delivered: 0,
                failed: 0
            }
        );
        let history = coordinator.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "offline");
        assert!(history[0].origin.is_local());
    }

    #[tokio::test]
    async fn test_sequences_increase_per_broadcast() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let coordinator = coordinator(TransportError::AddressInUse { addr });

        let first = coordinator.broadcast("a").await.unwrap();
        let second = coordinator.broadcast("b").await.unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(coordinator.latest_entry().map(|e| e.content), Some("b".into()));
    }

    #[tokio::test]
    async fn test_oversized_content_is_rejected_without_append() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let coordinator = coordinator(TransportError::AddressInUse { addr });

        let err = coordinator.broadcast("x".repeat(70_000)).await.unwrap_err();

        assert!(matches!(err, LiaisonError::Encode(_)));
        assert!(coordinator.get_history().is_empty());
    }

    #[tokio::test]
    async fn test_stop_from_idle_is_terminal() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let coordinator = coordinator(TransportError::AddressInUse { addr });
        let mut events = coordinator.subscribe();

        coordinator.stop().await;
        coordinator.stop().await;

        assert_eq!(coordinator.session().await.state, SessionState::Stopped);
        assert_eq!(coordinator.start().await, Err(LiaisonError::Stopped));
        assert_eq!(events.recv().await.unwrap(), LiaisonEvent::SessionStopped);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_configured_instance_id_is_used() {
        let addr: SocketAddr = "0.0.0.0:1699".parse().unwrap();
        let coordinator = coordinator(TransportError::AddressInUse { addr });
        assert_eq!(coordinator.instance_id().as_str(), "A");
    }
}
