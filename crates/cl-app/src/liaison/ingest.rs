//! Inbound envelope handling.
//!
//! The receive loop calls [`IngestHandler`] for every decoded datagram. It
//! holds only a weak reference to the coordinator so a dropped coordinator
//! never stays alive through its own receive task.

use std::net::SocketAddr;
use std::sync::Weak;

use async_trait::async_trait;
use cl_core::network::{encode, ClipboardEnvelope, Envelope, PongEnvelope};
use cl_core::ports::{InboundEnvelopeHandler, ListenHandle};
use cl_core::ClipboardEntry;
use tracing::{debug, trace, warn};

use super::coordinator::CoordinatorInner;

pub(super) struct IngestHandler {
    inner: Weak<CoordinatorInner>,
    handle: ListenHandle,
}

impl IngestHandler {
    pub(super) fn new(inner: Weak<CoordinatorInner>, handle: ListenHandle) -> Self {
        Self { inner, handle }
    }

    fn ingest_data(&self, inner: &CoordinatorInner, data: ClipboardEnvelope, source: SocketAddr) {
        inner.observe_peer(source, Some(data.origin.clone()));

        let entry = ClipboardEntry::remote(
            data.content,
            data.origin,
            source,
            data.epoch,
            data.sequence,
            inner.clock.now(),
        );
        let key = entry.key();
        match inner.record(entry) {
            Some(position) => debug!(
                %source,
                origin = %key.origin,
                epoch = key.epoch,
                sequence = key.sequence,
                position,
                "Clipboard entry ingested"
            ),
            None => trace!(
                %source,
                origin = %key.origin,
                epoch = key.epoch,
                sequence = key.sequence,
                "Duplicate envelope dropped"
            ),
        }
    }

    async fn answer_ping(&self, inner: &CoordinatorInner, source: SocketAddr) {
        let peers = inner
            .peers()
            .addresses()
            .into_iter()
            .filter(|addr| *addr != source)
            .collect();
        let pong = Envelope::Pong(PongEnvelope {
            origin: inner.instance_id.clone(),
            peers,
        });

        let frame = match encode(&pong) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "Failed to encode pong");
                return;
            }
        };
        if let Err(err) = inner.transport.send(&self.handle, &frame, source).await {
            warn!(%source, error = %err, "Failed to answer ping");
        }
    }

    fn ingest_pong(&self, inner: &CoordinatorInner, pong: PongEnvelope, source: SocketAddr) {
        inner.observe_peer(source, Some(pong.origin));

        let local_addr = self.handle.local_addr();
        for peer in pong.peers {
            if peer == local_addr || peer.ip().is_unspecified() || peer.port() == 0 {
                continue;
            }
            inner.observe_peer(peer, None);
        }
    }
}

#[async_trait]
impl InboundEnvelopeHandler for IngestHandler {
    async fn on_envelope(&self, envelope: Envelope, source: SocketAddr) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        // Our own broadcasts come back through the network; the local append
        // already happened. The source still tells us which address is ours.
        if envelope.origin() == &inner.instance_id {
            trace!(%source, opcode = ?envelope.opcode(), "Ignoring own envelope");
            inner.note_own_address(source);
            return;
        }

        match envelope {
            Envelope::Data(data) => self.ingest_data(&inner, data, source),
            Envelope::Ping(ping) => {
                inner.observe_peer(source, Some(ping.origin));
                self.answer_ping(&inner, source).await;
            }
            Envelope::Pong(pong) => self.ingest_pong(&inner, pong, source),
        }
    }
}
