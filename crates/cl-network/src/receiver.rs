//! Receive loop shared by all transports.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cl_core::network::decode;
use cl_core::ports::{DatagramEndpoint, InboundEnvelopeHandler, TransportError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Large enough for any UDP datagram.
pub const RECV_BUFFER_SIZE: usize = 65_536;

/// Pause after a failed receive so a persistent socket error cannot spin.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Counters reported when a receive loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub datagrams: u64,
    pub dispatched: u64,
    pub dropped: u64,
}

enum Next {
    Shutdown,
    Datagram(Result<(usize, SocketAddr), TransportError>),
}

/// Receive datagrams from `endpoint` until `shutdown` is set (or its sender
/// dropped), decoding each one and passing it to `handler`.
///
/// Decode failures never end the loop.
pub async fn run_receive_loop(
    endpoint: Arc<dyn DatagramEndpoint>,
    mut shutdown: watch::Receiver<bool>,
    handler: Arc<dyn InboundEnvelopeHandler>,
) -> ReceiveStats {
    let local_addr = endpoint.local_addr();
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut stats = ReceiveStats::default();

    info!(%local_addr, "Receive loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!(%local_addr, "Shutdown sender dropped");
                    Next::Shutdown
                } else {
                    continue;
                }
            }
            received = endpoint.recv_from(&mut buf) => Next::Datagram(received),
        };

        match next {
            Next::Shutdown => break,
            Next::Datagram(Ok((len, source))) => {
                stats.datagrams += 1;
                match decode(&buf[..len]) {
                    Ok(envelope) => {
                        debug!(%source, len, opcode = ?envelope.opcode(), "Datagram received");
                        handler.on_envelope(envelope, source).await;
                        stats.dispatched += 1;
                    }
                    Err(err) => {
                        stats.dropped += 1;
                        warn!(%source, len, error = %err, "Dropping undecodable datagram");
                    }
                }
            }
            Next::Datagram(Err(err)) => {
                warn!(%local_addr, error = %err, "Receive failed");
                tokio::time::sleep(RECV_ERROR_BACKOFF).await;
            }
        }
    }

    info!(
        %local_addr,
        datagrams = stats.datagrams,
        dispatched = stats.dispatched,
        dropped = stats.dropped,
        "Receive loop stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryNetwork;
    use async_trait::async_trait;
    use cl_core::network::{encode, Envelope, PingEnvelope};
    use cl_core::InstanceId;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(Envelope, SocketAddr)>>,
    }

    #[async_trait]
    impl InboundEnvelopeHandler for Recorder {
        async fn on_envelope(&self, envelope: Envelope, source: SocketAddr) {
            self.seen.lock().unwrap().push((envelope, source));
        }
    }

    #[tokio::test]
    async fn test_counts_dropped_datagrams_and_stops_on_signal() {
        let network = MemoryNetwork::new();
        let endpoint = Arc::new(network.bind("10.0.0.1:1699".parse().unwrap()).unwrap());
        let from: SocketAddr = "10.0.0.2:1699".parse().unwrap();
        let ping = Envelope::Ping(PingEnvelope {
            origin: InstanceId::from("B"),
        });

        network.inject(from, endpoint.local_addr(), b"");
        network.inject(from, endpoint.local_addr(), b"nope");
        network.inject(from, endpoint.local_addr(), &encode(&ping).unwrap());

        let recorder = Arc::new(Recorder::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_receive_loop(endpoint, shutdown_rx, recorder.clone()));

        while recorder.seen.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(true).unwrap();
        let stats = task.await.unwrap();

        assert_eq!(
            stats,
            ReceiveStats {
                datagrams: 3,
                dispatched: 1,
                dropped: 2
            }
        );
        assert_eq!(recorder.seen.lock().unwrap()[0], (ping, from));
    }

    #[tokio::test]
    async fn test_dropping_shutdown_sender_ends_loop() {
        let network = MemoryNetwork::new();
        let endpoint = Arc::new(network.bind("10.0.0.1:1699".parse().unwrap()).unwrap());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_receive_loop(
            endpoint,
            shutdown_rx,
            Arc::new(Recorder::default()),
        ));

        drop(shutdown_tx);

        let stats = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop did not stop")
            .unwrap();
        assert_eq!(stats, ReceiveStats::default());
    }
}
