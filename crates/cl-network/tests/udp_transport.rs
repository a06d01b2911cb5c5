//! Loopback tests for the UDP transport.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cl_core::network::{encode, ClipboardEnvelope, Envelope};
use cl_core::ports::{InboundEnvelopeHandler, PeerTransportPort, TransportError};
use cl_core::InstanceId;
use cl_network::UdpTransport;
use tokio::sync::{mpsc, watch};

struct ChannelHandler {
    tx: mpsc::UnboundedSender<(Envelope, SocketAddr)>,
}

#[async_trait]
impl InboundEnvelopeHandler for ChannelHandler {
    async fn on_envelope(&self, envelope: Envelope, source: SocketAddr) {
        let _ = self.tx.send((envelope, source));
    }
}

fn data(content: &str, sequence: u64) -> Envelope {
    Envelope::Data(ClipboardEnvelope {
        origin: InstanceId::from("sender"),
        epoch: 1,
        sequence,
        content: content.to_string(),
    })
}

async fn next(rx: &mut mpsc::UnboundedReceiver<(Envelope, SocketAddr)>) -> (Envelope, SocketAddr) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for datagram")
        .expect("handler channel closed")
}

#[tokio::test]
async fn test_loopback_send_and_receive() {
    let transport = UdpTransport::new();
    let receiver = transport.start("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let sender = transport.start("127.0.0.1:0".parse().unwrap()).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_task = tokio::spawn({
        let transport = transport;
        let receiver = receiver.clone();
        async move {
            transport
                .receive_loop(receiver, shutdown_rx, Arc::new(ChannelHandler { tx }))
                .await
        }
    });

    let bytes = encode(&data("hello", 1)).unwrap();
    transport
        .send(&sender, &bytes, receiver.local_addr())
        .await
        .unwrap();

    let (envelope, source) = next(&mut rx).await;
    assert_eq!(envelope, data("hello", 1));
    assert_eq!(source, sender.local_addr());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), loop_task)
        .await
        .expect("receive loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_malformed_datagram_does_not_stop_loop() {
    let transport = UdpTransport::new();
    let receiver = transport.start("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let sender = transport.start("127.0.0.1:0".parse().unwrap()).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn({
        let receiver = receiver.clone();
        async move {
            transport
                .receive_loop(receiver, shutdown_rx, Arc::new(ChannelHandler { tx }))
                .await
        }
    });

    transport
        .send(&sender, b"definitely not a frame", receiver.local_addr())
        .await
        .unwrap();
    let bytes = encode(&data("after garbage", 2)).unwrap();
    transport
        .send(&sender, &bytes, receiver.local_addr())
        .await
        .unwrap();

    let (envelope, _) = next(&mut rx).await;
    assert_eq!(envelope, data("after garbage", 2));
}

#[tokio::test]
async fn test_rebinding_bound_port_reports_address_in_use() {
    let transport = UdpTransport::new();
    let first = transport.start("127.0.0.1:0".parse().unwrap()).await.unwrap();

    let err = transport.start(first.local_addr()).await.unwrap_err();
    assert_eq!(
        err,
        TransportError::AddressInUse {
            addr: first.local_addr()
        }
    );
}

#[tokio::test]
async fn test_dropping_handle_releases_port() {
    let transport = UdpTransport::new();
    let first = transport.start("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = first.local_addr();
    drop(first);

    let again = transport.start(addr).await.unwrap();
    assert_eq!(again.local_addr(), addr);
}
