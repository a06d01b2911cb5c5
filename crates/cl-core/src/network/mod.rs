//! Peer protocol: envelopes exchanged between liaison instances and their
//! datagram framing.

pub mod codec;
mod envelope;
mod peer;

pub use codec::{decode, encode, DecodeError, EncodeError, MAX_DATAGRAM_SIZE};
pub use envelope::{ClipboardEnvelope, Envelope, Opcode, PingEnvelope, PongEnvelope};
pub use peer::PeerInfo;
