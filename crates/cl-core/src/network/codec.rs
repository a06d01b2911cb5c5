//! Datagram framing for liaison envelopes.
//!
//! Frame layout (one frame per datagram):
//!
//! ```text
//! +-------+---------+--------+-------------+----------+----------------+
//! | magic | version | opcode | body_length | checksum | body (bincode) |
//! | 2 B   | 1 B     | 1 B    | u32 LE      | u64 LE   | body_length B  |
//! +-------+---------+--------+-------------+----------+----------------+
//! ```
//!
//! The checksum is the xxh3-64 hash of the body. Bytes after the body are
//! ignored so later protocol revisions can append data without breaking
//! older peers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use twox_hash::xxh3::hash64;

use super::envelope::{Envelope, Opcode};

/// Wire protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Leading bytes of every frame
pub const FRAME_MAGIC: [u8; 2] = *b"CL";

/// Fixed header size in bytes
pub const FRAME_HEADER_SIZE: usize = 16;

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("frame of {size} bytes exceeds the {max} byte datagram limit")]
    TooLarge { size: usize, max: usize },

    #[error("failed to serialize envelope: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameHeader {
    magic: [u8; 2],
    version: u8,
    opcode: u8,
    body_length: u32,
    checksum: u64,
}

/// Encode an envelope into a single datagram frame.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
    let body = match envelope {
        Envelope::Ping(ping) => bincode::serialize(ping),
        Envelope::Pong(pong) => bincode::serialize(pong),
        Envelope::Data(data) => bincode::serialize(data),
    }
    .map_err(|e| EncodeError::Serialize(e.to_string()))?;

    let size = FRAME_HEADER_SIZE + body.len();
    if size > MAX_DATAGRAM_SIZE {
        return Err(EncodeError::TooLarge {
            size,
            max: MAX_DATAGRAM_SIZE,
        });
    }

    let header = FrameHeader {
        magic: FRAME_MAGIC,
        version: PROTOCOL_VERSION,
        opcode: envelope.opcode() as u8,
        body_length: body.len() as u32,
        checksum: hash64(&body),
    };
    let header_bytes =
        bincode::serialize(&header).map_err(|e| EncodeError::Serialize(e.to_string()))?;

    let mut frame = Vec::with_capacity(size);
    frame.extend_from_slice(&header_bytes);
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode one datagram frame.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(DecodeError::Malformed(format!(
            "frame too short: expected at least {} bytes, got {}",
            FRAME_HEADER_SIZE,
            bytes.len()
        )));
    }

    let header: FrameHeader = bincode::deserialize(&bytes[..FRAME_HEADER_SIZE])
        .map_err(|e| DecodeError::Malformed(format!("invalid header: {e}")))?;

    if header.magic != FRAME_MAGIC {
        return Err(DecodeError::Malformed("bad frame magic".to_string()));
    }

    if header.version != PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    let body_length = header.body_length as usize;
    let available = bytes.len() - FRAME_HEADER_SIZE;
    if body_length > available {
        return Err(DecodeError::Malformed(format!(
            "truncated body: header declares {body_length} bytes, got {available}"
        )));
    }

    let body = &bytes[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + body_length];
    if hash64(body) != header.checksum {
        return Err(DecodeError::Malformed("checksum mismatch".to_string()));
    }

    let opcode = Opcode::from_u8(header.opcode)
        .ok_or_else(|| DecodeError::Malformed(format!("unknown opcode {}", header.opcode)))?;

    match opcode {
        Opcode::Ping => parse_body(body).map(Envelope::Ping),
        Opcode::Pong => parse_body(body).map(Envelope::Pong),
        Opcode::Data => parse_body(body).map(Envelope::Data),
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    bincode::deserialize(body).map_err(|e| DecodeError::Malformed(format!("invalid body: {e}")))
}
