use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::ids::InstanceId;

/// Frame opcode. Values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Discovery probe, answered with a `Pong`.
    Ping = 0x00,
    /// Discovery answer listing the responder's known peers.
    Pong = 0x01,
    /// Clipboard payload.
    Data = 0x02,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Opcode::Ping),
            0x01 => Some(Opcode::Pong),
            0x02 => Some(Opcode::Data),
            _ => None,
        }
    }
}

/// Clipboard broadcast body. Field order is fixed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEnvelope {
    pub origin: InstanceId,
    /// Sender process epoch; sequences restart when it changes.
    pub epoch: u64,
    pub sequence: u64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingEnvelope {
    pub origin: InstanceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongEnvelope {
    pub origin: InstanceId,
    pub peers: Vec<SocketAddr>,
}

/// One decoded datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Ping(PingEnvelope),
    Pong(PongEnvelope),
    Data(ClipboardEnvelope),
}

impl Envelope {
    pub fn opcode(&self) -> Opcode {
        match self {
            Envelope::Ping(_) => Opcode::Ping,
            Envelope::Pong(_) => Opcode::Pong,
            Envelope::Data(_) => Opcode::Data,
        }
    }

    pub fn origin(&self) -> &InstanceId {
        match self {
            Envelope::Ping(ping) => &ping.origin,
            Envelope::Pong(pong) => &pong.origin,
            Envelope::Data(data) => &data.origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_conversion() {
        assert_eq!(Opcode::from_u8(0), Some(Opcode::Ping));
        assert_eq!(Opcode::from_u8(1), Some(Opcode::Pong));
        assert_eq!(Opcode::from_u8(2), Some(Opcode::Data));
        assert_eq!(Opcode::from_u8(7), None);
    }

    #[test]
    fn test_envelope_reports_origin_and_opcode() {
        let envelope = Envelope::Data(ClipboardEnvelope {
            origin: InstanceId::from("A"),
            epoch: 5,
            sequence: 9,
            content: "x".to_string(),
        });
        assert_eq!(envelope.opcode(), Opcode::Data);
        assert_eq!(envelope.origin().as_str(), "A");
    }
}
