use cl_core::liaison::SessionTransitionError;
use cl_core::network::EncodeError;
use cl_core::TransportError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiaisonError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to encode clipboard envelope: {0}")]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Session(#[from] SessionTransitionError),

    #[error("liaison session has been stopped")]
    Stopped,
}
