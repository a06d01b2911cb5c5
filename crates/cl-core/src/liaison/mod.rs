//! Liaison session lifecycle and the events it publishes.

mod event;
mod session;

pub use event::LiaisonEvent;
pub use session::{LiaisonSession, SessionState, SessionTransitionError};
