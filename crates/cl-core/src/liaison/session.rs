use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of the listening socket.
///
/// ```text
/// Idle --start--> Listening --stop--> Stopped
///   \______________stop_______________/
/// ```
///
/// `Stopped` is terminal for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Listening,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionTransitionError {
    #[error("cannot start a liaison session from state {0:?}")]
    CannotStart(SessionState),
}

/// Point-in-time view of the liaison session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiaisonSession {
    pub state: SessionState,
    pub bound_address: Option<SocketAddr>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for LiaisonSession {
    fn default() -> Self {
        Self::idle()
    }
}

impl LiaisonSession {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            bound_address: None,
            started_at: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    /// `Idle -> Listening`.
    pub fn start(
        &mut self,
        bound_address: SocketAddr,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionTransitionError> {
        if self.state != SessionState::Idle {
            return Err(SessionTransitionError::CannotStart(self.state));
        }
        self.state = SessionState::Listening;
        self.bound_address = Some(bound_address);
        self.started_at = Some(started_at);
        Ok(())
    }

    /// Any state -> `Stopped`. The bound address of a previous listening
    /// session is kept for reporting.
    pub fn stop(&mut self) {
        self.state = SessionState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:1699".parse().unwrap()
    }

    #[test]
    fn test_idle_session_starts_listening() {
        let mut session = LiaisonSession::idle();
        let now = Utc::now();

        session.start(addr(), now).unwrap();

        assert!(session.is_listening());
        assert_eq!(session.bound_address, Some(addr()));
        assert_eq!(session.started_at, Some(now));
    }

    #[test]
    fn test_listening_session_cannot_start_again() {
        let mut session = LiaisonSession::idle();
        session.start(addr(), Utc::now()).unwrap();

        let err = session.start(addr(), Utc::now()).unwrap_err();

        assert_eq!(
            err,
            SessionTransitionError::CannotStart(SessionState::Listening)
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut session = LiaisonSession::idle();
        session.stop();

        assert_eq!(session.state, SessionState::Stopped);
        assert!(session.start(addr(), Utc::now()).is_err());
    }
}
