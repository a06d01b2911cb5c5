use chrono::{DateTime, Utc};

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock frozen at a given instant. Used by tests and replay tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
