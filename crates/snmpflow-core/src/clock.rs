// ── Wall-clock source ──
//
// Window alignment is defined on wall-clock time. Everything that
// compares instants against window boundaries reads the time through
// `Clock` so tests can drive it by hand.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
