// ── Aligned ticker ──
//
// Emits tick instants on absolute wall-clock boundaries. Tick k is
// `first + k * alignment`, so a slow poll never shifts later ticks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;
use crate::error::CoreError;

/// Truncate `t` down to a multiple of `period` since the Unix epoch.
pub fn truncate(t: DateTime<Utc>, period: TimeDelta) -> DateTime<Utc> {
    let step = period.num_milliseconds();
    if step <= 0 {
        return t;
    }
    let ms = t.timestamp_millis();
    DateTime::from_timestamp_millis(ms - ms.rem_euclid(step)).unwrap_or(t)
}

/// Identity of the fixed-length bucket an instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlignedWindow(DateTime<Utc>);

impl AlignedWindow {
    pub fn of(t: DateTime<Utc>, period: TimeDelta) -> Self {
        Self(truncate(t, period))
    }

    pub fn start(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for AlignedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Schedule of aligned ticks with a random first-tick offset.
#[derive(Debug, Clone, Copy)]
pub struct AlignedTicker {
    alignment: TimeDelta,
    jitter: TimeDelta,
}

impl AlignedTicker {
    /// Requires `alignment > 0` and `jitter < alignment`.
    pub fn new(alignment: Duration, jitter: Duration) -> Result<Self, CoreError> {
        let to_delta = |d: Duration, what: &str| {
            TimeDelta::from_std(d).map_err(|_| CoreError::Config {
                message: format!("{what} {d:?} is out of range"),
            })
        };
        let alignment = to_delta(alignment, "alignment")?;
        let jitter = to_delta(jitter, "jitter")?;

        if alignment.num_milliseconds() <= 0 {
            return Err(CoreError::Config {
                message: "alignment must be at least one millisecond".into(),
            });
        }
        if jitter >= alignment {
            return Err(CoreError::Config {
                message: format!(
                    "jitter ({}ms) must be shorter than alignment ({}ms)",
                    jitter.num_milliseconds(),
                    alignment.num_milliseconds()
                ),
            });
        }

        Ok(Self { alignment, jitter })
    }

    pub fn alignment(&self) -> TimeDelta {
        self.alignment
    }

    pub fn jitter(&self) -> TimeDelta {
        self.jitter
    }

    /// `truncate(now) + alignment + uniform[0, jitter)`.
    pub fn first_tick_with<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
        let jitter_ms = self.jitter.num_milliseconds();
        let offset = if jitter_ms > 0 {
            TimeDelta::milliseconds(rng.gen_range(0..jitter_ms))
        } else {
            TimeDelta::zero()
        };
        truncate(now, self.alignment) + self.alignment + offset
    }

    pub fn first_tick(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.first_tick_with(now, &mut rand::thread_rng())
    }

    /// The k-th tick after `first` (k = 0 is `first` itself).
    pub fn nth_tick(&self, first: DateTime<Utc>, k: i32) -> DateTime<Utc> {
        first + self.alignment * k
    }

    /// Start emitting ticks on a channel that buffers at most one.
    ///
    /// A tick that finds the buffer full is dropped; the consumer will
    /// pick up the pending one and later ticks stay on schedule. The task
    /// ends when `cancel` fires or the receiver is dropped.
    pub fn spawn(
        self,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> (DateTime<Utc>, mpsc::Receiver<DateTime<Utc>>, JoinHandle<()>) {
        let first = self.first_tick(clock.now());
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(self.run(first, clock, tx, cancel));
        (first, rx, handle)
    }

    async fn run(
        self,
        first: DateTime<Utc>,
        clock: Arc<dyn Clock>,
        tx: mpsc::Sender<DateTime<Utc>>,
        cancel: CancellationToken,
    ) {
        let mut next = first;
        loop {
            let wait = (next - clock.now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }

            match tx.try_send(next) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(tick = %next, "consumer still busy; dropping tick");
                }
                Err(TrySendError::Closed(_)) => break,
            }
            next += self.alignment;
        }
    }
}
