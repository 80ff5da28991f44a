// ── Delta-state tracker ──
//
// Turns raw monotonically increasing counters into per-second rates.
// A rate needs two consecutive valid samples; anything that breaks the
// sequence (first sample, discard, clock going backwards) only sets a
// new baseline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{CounterSample, CounterWidth, IfaceId};

/// Composite key for one counter on one device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterKey {
    pub iface: IfaceId,
    pub metric: String,
}

impl CounterKey {
    pub fn new(iface: IfaceId, metric: impl Into<String>) -> Self {
        Self {
            iface,
            metric: metric.into(),
        }
    }
}

/// Last-seen raw reading for one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub previous_value: u64,
    pub previous_timestamp: DateTime<Utc>,
    pub valid: bool,
}

/// Rate between two readings of the same counter, or `None` when no
/// trustworthy rate exists.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn counter_rate(
    previous: &CounterState,
    value: u64,
    at: DateTime<Utc>,
    width: CounterWidth,
) -> Option<f64> {
    if !previous.valid {
        return None;
    }

    let elapsed_ms = (at - previous.previous_timestamp).num_milliseconds();
    if elapsed_ms <= 0 {
        return None;
    }

    let v1 = u128::from(previous.previous_value);
    let v2 = u128::from(value);
    let delta = if v2 >= v1 {
        v2 - v1
    } else {
        (v2 + width.wrap()).checked_sub(v1)?
    };

    Some(delta as f64 / (elapsed_ms as f64 / 1000.0))
}

/// Per-device store of counter baselines. Owned by exactly one poller.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    states: BTreeMap<CounterKey, CounterState>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sample` and return its rate if the previous reading was a
    /// valid baseline.
    pub fn observe(&mut self, sample: &CounterSample) -> Option<f64> {
        let key = CounterKey::new(sample.iface, sample.metric.as_str());
        let next = CounterState {
            previous_value: sample.value,
            previous_timestamp: sample.at,
            valid: true,
        };

        match self.states.insert(key, next) {
            Some(previous) => {
                let rate = counter_rate(&previous, sample.value, sample.at, sample.width);
                if rate.is_none() && previous.valid {
                    debug!(
                        iface = %sample.iface,
                        metric = %sample.metric,
                        "counter sequence broken; re-baselining"
                    );
                }
                rate
            }
            None => None,
        }
    }

    /// Invalidate every baseline. The next sample of each counter only
    /// re-establishes its baseline.
    pub fn discard(&mut self) {
        for state in self.states.values_mut() {
            state.valid = false;
        }
    }

    pub fn state(&self, key: &CounterKey) -> Option<&CounterState> {
        self.states.get(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn sample(value: u64, secs: i64, width: CounterWidth) -> CounterSample {
        CounterSample {
            iface: IfaceId(1),
            metric: "ifHCInOctets".into(),
            value,
            width,
            at: t0() + TimeDelta::seconds(secs),
        }
    }

    #[test]
    fn first_sample_only_sets_baseline() {
        let mut tracker = DeltaTracker::new();
        assert_eq!(tracker.observe(&sample(100, 0, CounterWidth::Bits64)), None);
        let state = tracker.state(&CounterKey::new(IfaceId(1), "ifHCInOctets")).unwrap();
        assert_eq!(state.previous_value, 100);
        assert!(state.valid);
    }

    #[test]
    fn consecutive_samples_yield_rate() {
        let mut tracker = DeltaTracker::new();
        tracker.observe(&sample(100, 0, CounterWidth::Bits64));
        let rate = tracker.observe(&sample(150, 60, CounterWidth::Bits64)).unwrap();
        assert!((rate - 50.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn discard_between_samples_suppresses_rate() {
        let mut tracker = DeltaTracker::new();
        tracker.observe(&sample(100, 0, CounterWidth::Bits64));
        tracker.discard();
        assert!(!tracker.state(&CounterKey::new(IfaceId(1), "ifHCInOctets")).unwrap().valid);

        assert_eq!(tracker.observe(&sample(150, 60, CounterWidth::Bits64)), None);
        let rate = tracker.observe(&sample(210, 120, CounterWidth::Bits64)).unwrap();
        assert!((rate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wraps_32_bit_counters() {
        let mut tracker = DeltaTracker::new();
        tracker.observe(&sample(4_294_967_290, 0, CounterWidth::Bits32));
        let rate = tracker.observe(&sample(10, 10, CounterWidth::Bits32)).unwrap();
        assert!((rate - 1.6).abs() < 1e-12);
    }

    #[test]
    fn wraps_64_bit_counters() {
        let mut tracker = DeltaTracker::new();
        tracker.observe(&sample(u64::MAX - 4, 0, CounterWidth::Bits64));
        let rate = tracker.observe(&sample(5, 2, CounterWidth::Bits64)).unwrap();
        assert!((rate - 5.0).abs() < 1e-12);
    }

    #[test]
    fn non_advancing_clock_rebaselines() {
        let mut tracker = DeltaTracker::new();
        tracker.observe(&sample(100, 10, CounterWidth::Bits64));
        assert_eq!(tracker.observe(&sample(200, 10, CounterWidth::Bits64)), None);
        let rate = tracker.observe(&sample(300, 20, CounterWidth::Bits64)).unwrap();
        assert!((rate - 10.0).abs() < 1e-12);
    }

    #[test]
    fn counters_are_tracked_independently() {
        let mut tracker = DeltaTracker::new();
        let mut out = sample(0, 0, CounterWidth::Bits64);
        out.metric = "ifHCOutOctets".into();
        tracker.observe(&sample(100, 0, CounterWidth::Bits64));
        tracker.observe(&out);
        assert_eq!(tracker.len(), 2);

        out.value = 600;
        out.at = t0() + TimeDelta::seconds(60);
        assert!((tracker.observe(&out).unwrap() - 10.0).abs() < 1e-12);
    }
}
