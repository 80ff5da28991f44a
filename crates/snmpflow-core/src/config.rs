// ── Runtime collector configuration ──
//
// These types describe *what* to poll and *when*. They never touch
// disk: the binary loads its settings file, validates it, and hands
// a `CollectorConfig` plus one `DeviceSpec` per device in.

use std::time::Duration;

use crate::model::DeviceId;

/// Scheduling parameters shared by every device loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Width of the aligned window; ticks land once per window.
    pub alignment: Duration,
    /// Upper bound (exclusive) on the random offset of the first tick.
    pub jitter: Duration,
    /// Capacity of the batch channel between pollers and sinks.
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            alignment: Duration::from_secs(60),
            jitter: Duration::from_secs(15),
            channel_capacity: 64,
        }
    }
}

/// One device to poll.
///
/// The optional identity fields override what the agent reports about
/// itself, which is how devices with a misleading sysObjectID are pinned
/// to the right classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub name: String,
    pub sys_object_id: Option<String>,
    pub sys_descr: Option<String>,
    /// Template used when the classifier finds no match.
    pub template: Option<String>,
    /// Multiplier applied to every computed rate. 0 is treated as 1.
    pub rate_multiplier: u32,
}

impl DeviceSpec {
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sys_object_id: None,
            sys_descr: None,
            template: None,
            rate_multiplier: 1,
        }
    }
}
