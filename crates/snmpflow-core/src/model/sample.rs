// ── Raw samples returned by the polling protocol ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{IfaceId, Oid};

/// Width of a hardware counter, as reported by the protocol metadata
/// (`Counter32` vs `Counter64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterWidth {
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl CounterWidth {
    /// The value at which a counter of this width rolls over to zero.
    pub fn wrap(self) -> u128 {
        match self {
            Self::Bits32 => 1u128 << 32,
            Self::Bits64 => 1u128 << 64,
        }
    }
}

/// One raw counter reading from an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSample {
    pub iface: IfaceId,
    pub metric: String,
    pub value: u64,
    pub width: CounterWidth,
    pub at: DateTime<Utc>,
}

/// One device-level reading (CPU, memory, temperature...). Reported as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeSample {
    pub metric: String,
    pub value: f64,
}

/// Identity fields every SNMP agent exposes under `system`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    pub sys_object_id: Option<Oid>,
    #[serde(default)]
    pub sys_descr: String,
}
