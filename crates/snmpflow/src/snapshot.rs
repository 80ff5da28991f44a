//! File-backed polling client.
//!
//! An external walker keeps one JSON snapshot per device up to date; each
//! cycle re-reads it. Shape:
//!
//! ```json
//! {
//!   "taken_at": "2024-03-01T10:09:00.412Z",
//!   "system": { "sys_object_id": ".1.3.6.1.4.1.9.1.1208", "sys_descr": "Cisco IOS" },
//!   "device": { "CPU": 12.5, "MemoryUtilization": 41.0 },
//!   "interfaces": {
//!     "1": { "ifHCInOctets": 90210, "ifInErrors": { "value": 3, "width": "32" } }
//!   }
//! }
//! ```
//!
//! Bare counter values are 64-bit. `taken_at` defaults to read time.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use snmpflow_core::{
    Clock, CounterSample, CounterWidth, GaugeSample, IfaceId, PollError, SnmpClient, SystemInfo,
};

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    system: SystemInfo,
    #[serde(default)]
    device: BTreeMap<String, f64>,
    #[serde(default)]
    interfaces: BTreeMap<u32, BTreeMap<String, CounterValue>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum CounterValue {
    Bare(u64),
    Sized { value: u64, width: CounterWidth },
}

impl CounterValue {
    fn split(self) -> (u64, CounterWidth) {
        match self {
            Self::Bare(value) => (value, CounterWidth::Bits64),
            Self::Sized { value, width } => (value, width),
        }
    }
}

pub struct SnapshotClient {
    address: String,
    path: PathBuf,
    clock: Arc<dyn Clock>,
    /// Snapshot read by `poll_device`, consumed by `poll_interfaces`, so
    /// both halves of a cycle see the same file contents.
    pending: Option<(Snapshot, DateTime<Utc>)>,
}

impl SnapshotClient {
    pub fn new(address: impl Into<String>, path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            address: address.into(),
            path: path.into(),
            clock,
            pending: None,
        }
    }

    async fn read(&self) -> Result<(Snapshot, DateTime<Utc>), PollError> {
        let read_at = self.clock.now();
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| PollError::Unavailable {
                target: self.address.clone(),
                reason: format!("{}: {e}", self.path.display()),
            })?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| PollError::Protocol {
                target: self.address.clone(),
                message: format!("{}: {e}", self.path.display()),
            })?;
        let at = snapshot.taken_at.unwrap_or(read_at);
        Ok((snapshot, at))
    }
}

#[async_trait]
impl SnmpClient for SnapshotClient {
    fn target(&self) -> &str {
        &self.address
    }

    async fn system_info(&mut self) -> Result<SystemInfo, PollError> {
        let (snapshot, _) = self.read().await?;
        Ok(snapshot.system)
    }

    async fn poll_device(&mut self) -> Result<Vec<GaugeSample>, PollError> {
        let (snapshot, at) = self.read().await?;
        let gauges = snapshot
            .device
            .iter()
            .map(|(metric, value)| GaugeSample {
                metric: metric.clone(),
                value: *value,
            })
            .collect();
        self.pending = Some((snapshot, at));
        Ok(gauges)
    }

    async fn poll_interfaces(&mut self) -> Result<Vec<CounterSample>, PollError> {
        let (snapshot, at) = match self.pending.take() {
            Some(pending) => pending,
            None => self.read().await?,
        };
        let samples = snapshot
            .interfaces
            .into_iter()
            .flat_map(|(iface, counters)| {
                counters.into_iter().map(move |(metric, counter)| {
                    let (value, width) = counter.split();
                    CounterSample {
                        iface: IfaceId(iface),
                        metric,
                        value,
                        width,
                        at,
                    }
                })
            })
            .collect();
        Ok(samples)
    }
}
