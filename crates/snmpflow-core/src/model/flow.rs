// ── Flow records emitted downstream ──

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeviceId, IfaceId};
use super::provider::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Device,
    Interface,
}

/// Interface attributes taken from the device/interface mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceLabels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_hint: Option<String>,
}

/// A single unit of telemetry: either the device-level gauges or the
/// per-interface rates for one aligned window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub device_id: DeviceId,
    pub device_name: String,
    pub provider: Provider,
    pub timestamp: DateTime<Utc>,
    pub kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iface: Option<IfaceId>,
    #[serde(default, skip_serializing_if = "is_default_labels")]
    pub interface: InterfaceLabels,
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

fn is_default_labels(labels: &InterfaceLabels) -> bool {
    *labels == InterfaceLabels::default()
}

/// Everything one device produced for one aligned window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBatch {
    pub device_name: String,
    pub scheduled: DateTime<Utc>,
    pub records: Vec<FlowRecord>,
}

impl FlowBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
