// ── Device / interface mapping ──
//
// A JSON array of interface rows exported from the inventory. Rows live
// in an arena indexed by `(device, ifIndex)` so iteration order is
// deterministic.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{DeviceId, IfaceId, InterfaceLabels};

/// One interface of one device, as exported by the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceRow {
    pub device_id: u64,
    pub device_name: String,
    pub device_type: String,
    pub site_id: u64,
    /// `ifIndex` as a string; unparsable values map to interface 0.
    pub snmp_id: String,
    pub snmp_speed: u64,
    pub snmp_type: u32,
    pub snmp_alias: String,
    pub interface_ip: String,
    pub interface_description: String,
    pub provider: String,
    pub vrf_id: Option<u64>,
    pub site_title: String,
    pub site_country: String,
}

impl InterfaceRow {
    pub fn iface_id(&self) -> IfaceId {
        IfaceId(self.snmp_id.trim().parse().unwrap_or(0))
    }

    /// The subset of attributes attached to emitted records.
    pub fn labels(&self) -> InterfaceLabels {
        InterfaceLabels {
            alias: non_empty(&self.snmp_alias),
            description: non_empty(&self.interface_description),
            speed: (self.snmp_speed > 0).then_some(self.snmp_speed),
            ip: self.interface_ip.trim().parse::<IpAddr>().ok(),
            provider_hint: non_empty(&self.provider),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

#[derive(Debug, Default)]
pub struct DeviceMapper {
    rows: Vec<InterfaceRow>,
    index: BTreeMap<(DeviceId, IfaceId), usize>,
    total: usize,
}

impl DeviceMapper {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| CoreError::io(path, e))?;
        let rows: Vec<InterfaceRow> =
            serde_json::from_slice(&raw).map_err(|e| CoreError::parse(path, e))?;
        let mapper = Self::from_rows(rows);
        debug!(path = %path.display(), rows = mapper.total, interfaces = mapper.len(), "device mapping loaded");
        Ok(mapper)
    }

    /// Later rows for the same `(device, ifIndex)` replace earlier ones.
    pub fn from_rows(rows: impl IntoIterator<Item = InterfaceRow>) -> Self {
        let mut mapper = Self::default();
        for row in rows {
            mapper.total += 1;
            let key = (DeviceId(row.device_id), row.iface_id());
            if let Some(&slot) = mapper.index.get(&key) {
                mapper.rows[slot] = row;
            } else {
                mapper.index.insert(key, mapper.rows.len());
                mapper.rows.push(row);
            }
        }
        mapper
    }

    pub fn get(&self, device: DeviceId, iface: IfaceId) -> Option<&InterfaceRow> {
        self.index.get(&(device, iface)).map(|&slot| &self.rows[slot])
    }

    /// All interfaces of `device`, ordered by `ifIndex`.
    pub fn interfaces(&self, device: DeviceId) -> impl Iterator<Item = &InterfaceRow> {
        self.index
            .range((device, IfaceId(0))..=(device, IfaceId(u32::MAX)))
            .map(|(_, &slot)| &self.rows[slot])
    }

    pub fn device_count(&self) -> usize {
        let mut last = None;
        let mut count = 0;
        for (device, _) in self.index.keys() {
            if last != Some(*device) {
                count += 1;
                last = Some(*device);
            }
        }
        count
    }

    /// Distinct `(device, ifIndex)` entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows read from the source, duplicates included.
    pub fn rows_read(&self) -> usize {
        self.total
    }
}
