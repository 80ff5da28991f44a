// ── Custom key-value mapping ──
//
// Deployment-specific labels. The document is opaque except for one
// convention: a top-level key naming a device whose value is an object
// of strings contributes those strings as labels on that device's
// records.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CustomMapper {
    entries: BTreeMap<String, Value>,
}

impl CustomMapper {
    /// Load JSON, or YAML when the extension is `.yaml` / `.yml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let entries: BTreeMap<String, Value> = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|e| CoreError::parse(path, e))?
        } else {
            serde_json::from_str(&raw).map_err(|e| CoreError::parse(path, e))?
        };
        debug!(path = %path.display(), keys = entries.len(), "custom mapping loaded");
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// String-valued labels registered under `device`.
    pub fn labels_for(&self, device: &str) -> BTreeMap<String, String> {
        let Some(Value::Object(map)) = self.entries.get(device) else {
            return BTreeMap::new();
        };
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for CustomMapper {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}
