// ── Core identity types ──
//
// Device and interface identifiers plus the dotted OID type used both
// as a metric address and as a device-type fingerprint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ── DeviceId / IfaceId ──────────────────────────────────────────────

/// Numeric device identifier assigned by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

/// SNMP interface index (`ifIndex`) on a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IfaceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for IfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Oid ─────────────────────────────────────────────────────────────

/// A parsed object identifier: an ordered sequence of numeric components.
///
/// Accepts both `1.3.6.1` and the net-snmp style `.1.3.6.1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_components(components: &[u32]) -> Self {
        Self(components.to_vec())
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Oid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(CoreError::InvalidOid {
                oid: s.to_owned(),
                reason: "no components".into(),
            });
        }

        body.split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| CoreError::InvalidOid {
                    oid: s.to_owned(),
                    reason: format!("component '{part}' is not a non-negative integer"),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for Oid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_leading_dot() {
        let a: Oid = "1.3.6.1.4.1.9".parse().unwrap();
        let b: Oid = ".1.3.6.1.4.1.9".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.components(), &[1, 3, 6, 1, 4, 1, 9]);
        assert_eq!(a.to_string(), "1.3.6.1.4.1.9");
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Oid>().is_err());
        assert!(".".parse::<Oid>().is_err());
        assert!("1.3..6".parse::<Oid>().is_err());
        assert!("1.3.x".parse::<Oid>().is_err());
        assert!("1.-3".parse::<Oid>().is_err());
    }

    #[test]
    fn serde_uses_dotted_string() {
        let oid: Oid = "1.3.6.1".parse().unwrap();
        assert_eq!(serde_json::to_string(&oid).unwrap(), "\"1.3.6.1\"");
        let back: Oid = serde_json::from_str("\".1.3.6.1\"").unwrap();
        assert_eq!(back, oid);
    }
}
