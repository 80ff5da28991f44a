// ── Device provider classification ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What kind of box a polled device is.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Provider {
    Router,
    Switch,
    Firewall,
    #[strum(serialize = "iot")]
    #[serde(rename = "iot")]
    Iot,
    Ups,
    Pdu,
    #[default]
    Unknown,
}

impl Provider {
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Router".parse::<Provider>().unwrap(), Provider::Router);
        assert_eq!("IOT".parse::<Provider>().unwrap(), Provider::Iot);
        assert_eq!("ups".parse::<Provider>().unwrap(), Provider::Ups);
        assert!("toaster".parse::<Provider>().is_err());
    }

    #[test]
    fn display_matches_serde() {
        assert_eq!(Provider::Pdu.to_string(), "pdu");
        assert_eq!(serde_json::to_string(&Provider::Iot).unwrap(), "\"iot\"");
    }
}
