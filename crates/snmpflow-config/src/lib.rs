//! Configuration for the snmpflow collector.
//!
//! One TOML file plus `SNMPFLOW_` environment overrides, validated once
//! and translated into `snmpflow_core::CollectorConfig` and per-device
//! `DeviceSpec`s. The core crate never reads config files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use snmpflow_core::{CollectorConfig, Compression, DeviceId, DeviceSpec, Format};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// SQLite classifier database.
    pub mib_db: Option<PathBuf>,

    /// JSON array of device/interface rows.
    pub device_map: Option<PathBuf>,

    /// Comma-separated UDR definitions.
    pub udr_map: Option<PathBuf>,

    /// JSON or YAML map of custom per-device labels.
    pub custom_map: Option<PathBuf>,

    #[serde(default)]
    pub devices: Vec<DeviceProfile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_alignment_secs")]
    pub alignment_secs: u64,

    #[serde(default = "default_jitter_secs")]
    pub jitter_secs: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub format: Format,

    #[serde(default)]
    pub compression: Compression,

    #[serde(default = "default_rate_multiplier")]
    pub rate_multiplier: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            alignment_secs: default_alignment_secs(),
            jitter_secs: default_jitter_secs(),
            channel_capacity: default_channel_capacity(),
            format: Format::default(),
            compression: Compression::default(),
            rate_multiplier: default_rate_multiplier(),
        }
    }
}

fn default_alignment_secs() -> u64 {
    60
}
fn default_jitter_secs() -> u64 {
    15
}
fn default_channel_capacity() -> usize {
    64
}
fn default_rate_multiplier() -> u32 {
    1
}

/// One polled device.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceProfile {
    /// Unique name, used in logs and as the custom-label key.
    pub name: String,

    pub device_id: u64,

    /// Agent address, informational.
    #[serde(default)]
    pub address: String,

    /// Counter snapshot file refreshed by the external walker.
    pub snapshot: PathBuf,

    /// Overrides the sysObjectID the agent reports.
    pub sys_object_id: Option<String>,

    /// Overrides the sysDescr the agent reports.
    pub sys_descr: Option<String>,

    /// Template used when classification finds nothing.
    pub template: Option<String>,

    /// Overrides `defaults.rate_multiplier`.
    pub rate_multiplier: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "snmpflow", "snmpflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("snmpflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config from file + environment.
///
/// An explicit `path` must exist; the default path may be absent, in
/// which case defaults and environment apply. Nested keys use a double
/// underscore: `SNMPFLOW_DEFAULTS__ALIGNMENT_SECS=30`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", p.display()),
            )));
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("SNMPFLOW_").split("__"))
        .extract()?;

    config.validate()?;
    Ok(config)
}

/// Parse a config from a TOML string without environment overrides.
pub fn parse_config(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()?;
    config.validate()?;
    Ok(config)
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.defaults;
        if d.alignment_secs == 0 {
            return Err(ConfigError::invalid("defaults.alignment_secs", "must be greater than 0"));
        }
        if d.jitter_secs >= d.alignment_secs {
            return Err(ConfigError::invalid(
                "defaults.jitter_secs",
                format!(
                    "must be less than alignment_secs ({} >= {})",
                    d.jitter_secs, d.alignment_secs
                ),
            ));
        }
        if d.channel_capacity == 0 {
            return Err(ConfigError::invalid("defaults.channel_capacity", "must be greater than 0"));
        }

        let mut names = BTreeSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() {
                return Err(ConfigError::invalid("devices.name", "must not be empty"));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::invalid(
                    "devices.name",
                    format!("duplicate device name '{}'", device.name),
                ));
            }
        }
        Ok(())
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            alignment: Duration::from_secs(self.defaults.alignment_secs),
            jitter: Duration::from_secs(self.defaults.jitter_secs),
            channel_capacity: self.defaults.channel_capacity,
        }
    }

    pub fn device(&self, name: &str) -> Option<&DeviceProfile> {
        self.devices.iter().find(|d| d.name == name)
    }
}

impl DeviceProfile {
    /// Build the core device description, filling unset fields from `defaults`.
    pub fn to_spec(&self, defaults: &Defaults) -> DeviceSpec {
        DeviceSpec {
            id: DeviceId(self.device_id),
            name: self.name.clone(),
            sys_object_id: self.sys_object_id.clone(),
            sys_descr: self.sys_descr.clone(),
            template: self.template.clone(),
            rate_multiplier: self.rate_multiplier.unwrap_or(defaults.rate_multiplier),
        }
    }
}
