//! Command dispatch plus the startup loading shared by every command.

pub mod check;
pub mod classify;
pub mod run;

use std::path::{Path, PathBuf};

use tracing::info;

use snmpflow_config::Config;
use snmpflow_core::{CustomMapper, DeviceMapper, Mappings, MibDb, UdrMapper};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, global).await,
        Command::Classify(args) => classify::handle(&args, global),
        Command::Check => check::handle(global),
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}

// ── Shared loading ───────────────────────────────────────────────────

pub fn config_location(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(snmpflow_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(snmpflow_config::load_config(global.config.as_deref())?)
}

/// Open the classifier database, preferring `explicit` over the config.
pub fn open_mib(
    explicit: Option<&Path>,
    config: &Config,
    global: &GlobalOpts,
) -> Result<MibDb, CliError> {
    let path = explicit
        .or(config.mib_db.as_deref())
        .ok_or_else(|| CliError::NoMibDb {
            path: config_location(global).display().to_string(),
        })?;
    Ok(MibDb::open(path)?)
}

/// Load every configured mapping file. Unset files yield empty mappings.
pub fn load_mappings(config: &Config) -> Result<Mappings, CliError> {
    let devices = match &config.device_map {
        Some(path) => DeviceMapper::load(path)?,
        None => DeviceMapper::default(),
    };
    let udrs = match &config.udr_map {
        Some(path) => UdrMapper::load(path)?,
        None => UdrMapper::default(),
    };
    let custom = match &config.custom_map {
        Some(path) => CustomMapper::load(path)?,
        None => CustomMapper::default(),
    };
    info!(
        interfaces = devices.len(),
        udrs = udrs.len(),
        custom = custom.len(),
        "mappings loaded"
    );
    Ok(Mappings {
        devices,
        udrs,
        custom,
    })
}
