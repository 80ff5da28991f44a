//! Clap derive structures for the `snmpflow` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// snmpflow -- window-aligned SNMP counter collector
#[derive(Debug, Parser)]
#[command(
    name = "snmpflow",
    version,
    about = "Poll SNMP counters on aligned windows and emit per-second rates",
    long_about = "Polls every configured device once per aligned window, turns raw\n\
        counters into rates, and writes one batch per device and window.\n\n\
        Batches whose samples can't be attributed to a single window are\n\
        discarded rather than emitted late.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "SNMPFLOW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format for command results
    #[arg(
        long,
        short = 'o',
        env = "SNMPFLOW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start polling every configured device
    Run(RunArgs),

    /// Classify a sysObjectID against the MIB database
    #[command(alias = "cls")]
    Classify(ClassifyArgs),

    /// Load every configured file and report what was read
    Check,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Dotted sysObjectID (a leading dot is accepted)
    pub oid: String,

    /// Template name to fall back on when no prefix matches
    #[arg(long, short = 't', default_value = "")]
    pub template: String,

    /// sysDescr text to fall back on when no prefix matches
    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Classifier database (overrides `mib_db` from the config)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
