// ── Output sinks ──
//
// Finished batches leave the pollers on a bounded channel. The
// dispatcher encodes each batch once and hands the payload to every
// configured sink.

pub mod dispatch;
pub mod stdout;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

pub use dispatch::Dispatcher;
pub use stdout::StdoutSink;

/// Payload encoding.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Format {
    /// The whole batch (device name, window, records) as one JSON line.
    #[default]
    Json,
    /// Only the records array, as one JSON line.
    JsonCompact,
}

/// Payload compression requested from the sink.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// A destination for encoded batches.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&mut self, format: Format, compression: Compression) -> Result<(), CoreError>;

    async fn send(&self, payload: &[u8]) -> Result<(), CoreError>;

    /// Flush and release resources.
    async fn close(&mut self);

    /// Simple numeric health counters.
    fn health(&self) -> BTreeMap<String, f64>;
}
