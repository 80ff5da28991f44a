// ── Batch dispatcher ──
//
// Drains the bounded batch channel. A slow sink backs the channel up,
// which in turn makes pollers wait on emission; lateness checks run on
// wall-clock time, so backpressure can only cause discards, never
// misaligned samples.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Compression, Format, Sink};
use crate::error::CoreError;
use crate::model::FlowBatch;

pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
    format: Format,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("format", &self.format)
            .finish()
    }
}

impl Dispatcher {
    /// Initialize every sink. The first failure aborts startup.
    pub async fn new(
        mut sinks: Vec<Box<dyn Sink>>,
        format: Format,
        compression: Compression,
    ) -> Result<Self, CoreError> {
        for sink in &mut sinks {
            sink.init(format, compression).await?;
            debug!(sink = sink.name(), %format, %compression, "sink initialized");
        }
        Ok(Self { sinks, format })
    }

    pub fn encode(&self, batch: &FlowBatch) -> Result<Vec<u8>, CoreError> {
        let encoded = match self.format {
            Format::Json => serde_json::to_vec(batch),
            Format::JsonCompact => serde_json::to_vec(&batch.records),
        };
        encoded.map_err(|e| CoreError::Sink {
            message: format!("cannot encode batch for {}: {e}", batch.device_name),
        })
    }

    /// Deliver one batch to every sink. Sink failures are logged, not fatal.
    pub async fn deliver(&self, batch: &FlowBatch) {
        let payload = match self.encode(batch) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "dropping batch");
                return;
            }
        };
        for sink in &self.sinks {
            if let Err(e) = sink.send(&payload).await {
                warn!(sink = sink.name(), device = %batch.device_name, error = %e, "sink rejected batch");
            }
        }
    }

    /// Run until every sender is gone, then close the sinks.
    pub async fn run(mut self, mut rx: mpsc::Receiver<FlowBatch>) -> BTreeMap<String, f64> {
        while let Some(batch) = rx.recv().await {
            debug!(device = %batch.device_name, records = batch.len(), "dispatching batch");
            self.deliver(&batch).await;
        }

        let health = self.health();
        for sink in &mut self.sinks {
            sink.close().await;
        }
        info!(?health, "dispatcher stopped");
        health
    }

    /// Health counters of every sink, keyed `sink.counter`.
    pub fn health(&self) -> BTreeMap<String, f64> {
        self.sinks
            .iter()
            .flat_map(|s| {
                s.health()
                    .into_iter()
                    .map(move |(k, v)| (format!("{}.{k}", s.name()), v))
            })
            .collect()
    }
}
