// ── Collector lifecycle ──
//
// Classifies each device once, then runs an independent ticker/poller
// pair per device. Devices never share a loop: one slow agent cannot
// delay another.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{CollectorConfig, DeviceSpec};
use crate::error::CoreError;
use crate::mapping::Mappings;
use crate::mib::{Classification, MibDb};
use crate::model::FlowBatch;
use crate::poller::{PollTarget, Poller, PollerStats, SnmpClient};
use crate::ticker::AlignedTicker;

/// What the collector knows about a running device loop.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    pub name: String,
    pub classification: Classification,
    pub first_tick: DateTime<Utc>,
    stats: watch::Receiver<PollerStats>,
}

impl DeviceHandle {
    pub fn stats(&self) -> PollerStats {
        *self.stats.borrow()
    }
}

pub struct Collector {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    devices: Vec<DeviceHandle>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("devices", &self.devices)
            .field("tasks", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Classify every device and start its loops.
    ///
    /// A closed classifier database is fatal. A device whose agent can't
    /// describe itself is still polled, classified from configuration
    /// alone.
    pub async fn start(
        config: &CollectorConfig,
        devices: Vec<(DeviceSpec, Box<dyn SnmpClient>)>,
        mib: &MibDb,
        mappings: &Arc<Mappings>,
        clock: &Arc<dyn Clock>,
        out: &mpsc::Sender<FlowBatch>,
    ) -> Result<Self, CoreError> {
        let ticker = AlignedTicker::new(config.alignment, config.jitter)?;
        let alignment = ticker.alignment();
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(devices.len() * 2);
        let mut running = Vec::with_capacity(devices.len());

        for (spec, mut client) in devices {
            let classification = match classify(&spec, client.as_mut(), mib).await {
                Ok(c) => c,
                Err(e) => {
                    cancel.cancel();
                    return Err(e);
                }
            };
            info!(
                device = %spec.name,
                target = client.target(),
                provider = %classification.provider,
                template = classification.template.as_deref().unwrap_or("-"),
                found = classification.found,
                "device classified"
            );

            let poller = Poller::new(
                PollTarget {
                    id: spec.id,
                    name: spec.name.clone(),
                    provider: classification.provider,
                    rate_multiplier: spec.rate_multiplier,
                },
                client,
                alignment,
                Arc::clone(clock),
                Arc::clone(mappings),
                out.clone(),
            );
            let stats = poller.stats();

            let (first_tick, ticks, ticker_handle) =
                ticker.spawn(Arc::clone(clock), cancel.child_token());
            info!(device = %spec.name, first_poll = %first_tick, "first poll scheduled");

            handles.push(ticker_handle);
            handles.push(tokio::spawn(poller.run(ticks, cancel.child_token())));
            running.push(DeviceHandle {
                name: spec.name,
                classification,
                first_tick,
                stats,
            });
        }

        info!(devices = running.len(), alignment_secs = alignment.num_seconds(), "collector started");
        Ok(Self {
            cancel,
            handles,
            devices: running,
        })
    }

    pub fn devices(&self) -> &[DeviceHandle] {
        &self.devices
    }

    pub fn stats(&self) -> BTreeMap<String, PollerStats> {
        self.devices
            .iter()
            .map(|d| (d.name.clone(), d.stats()))
            .collect()
    }

    /// A token that stops every loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop consuming ticks and wait for every loop to finish its current
    /// cycle. Batches already queued stay queued.
    pub async fn shutdown(self) -> BTreeMap<String, PollerStats> {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "device task ended abnormally");
            }
        }
        let stats: BTreeMap<String, PollerStats> = self
            .devices
            .iter()
            .map(|d| (d.name.clone(), d.stats()))
            .collect();
        debug!(?stats, "collector stopped");
        stats
    }
}

/// Configured identity wins over what the agent reports.
async fn classify(
    spec: &DeviceSpec,
    client: &mut dyn SnmpClient,
    mib: &MibDb,
) -> Result<Classification, CoreError> {
    let reported = match client.system_info().await {
        Ok(info) => info,
        Err(e) => {
            warn!(device = %spec.name, error = %e, "cannot read system info; classifying from configuration");
            crate::model::SystemInfo::default()
        }
    };

    let oid = spec
        .sys_object_id
        .clone()
        .or_else(|| reported.sys_object_id.map(|o| o.to_string()))
        .unwrap_or_default();
    let descr = spec.sys_descr.as_deref().unwrap_or(&reported.sys_descr);
    let template = spec.template.as_deref().unwrap_or_default();

    mib.classify(&oid, template, descr)
}
