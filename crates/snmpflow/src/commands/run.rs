//! `snmpflow run`: the long-running collector.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use snmpflow_core::{Clock, Collector, Dispatcher, Sink, SnmpClient, StdoutSink, SystemClock};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::snapshot::SnapshotClient;

use super::{config_location, load_config, load_mappings, open_mib};

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = load_config(global)?;
    if config.devices.is_empty() {
        return Err(CliError::NoDevices {
            path: config_location(global).display().to_string(),
        });
    }

    let mib = open_mib(None, &config, global)?;
    let mappings = Arc::new(load_mappings(&config)?);
    let collector_config = config.collector_config();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sinks: Vec<Box<dyn Sink>> = vec![Box::new(StdoutSink::new())];
    let dispatcher =
        Dispatcher::new(sinks, config.defaults.format, config.defaults.compression).await?;
    let (tx, rx) = mpsc::channel(collector_config.channel_capacity);
    let dispatch_task = tokio::spawn(dispatcher.run(rx));

    let devices: Vec<_> = config
        .devices
        .iter()
        .map(|profile| {
            let client: Box<dyn SnmpClient> = Box::new(SnapshotClient::new(
                profile.address.clone(),
                profile.snapshot.clone(),
                Arc::clone(&clock),
            ));
            (profile.to_spec(&config.defaults), client)
        })
        .collect();

    let collector =
        Collector::start(&collector_config, devices, &mib, &mappings, &clock, &tx).await?;
    // Pollers hold their own senders; the dispatcher ends once they stop.
    drop(tx);

    wait_for_stop(args.duration).await;
    info!("stopping collector");

    let stats = collector.shutdown().await;
    let health = dispatch_task.await?;
    mib.close()?;

    for (device, s) in &stats {
        info!(
            device = %device,
            sent = s.sent,
            skipped_late_start = s.skipped_late_start,
            discarded_error = s.discarded_error,
            discarded_late_finish = s.discarded_late_finish,
            device_errors = s.device_errors,
            "device summary"
        );
    }
    info!(?health, "sink summary");
    Ok(())
}

async fn wait_for_stop(duration: Option<u64>) {
    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "cannot listen for Ctrl-C; stopping");
            }
        }
        () = deadline => {}
    }
}
