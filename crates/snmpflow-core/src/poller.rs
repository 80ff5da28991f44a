// ── Per-device counter poller ──
//
// One poller per device, driven by its own aligned ticker. Each tick is
// a cycle: staleness check, collection, lateness-after-finish check,
// emission. Any ambiguity about which window the samples belong to
// discards the batch and the delta state; the next tick is the retry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::delta::DeltaTracker;
use crate::error::PollError;
use crate::mapping::Mappings;
use crate::model::{
    CounterSample, DeviceId, FlowBatch, FlowRecord, GaugeSample, IfaceId, Provider, RecordKind,
    SystemInfo,
};
use crate::ticker::AlignedWindow;

// ── Protocol seam ────────────────────────────────────────────────────

/// The polling protocol as seen by the scheduler.
#[async_trait]
pub trait SnmpClient: Send {
    /// Human-readable address of the agent, for logs.
    fn target(&self) -> &str;

    async fn system_info(&mut self) -> Result<SystemInfo, PollError>;

    /// Device-level gauges (CPU, memory, ...).
    async fn poll_device(&mut self) -> Result<Vec<GaugeSample>, PollError>;

    /// Interface counters. All-or-nothing: a partial walk is an error.
    async fn poll_interfaces(&mut self) -> Result<Vec<CounterSample>, PollError>;
}

// ── Cycle bookkeeping ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Batch forwarded. `device_error` is set when the device-level poll
    /// failed and only interface records went out.
    Sent { records: usize, device_error: bool },
    SkippedLateStart,
    DiscardedError,
    DiscardedLateFinish,
}

/// One collection attempt. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCycle {
    pub scheduled: DateTime<Utc>,
    pub started: DateTime<Utc>,
    pub outcome: CycleOutcome,
}

/// Cumulative cycle counters for one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub sent: u64,
    pub skipped_late_start: u64,
    pub discarded_error: u64,
    pub discarded_late_finish: u64,
    pub device_errors: u64,
}

impl PollerStats {
    fn record(&mut self, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::Sent { device_error, .. } => {
                self.sent += 1;
                if device_error {
                    self.device_errors += 1;
                }
            }
            CycleOutcome::SkippedLateStart => self.skipped_late_start += 1,
            CycleOutcome::DiscardedError => self.discarded_error += 1,
            CycleOutcome::DiscardedLateFinish => self.discarded_late_finish += 1,
        }
    }
}

/// Identity of the device a poller serves.
#[derive(Debug, Clone, PartialEq)]
pub struct PollTarget {
    pub id: DeviceId,
    pub name: String,
    pub provider: Provider,
    pub rate_multiplier: u32,
}

// ── Poller ───────────────────────────────────────────────────────────

pub struct Poller {
    target: PollTarget,
    client: Box<dyn SnmpClient>,
    tracker: DeltaTracker,
    alignment: TimeDelta,
    clock: Arc<dyn Clock>,
    mappings: Arc<Mappings>,
    labels: BTreeMap<String, String>,
    out: mpsc::Sender<FlowBatch>,
    stats: watch::Sender<PollerStats>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("target", &self.target)
            .field("alignment", &self.alignment)
            .field("counters", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl Poller {
    pub fn new(
        mut target: PollTarget,
        client: Box<dyn SnmpClient>,
        alignment: TimeDelta,
        clock: Arc<dyn Clock>,
        mappings: Arc<Mappings>,
        out: mpsc::Sender<FlowBatch>,
    ) -> Self {
        if target.rate_multiplier == 0 {
            target.rate_multiplier = 1;
            info!(device = %target.name, "defaulting rate multiplier to 1");
        }
        let labels = mappings.custom.labels_for(&target.name);
        let (stats, _) = watch::channel(PollerStats::default());

        Self {
            target,
            client,
            tracker: DeltaTracker::new(),
            alignment,
            clock,
            mappings,
            labels,
            out,
            stats,
        }
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn tracker(&self) -> &DeltaTracker {
        &self.tracker
    }

    pub fn stats(&self) -> watch::Receiver<PollerStats> {
        self.stats.subscribe()
    }

    /// Consume ticks until `cancel` fires, the ticker stops, or the
    /// output channel closes. A cycle in flight always completes.
    pub async fn run(mut self, mut ticks: mpsc::Receiver<DateTime<Utc>>, cancel: CancellationToken) {
        loop {
            let scheduled = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                tick = ticks.recv() => match tick {
                    Some(t) => t,
                    None => break,
                },
            };

            let cycle = self.run_cycle(scheduled).await;
            debug!(device = %self.target.name, scheduled = %cycle.scheduled, outcome = ?cycle.outcome, "cycle finished");

            if self.out.is_closed() {
                info!(device = %self.target.name, "output channel closed; stopping poller");
                break;
            }
        }
        debug!(device = %self.target.name, "poller stopped");
    }

    /// Run one collection cycle for the tick `scheduled`.
    pub async fn run_cycle(&mut self, scheduled: DateTime<Utc>) -> PollCycle {
        let started = self.clock.now();
        let outcome = self.cycle(scheduled, started).await;
        if !matches!(outcome, CycleOutcome::Sent { .. }) {
            self.tracker.discard();
        }
        self.stats.send_modify(|s| s.record(outcome));
        PollCycle {
            scheduled,
            started,
            outcome,
        }
    }

    async fn cycle(&mut self, scheduled: DateTime<Utc>, started: DateTime<Utc>) -> CycleOutcome {
        let window = AlignedWindow::of(scheduled, self.alignment);

        if AlignedWindow::of(started, self.alignment) != window {
            // A previous cycle overran its window and this tick was
            // dequeued too late to finish on time.
            warn!(
                device = %self.target.name,
                %window,
                scheduled = %scheduled,
                started = %started,
                "skipping counter datapoint: poll dequeued after its window ended"
            );
            return CycleOutcome::SkippedLateStart;
        }

        let device = self.client.poll_device().await;
        let interfaces = self.client.poll_interfaces().await;

        let device_error = match &device {
            Ok(_) => false,
            Err(e) => {
                warn!(device = %self.target.name, target = self.client.target(), error = %e, "device-level poll failed");
                true
            }
        };
        let samples = match interfaces {
            Ok(samples) => samples,
            Err(e) => {
                warn!(device = %self.target.name, target = self.client.target(), error = %e, "interface counter poll failed; discarding delta state");
                return CycleOutcome::DiscardedError;
            }
        };

        let rates = self.compute_rates(&samples);

        let finished = self.clock.now();
        if AlignedWindow::of(finished, self.alignment) != window {
            // The earliest samples are already outside this window and
            // can't anchor deltas.
            warn!(
                device = %self.target.name,
                %window,
                scheduled = %scheduled,
                started = %started,
                finished = %finished,
                "missed counter datapoint: poll finished after its window ended"
            );
            return CycleOutcome::DiscardedLateFinish;
        }

        let mut records = Vec::with_capacity(rates.len() + 1);
        if let Ok(gauges) = device {
            if !gauges.is_empty() {
                records.push(self.device_record(scheduled, gauges));
            }
        }
        for (iface, metrics) in rates {
            records.push(self.interface_record(scheduled, iface, metrics));
        }

        let batch = FlowBatch {
            device_name: self.target.name.clone(),
            scheduled,
            records,
        };
        let count = batch.len();
        if self.out.send(batch).await.is_err() {
            warn!(device = %self.target.name, "output channel closed; dropping batch");
            return CycleOutcome::DiscardedError;
        }

        CycleOutcome::Sent {
            records: count,
            device_error,
        }
    }

    fn compute_rates(&mut self, samples: &[CounterSample]) -> BTreeMap<IfaceId, BTreeMap<String, f64>> {
        let multiplier = f64::from(self.target.rate_multiplier);
        let mut rates: BTreeMap<IfaceId, BTreeMap<String, f64>> = BTreeMap::new();
        for sample in samples {
            if let Some(rate) = self.tracker.observe(sample) {
                rates
                    .entry(sample.iface)
                    .or_default()
                    .insert(sample.metric.clone(), rate * multiplier);
            }
        }
        rates
    }

    fn device_record(&self, scheduled: DateTime<Utc>, gauges: Vec<GaugeSample>) -> FlowRecord {
        FlowRecord {
            device_id: self.target.id,
            device_name: self.target.name.clone(),
            provider: self.target.provider,
            timestamp: scheduled,
            kind: RecordKind::Device,
            iface: None,
            interface: crate::model::InterfaceLabels::default(),
            metrics: gauges.into_iter().map(|g| (g.metric, g.value)).collect(),
            labels: self.labels.clone(),
        }
    }

    fn interface_record(
        &self,
        scheduled: DateTime<Utc>,
        iface: IfaceId,
        metrics: BTreeMap<String, f64>,
    ) -> FlowRecord {
        let interface = self
            .mappings
            .devices
            .get(self.target.id, iface)
            .map(|row| row.labels())
            .unwrap_or_default();
        FlowRecord {
            device_id: self.target.id,
            device_name: self.target.name.clone(),
            provider: self.target.provider,
            timestamp: scheduled,
            kind: RecordKind::Interface,
            iface: Some(iface),
            interface,
            metrics,
            labels: self.labels.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::mapping::{CustomMapper, DeviceMapper, InterfaceRow};
    use crate::model::CounterWidth;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    /// Scripted client: each poll pops the next interface result and may
    /// move the clock forward to simulate a slow walk.
    struct ScriptedClient {
        clock: ManualClock,
        calls: Arc<AtomicUsize>,
        device: VecDeque<Result<Vec<GaugeSample>, PollError>>,
        interfaces: VecDeque<Result<Vec<(u64, TimeDelta)>, PollError>>,
        walk_time: TimeDelta,
    }

    impl ScriptedClient {
        fn new(clock: ManualClock) -> Self {
            Self {
                clock,
                calls: Arc::new(AtomicUsize::new(0)),
                device: VecDeque::new(),
                interfaces: VecDeque::new(),
                walk_time: TimeDelta::seconds(1),
            }
        }

        fn counter(mut self, value: u64) -> Self {
            self.interfaces.push_back(Ok(vec![(value, TimeDelta::zero())]));
            self
        }

        fn failure(mut self) -> Self {
            self.interfaces.push_back(Err(PollError::Timeout {
                target: "10.0.0.1".into(),
                timeout_ms: 5000,
            }));
            self
        }
    }

    #[async_trait]
    impl SnmpClient for ScriptedClient {
        fn target(&self) -> &str {
            "10.0.0.1"
        }

        async fn system_info(&mut self) -> Result<SystemInfo, PollError> {
            Ok(SystemInfo::default())
        }

        async fn poll_device(&mut self) -> Result<Vec<GaugeSample>, PollError> {
            self.device.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn poll_interfaces(&mut self) -> Result<Vec<CounterSample>, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.clock.now();
            self.clock.advance(self.walk_time);
            let script = self.interfaces.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
            Ok(script
                .into_iter()
                .map(|(value, offset)| CounterSample {
                    iface: IfaceId(1),
                    metric: "ifHCInOctets".into(),
                    value,
                    width: CounterWidth::Bits64,
                    at: now + offset,
                })
                .collect())
        }
    }

    struct Harness {
        poller: Poller,
        clock: ManualClock,
        calls: Arc<AtomicUsize>,
        rx: mpsc::Receiver<FlowBatch>,
    }

    fn harness(client: ScriptedClient, mappings: Mappings, multiplier: u32) -> Harness {
        let clock = client.clock.clone();
        let calls = Arc::clone(&client.calls);
        let (tx, rx) = mpsc::channel(8);
        let poller = Poller::new(
            PollTarget {
                id: DeviceId(7),
                name: "edge1".into(),
                provider: Provider::Router,
                rate_multiplier: multiplier,
            },
            Box::new(client),
            TimeDelta::minutes(1),
            Arc::new(clock.clone()),
            Arc::new(mappings),
            tx,
        );
        Harness {
            poller,
            clock,
            calls,
            rx,
        }
    }

    fn counter_state_valid(poller: &Poller) -> bool {
        poller
            .tracker()
            .state(&crate::delta::CounterKey::new(IfaceId(1), "ifHCInOctets"))
            .unwrap()
            .valid
    }

    #[tokio::test]
    async fn two_cycles_produce_a_rate() {
        let clock = ManualClock::at(at("2024-03-01T10:08:02Z"));
        let client = ScriptedClient::new(clock).counter(100).counter(160);
        let mut h = harness(client, Mappings::default(), 1);

        let first = h.poller.run_cycle(at("2024-03-01T10:08:00Z")).await;
        assert_eq!(first.outcome, CycleOutcome::Sent { records: 0, device_error: false });
        assert!(h.rx.recv().await.unwrap().is_empty());

        h.clock.set(at("2024-03-01T10:09:02Z"));
        let second = h.poller.run_cycle(at("2024-03-01T10:09:00Z")).await;
        assert_eq!(second.outcome, CycleOutcome::Sent { records: 1, device_error: false });

        let batch = h.rx.recv().await.unwrap();
        assert_eq!(batch.scheduled, at("2024-03-01T10:09:00Z"));
        let record = &batch.records[0];
        assert_eq!(record.kind, RecordKind::Interface);
        assert_eq!(record.iface, Some(IfaceId(1)));
        assert_eq!(record.timestamp, at("2024-03-01T10:09:00Z"));
        assert!((record.metrics["ifHCInOctets"] - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn late_start_skips_protocol_and_discards_state() {
        let clock = ManualClock::at(at("2024-03-01T10:08:02Z"));
        let client = ScriptedClient::new(clock).counter(100).counter(160);
        let mut h = harness(client, Mappings::default(), 1);

        h.poller.run_cycle(at("2024-03-01T10:08:00Z")).await;
        h.rx.recv().await.unwrap();
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        assert!(counter_state_valid(&h.poller));

        // Tick for 10:09 dequeued at 10:10:05.
        h.clock.set(at("2024-03-01T10:10:05Z"));
        let cycle = h.poller.run_cycle(at("2024-03-01T10:09:00Z")).await;
        assert_eq!(cycle.outcome, CycleOutcome::SkippedLateStart);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        assert!(!counter_state_valid(&h.poller));
        assert!(h.rx.try_recv().is_err());
        assert_eq!(h.poller.stats().borrow().skipped_late_start, 1);
    }

    #[tokio::test]
    async fn late_start_on_first_cycle_never_calls_protocol() {
        let clock = ManualClock::at(at("2024-03-01T10:09:00Z"));
        let client = ScriptedClient::new(clock).counter(100);
        let mut h = harness(client, Mappings::default(), 1);

        let cycle = h.poller.run_cycle(at("2024-03-01T10:08:30Z")).await;
        assert_eq!(cycle.outcome, CycleOutcome::SkippedLateStart);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn late_finish_discards_successful_poll() {
        let clock = ManualClock::at(at("2024-03-01T10:08:02Z"));
        let mut client = ScriptedClient::new(clock).counter(100).counter(160).counter(220);
        client.walk_time = TimeDelta::seconds(1);
        let mut h = harness(client, Mappings::default(), 1);

        h.poller.run_cycle(at("2024-03-01T10:08:00Z")).await;
        h.rx.recv().await.unwrap();

        // Starts half a second before 10:10:00; the walk crosses the boundary.
        h.clock.set(at("2024-03-01T10:09:59.500Z"));
        let cycle = h.poller.run_cycle(at("2024-03-01T10:09:00Z")).await;
        assert_eq!(cycle.outcome, CycleOutcome::DiscardedLateFinish);
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
        assert!(h.rx.try_recv().is_err());
        assert!(!counter_state_valid(&h.poller));

        // The next cycle only re-baselines.
        h.clock.set(at("2024-03-01T10:11:01Z"));
        let cycle = h.poller.run_cycle(at("2024-03-01T10:11:00Z")).await;
        assert_eq!(cycle.outcome, CycleOutcome::Sent { records: 0, device_error: false });
    }

    #[tokio::test]
    async fn protocol_failure_discards_and_continues() {
        let clock = ManualClock::at(at("2024-03-01T10:08:02Z"));
        let client = ScriptedClient::new(clock).counter(100).failure().counter(300).counter(360);
        let mut h = harness(client, Mappings::default(), 1);

        h.poller.run_cycle(at("2024-03-01T10:08:00Z")).await;
        h.rx.recv().await.unwrap();

        h.clock.set(at("2024-03-01T10:09:02Z"));
        let failed = h.poller.run_cycle(at("2024-03-01T10:09:00Z")).await;
        assert_eq!(failed.outcome, CycleOutcome::DiscardedError);
        assert!(!counter_state_valid(&h.poller));

        h.clock.set(at("2024-03-01T10:10:02Z"));
        let rebaseline = h.poller.run_cycle(at("2024-03-01T10:10:00Z")).await;
        assert_eq!(rebaseline.outcome, CycleOutcome::Sent { records: 0, device_error: false });
        h.rx.recv().await.unwrap();

        h.clock.set(at("2024-03-01T10:11:02Z"));
        h.poller.run_cycle(at("2024-03-01T10:11:00Z")).await;
        let batch = h.rx.recv().await.unwrap();
        assert!((batch.records[0].metrics["ifHCInOctets"] - 1.0).abs() < 1e-12);

        let stats = *h.poller.stats().borrow();
        assert_eq!(stats.sent, 3);
        assert_eq!(stats.discarded_error, 1);
    }

    #[tokio::test]
    async fn device_failure_keeps_interface_records() {
        let clock = ManualClock::at(at("2024-03-01T10:08:02Z"));
        let mut client = ScriptedClient::new(clock).counter(100).counter(220);
        client.device.push_back(Ok(vec![GaugeSample {
            metric: "CPU".into(),
            value: 12.0,
        }]));
        client.device.push_back(Err(PollError::Protocol {
            target: "10.0.0.1".into(),
            message: "noSuchObject".into(),
        }));
        let mut h = harness(client, Mappings::default(), 8);

        let first = h.poller.run_cycle(at("2024-03-01T10:08:00Z")).await;
        assert_eq!(first.outcome, CycleOutcome::Sent { records: 1, device_error: false });
        let batch = h.rx.recv().await.unwrap();
        assert_eq!(batch.records[0].kind, RecordKind::Device);
        assert_eq!(batch.records[0].metrics["CPU"], 12.0);

        h.clock.set(at("2024-03-01T10:09:02Z"));
        let second = h.poller.run_cycle(at("2024-03-01T10:09:00Z")).await;
        assert_eq!(second.outcome, CycleOutcome::Sent { records: 1, device_error: true });
        let batch = h.rx.recv().await.unwrap();
        assert_eq!(batch.records[0].kind, RecordKind::Interface);
        // (220 - 100) / 60s * 8
        assert!((batch.records[0].metrics["ifHCInOctets"] - 16.0).abs() < 1e-12);
        assert_eq!(h.poller.stats().borrow().device_errors, 1);
    }

    #[tokio::test]
    async fn records_are_enriched_from_mappings() {
        let clock = ManualClock::at(at("2024-03-01T10:08:02Z"));
        let client = ScriptedClient::new(clock).counter(0).counter(60);
        let mappings = Mappings {
            devices: DeviceMapper::from_rows([InterfaceRow {
                device_id: 7,
                snmp_id: "1".into(),
                snmp_alias: "uplink".into(),
                snmp_speed: 10_000,
                ..InterfaceRow::default()
            }]),
            custom: CustomMapper::from(BTreeMap::from([(
                "edge1".to_owned(),
                serde_json::json!({"site": "fra1"}),
            )])),
            ..Mappings::default()
        };
        let mut h = harness(client, mappings, 0);
        assert_eq!(h.poller.target().rate_multiplier, 1);

        h.poller.run_cycle(at("2024-03-01T10:08:00Z")).await;
        h.rx.recv().await.unwrap();
        h.clock.set(at("2024-03-01T10:09:02Z"));
        h.poller.run_cycle(at("2024-03-01T10:09:00Z")).await;

        let record = h.rx.recv().await.unwrap().records.remove(0);
        assert_eq!(record.interface.alias.as_deref(), Some("uplink"));
        assert_eq!(record.interface.speed, Some(10_000));
        assert_eq!(record.labels["site"], "fra1");
        assert_eq!(record.provider, Provider::Router);
    }

    #[tokio::test]
    async fn run_loop_processes_ticks_in_order_until_cancelled() {
        let clock = ManualClock::at(at("2024-03-01T10:08:01Z"));
        let client = ScriptedClient::new(clock.clone()).counter(0).counter(60).counter(180);
        let h = harness(client, Mappings::default(), 1);
        let mut rx = h.rx;
        let stats = h.poller.stats();

        let (tick_tx, tick_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(h.poller.run(tick_rx, cancel.clone()));

        for minute in 8..11 {
            let tick = at(&format!("2024-03-01T10:{minute:02}:00Z"));
            clock.set(tick + TimeDelta::seconds(1));
            tick_tx.send(tick).await.unwrap();
            let batch = rx.recv().await.unwrap();
            assert_eq!(batch.scheduled, tick);
        }

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(stats.borrow().sent, 3);
    }
}
