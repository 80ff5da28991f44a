// snmpflow-core: aligned counter polling, delta tracking, and device
// classification. No file formats beyond the mapping/MIB inputs, no CLI.

pub mod clock;
pub mod collector;
pub mod config;
pub mod delta;
pub mod error;
pub mod mapping;
pub mod mib;
pub mod model;
pub mod poller;
pub mod sink;
pub mod ticker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, SystemClock};
pub use collector::{Collector, DeviceHandle};
pub use config::{CollectorConfig, DeviceSpec};
pub use delta::{CounterKey, CounterState, DeltaTracker, counter_rate};
pub use error::{CoreError, PollError};
pub use mapping::{CustomMapper, DeviceMapper, InterfaceRow, Mappings, Udr, UdrMapper, UdrType};
pub use mib::{Classification, MibDb};
pub use poller::{CycleOutcome, PollCycle, PollTarget, Poller, PollerStats, SnmpClient};
pub use sink::{Compression, Dispatcher, Format, Sink, StdoutSink};
pub use ticker::{AlignedTicker, AlignedWindow};

pub use model::{
    CounterSample, CounterWidth, DeviceId, FlowBatch, FlowRecord, GaugeSample, IfaceId,
    InterfaceLabels, Oid, Provider, RecordKind, SystemInfo,
};
