// ── Domain model ──

pub mod flow;
pub mod ids;
pub mod provider;
pub mod sample;

pub use flow::{FlowBatch, FlowRecord, InterfaceLabels, RecordKind};
pub use ids::{DeviceId, IfaceId, Oid};
pub use provider::Provider;
pub use sample::{CounterSample, CounterWidth, GaugeSample, SystemInfo};
