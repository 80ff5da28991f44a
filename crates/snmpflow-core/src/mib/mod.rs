// ── Device classifier ──
//
// OID prefix tree loaded from the MIB database, plus the text
// heuristics used when no prefix carries a device template.

pub mod db;
pub mod heuristic;
pub mod tree;

pub use db::{Classification, MibDb};
pub use heuristic::classify_by_text;
pub use tree::{ClassifierNode, MibEntry};
