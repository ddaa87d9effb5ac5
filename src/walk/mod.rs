//! The traversal engine and its supporting pieces (§4.B, §4.C, §4.A).

pub mod cycle;
pub mod dirreader;
pub mod engine;
pub mod fdbudget;
pub mod pool;
pub mod record;
pub mod statcache;
pub mod strategy;

pub use engine::{Engine, WalkConfig};
pub use record::{FileRecord, VisitPhase};
pub use statcache::{FileId, Metadata, StatMode};
pub use strategy::Strategy;
