//! Data layer for lm-evaluation-harness output: scan a directory of
//! per-model result and sample files, aggregate metrics into comparison
//! tables, and look up individual evaluation samples.

pub mod cache;
pub mod config;
pub mod loader;
pub mod parsers;
pub mod records;
#[cfg(feature = "serve")]
pub mod serve;
pub mod table;

pub use records::{MetricRecord, ResultSet, Sample, SampleIndex, TaskKey};
