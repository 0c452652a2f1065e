//! Evidence aggregation
//!
//! Assembles analysis snapshots from the output directory and owns the
//! current one.

pub mod session;
pub mod snapshot;

pub use session::{EvidenceAggregator, RetryPolicy};
pub use snapshot::{build_snapshot, AnalysisSnapshot, OutputDirSource, SnapshotSource, SnapshotSummary};
