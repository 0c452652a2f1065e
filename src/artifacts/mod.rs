//! Browser artifact loading
//!
//! Reads per-browser extractor output from an analysis output directory and
//! normalizes it into one set of entry types tagged with provenance.

pub mod adapters;
pub mod loader;
pub mod sources;
pub mod tree;
pub mod types;

pub use loader::{ArtifactLoader, SourceDocument};
pub use types::*;
