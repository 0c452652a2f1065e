//! Evidence bundle metadata
//!
//! The manifest, verification report and custody report the analysis tool
//! writes at the top of its output directory, plus local re-verification
//! of the output against the manifest.

pub mod types;
pub mod verify;

pub use types::*;
pub use verify::{reverify_output, BundleFiles};

/// Declared inventory of the bundle
pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Verification result; the tool writes it last, so it doubles as the completion marker
pub const VERIFICATION_REPORT_FILE: &str = "VERIFICATION_REPORT.json";

/// Custody chain, when the tool records one
pub const CUSTODY_REPORT_FILE: &str = "CUSTODY_REPORT.json";
