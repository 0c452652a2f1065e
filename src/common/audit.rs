//! Forensic Audit Logging
//!
//! Provides structured logging for chain of custody compliance.
//! Every analysis run, output-directory change and integrity verdict is
//! logged under the `forensic_audit` target with a UTC timestamp.

use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::custody::Verdict;

/// Log that an analysis tool run was started
pub fn log_analysis_launched(run_id: Uuid, tool: &Path, bundle: &Path, hash_file: &Path) {
    info!(
        target: "forensic_audit",
        operation = "analysis_launch",
        run_id = %run_id,
        tool = %tool.display(),
        bundle = %bundle.display(),
        hash_file = %hash_file.display(),
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "Analysis tool launched"
    );
}

/// Log removal of a previous run's output
pub fn log_output_cleared(path: &Path) {
    info!(
        target: "forensic_audit",
        operation = "output_cleared",
        path = %path.display(),
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "Previous analysis output removed"
    );
}

/// Log an artifact source that exists but could not be used
pub fn log_source_skipped(path: &Path, reason: &str) {
    warn!(
        target: "forensic_audit",
        operation = "source_skipped",
        path = %path.display(),
        reason = reason,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "Artifact source unreadable, treated as empty"
    );
}

/// Log the integrity verdict computed for a loaded bundle
pub fn log_integrity_verdict(case_id: Option<&str>, verdict: Verdict, issues: &[String]) {
    let case_id = case_id.unwrap_or("unknown");
    match verdict {
        Verdict::Verified => info!(
            target: "forensic_audit",
            operation = "integrity_verdict",
            case_id = case_id,
            verdict = verdict.as_str(),
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "Evidence integrity verified"
        ),
        Verdict::Compromised => warn!(
            target: "forensic_audit",
            operation = "integrity_verdict",
            case_id = case_id,
            verdict = verdict.as_str(),
            issues = issues.len(),
            first_issue = issues.first().map(String::as_str).unwrap_or(""),
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "Evidence integrity compromised"
        ),
    }
}

/// Log a local re-hash of the output against its manifest
pub fn log_reverification(output_dir: &Path, total: u64, failed: u64, bundle_hash_verified: bool) {
    info!(
        target: "forensic_audit",
        operation = "reverification",
        path = %output_dir.display(),
        total_files = total,
        failed_files = failed,
        bundle_hash_verified = bundle_hash_verified,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "Manifest re-verification completed"
    );
}

/// Audit context for a single analysis run.
///
/// Logs the session start on creation and the session end, with its
/// duration, when dropped, so every exit path is recorded.
pub struct AnalysisAuditContext {
    pub run_id: Uuid,
    pub bundle: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AnalysisAuditContext {
    pub fn new(run_id: Uuid, bundle: &Path) -> Self {
        let ctx = Self {
            run_id,
            bundle: bundle.display().to_string(),
            started_at: chrono::Utc::now(),
        };

        info!(
            target: "forensic_audit",
            operation = "session_start",
            run_id = %ctx.run_id,
            bundle = %ctx.bundle,
            timestamp = %ctx.started_at.to_rfc3339(),
            "Analysis audit session started"
        );

        ctx
    }

    /// Record the run's outcome (`completed`, `timed_out`, ...)
    pub fn log_outcome(&self, outcome: &str, details: &str) {
        info!(
            target: "forensic_audit",
            run_id = %self.run_id,
            operation = "analysis_outcome",
            outcome = outcome,
            details = details,
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "Analysis outcome"
        );
    }
}

impl Drop for AnalysisAuditContext {
    fn drop(&mut self) {
        let duration = chrono::Utc::now() - self.started_at;
        info!(
            target: "forensic_audit",
            operation = "session_end",
            run_id = %self.run_id,
            bundle = %self.bundle,
            duration_ms = duration.num_milliseconds(),
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "Analysis audit session ended"
        );
    }
}
