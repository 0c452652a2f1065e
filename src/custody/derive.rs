//! Custody chain synthesized from bundle metadata
//!
//! Used when the tool wrote no `CUSTODY_REPORT.json`: the manifest stands
//! in for the creation event and the verification report for the
//! verification event.

use crate::evidence::{
    AnalystIdentity, CaseManifest, CustodyAction, CustodyEntry, CustodyReport, EntryVerification,
    VerificationReport,
};

/// Build a chain from whatever metadata exists. `None` when there is neither
/// a manifest nor a verification report.
pub fn derive_chain(
    manifest: Option<&CaseManifest>,
    verification: Option<&VerificationReport>,
) -> Option<CustodyReport> {
    if manifest.is_none() && verification.is_none() {
        return None;
    }

    let mut entries = Vec::new();

    if let Some(manifest) = manifest {
        entries.push(CustodyEntry {
            entry_number: entries.len() as u64 + 1,
            action: CustodyAction::BundleCreated,
            timestamp: manifest.created_utc.clone(),
            analyst: AnalystIdentity {
                name: manifest.investigator.clone(),
                ..Default::default()
            },
            verification: EntryVerification {
                hash_match: true,
                files_verified: manifest.total_files() as u64,
                files_failed: 0,
            },
            details: CustodyAction::BundleCreated.describe(true),
            ..Default::default()
        });
    }

    if let Some(report) = verification {
        let hash_valid = report.bundle_hash_verified && report.failed_files == 0;
        entries.push(CustodyEntry {
            entry_number: entries.len() as u64 + 1,
            action: CustodyAction::VerificationComplete,
            timestamp: report.verification_timestamp.clone(),
            verification: EntryVerification {
                hash_match: report.bundle_hash_verified,
                files_verified: report.verified_files,
                files_failed: report.failed_files,
            },
            details: CustodyAction::VerificationComplete.describe(hash_valid),
            ..Default::default()
        });
    }

    let (case_id, case_name, investigator, created) = manifest
        .map(|m| {
            (
                m.case_id.clone(),
                m.case_name.clone(),
                m.investigator.clone(),
                m.created_utc.clone(),
            )
        })
        .unwrap_or_default();

    Some(CustodyReport {
        generated_utc: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        case_id,
        case_name,
        original_investigator: investigator,
        bundle_created_utc: created.clone(),
        custody_started_utc: created,
        total_entries: entries.len() as u64,
        entries,
        ..Default::default()
    })
}
