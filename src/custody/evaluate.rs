//! Custody chain evaluation
//!
//! Recomputes every derived field of a custody report from the entries and
//! the verification report. Values for `hash_valid`, `verified` and `issues`
//! found on disk are discarded.

use crate::evidence::{CustodyEntry, CustodyReport, VerificationReport};

/// An entry is valid when its verification snapshot matched the bundle hash
/// and no file failed
pub fn entry_is_valid(entry: &CustodyEntry) -> bool {
    entry.verification.hash_match && entry.verification.files_failed == 0
}

/// Evaluate `report` against the current verification result.
///
/// `verified` holds only when the chain has at least one entry, every entry
/// is valid, and `verification` covers at least one file with all of them
/// verified. A failed bundle hash check is reported as an issue but does
/// not on its own clear `verified`.
pub fn evaluate_custody(mut report: CustodyReport, verification: Option<&VerificationReport>) -> CustodyReport {
    let mut issues = Vec::new();

    for entry in &mut report.entries {
        entry.hash_valid = entry_is_valid(entry);
        if !entry.hash_valid {
            issues.push(entry_issue(entry));
        }
    }
    let entries_valid = report.entries.iter().all(|e| e.hash_valid);

    if report.entries.is_empty() {
        issues.push("custody chain has no entries".to_string());
    }

    let files_verified = match verification {
        None => {
            issues.push("no verification report found".to_string());
            false
        }
        Some(v) => {
            if v.total_files == 0 {
                issues.push("verification report covers zero files".to_string());
            } else if !v.all_files_verified {
                issues.push(failed_files_issue(v));
            }
            if !v.bundle_hash_verified {
                issues.push("bundle hash verification failed".to_string());
            }
            v.is_fully_verified()
        }
    };

    report.total_entries = report.entries.len() as u64;
    report.verified = !report.entries.is_empty() && entries_valid && files_verified;
    report.issues = issues;
    report
}

fn entry_issue(entry: &CustodyEntry) -> String {
    let mut problems = Vec::new();
    if !entry.verification.hash_match {
        problems.push("hash mismatch".to_string());
    }
    match entry.verification.files_failed {
        0 => {}
        1 => problems.push("1 file failed".to_string()),
        n => problems.push(format!("{} files failed", n)),
    }
    format!("entry {} ({}): {}", entry.entry_number, entry.action, problems.join(", "))
}

fn failed_files_issue(report: &VerificationReport) -> String {
    let mut issue = format!(
        "{} of {} files failed verification",
        report.failed_files, report.total_files
    );
    if !report.failed_file_list.is_empty() {
        issue.push_str(": ");
        issue.push_str(&report.failed_file_list.join(", "));
    }
    issue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{CustodyAction, EntryVerification};

    fn entry(number: u64, action: CustodyAction, hash_match: bool, files_failed: u64) -> CustodyEntry {
        CustodyEntry {
            entry_number: number,
            action,
            verification: EntryVerification {
                hash_match,
                files_verified: 24 - files_failed,
                files_failed,
            },
            ..Default::default()
        }
    }

    fn passing_report() -> VerificationReport {
        VerificationReport {
            total_files: 24,
            verified_files: 24,
            all_files_verified: true,
            bundle_hash_verified: true,
            ..Default::default()
        }
    }

    fn chain(entries: Vec<CustodyEntry>) -> CustodyReport {
        CustodyReport { entries, ..Default::default() }
    }

    #[test]
    fn test_all_valid_entries_verify() {
        let report = evaluate_custody(
            chain(vec![
                entry(1, CustodyAction::BundleCreated, true, 0),
                entry(2, CustodyAction::VerificationComplete, true, 0),
            ]),
            Some(&passing_report()),
        );
        assert!(report.verified);
        assert!(report.issues.is_empty());
        assert_eq!(report.total_entries, 2);
        assert!(report.entries.iter().all(|e| e.hash_valid));
    }

    #[test]
    fn test_one_invalid_entry_compromises_chain() {
        let report = evaluate_custody(
            chain(vec![
                entry(1, CustodyAction::BundleCreated, true, 0),
                entry(2, CustodyAction::BundleAccessed, false, 3),
            ]),
            Some(&passing_report()),
        );
        assert!(!report.verified);
        assert!(report.entries[0].hash_valid);
        assert!(!report.entries[1].hash_valid);
        assert_eq!(report.issues, vec!["entry 2 (BUNDLE_ACCESSED): hash mismatch, 3 files failed"]);
    }

    #[test]
    fn test_entry_with_failed_files_is_invalid() {
        assert!(!entry_is_valid(&entry(1, CustodyAction::BundleAccessed, true, 1)));
        assert!(!entry_is_valid(&entry(1, CustodyAction::BundleAccessed, false, 0)));
        assert!(entry_is_valid(&entry(1, CustodyAction::BundleAccessed, true, 0)));
    }

    #[test]
    fn test_empty_chain_is_not_verified() {
        let report = evaluate_custody(chain(Vec::new()), Some(&passing_report()));
        assert!(!report.verified);
        assert!(!report.issues.is_empty());
    }

    #[test]
    fn test_zero_file_report_is_not_verified() {
        let verification = VerificationReport {
            all_files_verified: true,
            bundle_hash_verified: true,
            ..Default::default()
        };
        let report = evaluate_custody(
            chain(vec![entry(1, CustodyAction::BundleCreated, true, 0)]),
            Some(&verification),
        );
        assert!(!report.verified);
        assert_eq!(report.issues, vec!["verification report covers zero files"]);
    }

    #[test]
    fn test_missing_verification_report_is_not_verified() {
        let report = evaluate_custody(chain(vec![entry(1, CustodyAction::BundleCreated, true, 0)]), None);
        assert!(!report.verified);
        assert_eq!(report.issues, vec!["no verification report found"]);
    }

    #[test]
    fn test_failed_files_are_named() {
        let verification = VerificationReport {
            total_files: 24,
            verified_files: 22,
            failed_files: 2,
            failed_file_list: vec!["results/a.json".into(), "results/b.json".into()],
            all_files_verified: false,
            bundle_hash_verified: true,
            ..Default::default()
        };
        let report = evaluate_custody(
            chain(vec![entry(1, CustodyAction::BundleCreated, true, 0)]),
            Some(&verification),
        );
        assert!(!report.verified);
        assert_eq!(
            report.issues,
            vec!["2 of 24 files failed verification: results/a.json, results/b.json"]
        );
    }

    #[test]
    fn test_bundle_hash_failure_is_reported_not_decisive() {
        let verification = VerificationReport { bundle_hash_verified: false, ..passing_report() };
        let report = evaluate_custody(
            chain(vec![entry(1, CustodyAction::BundleCreated, true, 0)]),
            Some(&verification),
        );
        assert!(report.verified);
        assert_eq!(report.issues, vec!["bundle hash verification failed"]);
    }

    #[test]
    fn test_on_disk_derived_fields_are_ignored() {
        let mut tampered = chain(vec![entry(1, CustodyAction::BundleAccessed, false, 0)]);
        tampered.entries[0].hash_valid = true;
        tampered.verified = true;
        tampered.issues = vec!["stale".into()];
        tampered.total_entries = 7;

        let report = evaluate_custody(tampered, Some(&passing_report()));
        assert!(!report.verified);
        assert!(!report.entries[0].hash_valid);
        assert_eq!(report.total_entries, 1);
        assert!(!report.issues.contains(&"stale".to_string()));
    }
}
