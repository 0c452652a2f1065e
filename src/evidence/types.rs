//! Bundle metadata written by the analysis tool
//!
//! `MANIFEST.json`, `VERIFICATION_REPORT.json` and `CUSTODY_REPORT.json`
//! deserialize directly into these types. Derived custody fields
//! (`hash_valid`, `verified`, `issues`) are recomputed by the evaluator and
//! never trusted from disk.

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::json::{
    lenient_bool, lenient_string, lenient_u64, lenient_vec, lenient_vec_keep, or_default,
};

/// Case manifest: the declared inventory of the bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseManifest {
    #[serde(deserialize_with = "lenient_string")]
    pub case_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub case_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub investigator: String,
    /// Bundle creation time (UTC)
    #[serde(deserialize_with = "lenient_string")]
    pub created_utc: String,
    /// Bundle creation time on the acquiring system's clock
    #[serde(deserialize_with = "lenient_string")]
    pub system_local: String,
    /// Files the bundle asserts it contains, in manifest order
    #[serde(deserialize_with = "lenient_vec")]
    pub files: Vec<ManifestFile>,
}

impl CaseManifest {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

/// One `(path, hash, size, mtime)` manifest tuple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestFile {
    /// Path relative to the bundle root
    #[serde(deserialize_with = "lenient_string")]
    pub path: String,
    /// SHA-256, hex
    #[serde(deserialize_with = "lenient_string")]
    pub sha256: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub size: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub mtime: String,
}

/// Result of re-hashing bundle contents against the manifest.
///
/// Each analysis run produces a new report; an existing one is never
/// updated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationReport {
    #[serde(deserialize_with = "lenient_u64")]
    pub total_files: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub verified_files: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub failed_files: u64,
    #[serde(deserialize_with = "lenient_vec")]
    pub failed_file_list: Vec<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub all_files_verified: bool,
    /// Integrity of the bundle as a whole, independent of per-file checks
    #[serde(deserialize_with = "lenient_bool")]
    pub bundle_hash_verified: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub verification_timestamp: String,
}

impl VerificationReport {
    /// All files verified, and there was at least one file to verify.
    /// An empty bundle is never considered fully verified.
    pub fn is_fully_verified(&self) -> bool {
        self.all_files_verified && self.total_files > 0
    }
}

/// Kind of custody event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum CustodyAction {
    BundleCreated,
    BundleAccessed,
    VerificationComplete,
    /// Any action string the tool records that has no dedicated variant
    Other(String),
}

impl CustodyAction {
    pub fn as_str(&self) -> &str {
        match self {
            CustodyAction::BundleCreated => "BUNDLE_CREATED",
            CustodyAction::BundleAccessed => "BUNDLE_ACCESSED",
            CustodyAction::VerificationComplete => "VERIFICATION_COMPLETE",
            CustodyAction::Other(action) => action,
        }
    }

    /// Human-readable description of the event given its validity
    pub fn describe(&self, hash_valid: bool) -> String {
        match (self, hash_valid) {
            (CustodyAction::BundleCreated, _) => "Evidence bundle created and encrypted".to_string(),
            (CustodyAction::BundleAccessed, true) => "Bundle accessed and verified".to_string(),
            (CustodyAction::BundleAccessed, false) => {
                "Bundle decrypted for analysis - Hash chain broken".to_string()
            }
            (CustodyAction::VerificationComplete, true) => "All files verified successfully".to_string(),
            (CustodyAction::VerificationComplete, false) => {
                "Verification completed with errors".to_string()
            }
            (CustodyAction::Other(action), _) => action.clone(),
        }
    }
}

impl Default for CustodyAction {
    fn default() -> Self {
        CustodyAction::Other(String::new())
    }
}

impl From<String> for CustodyAction {
    fn from(action: String) -> Self {
        match action.trim().to_ascii_uppercase().as_str() {
            "BUNDLE_CREATED" => CustodyAction::BundleCreated,
            "BUNDLE_ACCESSED" | "BUNDLE_DECRYPTED" => CustodyAction::BundleAccessed,
            "VERIFICATION_COMPLETE" | "VERIFICATION_COMPLETED" => CustodyAction::VerificationComplete,
            _ => CustodyAction::Other(action),
        }
    }
}

impl<'de> Deserialize<'de> for CustodyAction {
    /// Any scalar is accepted; `null` becomes an unnamed action
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_string(deserializer).map(CustodyAction::from)
    }
}

impl From<CustodyAction> for String {
    fn from(action: CustodyAction) -> Self {
        action.as_str().to_string()
    }
}

impl std::fmt::Display for CustodyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The analyst who performed a custody action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystIdentity {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string", alias = "badge")]
    pub badge_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub agency: String,
    #[serde(deserialize_with = "lenient_string")]
    pub purpose: String,
}

/// The system a custody action originated from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemIdentity {
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub hostname: String,
    #[serde(deserialize_with = "lenient_string", alias = "ip")]
    pub ip_address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub os: String,
}

/// Verification outcome recorded with a custody entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryVerification {
    #[serde(deserialize_with = "lenient_bool")]
    pub hash_match: bool,
    #[serde(deserialize_with = "lenient_u64")]
    pub files_verified: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub files_failed: u64,
}

/// One event in the append-only custody chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyEntry {
    #[serde(deserialize_with = "lenient_u64", alias = "id")]
    pub entry_number: u64,
    pub action: CustodyAction,
    #[serde(deserialize_with = "lenient_string", alias = "timestamp_utc")]
    pub timestamp: String,
    #[serde(deserialize_with = "or_default")]
    pub analyst: AnalystIdentity,
    #[serde(deserialize_with = "or_default")]
    pub system: SystemIdentity,
    /// Missing or unusable verification counts as a failed check
    #[serde(deserialize_with = "or_default")]
    pub verification: EntryVerification,
    #[serde(deserialize_with = "lenient_string")]
    pub details: String,
    /// Derived by the evaluator
    #[serde(deserialize_with = "lenient_bool")]
    pub hash_valid: bool,
}

/// The whole custody chain of a bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyReport {
    #[serde(deserialize_with = "lenient_string")]
    pub generated_utc: String,
    #[serde(deserialize_with = "lenient_string")]
    pub case_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub case_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub original_investigator: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bundle_created_utc: String,
    #[serde(deserialize_with = "lenient_string")]
    pub custody_started_utc: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub total_entries: u64,
    /// A malformed entry is kept as a default entry, which never validates
    #[serde(alias = "custody_chain", deserialize_with = "lenient_vec_keep")]
    pub entries: Vec<CustodyEntry>,
    /// Derived by the evaluator
    #[serde(deserialize_with = "lenient_bool")]
    pub verified: bool,
    /// Derived by the evaluator
    #[serde(deserialize_with = "lenient_vec")]
    pub issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_shape() {
        let manifest: CaseManifest = serde_json::from_value(json!({
            "case_name": "suicide",
            "case_id": "S_07",
            "investigator": "prixit singh",
            "created_utc": "2025-12-06 10:22:49 UTC",
            "system_local": "2025-12-06 15:52:49 IST",
            "files": [
                { "path": "results/chromium/chromium_history.json", "sha256": "ab", "size": 1416649, "mtime": "2025-12-06 10:20:00" }
            ]
        }))
        .unwrap();

        assert_eq!(manifest.case_id, "S_07");
        assert_eq!(manifest.total_files(), 1);
        assert_eq!(manifest.files[0].size, 1416649);
    }

    #[test]
    fn test_verification_report_shape() {
        let report: VerificationReport = serde_json::from_value(json!({
            "all_files_verified": true,
            "bundle_hash_verified": true,
            "failed_file_list": [],
            "failed_files": 0,
            "total_files": 24,
            "verification_timestamp": "2025-12-11 10:54:03 UTC",
            "verified_files": 24
        }))
        .unwrap();

        assert!(report.is_fully_verified());
        assert_eq!(report.verified_files, 24);
    }

    #[test]
    fn test_empty_report_is_not_fully_verified() {
        let report = VerificationReport { all_files_verified: true, ..Default::default() };
        assert!(!report.is_fully_verified());
    }

    #[test]
    fn test_custody_action_strings() {
        assert_eq!(CustodyAction::from("bundle_created".to_string()), CustodyAction::BundleCreated);
        assert_eq!(
            CustodyAction::from("EXPORTED".to_string()),
            CustodyAction::Other("EXPORTED".to_string())
        );
        assert_eq!(String::from(CustodyAction::VerificationComplete), "VERIFICATION_COMPLETE");
    }

    #[test]
    fn test_custody_entry_aliases() {
        let entry: CustodyEntry = serde_json::from_value(json!({
            "id": 2,
            "action": "BUNDLE_ACCESSED",
            "timestamp_utc": "2025-12-11 10:54:03 UTC",
            "analyst": { "name": "prixit singh", "badge": "B-113", "agency": "CFSL", "purpose": "analysis" },
            "system": { "username": "lab", "hostname": "lab-01", "ip": "10.0.0.5", "os": "Windows 11" },
            "verification": { "hash_match": false, "files_verified": 24, "files_failed": 0 },
            "hash_valid": true
        }))
        .unwrap();

        assert_eq!(entry.entry_number, 2);
        assert_eq!(entry.action, CustodyAction::BundleAccessed);
        assert_eq!(entry.analyst.badge_id, "B-113");
        assert_eq!(entry.system.ip_address, "10.0.0.5");
        assert!(!entry.verification.hash_match);
    }

    #[test]
    fn test_verification_report_with_null_failed_list() {
        let report: VerificationReport = serde_json::from_value(json!({
            "total_files": 2,
            "verified_files": 2,
            "failed_files": 0,
            "failed_file_list": null,
            "all_files_verified": true,
            "bundle_hash_verified": true
        }))
        .unwrap();
        assert!(report.failed_file_list.is_empty());
        assert!(report.is_fully_verified());

        let manifest: CaseManifest = serde_json::from_value(json!({ "case_id": "S_07", "files": null })).unwrap();
        assert_eq!(manifest.total_files(), 0);
    }

    #[test]
    fn test_custody_nulls_keep_every_entry() {
        let report: CustodyReport = serde_json::from_value(json!({
            "custody_chain": [
                { "entry_number": 1, "action": "BUNDLE_CREATED", "verification": { "hash_match": true } },
                { "entry_number": 2, "action": null, "analyst": null, "verification": { "hash_match": false, "files_failed": 3 } },
                "not an entry"
            ],
            "issues": null
        }))
        .unwrap();

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.entries[1].action, CustodyAction::default());
        assert!(!report.entries[1].verification.hash_match);
        assert_eq!(report.entries[1].verification.files_failed, 3);
        assert_eq!(report.entries[2], CustodyEntry::default());
    }
}
