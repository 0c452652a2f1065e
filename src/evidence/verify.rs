//! Local re-verification of analysis output against the case manifest
//!
//! Produces a fresh `VerificationReport` by hashing every manifest entry
//! found under the output directory, and optionally the encrypted bundle
//! against its detached hash file.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use super::types::{CaseManifest, ManifestFile, VerificationReport};
use crate::common::audit;
use crate::common::hash::{hashes_match, read_hash_file, sha256_file};
use crate::common::path_security::is_safe_relative_path;

/// An encrypted bundle together with its detached hash file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFiles {
    pub bundle: PathBuf,
    pub hash_file: PathBuf,
}

/// Re-hash the output directory against `manifest`.
///
/// Hashing runs on the blocking pool. Without `bundle`, the bundle hash is
/// reported as unverified.
pub async fn reverify_output(
    output_dir: &Path,
    manifest: &CaseManifest,
    bundle: Option<BundleFiles>,
) -> VerificationReport {
    let output_dir = output_dir.to_path_buf();
    let files = manifest.files.clone();
    let total = files.len() as u64;

    let task_dir = output_dir.clone();
    let report = tokio::task::spawn_blocking(move || verify_blocking(&task_dir, &files, bundle.as_ref()))
        .await
        .unwrap_or_else(|e| {
            warn!("Re-verification task failed: {}", e);
            VerificationReport {
                total_files: total,
                failed_files: total,
                verification_timestamp: timestamp_now(),
                ..Default::default()
            }
        });

    audit::log_reverification(
        &output_dir,
        report.total_files,
        report.failed_files,
        report.bundle_hash_verified,
    );
    report
}

#[instrument(skip(files, bundle), fields(output = %output_dir.display(), files = files.len()))]
fn verify_blocking(
    output_dir: &Path,
    files: &[ManifestFile],
    bundle: Option<&BundleFiles>,
) -> VerificationReport {
    let mut failed_file_list = Vec::new();

    for file in files {
        if !verify_manifest_file(output_dir, file) {
            failed_file_list.push(file.path.clone());
        }
    }

    let total_files = files.len() as u64;
    let failed_files = failed_file_list.len() as u64;
    let bundle_hash_verified = bundle.map(verify_bundle_hash).unwrap_or(false);

    VerificationReport {
        total_files,
        verified_files: total_files - failed_files,
        failed_files,
        failed_file_list,
        all_files_verified: failed_files == 0,
        bundle_hash_verified,
        verification_timestamp: timestamp_now(),
    }
}

fn verify_manifest_file(output_dir: &Path, file: &ManifestFile) -> bool {
    if !is_safe_relative_path(&file.path) {
        warn!(path = %file.path, "Manifest entry escapes the output directory");
        return false;
    }

    let path = output_dir.join(&file.path);
    match sha256_file(&path) {
        Ok(computed) => {
            let matched = hashes_match(&computed, &file.sha256);
            if !matched {
                debug!(path = %file.path, expected = %file.sha256, computed = %computed, "Hash mismatch");
            }
            matched
        }
        Err(e) => {
            debug!(path = %file.path, "Cannot hash manifest entry: {}", e);
            false
        }
    }
}

fn verify_bundle_hash(files: &BundleFiles) -> bool {
    let expected = match read_hash_file(&files.hash_file) {
        Ok(Some(hash)) => hash,
        Ok(None) => {
            warn!(path = %files.hash_file.display(), "No SHA-256 digest in hash file");
            return false;
        }
        Err(e) => {
            warn!(path = %files.hash_file.display(), "Cannot read hash file: {}", e);
            return false;
        }
    };

    match sha256_file(&files.bundle) {
        Ok(computed) => hashes_match(&computed, &expected),
        Err(e) => {
            warn!(path = %files.bundle.display(), "Cannot hash bundle: {}", e);
            false
        }
    }
}

fn timestamp_now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
