//! Analysis snapshot assembly
//!
//! A snapshot is built from scratch on every load: all loader calls run
//! concurrently, then the custody chain is evaluated against the
//! verification report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::artifacts::{
    ArtifactLoader, AutofillEntry, BookmarkEntry, BrowserProfile, CookieEntry, DownloadEntry,
    FileNode, HistoryEntry, PasswordEntry, ProfileExtensions, SourceDocument,
};
use crate::common::audit;
use crate::custody::{derive_chain, evaluate_custody, CustodySource, IntegrityAssessment};
use crate::evidence::{CaseManifest, CustodyReport, VerificationReport};

/// Everything known about one analysis output, as of `loaded_at`
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisSnapshot {
    pub case_manifest: Option<CaseManifest>,
    pub verification: Option<VerificationReport>,
    /// Evaluated chain, recorded or derived
    pub custody: Option<CustodyReport>,
    pub integrity: IntegrityAssessment,
    pub profiles: Vec<BrowserProfile>,
    pub history: Vec<HistoryEntry>,
    pub cookies: Vec<CookieEntry>,
    pub passwords: Vec<PasswordEntry>,
    pub downloads: Vec<DownloadEntry>,
    pub autofill: Vec<AutofillEntry>,
    pub bookmarks: Vec<BookmarkEntry>,
    pub extensions: Vec<ProfileExtensions>,
    pub file_tree: Option<FileNode>,
    /// `None` until the snapshot has been loaded from disk
    pub loaded_at: Option<DateTime<Utc>>,
}

impl AnalysisSnapshot {
    /// Whether the output holds anything worth showing. Derived custody does
    /// not count; only what the tool actually wrote does.
    pub fn has_meaningful_data(&self) -> bool {
        self.case_manifest.is_some()
            || self.verification.is_some()
            || matches!(
                self.integrity.custody_source,
                CustodySource::Recorded | CustodySource::Unreadable
            )
            || !self.profiles.is_empty()
            || !self.history.is_empty()
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            case_id: self.case_manifest.as_ref().map(|m| m.case_id.clone()),
            case_name: self.case_manifest.as_ref().map(|m| m.case_name.clone()),
            verdict: self.integrity.verdict.as_str(),
            issues: self.integrity.issues.clone(),
            profiles: self.profiles.len(),
            history: self.history.len(),
            cookies: self.cookies.len(),
            passwords: self.passwords.len(),
            downloads: self.downloads.len(),
            autofill: self.autofill.len(),
            bookmarks: self.bookmarks.iter().map(BookmarkEntry::url_count).sum(),
            extensions: self.extensions.iter().map(|p| p.extensions.len()).sum(),
            output_files: self.file_tree.as_ref().map(FileNode::file_count).unwrap_or(0),
            loaded_at: self.loaded_at,
        }
    }
}

/// Counts-only view of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub case_id: Option<String>,
    pub case_name: Option<String>,
    pub verdict: &'static str,
    pub issues: Vec<String>,
    pub profiles: usize,
    pub history: usize,
    pub cookies: usize,
    pub passwords: usize,
    pub downloads: usize,
    pub autofill: usize,
    pub bookmarks: usize,
    pub extensions: usize,
    pub output_files: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Something that can produce a fresh snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load(&self) -> AnalysisSnapshot;
}

/// Snapshot source reading an analysis output directory
#[derive(Debug, Clone)]
pub struct OutputDirSource {
    loader: ArtifactLoader,
}

impl OutputDirSource {
    pub fn new(output_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            loader: ArtifactLoader::new(output_dir),
        }
    }

    pub fn loader(&self) -> &ArtifactLoader {
        &self.loader
    }
}

#[async_trait]
impl SnapshotSource for OutputDirSource {
    async fn load(&self) -> AnalysisSnapshot {
        build_snapshot(&self.loader).await
    }
}

/// Run every loader call concurrently and assemble the snapshot
#[instrument(skip(loader), fields(root = %loader.root().display()))]
pub async fn build_snapshot(loader: &ArtifactLoader) -> AnalysisSnapshot {
    let (
        case_manifest,
        verification,
        recorded_custody,
        profiles,
        history,
        (cookies, passwords),
        downloads,
        autofill,
        bookmarks,
        extensions,
        file_tree,
    ) = tokio::join!(
        loader.load_case_manifest(),
        loader.load_verification_report(),
        loader.load_custody_report(),
        loader.load_profiles(),
        loader.load_history(),
        loader.load_credentials(),
        loader.load_downloads(),
        loader.load_autofill(),
        loader.load_bookmarks(),
        loader.load_extensions(),
        loader.load_file_tree(),
    );

    // Derive a chain only when the tool wrote none at all
    let (custody, integrity) = match recorded_custody {
        SourceDocument::Present(report) => {
            let custody = evaluate_custody(report, verification.as_ref());
            let integrity = IntegrityAssessment::from_custody(Some(&custody), CustodySource::Recorded);
            (Some(custody), integrity)
        }
        SourceDocument::Absent => {
            let custody = derive_chain(case_manifest.as_ref(), verification.as_ref())
                .map(|report| evaluate_custody(report, verification.as_ref()));
            let integrity = IntegrityAssessment::from_custody(custody.as_ref(), CustodySource::Derived);
            (custody, integrity)
        }
        SourceDocument::Unusable(reason) => (None, IntegrityAssessment::unreadable_custody(&reason)),
    };

    let snapshot = AnalysisSnapshot {
        case_manifest,
        verification,
        custody,
        integrity,
        profiles,
        history,
        cookies,
        passwords,
        downloads,
        autofill,
        bookmarks,
        extensions,
        file_tree,
        loaded_at: Some(Utc::now()),
    };

    if snapshot.has_meaningful_data() {
        audit::log_integrity_verdict(
            snapshot.case_manifest.as_ref().map(|m| m.case_id.as_str()),
            snapshot.integrity.verdict,
            &snapshot.integrity.issues,
        );
    }
    debug!(
        profiles = snapshot.profiles.len(),
        history = snapshot.history.len(),
        verdict = snapshot.integrity.verdict.as_str(),
        "Snapshot assembled"
    );

    snapshot
}
