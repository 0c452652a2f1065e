//! Artifact loader
//!
//! Reads the analysis output directory. Every operation is infallible: a
//! missing, unreadable or malformed source contributes nothing and is
//! recorded in the audit trail when it existed but could not be used.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use super::adapters::{self, FIREFOX};
use super::sources::{self, ArtifactSource, CHROMIUM_DIR, PROFILE_COOKIES_FILE, PROFILE_PASSWORDS_FILE};
use super::tree;
use super::types::*;
use crate::common::audit;
use crate::common::json::records;
use crate::evidence::{
    CaseManifest, CustodyReport, VerificationReport, CUSTODY_REPORT_FILE, MANIFEST_FILE,
    VERIFICATION_REPORT_FILE,
};

/// Reads artifacts from one analysis output directory
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    root: PathBuf,
}

/// Outcome of reading one document from the output directory
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDocument<T> {
    /// No such file
    Absent,
    /// The file exists but could not be read or parsed
    Unusable(String),
    Present(T),
}

impl<T> SourceDocument<T> {
    pub fn present(self) -> Option<T> {
        match self {
            SourceDocument::Present(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SourceDocument::Absent)
    }
}

/// A chromium `<browser>/<profile>` directory
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProfileDir {
    provenance: Provenance,
    path: PathBuf,
}

impl ArtifactLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Raw reads
    // =========================================================================

    /// Read and parse one JSON file. Unusable files are audited.
    async fn read_document(&self, path: &Path) -> SourceDocument<Value> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "Source not present");
                return SourceDocument::Absent;
            }
            Err(e) => {
                let reason = e.to_string();
                audit::log_source_skipped(path, &reason);
                return SourceDocument::Unusable(reason);
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => SourceDocument::Present(value),
            Err(e) => {
                let reason = format!("malformed JSON: {}", e);
                audit::log_source_skipped(path, &reason);
                SourceDocument::Unusable(reason)
            }
        }
    }

    /// `None` for anything but a parseable file
    async fn read_json(&self, path: &Path) -> Option<Value> {
        self.read_document(path).await.present()
    }

    /// Read one JSON file straight into a typed document
    async fn read_typed<T: DeserializeOwned>(&self, path: &Path) -> SourceDocument<T> {
        let value = match self.read_document(path).await {
            SourceDocument::Present(value) => value,
            SourceDocument::Absent => return SourceDocument::Absent,
            SourceDocument::Unusable(reason) => return SourceDocument::Unusable(reason),
        };
        match serde_json::from_value(value) {
            Ok(doc) => SourceDocument::Present(doc),
            Err(e) => {
                let reason = format!("unexpected shape: {}", e);
                audit::log_source_skipped(path, &reason);
                SourceDocument::Unusable(reason)
            }
        }
    }

    async fn read_source(&self, source: ArtifactSource) -> Option<Value> {
        self.read_json(&source.path(&self.root)).await
    }

    // =========================================================================
    // Bundle metadata
    // =========================================================================

    pub async fn load_case_manifest(&self) -> Option<CaseManifest> {
        self.read_typed(&self.root.join(MANIFEST_FILE)).await.present()
    }

    pub async fn load_verification_report(&self) -> Option<VerificationReport> {
        self.read_typed(&self.root.join(VERIFICATION_REPORT_FILE)).await.present()
    }

    /// Unlike the other sources, an unusable custody report is reported as
    /// such: it must not be mistaken for a bundle that never had one.
    pub async fn load_custody_report(&self) -> SourceDocument<CustodyReport> {
        self.read_typed(&self.root.join(CUSTODY_REPORT_FILE)).await
    }

    // =========================================================================
    // Browser artifacts
    // =========================================================================

    /// Chromium profiles from the profile list, then every Firefox profile
    /// that appears in the autofill or history export
    pub async fn load_profiles(&self) -> Vec<BrowserProfile> {
        let (chromium, ff_autofill, ff_history) = tokio::join!(
            self.read_source(sources::CHROMIUM_PROFILES),
            self.read_source(sources::FIREFOX_AUTOFILL),
            self.read_source(sources::FIREFOX_HISTORY),
        );

        let mut profiles: Vec<BrowserProfile> = chromium
            .map(records::<adapters::RawChromiumProfile>)
            .unwrap_or_default()
            .into_iter()
            .map(adapters::chromium_profile)
            .collect();

        let firefox_keys: BTreeSet<String> = [ff_autofill, ff_history]
            .iter()
            .flatten()
            .flat_map(adapters::object_keys)
            .collect();
        profiles.extend(firefox_keys.iter().map(|key| adapters::firefox_profile(key)));

        profiles
    }

    pub async fn load_history(&self) -> Vec<HistoryEntry> {
        let (chromium, firefox) = tokio::join!(
            self.read_source(sources::CHROMIUM_HISTORY),
            self.read_source(sources::FIREFOX_HISTORY),
        );

        let mut entries: Vec<HistoryEntry> = chromium
            .map(adapters::browser_profile_records)
            .unwrap_or_default()
            .into_iter()
            .map(|(p, raw)| adapters::chromium_history(p, raw))
            .collect();
        entries.extend(
            firefox
                .map(|v| adapters::profile_records(FIREFOX, v))
                .unwrap_or_default()
                .into_iter()
                .map(|(p, raw)| adapters::firefox_history(p, raw)),
        );
        entries
    }

    pub async fn load_downloads(&self) -> Vec<DownloadEntry> {
        let (chromium, firefox) = tokio::join!(
            self.read_source(sources::CHROMIUM_DOWNLOADS),
            self.read_source(sources::FIREFOX_DOWNLOADS),
        );

        let mut entries: Vec<DownloadEntry> = chromium
            .map(adapters::browser_profile_records)
            .unwrap_or_default()
            .into_iter()
            .map(|(p, raw)| adapters::chromium_download(p, raw))
            .collect();
        entries.extend(
            firefox
                .map(|v| adapters::profile_records(FIREFOX, v))
                .unwrap_or_default()
                .into_iter()
                .map(|(p, raw)| adapters::firefox_download(p, raw)),
        );
        entries
    }

    /// Per-profile chromium cookie files, then the Firefox export
    pub async fn load_cookies(&self) -> Vec<CookieEntry> {
        let dirs = self.chromium_profile_dirs().await;
        self.cookies_in(&dirs).await
    }

    /// Per-profile chromium password files, then the Firefox export
    pub async fn load_passwords(&self) -> Vec<PasswordEntry> {
        let dirs = self.chromium_profile_dirs().await;
        self.passwords_in(&dirs).await
    }

    /// Cookies and passwords together, listing the chromium profiles once
    pub async fn load_credentials(&self) -> (Vec<CookieEntry>, Vec<PasswordEntry>) {
        let dirs = self.chromium_profile_dirs().await;
        tokio::join!(self.cookies_in(&dirs), self.passwords_in(&dirs))
    }

    async fn cookies_in(&self, dirs: &[ProfileDir]) -> Vec<CookieEntry> {
        let (chromium, firefox) = tokio::join!(
            join_all(dirs.iter().map(|dir| self.read_json_in(dir, PROFILE_COOKIES_FILE))),
            self.read_source(sources::FIREFOX_COOKIES),
        );

        let mut entries: Vec<CookieEntry> = dirs
            .iter()
            .zip(chromium)
            .filter_map(|(dir, value)| value.map(|v| adapters::chromium_cookie_file(&dir.provenance, v)))
            .flatten()
            .collect();
        entries.extend(
            firefox
                .map(|v| adapters::profile_records(FIREFOX, v))
                .unwrap_or_default()
                .into_iter()
                .map(|(p, raw)| adapters::firefox_cookie(p, raw)),
        );
        entries
    }

    async fn passwords_in(&self, dirs: &[ProfileDir]) -> Vec<PasswordEntry> {
        let (chromium, firefox) = tokio::join!(
            join_all(dirs.iter().map(|dir| self.read_json_in(dir, PROFILE_PASSWORDS_FILE))),
            self.read_source(sources::FIREFOX_PASSWORDS),
        );

        let mut entries = Vec::new();
        for (dir, value) in dirs.iter().zip(chromium) {
            let Some(value) = value else { continue };
            entries.extend(
                records::<adapters::RawChromiumPassword>(value)
                    .into_iter()
                    .map(|raw| adapters::chromium_password(dir.provenance.clone(), raw)),
            );
        }
        entries.extend(
            firefox
                .map(|v| adapters::profile_records(FIREFOX, v))
                .unwrap_or_default()
                .into_iter()
                .map(|(p, raw)| adapters::firefox_password(p, raw)),
        );
        entries
    }

    pub async fn load_autofill(&self) -> Vec<AutofillEntry> {
        let (chromium, firefox) = tokio::join!(
            self.read_source(sources::CHROMIUM_AUTOFILL),
            self.read_source(sources::FIREFOX_AUTOFILL),
        );

        let mut entries: Vec<AutofillEntry> = chromium
            .map(adapters::browser_profile_records)
            .unwrap_or_default()
            .into_iter()
            .map(|(p, raw)| adapters::chromium_autofill(p, raw))
            .collect();
        entries.extend(
            firefox
                .map(adapters::firefox_form_history)
                .unwrap_or_default()
                .into_iter()
                .map(|(p, raw)| adapters::firefox_autofill(p, raw)),
        );
        entries
    }

    /// Extension lists per profile; profiles with no extensions are omitted
    pub async fn load_extensions(&self) -> Vec<ProfileExtensions> {
        let (chromium, firefox) = tokio::join!(
            self.read_source(sources::CHROMIUM_EXTENSIONS),
            self.read_source(sources::FIREFOX_EXTENSIONS),
        );

        let mut pairs: Vec<(Provenance, adapters::RawExtension)> =
            chromium.map(adapters::browser_profile_records).unwrap_or_default();
        pairs.extend(firefox.map(|v| adapters::profile_records(FIREFOX, v)).unwrap_or_default());

        group_extensions(pairs)
    }

    /// Chromium bookmark trees as exported; Firefox bookmarks grouped under
    /// one folder per profile
    pub async fn load_bookmarks(&self) -> Vec<BookmarkEntry> {
        let (chromium, firefox) = tokio::join!(
            self.read_source(sources::CHROMIUM_BOOKMARKS),
            self.read_source(sources::FIREFOX_BOOKMARKS),
        );

        let mut entries: Vec<BookmarkEntry> = chromium
            .map(adapters::browser_profile_records)
            .unwrap_or_default()
            .into_iter()
            .map(|(p, raw)| adapters::chromium_bookmark(&p, raw))
            .collect();

        if let Some(Value::Object(profiles)) = firefox {
            entries.extend(profiles.into_iter().filter_map(|(profile, items)| {
                adapters::firefox_bookmark_folder(Provenance::new(FIREFOX, profile), records(items))
            }));
        }
        entries
    }

    /// Directory listing of the whole output
    pub async fn load_file_tree(&self) -> Option<FileNode> {
        tree::load_file_tree(&self.root).await
    }

    // =========================================================================
    // Layout discovery
    // =========================================================================

    async fn read_json_in(&self, dir: &ProfileDir, file_name: &str) -> Option<Value> {
        self.read_json(&dir.path.join(file_name)).await
    }

    /// `results/chromium/<browser>/<profile>/` directories, sorted
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn chromium_profile_dirs(&self) -> Vec<ProfileDir> {
        let chromium_root = self.root.join(CHROMIUM_DIR);
        let mut dirs = Vec::new();

        for (browser, browser_path) in list_subdirs(&chromium_root).await {
            for (profile, path) in list_subdirs(&browser_path).await {
                dirs.push(ProfileDir {
                    provenance: Provenance::new(&browser, profile),
                    path,
                });
            }
        }

        debug!(count = dirs.len(), "Discovered chromium profile directories");
        dirs
    }
}

/// Named subdirectories of `dir`, sorted by name; empty if unreadable
async fn list_subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) => {
            trace!(path = %dir.display(), "Cannot list directory: {}", e);
            return Vec::new();
        }
    };

    let mut subdirs = Vec::new();
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            subdirs.push((name.to_string(), entry.path()));
        }
    }
    subdirs.sort();
    subdirs
}

/// Collapse consecutive `(provenance, extension)` pairs into per-profile lists
fn group_extensions(pairs: Vec<(Provenance, adapters::RawExtension)>) -> Vec<ProfileExtensions> {
    let mut grouped: Vec<ProfileExtensions> = Vec::new();
    for (provenance, raw) in pairs {
        let extension = adapters::extension(raw);
        match grouped.last_mut() {
            Some(last) if last.provenance == provenance => last.extensions.push(extension),
            _ => grouped.push(ProfileExtensions {
                provenance,
                extensions: vec![extension],
            }),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_json(root: &Path, relative: &str, value: Value) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_empty_directory_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ArtifactLoader::new(temp_dir.path());

        assert!(loader.load_case_manifest().await.is_none());
        assert!(loader.load_verification_report().await.is_none());
        assert!(loader.load_custody_report().await.is_absent());
        assert!(loader.load_profiles().await.is_empty());
        assert!(loader.load_history().await.is_empty());
        assert!(loader.load_cookies().await.is_empty());
        assert!(loader.load_bookmarks().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_not_an_error() {
        let loader = ArtifactLoader::new("/nonexistent/lume/output");
        assert!(loader.load_passwords().await.is_empty());
        assert!(loader.load_file_tree().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_source_contributes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("results/chromium")).unwrap();
        fs::write(root.join("results/chromium/chromium_history.json"), b"{ not json").unwrap();
        write_json(
            root,
            "results/firefox/firefox_history.json",
            json!({ "abcd.default": [ { "title": "MDN", "url": "https://developer.mozilla.org", "visit_time": "2025-12-01", "visit_count": 2 } ] }),
        );

        let loader = ArtifactLoader::new(root);
        let history = loader.load_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].provenance.browser, "Firefox");
        assert_eq!(history[0].last_visit_time, "2025-12-01");
    }

    #[tokio::test]
    async fn test_profiles_from_both_families() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(
            root,
            "results/chromium/chromium_profiles.json",
            json!([ { "browser": "chrome", "profile_dir": "Default", "display_name": "Person 1", "email": "p1@example.com" } ]),
        );
        write_json(root, "results/firefox/firefox_autofill.json", json!({ "abcd.default-release": { "form_history": [] } }));
        write_json(root, "results/firefox/firefox_history.json", json!({ "abcd.default-release": [], "efgh.work": [] }));

        let profiles = ArtifactLoader::new(root).load_profiles().await;
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].provenance, Provenance::new("Chrome", "Default"));
        assert_eq!(profiles[0].email, "p1@example.com");
        assert_eq!(profiles[1].display_name, "default-release");
        assert_eq!(profiles[2].provenance.profile, "efgh.work");
    }

    #[tokio::test]
    async fn test_per_profile_chromium_files_are_discovered() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(
            root,
            "results/chromium/chrome/Default/cookies.json",
            json!({ "cookies_by_host": { ".example.com": [ { "host": ".example.com", "name": "sid" } ] } }),
        );
        write_json(
            root,
            "results/chromium/edge/Profile 2/passwords.json",
            json!([ { "url": "https://login.example", "username": "bob", "password": "pw" }, "garbage" ]),
        );
        write_json(
            root,
            "results/firefox/firefox_passwords.json",
            json!({ "abcd.default": [ { "url": "https://mail.example", "user": "alice", "password": "pw2" } ] }),
        );

        let loader = ArtifactLoader::new(root);
        let cookies = loader.load_cookies().await;
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].provenance, Provenance::new("chrome", "Default"));

        let passwords = loader.load_passwords().await;
        assert_eq!(passwords.len(), 2);
        assert_eq!(passwords[0].provenance, Provenance::new("Edge", "Profile 2"));
        assert_eq!(passwords[0].username, "bob");
        assert_eq!(passwords[1].username, "alice");

        let (both_cookies, both_passwords) = loader.load_credentials().await;
        assert_eq!(both_cookies, cookies);
        assert_eq!(both_passwords, passwords);
    }

    #[tokio::test]
    async fn test_extensions_grouped_per_profile() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(
            root,
            "results/chromium/chromium_extensions.json",
            json!({ "chrome": { "Default": [ { "name": "uBlock" }, { "name": "Docs Offline" } ], "Profile 1": [] } }),
        );
        write_json(
            root,
            "results/firefox/firefox_extensions.json",
            json!({ "abcd.default": [ { "name": "NoScript", "id": "{73a6}", "version": "11.4" } ] }),
        );

        let extensions = ArtifactLoader::new(root).load_extensions().await;
        assert_eq!(extensions.len(), 2);
        assert_eq!(extensions[0].extensions.len(), 2);
        assert_eq!(extensions[0].extensions[0].id, None);
        assert_eq!(extensions[1].extensions[0].version.as_deref(), Some("11.4"));
    }

    #[tokio::test]
    async fn test_bookmarks_from_both_families() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(
            root,
            "results/chromium/chromium_bookmarks.json",
            json!({ "chrome": { "Default": [ { "name": "Bookmarks bar", "type": "folder", "children": [ { "name": "Rust", "type": "url", "url": "https://rust-lang.org" } ] } ] } }),
        );
        write_json(
            root,
            "results/firefox/firefox_bookmarks.json",
            json!({ "abcd.default": [ { "title": "MDN", "url": "https://developer.mozilla.org", "added": "2025-02-02" } ], "efgh.empty": [] }),
        );

        let bookmarks = ArtifactLoader::new(root).load_bookmarks().await;
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(bookmarks[0].url_count(), 1);
        assert_eq!(bookmarks[1].name, adapters::FIREFOX_BOOKMARKS_FOLDER);
        assert_eq!(bookmarks[1].provenance.profile, "abcd.default");
    }

    #[tokio::test]
    async fn test_downloads_and_autofill() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(
            root,
            "results/chromium/chromium_download_history.json",
            json!({ "chrome": { "Default": [ { "target_path": "C:\\setup.exe", "url": "https://x", "state": 1, "total_bytes": 10, "received_bytes": 10 } ] } }),
        );
        write_json(
            root,
            "results/chromium/chromium_autofill.json",
            json!({ "edge": { "Default": [ { "name": "email", "value": "a@b.c", "used_at": 13380000000i64 } ] } }),
        );

        let loader = ArtifactLoader::new(root);
        let downloads = loader.load_downloads().await;
        assert_eq!(downloads.len(), 1);
        assert!(downloads[0].is_complete());

        let autofill = loader.load_autofill().await;
        assert_eq!(autofill.len(), 1);
        assert_eq!(autofill[0].used_at, "13380000000");
        assert_eq!(autofill[0].provenance.browser, "Edge");
    }

    #[tokio::test]
    async fn test_metadata_documents() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(root, "MANIFEST.json", json!({ "case_id": "S_07", "files": [ { "path": "a", "sha256": "00", "size": 1 } ] }));
        write_json(root, "CUSTODY_REPORT.json", json!({ "case_id": "S_07", "custody_chain": [ { "id": 1, "action": "BUNDLE_CREATED" } ] }));
        fs::write(root.join("VERIFICATION_REPORT.json"), b"42").unwrap();

        let loader = ArtifactLoader::new(root);
        assert_eq!(loader.load_case_manifest().await.unwrap().case_id, "S_07");
        assert_eq!(loader.load_custody_report().await.present().unwrap().entries.len(), 1);
        assert!(loader.load_verification_report().await.is_none());
    }

    #[tokio::test]
    async fn test_unusable_custody_report_is_not_absent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let loader = ArtifactLoader::new(root);

        fs::write(root.join("CUSTODY_REPORT.json"), b"{ \"custody_chain\": [").unwrap();
        assert!(matches!(loader.load_custody_report().await, SourceDocument::Unusable(_)));

        write_json(root, "CUSTODY_REPORT.json", json!("not a report"));
        assert!(matches!(loader.load_custody_report().await, SourceDocument::Unusable(_)));
    }

    #[tokio::test]
    async fn test_marker_with_null_collections_loads() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(
            root,
            "VERIFICATION_REPORT.json",
            json!({ "total_files": 2, "verified_files": 2, "failed_files": 0, "failed_file_list": null, "all_files_verified": true, "bundle_hash_verified": true }),
        );
        write_json(root, "MANIFEST.json", json!({ "case_id": "S_07", "files": null }));

        let loader = ArtifactLoader::new(root);
        let report = loader.load_verification_report().await.unwrap();
        assert!(report.is_fully_verified());
        assert!(report.failed_file_list.is_empty());
        assert_eq!(loader.load_case_manifest().await.unwrap().total_files(), 0);
    }
}
