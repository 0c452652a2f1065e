//! Normalized browser artifact types
//!
//! Every record carries the `(browser, profile)` pair it was extracted from,
//! whatever shape the source file had.

use serde::Serialize;

/// Which browser and profile a record came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Provenance {
    pub browser: String,
    pub profile: String,
}

impl Provenance {
    /// Build a provenance tag, normalizing the browser name
    pub fn new(browser: &str, profile: impl Into<String>) -> Self {
        Self {
            browser: normalize_browser_name(browser),
            profile: profile.into(),
        }
    }
}

/// Records that know where they came from
pub trait Provenanced {
    fn provenance(&self) -> &Provenance;
}

/// Records of `items` extracted from one browser profile
pub fn for_profile<'a, T: Provenanced>(
    items: &'a [T],
    provenance: &'a Provenance,
) -> impl Iterator<Item = &'a T> + 'a {
    items.iter().filter(move |item| item.provenance() == provenance)
}

/// Canonical display name for a browser directory or key.
///
/// Extractors are inconsistent (`chrome` as a directory, `Chrome` as a key),
/// so everything goes through here.
pub fn normalize_browser_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "chrome" | "google chrome" => "Chrome".to_string(),
        "edge" | "msedge" | "microsoft edge" => "Edge".to_string(),
        "brave" => "Brave".to_string(),
        "opera" => "Opera".to_string(),
        "vivaldi" => "Vivaldi".to_string(),
        "chromium" => "Chromium".to_string(),
        "firefox" | "mozilla firefox" => "Firefox".to_string(),
        _ => {
            let mut chars = trimmed.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => "Unknown".to_string(),
            }
        }
    }
}

macro_rules! impl_provenanced {
    ($($ty:ty),* $(,)?) => {
        $(impl Provenanced for $ty {
            fn provenance(&self) -> &Provenance {
                &self.provenance
            }
        })*
    };
}

impl_provenanced!(
    BrowserProfile,
    HistoryEntry,
    CookieEntry,
    PasswordEntry,
    DownloadEntry,
    AutofillEntry,
    BookmarkEntry,
    ProfileExtensions,
);

/// A browser profile found in the output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BrowserProfile {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
    pub last_visit_time: String,
    pub visit_count: u64,
    #[serde(flatten)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CookieEntry {
    pub host: String,
    pub name: String,
    pub value: String,
    pub path: String,
    pub expiry_date: String,
    pub creation_date: String,
    pub last_access_date: String,
    pub is_secure: bool,
    pub is_http_only: bool,
    #[serde(flatten)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PasswordEntry {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// Chromium download state value for a finished download
pub const DOWNLOAD_STATE_COMPLETE: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadEntry {
    pub target_path: String,
    pub url: String,
    pub start_time: String,
    pub received_bytes: u64,
    pub total_bytes: u64,
    /// Chromium download state; Firefox states are mapped onto it
    pub state: i64,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl DownloadEntry {
    pub fn is_complete(&self) -> bool {
        self.state == DOWNLOAD_STATE_COMPLETE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutofillEntry {
    pub name: String,
    pub value: String,
    pub used_at: String,
    #[serde(flatten)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Installed extensions of one profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileExtensions {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub extensions: Vec<ExtensionEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkKind {
    #[default]
    Url,
    Folder,
}

/// A bookmark or bookmark folder; folders carry their children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookmarkEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub kind: BookmarkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BookmarkEntry>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl BookmarkEntry {
    /// Number of URL bookmarks in this subtree
    pub fn url_count(&self) -> usize {
        let own = usize::from(self.kind == BookmarkKind::Url);
        own + self.children.iter().map(BookmarkEntry::url_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// A node of the output directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub name: String,
    pub kind: FileKind,
    /// File size in bytes; 0 for folders
    pub size: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// Number of files in this subtree
    pub fn file_count(&self) -> usize {
        match self.kind {
            FileKind::File => 1,
            FileKind::Folder => self.children.iter().map(FileNode::file_count).sum(),
        }
    }
}
