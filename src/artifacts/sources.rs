//! Known artifact source locations, relative to the analysis output directory

use std::path::{Path, PathBuf};

/// Chromium-family extractor output
pub const CHROMIUM_DIR: &str = "results/chromium";

/// Firefox extractor output
pub const FIREFOX_DIR: &str = "results/firefox";

/// Per-profile chromium files, found under `CHROMIUM_DIR/<browser>/<profile>/`
pub const PROFILE_COOKIES_FILE: &str = "cookies.json";
pub const PROFILE_PASSWORDS_FILE: &str = "passwords.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserFamily {
    Chromium,
    Firefox,
}

impl BrowserFamily {
    pub fn dir(self) -> &'static str {
        match self {
            BrowserFamily::Chromium => CHROMIUM_DIR,
            BrowserFamily::Firefox => FIREFOX_DIR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Profiles,
    History,
    Downloads,
    Cookies,
    Passwords,
    Autofill,
    Extensions,
    Bookmarks,
}

/// One fixed source file: which kind it holds, for which family, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSource {
    pub kind: ArtifactKind,
    pub family: BrowserFamily,
    pub file_name: &'static str,
}

impl ArtifactSource {
    const fn new(kind: ArtifactKind, family: BrowserFamily, file_name: &'static str) -> Self {
        Self { kind, family, file_name }
    }

    /// Location of this source under `root`
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(self.family.dir()).join(self.file_name)
    }
}

use ArtifactKind as K;
use BrowserFamily as F;

pub const CHROMIUM_PROFILES: ArtifactSource = ArtifactSource::new(K::Profiles, F::Chromium, "chromium_profiles.json");
pub const CHROMIUM_HISTORY: ArtifactSource = ArtifactSource::new(K::History, F::Chromium, "chromium_history.json");
pub const CHROMIUM_DOWNLOADS: ArtifactSource = ArtifactSource::new(K::Downloads, F::Chromium, "chromium_download_history.json");
pub const CHROMIUM_AUTOFILL: ArtifactSource = ArtifactSource::new(K::Autofill, F::Chromium, "chromium_autofill.json");
pub const CHROMIUM_EXTENSIONS: ArtifactSource = ArtifactSource::new(K::Extensions, F::Chromium, "chromium_extensions.json");
pub const CHROMIUM_BOOKMARKS: ArtifactSource = ArtifactSource::new(K::Bookmarks, F::Chromium, "chromium_bookmarks.json");

pub const FIREFOX_HISTORY: ArtifactSource = ArtifactSource::new(K::History, F::Firefox, "firefox_history.json");
pub const FIREFOX_DOWNLOADS: ArtifactSource = ArtifactSource::new(K::Downloads, F::Firefox, "firefox_downloads.json");
pub const FIREFOX_COOKIES: ArtifactSource = ArtifactSource::new(K::Cookies, F::Firefox, "firefox_cookies.json");
pub const FIREFOX_PASSWORDS: ArtifactSource = ArtifactSource::new(K::Passwords, F::Firefox, "firefox_passwords.json");
pub const FIREFOX_AUTOFILL: ArtifactSource = ArtifactSource::new(K::Autofill, F::Firefox, "firefox_autofill.json");
pub const FIREFOX_EXTENSIONS: ArtifactSource = ArtifactSource::new(K::Extensions, F::Firefox, "firefox_extensions.json");
pub const FIREFOX_BOOKMARKS: ArtifactSource = ArtifactSource::new(K::Bookmarks, F::Firefox, "firefox_bookmarks.json");

/// Every fixed-path source. Per-profile chromium cookies and passwords are
/// discovered at load time and are not listed here.
pub const ALL_SOURCES: &[ArtifactSource] = &[
    CHROMIUM_PROFILES,
    CHROMIUM_HISTORY,
    CHROMIUM_DOWNLOADS,
    CHROMIUM_AUTOFILL,
    CHROMIUM_EXTENSIONS,
    CHROMIUM_BOOKMARKS,
    FIREFOX_HISTORY,
    FIREFOX_DOWNLOADS,
    FIREFOX_COOKIES,
    FIREFOX_PASSWORDS,
    FIREFOX_AUTOFILL,
    FIREFOX_EXTENSIONS,
    FIREFOX_BOOKMARKS,
];
