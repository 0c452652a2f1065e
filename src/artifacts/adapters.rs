//! Source-shape adapters
//!
//! One raw record type and one adapter function per extractor output shape.
//! Each adapter maps its record onto the canonical entry type; the layout
//! walkers at the bottom attach provenance from the file's nesting.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::*;
use crate::common::json::{
    lenient_bool, lenient_i64, lenient_opt_i64, lenient_opt_string, lenient_string, lenient_u64,
    lenient_vec, records,
};

// =============================================================================
// Profiles
// =============================================================================

/// `chromium_profiles.json` element
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumProfile {
    #[serde(deserialize_with = "lenient_string")]
    pub browser: String,
    #[serde(deserialize_with = "lenient_string")]
    pub profile_dir: String,
    #[serde(deserialize_with = "lenient_string")]
    pub display_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
}

pub fn chromium_profile(raw: RawChromiumProfile) -> BrowserProfile {
    BrowserProfile {
        provenance: Provenance::new(&raw.browser, raw.profile_dir),
        display_name: raw.display_name,
        email: raw.email,
    }
}

/// Firefox profiles are only known by their directory key (`abcd1234.default-release`)
pub fn firefox_profile(profile_key: &str) -> BrowserProfile {
    BrowserProfile {
        provenance: Provenance::new(FIREFOX, profile_key),
        display_name: firefox_display_name(profile_key),
        email: String::new(),
    }
}

/// `abcd1234.default-release` -> `default-release`; the last dotted segment wins
pub fn firefox_display_name(profile_key: &str) -> String {
    profile_key
        .rsplit_once('.')
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
        .unwrap_or(profile_key)
        .to_string()
}

// =============================================================================
// History
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumHistory {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_visit_time: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub visit_count: u64,
}

pub fn chromium_history(provenance: Provenance, raw: RawChromiumHistory) -> HistoryEntry {
    HistoryEntry {
        title: raw.title,
        url: raw.url,
        last_visit_time: raw.last_visit_time,
        visit_count: raw.visit_count,
        provenance,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirefoxHistory {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub visit_time: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub visit_count: u64,
}

pub fn firefox_history(provenance: Provenance, raw: RawFirefoxHistory) -> HistoryEntry {
    HistoryEntry {
        title: raw.title,
        url: raw.url,
        last_visit_time: raw.visit_time,
        visit_count: raw.visit_count,
        provenance,
    }
}

// =============================================================================
// Downloads
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumDownload {
    #[serde(deserialize_with = "lenient_string")]
    pub target_path: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_time: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub received_bytes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total_bytes: u64,
    #[serde(deserialize_with = "lenient_i64")]
    pub state: i64,
}

pub fn chromium_download(provenance: Provenance, raw: RawChromiumDownload) -> DownloadEntry {
    DownloadEntry {
        target_path: raw.target_path,
        url: raw.url,
        start_time: raw.start_time,
        received_bytes: raw.received_bytes,
        total_bytes: raw.total_bytes,
        state: raw.state,
        provenance,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirefoxDownload {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(deserialize_with = "lenient_string")]
    pub target: String,
    #[serde(deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_time: String,
}

/// Firefox records neither byte counts nor numeric states
pub fn firefox_download(provenance: Provenance, raw: RawFirefoxDownload) -> DownloadEntry {
    let target_path = if raw.target.is_empty() { raw.name } else { raw.target };
    let state = if raw.state.eq_ignore_ascii_case("completed") {
        DOWNLOAD_STATE_COMPLETE
    } else {
        0
    };
    DownloadEntry {
        target_path,
        url: raw.source,
        start_time: raw.start_time,
        received_bytes: 0,
        total_bytes: 0,
        state,
        provenance,
    }
}

// =============================================================================
// Cookies
// =============================================================================

/// Element of `cookies_by_host` in a per-profile chromium `cookies.json`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumCookie {
    #[serde(deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(deserialize_with = "lenient_string")]
    pub expiry_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub creation_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_access_date: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_secure: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_httponly: bool,
}

pub fn chromium_cookie(provenance: Provenance, raw: RawChromiumCookie) -> CookieEntry {
    CookieEntry {
        host: raw.host,
        name: raw.name,
        value: raw.value,
        path: raw.path,
        expiry_date: raw.expiry_date,
        creation_date: raw.creation_date,
        last_access_date: raw.last_access_date,
        is_secure: raw.is_secure,
        is_http_only: raw.is_httponly,
        provenance,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirefoxCookie {
    #[serde(deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(deserialize_with = "lenient_string")]
    pub expiry: String,
    #[serde(deserialize_with = "lenient_string")]
    pub creation_time: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_access: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_secure: bool,
}

/// Firefox does not export the HttpOnly flag
pub fn firefox_cookie(provenance: Provenance, raw: RawFirefoxCookie) -> CookieEntry {
    CookieEntry {
        host: raw.host,
        name: raw.name,
        value: raw.value,
        path: raw.path,
        expiry_date: raw.expiry,
        creation_date: raw.creation_time,
        last_access_date: raw.last_access,
        is_secure: raw.is_secure,
        is_http_only: false,
        provenance,
    }
}

/// Flatten `{ "cookies_by_host": { host: [cookie] } }`
pub fn chromium_cookie_file(provenance: &Provenance, value: Value) -> Vec<CookieEntry> {
    let Value::Object(mut file) = value else {
        return Vec::new();
    };
    let Some(Value::Object(by_host)) = file.remove("cookies_by_host") else {
        return Vec::new();
    };
    by_host
        .into_iter()
        .flat_map(|(_, cookies)| records::<RawChromiumCookie>(cookies))
        .map(|raw| chromium_cookie(provenance.clone(), raw))
        .collect()
}

// =============================================================================
// Passwords
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumPassword {
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
}

pub fn chromium_password(provenance: Provenance, raw: RawChromiumPassword) -> PasswordEntry {
    PasswordEntry {
        url: raw.url,
        username: raw.username,
        password: raw.password,
        provenance,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirefoxPassword {
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub user: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
}

pub fn firefox_password(provenance: Provenance, raw: RawFirefoxPassword) -> PasswordEntry {
    PasswordEntry {
        url: raw.url,
        username: raw.user,
        password: raw.password,
        provenance,
    }
}

// =============================================================================
// Autofill
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumAutofill {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(deserialize_with = "lenient_string")]
    pub used_at: String,
}

pub fn chromium_autofill(provenance: Provenance, raw: RawChromiumAutofill) -> AutofillEntry {
    AutofillEntry {
        name: raw.name,
        value: raw.value,
        used_at: raw.used_at,
        provenance,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirefoxFormHistory {
    #[serde(deserialize_with = "lenient_string")]
    pub field_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_used: String,
}

pub fn firefox_autofill(provenance: Provenance, raw: RawFirefoxFormHistory) -> AutofillEntry {
    AutofillEntry {
        name: raw.field_name,
        value: raw.value,
        used_at: raw.last_used,
        provenance,
    }
}

// =============================================================================
// Extensions
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawExtension {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub version: Option<String>,
}

/// Chromium exports only names; Firefox adds id and version
pub fn extension(raw: RawExtension) -> ExtensionEntry {
    ExtensionEntry {
        name: raw.name,
        id: raw.id.filter(|id| !id.is_empty()),
        version: raw.version.filter(|v| !v.is_empty()),
    }
}

// =============================================================================
// Bookmarks
// =============================================================================

/// Chromium bookmark tree node
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawChromiumBookmark {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub url: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub date_added: Option<String>,
    /// A malformed child is dropped on its own
    #[serde(deserialize_with = "lenient_vec")]
    pub children: Vec<RawChromiumBookmark>,
}

pub fn chromium_bookmark(provenance: &Provenance, raw: RawChromiumBookmark) -> BookmarkEntry {
    let kind = if raw.kind.eq_ignore_ascii_case("folder") || (raw.url.is_none() && !raw.children.is_empty()) {
        BookmarkKind::Folder
    } else {
        BookmarkKind::Url
    };
    BookmarkEntry {
        name: raw.name,
        url: raw.url,
        kind,
        date_added: raw.date_added,
        children: raw
            .children
            .into_iter()
            .map(|child| chromium_bookmark(provenance, child))
            .collect(),
        provenance: provenance.clone(),
    }
}

/// Flat Firefox bookmark record
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirefoxBookmark {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub added: String,
    #[serde(deserialize_with = "lenient_opt_i64")]
    pub folder_id: Option<i64>,
}

pub fn firefox_bookmark(provenance: &Provenance, raw: RawFirefoxBookmark) -> BookmarkEntry {
    let kind = if raw.url.is_some() { BookmarkKind::Url } else { BookmarkKind::Folder };
    BookmarkEntry {
        name: raw.title,
        url: raw.url,
        kind,
        date_added: Some(raw.added).filter(|added| !added.is_empty()),
        children: Vec::new(),
        provenance: provenance.clone(),
    }
}

/// Folder name the flat Firefox bookmarks of a profile are grouped under
pub const FIREFOX_BOOKMARKS_FOLDER: &str = "Firefox Bookmarks";

/// Group a profile's flat Firefox bookmarks under one folder node
pub fn firefox_bookmark_folder(provenance: Provenance, bookmarks: Vec<RawFirefoxBookmark>) -> Option<BookmarkEntry> {
    if bookmarks.is_empty() {
        return None;
    }
    let children = bookmarks
        .into_iter()
        .map(|raw| firefox_bookmark(&provenance, raw))
        .collect();
    Some(BookmarkEntry {
        name: FIREFOX_BOOKMARKS_FOLDER.to_string(),
        url: None,
        kind: BookmarkKind::Folder,
        date_added: None,
        children,
        provenance,
    })
}

// =============================================================================
// Layout walkers
// =============================================================================

/// Browser name used for every Firefox record
pub const FIREFOX: &str = "Firefox";

/// Walk a `browser -> profile -> [record]` file
pub fn browser_profile_records<T: serde::de::DeserializeOwned>(value: Value) -> Vec<(Provenance, T)> {
    let Value::Object(browsers) = value else {
        return Vec::new();
    };
    browsers
        .into_iter()
        .flat_map(|(browser, profiles)| match profiles {
            Value::Object(profiles) => profile_map_records(&browser, profiles),
            _ => Vec::new(),
        })
        .collect()
}

/// Walk a `profile -> [record]` file for a single browser
pub fn profile_records<T: serde::de::DeserializeOwned>(browser: &str, value: Value) -> Vec<(Provenance, T)> {
    match value {
        Value::Object(profiles) => profile_map_records(browser, profiles),
        _ => Vec::new(),
    }
}

fn profile_map_records<T: serde::de::DeserializeOwned>(browser: &str, profiles: Map<String, Value>) -> Vec<(Provenance, T)> {
    profiles
        .into_iter()
        .flat_map(|(profile, items)| {
            let provenance = Provenance::new(browser, profile);
            records::<T>(items)
                .into_iter()
                .map(move |record| (provenance.clone(), record))
        })
        .collect()
}

/// Walk Firefox autofill: `profile -> { form_history: [record] }`
pub fn firefox_form_history(value: Value) -> Vec<(Provenance, RawFirefoxFormHistory)> {
    let Value::Object(profiles) = value else {
        return Vec::new();
    };
    profiles
        .into_iter()
        .flat_map(|(profile, data)| {
            let provenance = Provenance::new(FIREFOX, profile);
            let history = match data {
                Value::Object(mut fields) => fields.remove("form_history").unwrap_or(Value::Null),
                _ => Value::Null,
            };
            records::<RawFirefoxFormHistory>(history)
                .into_iter()
                .map(move |record| (provenance.clone(), record))
        })
        .collect()
}

/// Top-level keys of an object-shaped file (profile names for Firefox files)
pub fn object_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}
