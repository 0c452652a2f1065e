//! Path Security Utilities
//!
//! Manifest entries are untrusted input: they must stay inside the output
//! directory when re-verified. The output directory itself is deleted before
//! every run, so it must never be the application root or one of its parents.

use std::path::{Component, Path};
use tracing::warn;

/// Check if a relative path string contains traversal patterns.
///
/// Detects:
/// - `..` components
/// - Absolute path indicators (Unix, UNC, drive letters)
/// - Null bytes
/// - URL-encoded separators and dots
pub fn contains_traversal_pattern(relative: &str) -> bool {
    if relative.contains('\0') {
        return true;
    }

    if relative
        .split(['/', '\\'])
        .any(|component| component == "..")
    {
        return true;
    }

    if relative.starts_with('/') || relative.starts_with('\\') {
        return true;
    }

    let bytes = relative.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }

    let lower = relative.to_lowercase();
    lower.contains("%2e%2e") || lower.contains("%2f") || lower.contains("%5c")
}

/// True if `relative` can be joined onto a base directory without escaping it
pub fn is_safe_relative_path(relative: &str) -> bool {
    if relative.trim().is_empty() || contains_traversal_pattern(relative) {
        return false;
    }
    Path::new(relative)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// True if `output_dir` may be deleted and recreated before an analysis run.
///
/// Refuses the application root, any of its ancestors, and filesystem roots.
pub fn is_removable_output_dir(output_dir: &Path, app_root: &Path) -> bool {
    let output = normalize(output_dir);
    let root = normalize(app_root);

    if output.parent().is_none() || output.as_os_str().is_empty() {
        warn!(target: "security", path = %output_dir.display(), "Refusing to clear a filesystem root");
        return false;
    }
    if root.starts_with(&output) {
        warn!(
            target: "security",
            path = %output_dir.display(),
            app_root = %app_root.display(),
            "Refusing to clear the application root or one of its parents"
        );
        return false;
    }
    true
}

/// Best-effort absolute, `.`-free form of a path without touching the filesystem
pub fn normalize(path: &Path) -> std::path::PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = std::path::PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
