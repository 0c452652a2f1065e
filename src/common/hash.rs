// SHA-256 helpers for evidence re-verification
//
// Manifest entries and detached bundle hash files both carry SHA-256 digests
// as hex strings; comparisons are case-insensitive.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::BUFFER_SIZE;

/// Pre-compiled regex for a SHA-256 hex digest
/// Compiled once on first use via OnceLock
fn sha256_regex() -> Option<&'static Regex> {
    static SHA256_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    SHA256_REGEX
        .get_or_init(|| Regex::new(r"\b[a-fA-F0-9]{64}\b").ok())
        .as_ref()
}

/// Hash in-memory data (one-shot, for small data)
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Stream a file through SHA-256
#[instrument(fields(path = %path.display()))]
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut total = 0u64;

    loop {
        let buf = reader.fill_buf()?;
        let len = buf.len();
        if len == 0 {
            break;
        }
        hasher.update(buf);
        reader.consume(len);
        total += len as u64;
    }

    let hash = hex::encode(hasher.finalize());
    debug!(bytes = total, hash = %hash, "File hash complete");
    Ok(hash)
}

/// Extract the first SHA-256 digest from a detached hash file.
///
/// Accepts bare digests as well as `sha256sum`-style `<digest>  <name>` lines.
pub fn read_hash_file(path: &Path) -> io::Result<Option<String>> {
    let regex = sha256_regex()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "SHA-256 pattern failed to compile"))?;
    let content = std::fs::read_to_string(path)?;
    Ok(regex
        .find(&content)
        .map(|m| m.as_str().to_lowercase()))
}

/// Compare two hex digests (case-insensitive, surrounding whitespace ignored).
/// Empty or non-hex values never match.
pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
    let (a, b) = (hash1.trim(), hash2.trim());
    !a.is_empty()
        && a.chars().all(|c| c.is_ascii_hexdigit())
        && a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_bytes() {
        assert_eq!(sha256_bytes(b"hello world"), HELLO_SHA256);
    }

    #[test]
    fn test_sha256_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("evidence.bin");
        fs::write(&path, b"hello world").unwrap();

        assert_eq!(sha256_file(&path).unwrap(), HELLO_SHA256);
        assert!(sha256_file(&temp_dir.path().join("missing.bin")).is_err());
    }

    #[test]
    fn test_read_hash_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bundle.sha256");
        fs::write(&path, format!("{}  bundle.enc\n", HELLO_SHA256.to_uppercase())).unwrap();
        assert_eq!(read_hash_file(&path).unwrap().as_deref(), Some(HELLO_SHA256));

        fs::write(&path, "no digest in here").unwrap();
        assert_eq!(read_hash_file(&path).unwrap(), None);
    }

    #[test]
    fn test_sha256_pattern_compiles_once() {
        let first = sha256_regex().unwrap();
        assert!(std::ptr::eq(first, sha256_regex().unwrap()));
        assert!(first.is_match(HELLO_SHA256));
    }

    #[test]
    fn test_hashes_match() {
        assert!(hashes_match(HELLO_SHA256, &HELLO_SHA256.to_uppercase()));
        assert!(hashes_match(&format!(" {} ", HELLO_SHA256), HELLO_SHA256));
        assert!(!hashes_match(HELLO_SHA256, "deadbeef"));
        assert!(!hashes_match("", ""));
        assert!(!hashes_match("zz", "zz"));
    }
}
