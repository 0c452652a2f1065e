// Common utilities shared by the loader, evaluator and orchestrator

pub mod audit;
pub mod hash;
pub mod json;
pub mod path_security;

// Re-exports for convenience
pub use hash::{hashes_match, read_hash_file, sha256_bytes, sha256_file};
pub use json::{lenient_bool, lenient_i64, lenient_string, lenient_u64, records};

// Shared constants
pub const BUFFER_SIZE: usize = 1024 * 1024; // 1MB read buffer for file hashing
