//! Logging and tracing configuration for Lume Viewer
//!
//! This module provides structured logging using the `tracing` crate.
//!
//! # Log Levels
//!
//! - `error` - Errors that prevent an analysis or load from completing
//! - `warn`  - Unreadable artifact sources, compromised bundles
//! - `info`  - Analysis runs, snapshot loads, audit records (default in release)
//! - `debug` - Retry attempts, state transitions (default in debug builds)
//! - `trace` - Per-source and per-record details
//!
//! # Environment Variable Control
//!
//! Set `RUST_LOG` to control log levels at runtime:
//! ```bash
//! RUST_LOG=debug ./lume-viewer                          # All debug logs
//! RUST_LOG=lume_viewer_lib::orchestrator=trace ./lume-viewer
//! RUST_LOG=forensic_audit=info,warn ./lume-viewer       # Audit trail only
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging/tracing system
///
/// Call this once at application startup (in main.rs)
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true) // Show module path
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    // Ignore the error if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Initialize logging with verbose output (file:line, thread IDs)
/// Useful for debugging completion detection against a real tool
pub fn init_verbose() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .pretty(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Default filter: debug in debug builds, info in release.
/// The forensic audit target is always kept at info.
fn default_filter() -> EnvFilter {
    if cfg!(debug_assertions) {
        EnvFilter::new("lume_viewer=debug,lume_viewer_lib=debug,forensic_audit=info")
    } else {
        EnvFilter::new("lume_viewer=info,lume_viewer_lib=info,forensic_audit=info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};

    #[test]
    fn test_init() {
        init();
        info!("Test log message");
        debug!(key = "value", "Structured log");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init_verbose();
    }
}
