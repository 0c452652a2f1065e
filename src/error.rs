//! Error types for analysis orchestration, snapshot loading and configuration
//!
//! Only conditions that make an operation impossible are represented here.
//! Unreadable artifact sources are absorbed by the loader, and a compromised
//! bundle is a `Verdict`, not an error.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Result type alias for snapshot loads
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures of `start_analysis`
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The external analysis binary does not exist
    #[error("analysis tool not found at {}", .0.display())]
    ToolNotFound(PathBuf),

    /// The analysis process could not be spawned
    #[error("failed to launch analysis tool: {0}")]
    LaunchFailed(#[source] io::Error),

    /// No completion marker appeared within the analysis window
    #[error("analysis did not complete within {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Another analysis is already writing to this output directory
    #[error("an analysis is already running for {}", .0.display())]
    AlreadyRunning(PathBuf),

    /// The output directory could not be cleared or created
    #[error("failed to prepare output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of `load_snapshot` / `refresh`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Every attempt found no meaningful analysis data
    #[error("no analysis data found after {attempts} attempts")]
    Incomplete { attempts: u32 },
}

/// Failures while reading `lume.json`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
