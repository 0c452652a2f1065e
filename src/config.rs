//! Viewer configuration
//!
//! Settings are read from an optional `lume.json` in the application root and
//! can be overridden with environment variables:
//! - `LUME_APP_ROOT` - working directory for the analysis tool
//! - `LUME_TOOL_PATH` - path to the analysis executable
//! - `LUME_OUTPUT_DIR` - directory the tool writes its results to

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};

/// Config file name, looked up in the application root
pub const CONFIG_FILE: &str = "lume.json";

/// Default output directory name, relative to the application root
pub const DEFAULT_OUTPUT_DIR: &str = "analyzed";

/// Default analysis executable name
#[cfg(windows)]
pub const DEFAULT_TOOL_NAME: &str = "LumeViewer.exe";
#[cfg(not(windows))]
pub const DEFAULT_TOOL_NAME: &str = "LumeViewer";

pub const ENV_APP_ROOT: &str = "LUME_APP_ROOT";
pub const ENV_TOOL_PATH: &str = "LUME_TOOL_PATH";
pub const ENV_OUTPUT_DIR: &str = "LUME_OUTPUT_DIR";

/// Runtime settings for the orchestrator and aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Working directory the analysis tool is started in
    pub app_root: PathBuf,
    /// Analysis executable; defaults to `<app_root>/LumeViewer[.exe]`
    pub tool_path: Option<PathBuf>,
    /// Output directory; relative paths resolve against `app_root`
    pub output_dir: PathBuf,
    /// Wall-clock window for the completion marker to appear
    pub analysis_timeout_secs: u64,
    /// Delay between seeing the marker and parsing it
    pub settle_delay_ms: u64,
    /// Fallback poll interval while watching the output directory
    pub poll_interval_ms: u64,
    /// Backoff between snapshot load attempts
    pub load_retry_delay_ms: u64,
    /// Retries after the first load attempt finds no data
    pub load_max_retries: u32,
    /// Start the tool in its own console window (Windows only)
    pub open_new_console: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            app_root: PathBuf::from("."),
            tool_path: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            analysis_timeout_secs: 300,
            settle_delay_ms: 1_000,
            poll_interval_ms: 500,
            load_retry_delay_ms: 1_500,
            load_max_retries: 5,
            open_new_console: true,
        }
    }
}

impl ViewerConfig {
    /// Default configuration rooted at `app_root`
    pub fn for_app_root(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            ..Self::default()
        }
    }

    /// Load a config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `<app_root>/lume.json` if present, then apply environment overrides
    pub fn load_or_default(app_root: &Path) -> ConfigResult<Self> {
        let path = app_root.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            let mut config = Self::load(&path)?;
            if config.app_root.is_relative() {
                config.app_root = app_root.join(&config.app_root);
            }
            config
        } else {
            debug!("No {} in {}, using defaults", CONFIG_FILE, app_root.display());
            Self::for_app_root(app_root)
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_APP_ROOT).filter(|v| !v.is_empty()) {
            self.app_root = PathBuf::from(root);
        }
        if let Some(tool) = lookup(ENV_TOOL_PATH).filter(|v| !v.is_empty()) {
            self.tool_path = Some(PathBuf::from(tool));
        }
        if let Some(output) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(output);
        }
    }

    /// Absolute-or-app-root-relative path of the analysis executable
    pub fn resolved_tool_path(&self) -> PathBuf {
        match &self.tool_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.app_root.join(path),
            None => self.app_root.join(DEFAULT_TOOL_NAME),
        }
    }

    /// Output directory resolved against the application root
    pub fn resolved_output_dir(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.app_root.join(&self.output_dir)
        }
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would make the watch loop spin
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn load_retry_delay(&self) -> Duration {
        Duration::from_millis(self.load_retry_delay_ms)
    }
}
