//! Lume Viewer core
//!
//! Runs the external analysis tool against an encrypted evidence bundle,
//! loads what it produced, and decides whether the bundle's custody chain
//! can be trusted.

pub mod aggregator;
pub mod artifacts;
pub mod common;
pub mod config;
pub mod custody;
pub mod error;
pub mod evidence;
pub mod logging;
pub mod orchestrator;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use aggregator::{AnalysisSnapshot, EvidenceAggregator, OutputDirSource, RetryPolicy, SnapshotSource};
use config::ViewerConfig;
use error::{AnalysisResult, LoadResult};
use evidence::{BundleFiles, VerificationReport};
use orchestrator::{AnalysisCompletion, AnalysisOrchestrator, OrchestratorConfig, ProcessLauncher, ToolLauncher};

/// One orchestrator and one aggregator sharing an output directory
pub struct AnalysisService<L = ProcessLauncher, S = OutputDirSource> {
    orchestrator: AnalysisOrchestrator<L>,
    aggregator: EvidenceAggregator<S>,
}

impl AnalysisService {
    pub fn new(config: &ViewerConfig) -> Self {
        Self::with_launcher(config, ProcessLauncher)
    }
}

impl<L: ToolLauncher> AnalysisService<L, OutputDirSource> {
    pub fn with_launcher(config: &ViewerConfig, launcher: L) -> Self {
        let orchestrator_config = OrchestratorConfig::from_viewer_config(config);
        let source = OutputDirSource::new(&orchestrator_config.output_dir);
        Self {
            orchestrator: AnalysisOrchestrator::new(orchestrator_config, launcher),
            aggregator: EvidenceAggregator::new(source, RetryPolicy::from_config(config)),
        }
    }
}

impl<L: ToolLauncher, S: SnapshotSource> AnalysisService<L, S> {
    pub fn orchestrator(&self) -> &AnalysisOrchestrator<L> {
        &self.orchestrator
    }

    pub fn aggregator(&self) -> &EvidenceAggregator<S> {
        &self.aggregator
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AnalysisSnapshot>> {
        self.aggregator.subscribe()
    }

    /// Run the analysis tool, then reload the snapshot from its output.
    ///
    /// A failed reload after a completed run is logged, not returned; the
    /// caller can `refresh` later.
    pub async fn start_analysis(&self, bundle: &Path, hash_file: &Path) -> AnalysisResult<AnalysisCompletion> {
        let completion = self.orchestrator.start_analysis(bundle, hash_file).await?;
        match self.aggregator.refresh().await {
            Ok(snapshot) => info!(
                verdict = snapshot.integrity.verdict.as_str(),
                "Snapshot reloaded after analysis"
            ),
            Err(e) => warn!("Analysis completed but its output could not be loaded: {}", e),
        }
        Ok(completion)
    }

    pub async fn load_snapshot(&self) -> LoadResult<Arc<AnalysisSnapshot>> {
        self.aggregator.load_snapshot().await
    }

    pub async fn refresh(&self) -> LoadResult<Arc<AnalysisSnapshot>> {
        self.aggregator.refresh().await
    }

    /// Re-hash the output against the loaded manifest.
    /// `None` when no manifest has been loaded.
    pub async fn reverify(&self, bundle: Option<BundleFiles>) -> Option<VerificationReport> {
        let snapshot = self.aggregator.current();
        let manifest = snapshot.case_manifest.as_ref()?;
        Some(evidence::reverify_output(&self.orchestrator.config().output_dir, manifest, bundle).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::hash::sha256_bytes;
    use crate::custody::Verdict;
    use crate::error::AnalysisError;
    use crate::orchestrator::ToolInvocation;
    use std::io;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Writes a complete, verifiable output as soon as it is launched
    struct InstantTool {
        output_dir: PathBuf,
    }

    impl ToolLauncher for InstantTool {
        fn launch(&self, _invocation: &ToolInvocation) -> io::Result<()> {
            let history = br#"{"abcd.default": [{"title": "MDN", "url": "https://developer.mozilla.org", "visit_time": "2025-12-01", "visit_count": 1}]}"#;
            std::fs::create_dir_all(self.output_dir.join("results/firefox"))?;
            std::fs::write(self.output_dir.join("results/firefox/firefox_history.json"), history)?;

            let manifest = serde_json::json!({
                "case_id": "S_07",
                "case_name": "test",
                "investigator": "examiner",
                "created_utc": "2025-12-06 10:22:49 UTC",
                "files": [ { "path": "results/firefox/firefox_history.json", "sha256": sha256_bytes(history), "size": history.len() } ]
            });
            std::fs::write(self.output_dir.join("MANIFEST.json"), manifest.to_string())?;

            let report = serde_json::json!({
                "total_files": 1, "verified_files": 1, "failed_files": 0, "failed_file_list": [],
                "all_files_verified": true, "bundle_hash_verified": true,
                "verification_timestamp": "2025-12-06 10:23:00 UTC"
            });
            std::fs::write(self.output_dir.join("VERIFICATION_REPORT.json"), report.to_string())
        }
    }

    fn test_config(root: &Path) -> ViewerConfig {
        let config = ViewerConfig {
            settle_delay_ms: 10,
            poll_interval_ms: 10,
            load_retry_delay_ms: 10,
            load_max_retries: 1,
            analysis_timeout_secs: 5,
            ..ViewerConfig::for_app_root(root)
        };
        std::fs::write(config.resolved_tool_path(), b"").unwrap();
        config
    }

    #[tokio::test]
    async fn test_analysis_then_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let service = AnalysisService::with_launcher(
            &config,
            InstantTool { output_dir: config.resolved_output_dir() },
        );

        let completion = service
            .start_analysis(Path::new("case.lume"), Path::new("case.sha256"))
            .await
            .unwrap();
        assert!(completion.report.all_files_verified);

        let snapshot = service.load_snapshot().await.unwrap();
        assert_eq!(snapshot.case_manifest.as_ref().unwrap().case_id, "S_07");
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.profiles.len(), 1);
        assert_eq!(snapshot.integrity.verdict, Verdict::Verified);

        let report = service.reverify(None).await.unwrap();
        assert!(report.all_files_verified);
        assert!(!report.bundle_hash_verified);
    }

    #[tokio::test]
    async fn test_missing_tool_leaves_snapshot_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let config = ViewerConfig::for_app_root(temp_dir.path());
        let service = AnalysisService::new(&config);

        let err = service
            .start_analysis(Path::new("case.lume"), Path::new("case.sha256"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ToolNotFound(_)));
        assert!(service.aggregator().current().loaded_at.is_none());
        assert!(service.reverify(None).await.is_none());
    }
}
