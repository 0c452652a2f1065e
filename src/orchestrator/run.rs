//! Analysis orchestrator
//!
//! Drives one run of the external analysis tool: launch, watch the output
//! directory for the completion marker, settle, parse. The deadline is the
//! only way a run is cancelled.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::launcher::ToolLauncher;
use super::types::{AnalysisCompletion, OrchestratorConfig, RunSignal, RunState, ToolInvocation};
use super::watch::MarkerWatch;
use crate::common::audit::{self, AnalysisAuditContext};
use crate::common::path_security::{is_removable_output_dir, normalize};
use crate::error::{AnalysisError, AnalysisResult};
use crate::evidence::{VerificationReport, VERIFICATION_REPORT_FILE};

// =============================================================================
// Output directory leases
// =============================================================================

/// Output directories with a run in progress, across all orchestrators
fn active_outputs() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive claim on an output directory for the duration of a run.
/// Keyed on the normalized path so `analyzed` and `./analyzed` collide.
struct OutputLease {
    path: PathBuf,
}

impl OutputLease {
    fn acquire(path: &Path) -> Option<Self> {
        let key = normalize(path);
        let mut active = active_outputs().lock().unwrap_or_else(|e| e.into_inner());
        if active.insert(key.clone()) {
            Some(Self { path: key })
        } else {
            None
        }
    }
}

impl Drop for OutputLease {
    fn drop(&mut self) {
        let mut active = active_outputs().lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.path);
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct AnalysisOrchestrator<L> {
    config: OrchestratorConfig,
    launcher: L,
    state: watch::Sender<RunState>,
    live_watches: Arc<AtomicUsize>,
}

impl<L: ToolLauncher> AnalysisOrchestrator<L> {
    pub fn new(config: OrchestratorConfig, launcher: L) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            config,
            launcher,
            state,
            live_watches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// State of the current or most recent run
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Output directory watches currently held by runs
    pub fn live_watches(&self) -> usize {
        self.live_watches.load(Ordering::SeqCst)
    }

    fn signal(&self, signal: RunSignal) -> RunState {
        let mut next = RunState::Idle;
        self.state.send_modify(|state| {
            *state = state.next(signal);
            next = *state;
        });
        debug!(?signal, state = %next, "Run state");
        next
    }

    /// Run the analysis tool on `bundle` and wait for its output.
    ///
    /// The output directory is cleared first. Only one run per output
    /// directory may be in progress; a second request gets `AlreadyRunning`.
    #[instrument(skip(self), fields(output = %self.config.output_dir.display()))]
    pub async fn start_analysis(&self, bundle: &Path, hash_file: &Path) -> AnalysisResult<AnalysisCompletion> {
        let output_dir = self.config.output_dir.clone();
        let _lease = OutputLease::acquire(&output_dir)
            .ok_or_else(|| AnalysisError::AlreadyRunning(output_dir.clone()))?;

        let run_id = Uuid::new_v4();
        let audit_ctx = AnalysisAuditContext::new(run_id, bundle);

        self.state.send_replace(RunState::Idle);
        self.signal(RunSignal::Launch);

        if !self.config.tool_path.is_file() {
            self.signal(RunSignal::ToolMissing);
            audit_ctx.log_outcome(RunState::ToolNotFound.as_str(), &self.config.tool_path.display().to_string());
            return Err(AnalysisError::ToolNotFound(self.config.tool_path.clone()));
        }

        if let Err(e) = self.prepare_output_dir().await {
            self.signal(RunSignal::SpawnFailed);
            audit_ctx.log_outcome(RunState::LaunchFailed.as_str(), &e.to_string());
            return Err(e);
        }

        let mut watch = MarkerWatch::start(
            &output_dir,
            VERIFICATION_REPORT_FILE,
            self.config.poll_interval,
            Arc::clone(&self.live_watches),
        );

        let invocation = ToolInvocation::analyze(&self.config, bundle, hash_file);
        let started = Instant::now();
        if let Err(e) = self.launcher.launch(&invocation) {
            self.signal(RunSignal::SpawnFailed);
            audit_ctx.log_outcome(RunState::LaunchFailed.as_str(), &e.to_string());
            return Err(AnalysisError::LaunchFailed(e));
        }
        self.signal(RunSignal::Spawned);
        audit::log_analysis_launched(run_id, &invocation.program, bundle, hash_file);

        let deadline = sleep(self.config.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => return Err(self.timed_out(&audit_ctx)),
                _ = watch.marker_seen() => {}
            }
            self.signal(RunSignal::MarkerSeen);

            tokio::select! {
                biased;
                _ = &mut deadline => return Err(self.timed_out(&audit_ctx)),
                _ = sleep(self.config.settle_delay) => {}
            }

            match read_marker(watch.marker_path()).await {
                Some(report) => {
                    self.signal(RunSignal::MarkerConfirmed);
                    let elapsed = started.elapsed();
                    info!(%run_id, elapsed_ms = elapsed.as_millis() as u64, "Analysis completed");
                    audit_ctx.log_outcome(RunState::Completed.as_str(), &format!("{} files", report.total_files));
                    return Ok(AnalysisCompletion {
                        run_id,
                        output_dir,
                        report,
                        elapsed,
                    });
                }
                None => {
                    self.signal(RunSignal::MarkerUnreadable);
                }
            }
        }
    }

    fn timed_out(&self, audit_ctx: &AnalysisAuditContext) -> AnalysisError {
        self.signal(RunSignal::Deadline);
        warn!(timeout_secs = self.config.timeout.as_secs(), "Analysis timed out");
        audit_ctx.log_outcome(RunState::TimedOut.as_str(), "no completion marker");
        AnalysisError::TimedOut(self.config.timeout)
    }

    /// Remove the previous run's output and recreate an empty directory
    async fn prepare_output_dir(&self) -> AnalysisResult<()> {
        let output_dir = &self.config.output_dir;
        let output_err = |source| AnalysisError::OutputDir {
            path: output_dir.clone(),
            source,
        };

        if !is_removable_output_dir(output_dir, &self.config.app_root) {
            return Err(output_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "refusing to clear this directory",
            )));
        }

        match tokio::fs::remove_dir_all(output_dir).await {
            Ok(()) => audit::log_output_cleared(output_dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(output_err(e)),
        }
        tokio::fs::create_dir_all(output_dir).await.map_err(output_err)
    }
}

/// Parse the completion marker; `None` while it is incomplete or invalid
async fn read_marker(path: &Path) -> Option<VerificationReport> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(report) => Some(report),
        Err(e) => {
            debug!(path = %path.display(), "Completion marker not parseable yet: {}", e);
            None
        }
    }
}
