//! Snapshot load sessions
//!
//! A session loads from the source until the output holds meaningful data
//! or the retry budget runs out. Sessions never overlap: a refresh that
//! arrives while one is running waits for it and shares its outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use super::snapshot::{AnalysisSnapshot, SnapshotSource};
use crate::config::ViewerConfig;
use crate::error::{LoadError, LoadResult};

/// Fixed-delay retry budget for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            delay: config.load_retry_delay(),
            max_retries: config.load_max_retries,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

/// Owner of the current snapshot
pub struct EvidenceAggregator<S> {
    source: S,
    policy: RetryPolicy,
    current: watch::Sender<Arc<AnalysisSnapshot>>,
    /// Held for the duration of a session; keeps the last outcome
    session_gate: Mutex<Option<LoadResult<Arc<AnalysisSnapshot>>>>,
    completed_sessions: AtomicU64,
}

impl<S: SnapshotSource> EvidenceAggregator<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        let (current, _) = watch::channel(Arc::new(AnalysisSnapshot::default()));
        Self {
            source,
            policy,
            current,
            session_gate: Mutex::new(None),
            completed_sessions: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// The last successfully loaded snapshot (empty before the first load)
    pub fn current(&self) -> Arc<AnalysisSnapshot> {
        self.current.borrow().clone()
    }

    /// Receives every snapshot that replaces the current one
    pub fn subscribe(&self) -> watch::Receiver<Arc<AnalysisSnapshot>> {
        self.current.subscribe()
    }

    /// Number of sessions run so far
    pub fn session_count(&self) -> u64 {
        self.completed_sessions.load(Ordering::SeqCst)
    }

    /// The current snapshot, loading it first if nothing has been loaded yet
    pub async fn load_snapshot(&self) -> LoadResult<Arc<AnalysisSnapshot>> {
        let current = self.current();
        if current.loaded_at.is_some() {
            return Ok(current);
        }
        self.refresh().await
    }

    /// Re-run a full session with a fresh retry budget.
    ///
    /// A caller that had to wait for a session started before it arrived
    /// gets that session's outcome instead of starting another one.
    pub async fn refresh(&self) -> LoadResult<Arc<AnalysisSnapshot>> {
        let observed = self.completed_sessions.load(Ordering::SeqCst);
        let mut last_outcome = self.session_gate.lock().await;

        if self.completed_sessions.load(Ordering::SeqCst) != observed {
            if let Some(outcome) = last_outcome.as_ref() {
                debug!("Joined an in-flight load session");
                return outcome.clone();
            }
        }

        let outcome = self.run_session().await;
        *last_outcome = Some(outcome.clone());
        self.completed_sessions.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    #[instrument(skip(self), fields(attempts = self.policy.attempts()))]
    async fn run_session(&self) -> LoadResult<Arc<AnalysisSnapshot>> {
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            let snapshot = self.source.load().await;
            if snapshot.has_meaningful_data() {
                let snapshot = Arc::new(snapshot);
                self.current.send_replace(Arc::clone(&snapshot));
                info!(attempt, "Analysis snapshot loaded");
                return Ok(snapshot);
            }

            if attempt < attempts {
                debug!(attempt, delay_ms = self.policy.delay.as_millis() as u64, "No analysis data yet, retrying");
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        warn!(attempts, "No analysis data found; keeping previous snapshot");
        Err(LoadError::Incomplete { attempts })
    }
}
