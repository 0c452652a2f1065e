//! Completion marker watch
//!
//! Filesystem notifications on the output directory, backed by a periodic
//! existence check for platforms or filesystems where notifications are
//! unreliable. Dropping the watch releases the watcher and the timer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

pub struct MarkerWatch {
    marker: PathBuf,
    _watcher: Option<RecommendedWatcher>,
    events: Option<UnboundedReceiver<()>>,
    ticker: Interval,
    live: Arc<AtomicUsize>,
}

enum Wake {
    Event(bool),
    Tick,
}

impl MarkerWatch {
    /// Watch `dir` for `marker_name`. `live` counts watches not yet dropped.
    pub fn start(dir: &Path, marker_name: &str, poll_interval: Duration, live: Arc<AtomicUsize>) -> Self {
        let marker = dir.join(marker_name);
        let (watcher, events) = match start_watcher(dir, marker_name) {
            Ok((watcher, events)) => (Some(watcher), Some(events)),
            Err(e) => {
                warn!(path = %dir.display(), "Filesystem watch unavailable, polling only: {}", e);
                (None, None)
            }
        };

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        live.fetch_add(1, Ordering::SeqCst);
        Self {
            marker,
            _watcher: watcher,
            events,
            ticker,
            live,
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    /// Resolves once the marker file exists
    pub async fn marker_seen(&mut self) {
        loop {
            let wake = tokio::select! {
                event = next_event(&mut self.events) => Wake::Event(event.is_some()),
                _ = self.ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Event(false) => {
                    debug!("Watch channel closed, falling back to polling");
                    self.events = None;
                }
                Wake::Event(true) | Wake::Tick => {
                    if tokio::fs::try_exists(&self.marker).await.unwrap_or(false) {
                        trace!(path = %self.marker.display(), "Completion marker present");
                        return;
                    }
                }
            }
        }
    }
}

impl Drop for MarkerWatch {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MarkerWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerWatch")
            .field("marker", &self.marker)
            .field("has_watcher", &self._watcher.is_some())
            .finish()
    }
}

async fn next_event(events: &mut Option<UnboundedReceiver<()>>) -> Option<()> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn start_watcher(dir: &Path, marker_name: &str) -> notify::Result<(RecommendedWatcher, UnboundedReceiver<()>)> {
    let (tx, rx) = unbounded_channel();
    let marker_name = marker_name.to_string();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(_) => return,
        };
        let touches_marker = event
            .paths
            .iter()
            .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(marker_name.as_str()));
        if touches_marker {
            let _ = tx.send(());
        }
    })?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok((watcher, rx))
}
