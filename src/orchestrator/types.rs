//! Orchestrator state machine and run types

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::config::ViewerConfig;
use crate::evidence::VerificationReport;

/// Lifecycle of one analysis run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    /// Checking the tool and preparing the output directory
    Launching,
    /// Tool spawned, watching for the completion marker
    Running,
    /// Marker seen, waiting for the tool to finish writing it
    Settling,
    Completed,
    TimedOut,
    LaunchFailed,
    ToolNotFound,
}

/// Events that drive a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSignal {
    Launch,
    ToolMissing,
    Spawned,
    SpawnFailed,
    MarkerSeen,
    MarkerConfirmed,
    MarkerUnreadable,
    Deadline,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::TimedOut | RunState::LaunchFailed | RunState::ToolNotFound
        )
    }

    /// State after `signal`. Terminal states absorb every signal, and a
    /// signal that does not apply to the current state is ignored.
    pub fn next(self, signal: RunSignal) -> RunState {
        use RunSignal as S;
        use RunState::*;

        if self.is_terminal() {
            return self;
        }
        match (self, signal) {
            (Idle, S::Launch) => Launching,
            (Launching, S::ToolMissing) => ToolNotFound,
            (Launching, S::SpawnFailed) => LaunchFailed,
            (Launching, S::Spawned) => Running,
            (Running, S::MarkerSeen) => Settling,
            (Settling, S::MarkerConfirmed) => Completed,
            (Settling, S::MarkerUnreadable) => Running,
            (Running | Settling, S::Deadline) => TimedOut,
            (state, _) => state,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Launching => "launching",
            RunState::Running => "running",
            RunState::Settling => "settling",
            RunState::Completed => "completed",
            RunState::TimedOut => "timed_out",
            RunState::LaunchFailed => "launch_failed",
            RunState::ToolNotFound => "tool_not_found",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator settings, resolved from `ViewerConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub tool_path: PathBuf,
    pub app_root: PathBuf,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub new_console: bool,
}

impl OrchestratorConfig {
    pub fn from_viewer_config(config: &ViewerConfig) -> Self {
        Self {
            tool_path: config.resolved_tool_path(),
            app_root: config.app_root.clone(),
            output_dir: config.resolved_output_dir(),
            timeout: config.analysis_timeout(),
            settle_delay: config.settle_delay(),
            poll_interval: config.poll_interval(),
            new_console: config.open_new_console,
        }
    }
}

/// Fully resolved command line for one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    /// Windows only: give the tool its own console for the passphrase prompt
    pub new_console: bool,
}

impl ToolInvocation {
    /// `<tool> analyze --hash <hash_file> --bundle <bundle>`
    pub fn analyze(config: &OrchestratorConfig, bundle: &std::path::Path, hash_file: &std::path::Path) -> Self {
        Self {
            program: config.tool_path.clone(),
            args: vec![
                OsString::from("analyze"),
                OsString::from("--hash"),
                hash_file.as_os_str().to_owned(),
                OsString::from("--bundle"),
                bundle.as_os_str().to_owned(),
            ],
            working_dir: config.app_root.clone(),
            new_console: config.new_console,
        }
    }
}

/// A finished analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisCompletion {
    pub run_id: Uuid,
    pub output_dir: PathBuf,
    /// The parsed completion marker
    pub report: VerificationReport,
    /// Time from launch to a parsed marker
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = RunState::Idle;
        for signal in [RunSignal::Launch, RunSignal::Spawned, RunSignal::MarkerSeen, RunSignal::MarkerConfirmed] {
            state = state.next(signal);
        }
        assert_eq!(state, RunState::Completed);
    }

    #[test]
    fn test_unreadable_marker_returns_to_running() {
        assert_eq!(RunState::Settling.next(RunSignal::MarkerUnreadable), RunState::Running);
        assert_eq!(RunState::Settling.next(RunSignal::Deadline), RunState::TimedOut);
    }

    #[test]
    fn test_terminal_states_absorb_signals() {
        for terminal in [RunState::Completed, RunState::TimedOut, RunState::LaunchFailed, RunState::ToolNotFound] {
            for signal in [RunSignal::MarkerSeen, RunSignal::MarkerConfirmed, RunSignal::Deadline, RunSignal::Launch] {
                assert_eq!(terminal.next(signal), terminal);
            }
        }
    }

    #[test]
    fn test_launch_failures() {
        assert_eq!(RunState::Launching.next(RunSignal::ToolMissing), RunState::ToolNotFound);
        assert_eq!(RunState::Launching.next(RunSignal::SpawnFailed), RunState::LaunchFailed);
        // A marker cannot complete a run that never started
        assert_eq!(RunState::Idle.next(RunSignal::MarkerConfirmed), RunState::Idle);
    }

    #[test]
    fn test_invocation_arguments() {
        let config = OrchestratorConfig::from_viewer_config(&ViewerConfig::for_app_root("/opt/lume"));
        let invocation = ToolInvocation::analyze(&config, Path::new("/cases/s07.lume"), Path::new("/cases/s07.sha256"));

        let args: Vec<&str> = invocation.args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(args, ["analyze", "--hash", "/cases/s07.sha256", "--bundle", "/cases/s07.lume"]);
        assert_eq!(invocation.working_dir, Path::new("/opt/lume"));
        assert_eq!(config.output_dir, Path::new("/opt/lume/analyzed"));
    }
}
