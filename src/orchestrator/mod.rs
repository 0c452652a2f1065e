//! Analysis orchestration
//!
//! Launches the external analysis tool against an encrypted bundle and
//! waits for it to write its completion marker.

pub mod launcher;
pub mod run;
pub mod types;
pub mod watch;

pub use launcher::{ProcessLauncher, ToolLauncher};
pub use run::AnalysisOrchestrator;
pub use types::{AnalysisCompletion, OrchestratorConfig, RunSignal, RunState, ToolInvocation};
