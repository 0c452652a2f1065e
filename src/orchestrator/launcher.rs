//! Analysis tool process launching

use std::io;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::types::ToolInvocation;

/// Windows `CREATE_NEW_CONSOLE` process creation flag
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Starts the analysis tool. Returning `Ok` means the process was spawned;
/// completion is detected from its output, not its exit.
pub trait ToolLauncher: Send + Sync {
    fn launch(&self, invocation: &ToolInvocation) -> io::Result<()>;
}

/// Spawns the tool as a child process.
///
/// The tool talks to the user directly (passphrase prompt), so stdio is
/// inherited. Must be called from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ToolLauncher for ProcessLauncher {
    fn launch(&self, invocation: &ToolInvocation) -> io::Result<()> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(windows)]
        if invocation.new_console {
            cmd.creation_flags(CREATE_NEW_CONSOLE);
        }

        let mut child = cmd.spawn()?;
        let pid = child.id();
        debug!(?pid, program = %invocation.program.display(), "Analysis tool spawned");

        // Reap the child; its exit status is informational only
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!(?pid, "Analysis tool exited"),
                Ok(status) => warn!(?pid, code = ?status.code(), "Analysis tool exited with failure"),
                Err(e) => warn!(?pid, "Failed to wait for analysis tool: {}", e),
            }
        });

        Ok(())
    }
}
