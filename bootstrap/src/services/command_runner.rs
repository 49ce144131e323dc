//! Runs short-lived commands to completion and captures their output
//!
//! Every run is bounded by a timeout. A command that overruns it is killed
//! and reported as [`BootstrapError::CommandFailed`].

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{BootstrapError, BootstrapResult};
use crate::traits::{CommandOutput, CommandRunner};

/// Command runner backed by `tokio::process`
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Limit how long a single command may run (fluent API)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &Path, args: &[String]) -> BootstrapResult<CommandOutput> {
        let failed = |message: String| BootstrapError::CommandFailed {
            program: program.display().to_string(),
            message,
        };

        // Dropping the output future on timeout kills the command
        let running = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, running)
            .await
            .map_err(|_| failed(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| failed(e.to_string()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
