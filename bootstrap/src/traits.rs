//! Trait definitions with mockall annotations for testing
//!
//! Every external collaborator of the bootstrap pipeline sits behind one of
//! these traits so the sequencer can be driven by mocks in tests and by the
//! real services in `crate::services` at runtime.

use std::path::{Path, PathBuf};
use tokio::process::Child;

use crate::error::BootstrapResult;

/// How to start one long-running external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// Command line as it would be typed in a shell, for logging
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A process the launcher has started
#[derive(Debug)]
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    pub child: Option<Child>,
}

impl LaunchedProcess {
    /// Launched process that is not tracked through a child handle
    pub fn detached(pid: Option<u32>) -> Self {
        Self { pid, child: None }
    }
}

/// Captured result of a short-lived command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// The control binary signals failure through stderr, not its exit code
    pub fn has_error_output(&self) -> bool {
        !self.stderr.is_empty()
    }
}

/// Process spawning abstraction used by the supervisor
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start the process without waiting for it to become ready
    async fn launch(&self, spec: &ProcessSpec) -> BootstrapResult<LaunchedProcess>;
}

/// Short-lived command execution abstraction
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output
    async fn run(&self, program: &Path, args: &[String]) -> BootstrapResult<CommandOutput>;
}

/// HTTP readiness abstraction for the API server under test
#[mockall::automock]
#[async_trait::async_trait]
pub trait ApiReadiness: Send + Sync {
    /// Issue one request; `Ok` means a response of any status was received
    async fn probe(&self) -> BootstrapResult<()>;
}

/// Node control abstraction (ping and block generation)
#[mockall::automock]
#[async_trait::async_trait]
pub trait NodeControl: Send + Sync {
    /// Ping the daemon and return the control binary's stderr (empty when ready)
    async fn ping(&self) -> BootstrapResult<String>;

    /// Generate `blocks` new blocks and return their hashes
    async fn generate(&self, blocks: u32) -> BootstrapResult<Vec<String>>;
}

/// Chain height abstraction
#[mockall::automock]
#[async_trait::async_trait]
pub trait HeightSource: Send + Sync {
    /// Current best block height
    async fn best_height(&self) -> BootstrapResult<u64>;
}
