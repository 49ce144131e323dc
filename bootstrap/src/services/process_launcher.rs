//! Real process launcher implementation
//!
//! Spawns long-running children with tokio and hands the child handle to the
//! supervisor. Children are not killed when their handle is dropped; they
//! outlive the bootstrap call and are torn down externally.

use async_trait::async_trait;
use tokio::process::Command;

use super::process_output_handler::{OutputMode, configure_child_stdio, spawn_output_consumers};
use crate::error::{BootstrapError, BootstrapResult};
use crate::traits::{LaunchedProcess, ProcessLauncher, ProcessSpec};

/// Real process launcher implementation
pub struct RealProcessLauncher {
    output_mode: OutputMode,
}

impl RealProcessLauncher {
    pub fn new() -> Self {
        Self {
            output_mode: OutputMode::default(),
        }
    }

    /// Configure child output handling (fluent API)
    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }
}

impl Default for RealProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessLauncher for RealProcessLauncher {
    async fn launch(&self, spec: &ProcessSpec) -> BootstrapResult<LaunchedProcess> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).kill_on_drop(false);
        configure_child_stdio(&mut cmd, self.output_mode);

        let child = cmd.spawn().map_err(|e| BootstrapError::Spawn {
            name: spec.name.clone(),
            message: e.to_string(),
        })?;
        let pid = child.id();
        let child = spawn_output_consumers(child, &spec.name);

        Ok(LaunchedProcess {
            pid,
            child: Some(child),
        })
    }
}
