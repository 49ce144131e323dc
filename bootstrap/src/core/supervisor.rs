//! Idempotent process supervision
//!
//! Keeps at most one process per logical name for the lifetime of the
//! supervisor. Spawning never blocks on readiness and never fails the caller:
//! a process that could not be started is recorded as such and shows up later
//! as a readiness timeout.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;

use shared::{Stage, stage_debug, stage_info, stage_warn};

use crate::traits::{ProcessLauncher, ProcessSpec};

const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle returned to callers of [`ProcessSupervisor::ensure_started`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub name: String,
    pub command: String,
    pub pid: Option<u32>,
    /// Set when the launcher could not start the process
    pub spawn_error: Option<String>,
}

impl ProcessHandle {
    pub fn is_spawned(&self) -> bool {
        self.spawn_error.is_none()
    }
}

/// Observed state of a managed process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProcessStatus {
    Running,
    Exited(Option<i32>),
    SpawnFailed,
    /// Started without a child handle, so its state cannot be observed
    Detached,
    Unknown,
}

struct ManagedProcess {
    spec: ProcessSpec,
    handle: ProcessHandle,
    child: Option<Child>,
}

/// Process-wide registry of long-running external processes
pub struct ProcessSupervisor<L>
where
    L: ProcessLauncher,
{
    launcher: L,
    processes: Mutex<HashMap<String, ManagedProcess>>,
}

impl<L> ProcessSupervisor<L>
where
    L: ProcessLauncher,
{
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Start `spec` unless a process with the same name was already started
    ///
    /// The registry lock is held across the launch so concurrent callers
    /// cannot spawn the same name twice.
    pub async fn ensure_started(&self, spec: &ProcessSpec) -> ProcessHandle {
        let mut processes = self.processes.lock().await;

        if let Some(existing) = processes.get(&spec.name) {
            stage_info!(Stage::Launch, "...{} already running", spec.name);
            if existing.spec != *spec {
                stage_warn!(
                    Stage::Launch,
                    "{} requested with a different command line, keeping the original: {}",
                    spec.name,
                    existing.handle.command
                );
            }
            return existing.handle.clone();
        }

        stage_info!(Stage::Launch, "starting {} ...", spec.name);
        let command = spec.command_line();
        let (handle, child) = match self.launcher.launch(spec).await {
            Ok(launched) => {
                stage_info!(Stage::Launch, "... OKAY ({} pid {:?})", spec.name, launched.pid);
                let handle = ProcessHandle {
                    name: spec.name.clone(),
                    command,
                    pid: launched.pid,
                    spawn_error: None,
                };
                (handle, launched.child)
            }
            Err(e) => {
                stage_warn!(
                    Stage::Launch,
                    "⚠️ Could not start {} ({}): {}. Readiness checks will time out.",
                    spec.name,
                    command,
                    e
                );
                let handle = ProcessHandle {
                    name: spec.name.clone(),
                    command,
                    pid: None,
                    spawn_error: Some(e.to_string()),
                };
                (handle, None)
            }
        };

        processes.insert(
            spec.name.clone(),
            ManagedProcess {
                spec: spec.clone(),
                handle: handle.clone(),
                child,
            },
        );
        handle
    }

    pub async fn handle(&self, name: &str) -> Option<ProcessHandle> {
        let processes = self.processes.lock().await;
        processes.get(name).map(|managed| managed.handle.clone())
    }

    /// Check a managed process without blocking; `None` for unknown names
    pub async fn status(&self, name: &str) -> Option<ProcessStatus> {
        let mut processes = self.processes.lock().await;
        let managed = processes.get_mut(name)?;

        if !managed.handle.is_spawned() {
            return Some(ProcessStatus::SpawnFailed);
        }

        let status = match managed.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(None) => ProcessStatus::Running,
                Ok(Some(exit)) => ProcessStatus::Exited(exit.code()),
                Err(_) => ProcessStatus::Unknown,
            },
            None => ProcessStatus::Detached,
        };
        Some(status)
    }

    /// Names of every process started so far, sorted
    pub async fn names(&self) -> Vec<String> {
        let processes = self.processes.lock().await;
        let mut names: Vec<String> = processes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Kill every managed child that is still running
    ///
    /// Entries stay registered, so later `ensure_started` calls remain no-ops.
    /// Returns the number of processes that were signalled.
    pub async fn terminate_all(&self) -> usize {
        let mut processes = self.processes.lock().await;
        let mut terminated = 0;

        for (name, managed) in processes.iter_mut() {
            let Some(child) = managed.child.as_mut() else {
                continue;
            };
            match child.try_wait() {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => {}
            }
            match child.start_kill() {
                Ok(()) => {
                    terminated += 1;
                    // Reaping relies on the launching runtime, which may be gone
                    if tokio::time::timeout(REAP_TIMEOUT, child.wait()).await.is_err() {
                        stage_debug!(Stage::Handoff, "{} killed but not yet reaped", name);
                    }
                    stage_debug!(Stage::Handoff, "🛑 Terminated {}", name);
                }
                Err(e) => {
                    stage_warn!(Stage::Handoff, "⚠️ Failed to terminate {}: {}", name, e);
                }
            }
        }

        terminated
    }
}
