//! Bootstrap sequencer
//!
//! Runs the fixed pipeline that prepares the regtest environment for a test
//! run: launch the daemon and API server, wait for the API server, wait for
//! the daemon, prime the chain height, then hand control back. Waiting stages
//! only log when their budget runs out; block generation failure is the one
//! error that aborts the run.

use serde::Serialize;
use std::time::Duration;

use shared::{ChainHeightTarget, ProbeOutcome, Stage, logging, stage_debug, stage_error, stage_info, stage_warn};

use crate::config::{BootstrapConfig, StageBudgets};
use crate::core::{ChainPrimer, PollReport, PrimingReport, ProcessHandle, ProcessSupervisor, ReadinessProbe};
use crate::error::BootstrapResult;
use crate::traits::{ApiReadiness, HeightSource, NodeControl, ProcessLauncher, ProcessSpec};

/// Outcome of one waiting stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StageStatus {
    Ready { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl StageStatus {
    fn from_report<T>(report: &PollReport<T>) -> Self {
        if report.is_ready() {
            StageStatus::Ready {
                attempts: report.attempts,
                elapsed: report.elapsed,
            }
        } else {
            StageStatus::TimedOut {
                attempts: report.attempts,
                elapsed: report.elapsed,
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StageStatus::Ready { .. })
    }
}

/// What a bootstrap run observed; soft failures show up as `TimedOut`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub processes: Vec<ProcessHandle>,
    pub api: StageStatus,
    pub daemon: StageStatus,
    pub priming: PrimingReport,
}

impl BootstrapReport {
    pub fn all_ready(&self) -> bool {
        self.api.is_ready() && self.daemon.is_ready() && self.priming.reached
    }
}

/// Which processes to launch and how long to wait for each stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerPlan {
    pub daemon: ProcessSpec,
    pub api_server: ProcessSpec,
    pub budgets: StageBudgets,
    pub target: ChainHeightTarget,
    pub batch_size: u32,
}

impl SequencerPlan {
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            daemon: config.daemon_spec(),
            api_server: config.api_server_spec(),
            budgets: config.budgets,
            target: config.target,
            batch_size: config.batch_size,
        }
    }
}

/// Sequences process launch, readiness polling and chain priming
pub struct BootstrapSequencer<L, A, N, H>
where
    L: ProcessLauncher,
    A: ApiReadiness,
    N: NodeControl,
    H: HeightSource,
{
    supervisor: ProcessSupervisor<L>,
    api: A,
    control: N,
    heights: H,
    plan: SequencerPlan,
}

impl<L, A, N, H> BootstrapSequencer<L, A, N, H>
where
    L: ProcessLauncher,
    A: ApiReadiness,
    N: NodeControl,
    H: HeightSource,
{
    /// Create new sequencer with injected dependencies
    pub fn new(launcher: L, api: A, control: N, heights: H, plan: SequencerPlan) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(launcher),
            api,
            control,
            heights,
            plan,
        }
    }

    pub fn supervisor(&self) -> &ProcessSupervisor<L> {
        &self.supervisor
    }

    pub fn plan(&self) -> &SequencerPlan {
        &self.plan
    }

    /// Run the whole pipeline
    ///
    /// Safe to call repeatedly: processes are only spawned on the first call,
    /// later calls re-run the readiness and priming stages.
    pub async fn run(&self) -> BootstrapResult<BootstrapReport> {
        logging::log_startup(Stage::Launch, "regtest environment bootstrap");

        let processes = vec![
            self.supervisor.ensure_started(&self.plan.daemon).await,
            self.supervisor.ensure_started(&self.plan.api_server).await,
        ];

        let api = self.wait_for_api().await;
        let daemon = self.wait_for_daemon().await;
        let priming = self.prime_chain().await?;

        stage_info!(Stage::Handoff, "proceeding...");
        Ok(BootstrapReport {
            processes,
            api,
            daemon,
            priming,
        })
    }

    async fn wait_for_api(&self) -> StageStatus {
        let report = ReadinessProbe::new(Stage::ApiReadiness, self.plan.budgets.api)
            .poll_until_ready(move || async move {
                match self.api.probe().await {
                    Ok(()) => ProbeOutcome::Ready(()),
                    Err(e) => ProbeOutcome::ProbeError(e.to_string()),
                }
            })
            .await;

        if report.is_ready() {
            logging::log_success(Stage::ApiReadiness, "API server is responding");
        } else {
            self.log_soft_timeout(&report, &self.plan.api_server.name).await;
        }
        StageStatus::from_report(&report)
    }

    async fn wait_for_daemon(&self) -> StageStatus {
        let report = ReadinessProbe::new(Stage::DaemonReadiness, self.plan.budgets.daemon)
            .poll_until_ready(move || async move {
                match self.control.ping().await {
                    Ok(stderr) if stderr.is_empty() => ProbeOutcome::Ready(()),
                    Ok(stderr) => {
                        stage_debug!(Stage::DaemonReadiness, "ping: {}", stderr.trim());
                        ProbeOutcome::NotReady(None)
                    }
                    Err(e) => ProbeOutcome::ProbeError(e.to_string()),
                }
            })
            .await;

        if report.is_ready() {
            logging::log_success(Stage::DaemonReadiness, "node daemon answered ping");
        } else {
            self.log_soft_timeout(&report, &self.plan.daemon.name).await;
        }
        StageStatus::from_report(&report)
    }

    async fn prime_chain(&self) -> BootstrapResult<PrimingReport> {
        let primer = ChainPrimer::new(self.plan.target, self.plan.batch_size, self.plan.budgets.height);
        let report = match primer.ensure_minimum_height(&self.control, &self.heights).await {
            Ok(report) => report,
            Err(e) => {
                stage_error!(Stage::ChainPriming, "❌ Block generation failed, aborting bootstrap: {}", e);
                return Err(e);
            }
        };

        if report.reached {
            logging::log_success(
                Stage::ChainPriming,
                &format!(
                    "chain height {} meets minimum {}",
                    report.final_height().unwrap_or_default(),
                    self.plan.target.minimum_height
                ),
            );
        } else {
            stage_warn!(
                Stage::ChainPriming,
                "⏰ Height {} still below {} after {} attempt(s); continuing",
                report
                    .final_height()
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                self.plan.target.minimum_height,
                report.attempts
            );
        }
        Ok(report)
    }

    async fn log_soft_timeout<T>(&self, report: &PollReport<T>, process_name: &str) {
        let process = match self.supervisor.status(process_name).await {
            Some(status) => format!("{process_name} is {status:?}"),
            None => format!("{process_name} was never started"),
        };
        stage_warn!(
            report.stage,
            "⏰ {} not ready after {} attempt(s) in {:?} ({}); continuing",
            report.stage.target(),
            report.attempts,
            report.elapsed,
            process
        );
    }
}
