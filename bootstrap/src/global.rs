//! Process-wide bootstrap entry points for test suites
//!
//! The first call builds a sequencer from the environment and keeps it for
//! the rest of the process, so every test binary can call [`global_setup`]
//! from its own setup without spawning duplicate daemons. A failed first
//! call leaves nothing behind, so the next call starts over.
//!
//! Calls may come from different tokio runtimes (one per `#[tokio::test]`):
//! spawned processes and their output do not depend on the runtime that
//! started them.

use std::path::Path;
use tokio::sync::OnceCell;

use crate::config::BootstrapConfig;
use crate::error::BootstrapResult;
use crate::sequencer::{BootstrapReport, BootstrapSequencer, SequencerPlan};
use crate::services::{
    ControlClient, HttpReadinessProbe, JsonRpcHeightSource, RealProcessLauncher, SystemCommandRunner,
};

/// Sequencer wired to the real services
pub type RealSequencer = BootstrapSequencer<
    RealProcessLauncher,
    HttpReadinessProbe,
    ControlClient<SystemCommandRunner>,
    JsonRpcHeightSource,
>;

static SEQUENCER: OnceCell<RealSequencer> = OnceCell::const_new();

/// Wire the real services for `config`
pub fn build_sequencer(config: &BootstrapConfig) -> BootstrapResult<RealSequencer> {
    let launcher = RealProcessLauncher::new().with_output_mode(config.output_mode);
    let api = HttpReadinessProbe::new(config.api_server.ready_url.clone(), config.rpc.timeout)?;
    let control = ControlClient::new(
        SystemCommandRunner::new().with_timeout(config.control_timeout),
        config.control_binary.clone(),
        config.credentials.clone(),
    );
    let heights = JsonRpcHeightSource::new(config.rpc.clone(), config.credentials.clone())?;

    Ok(BootstrapSequencer::new(
        launcher,
        api,
        control,
        heights,
        SequencerPlan::from_config(config),
    ))
}

/// Bootstrap from `.env.regtest` and the process environment
pub async fn global_setup() -> BootstrapResult<BootstrapReport> {
    global_setup_from(Path::new(BootstrapConfig::DEFAULT_ENV_FILE)).await
}

/// Bootstrap using `env_file` the first time; later calls reuse that sequencer
pub async fn global_setup_from(env_file: &Path) -> BootstrapResult<BootstrapReport> {
    let sequencer = SEQUENCER
        .get_or_try_init(|| async {
            let config = BootstrapConfig::load(Some(env_file))?;
            build_sequencer(&config)
        })
        .await?;
    sequencer.run().await
}

/// Kill the processes started by [`global_setup`]; returns how many were signalled
pub async fn global_teardown() -> usize {
    match SEQUENCER.get() {
        Some(sequencer) => sequencer.supervisor().terminate_all().await,
        None => 0,
    }
}
