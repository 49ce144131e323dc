//! Main entry point for the bootstrap binary
//!
//! Prepares the regtest environment and optionally runs a test command against
//! it. With a test command the spawned processes are killed once it exits and
//! its exit code becomes ours.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::process::Command;
use tokio::signal;

use bootstrap::global::RealSequencer;
use bootstrap::{BootstrapConfig, build_sequencer};
use shared::{Stage, logging, stage_debug, stage_info, stage_warn};

/// Bring up a regtest node and API server for integration tests
#[derive(Parser)]
#[command(name = "bootstrap")]
#[command(about = "Starts the node daemon and API server and primes the regtest chain")]
pub struct Args {
    /// Env file loaded before reading the environment (missing file is ignored)
    #[arg(long, default_value = BootstrapConfig::DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Wait for Ctrl+C and then stop the spawned processes
    #[arg(long)]
    pub keep_running: bool,

    /// Test command to run once the environment is ready, e.g. `-- npm test`
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let mut config = BootstrapConfig::load(Some(&args.env_file)).context("failed to load configuration")?;
    let leaves_children_running = args.command.is_empty() && !args.keep_running;
    if leaves_children_running {
        config.output_mode = config.output_mode.outliving_parent();
    }
    let sequencer = build_sequencer(&config).context("failed to set up services")?;

    let report = match sequencer.run().await {
        Ok(report) => report,
        Err(e) => {
            stop_children(&sequencer).await;
            return Err(e.into());
        }
    };
    stage_debug!(Stage::Handoff, "report: {}", serde_json::to_string(&report)?);
    if !report.all_ready() {
        stage_warn!(Stage::Handoff, "environment is only partially ready");
    }

    let exit_code = if let Some((program, rest)) = args.command.split_first() {
        stage_info!(Stage::Handoff, "▶️ Running {}", args.command.join(" "));
        let status = Command::new(program).args(rest).status().await;
        stop_children(&sequencer).await;
        let status = status.with_context(|| format!("failed to run {program}"))?;
        // Signal-terminated commands have no code
        ExitCode::from(status.code().unwrap_or(1).clamp(0, 255) as u8)
    } else if args.keep_running {
        stage_info!(Stage::Handoff, "Environment ready, press Ctrl+C to stop");
        if let Err(err) = signal::ctrl_c().await {
            logging::log_error(Stage::Handoff, "Signal handling", &err);
        }
        stop_children(&sequencer).await;
        ExitCode::SUCCESS
    } else {
        stage_info!(Stage::Handoff, "Environment ready; processes left running");
        ExitCode::SUCCESS
    };

    Ok(exit_code)
}

async fn stop_children(sequencer: &RealSequencer) {
    let stopped = sequencer.supervisor().terminate_all().await;
    logging::log_success(Stage::Handoff, &format!("stopped {stopped} process(es)"));
}
