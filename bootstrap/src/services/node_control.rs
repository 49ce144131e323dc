//! Node control through the daemon's control binary
//!
//! The control binary reports failures on stderr; its exit code is not
//! consulted. Successful `generate` calls print a JSON array of block hashes.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use shared::{Stage, stage_debug};

use crate::config::RpcCredentials;
use crate::error::{BootstrapError, BootstrapResult};
use crate::traits::{CommandRunner, NodeControl};

/// Network flag passed to every control invocation
const CONTROL_NETWORK_FLAG: &str = "--testnet";

/// [`NodeControl`] implementation that shells out to the control binary
pub struct ControlClient<R>
where
    R: CommandRunner,
{
    runner: R,
    binary: PathBuf,
    credentials: RpcCredentials,
}

impl<R> ControlClient<R>
where
    R: CommandRunner,
{
    pub fn new(runner: R, binary: impl Into<PathBuf>, credentials: RpcCredentials) -> Self {
        Self {
            runner,
            binary: binary.into(),
            credentials,
        }
    }

    pub fn ping_args(&self) -> Vec<String> {
        vec![
            format!("--rpcuser={}", self.credentials.user),
            format!("--rpcpass={}", self.credentials.password),
            CONTROL_NETWORK_FLAG.to_string(),
            "ping".to_string(),
        ]
    }

    pub fn generate_args(&self, blocks: u32) -> Vec<String> {
        vec![
            CONTROL_NETWORK_FLAG.to_string(),
            format!("--rpcuser={}", self.credentials.user),
            format!("--rpcpass={}", self.credentials.password),
            "generate".to_string(),
            "--skipverify".to_string(),
            blocks.to_string(),
        ]
    }
}

#[async_trait]
impl<R> NodeControl for ControlClient<R>
where
    R: CommandRunner,
{
    async fn ping(&self) -> BootstrapResult<String> {
        let output = self.runner.run(&self.binary, &self.ping_args()).await?;
        Ok(output.stderr)
    }

    async fn generate(&self, blocks: u32) -> BootstrapResult<Vec<String>> {
        let output = self.runner.run(&self.binary, &self.generate_args(blocks)).await?;
        if output.has_error_output() {
            return Err(BootstrapError::BlockGeneration {
                stderr: output.stderr.trim().to_string(),
            });
        }

        let hashes = match serde_json::from_str::<Value>(&output.stdout)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            other => {
                stage_debug!(Stage::ChainPriming, "generate returned non-array output: {}", other);
                Vec::new()
            }
        };
        stage_debug!(Stage::ChainPriming, "⛏️ Generated {} block(s)", hashes.len());
        Ok(hashes)
    }
}
