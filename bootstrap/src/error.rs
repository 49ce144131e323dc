//! Bootstrap-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The control binary reported an error while generating blocks.
    /// This is the only failure that aborts the bootstrap pipeline.
    #[error("Block generation failed: {stderr}")]
    BlockGeneration { stderr: String },

    #[error("Failed to spawn {name}: {message}")]
    Spawn { name: String, message: String },

    #[error("Command {program} could not be run: {message}")]
    CommandFailed { program: String, message: String },

    #[error("RPC call {method} failed: {message}")]
    Rpc { method: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BootstrapError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn rpc(method: &str, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error must abort the pipeline instead of being logged
    pub fn is_fatal(&self) -> bool {
        matches!(self, BootstrapError::BlockGeneration { .. })
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
