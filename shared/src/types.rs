//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::{SharedError, SharedResult};

/// Number of blocks requested per generation round
pub const DEFAULT_BLOCK_BATCH: u32 = 105;

/// Identifier for each step of the bootstrap pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Spawning the daemon and API server processes
    Launch,
    /// Waiting for the API server to answer HTTP
    ApiReadiness,
    /// Waiting for the daemon to answer the control ping
    DaemonReadiness,
    /// Generating blocks until the minimum height is reached
    ChainPriming,
    /// Control handed back to the test runner
    Handoff,
}

impl Stage {
    /// Human readable name of the dependency the stage waits on
    pub fn target(&self) -> &'static str {
        match self {
            Stage::Launch => "external processes",
            Stage::ApiReadiness => "API server",
            Stage::DaemonReadiness => "node daemon",
            Stage::ChainPriming => "block height",
            Stage::Handoff => "test runner",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Launch => write!(f, "launch"),
            Stage::ApiReadiness => write!(f, "api_readiness"),
            Stage::DaemonReadiness => write!(f, "daemon_readiness"),
            Stage::ChainPriming => write!(f, "chain_priming"),
            Stage::Handoff => write!(f, "handoff"),
        }
    }
}

/// Attempts and inter-attempt delay for one polling stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryBudget {
    pub const API_READINESS: RetryBudget = RetryBudget::from_millis(10, 1000);
    pub const DAEMON_READINESS: RetryBudget = RetryBudget::from_millis(5, 2000);
    pub const CHAIN_HEIGHT: RetryBudget = RetryBudget::from_millis(15, 2000);

    pub const fn from_millis(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Reject budgets that would never run a single check
    pub fn validate(&self, stage: Stage) -> SharedResult<()> {
        if self.max_attempts == 0 {
            return Err(SharedError::InvalidBudget {
                stage: stage.to_string(),
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Upper bound on the time spent sleeping inside a loop with this budget
    pub fn max_wait(&self) -> Duration {
        self.delay * self.max_attempts
    }
}

/// Minimum chain height the test suite expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHeightTarget {
    pub minimum_height: u64,
}

impl ChainHeightTarget {
    pub const fn new(minimum_height: u64) -> Self {
        Self { minimum_height }
    }

    pub fn is_met(&self, height: u64) -> bool {
        height >= self.minimum_height
    }
}

impl Default for ChainHeightTarget {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Result of a single readiness check
///
/// `NotReady` and `ProbeError` are both retry signals for the polling loop;
/// the error cause is only kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T> {
    /// Target is usable, with the value that proved it
    Ready(T),
    /// Target answered but is not usable yet
    NotReady(Option<T>),
    /// The check itself failed
    ProbeError(String),
}

impl<T> ProbeOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready(_))
    }

    /// Value observed by the check, ready or not
    pub fn observed(&self) -> Option<&T> {
        match self {
            ProbeOutcome::Ready(value) => Some(value),
            ProbeOutcome::NotReady(value) => value.as_ref(),
            ProbeOutcome::ProbeError(_) => None,
        }
    }
}
