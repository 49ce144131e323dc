//! Regtest environment bootstrap
//!
//! Brings up a node daemon and the API server under test, waits for both to
//! become usable, and mines blocks until the chain reaches the minimum height
//! the integration tests rely on.

pub mod config;
pub mod core;
pub mod error;
pub mod global;
pub mod sequencer;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{BootstrapConfig, RpcCredentials, StageBudgets};
pub use core::{ChainPrimer, PrimingReport, ProcessHandle, ProcessStatus, ProcessSupervisor, ReadinessProbe};
pub use error::{BootstrapError, BootstrapResult};
pub use global::{build_sequencer, global_setup, global_setup_from, global_teardown};
pub use sequencer::{BootstrapReport, BootstrapSequencer, SequencerPlan, StageStatus};
pub use traits::{ApiReadiness, CommandRunner, HeightSource, NodeControl, ProcessLauncher, ProcessSpec};
