//! Service implementations
//!
//! This module contains real implementations of all service traits.
//! These are the production implementations that handle actual I/O operations.

pub mod command_runner;
pub mod height_rpc;
pub mod http_readiness;
pub mod node_control;
pub mod process_launcher;
pub mod process_output_handler;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use command_runner::SystemCommandRunner;
pub use height_rpc::JsonRpcHeightSource;
pub use http_readiness::HttpReadinessProbe;
pub use node_control::ControlClient;
pub use process_launcher::RealProcessLauncher;
pub use process_output_handler::OutputMode;
