//! Common test utilities and infrastructure
//!
//! Shared fixtures and the mock-backed sequencer builder used across the
//! bootstrap test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{MockSequencer, SequencerBuilder, SimulatedChain};
