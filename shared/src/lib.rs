//! Shared types for the regtest bootstrap workspace
//!
//! Contains the stage identifiers, retry budgets and probe outcomes used by the
//! bootstrap library, its binary and its test suites, together with the common
//! logging setup.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
