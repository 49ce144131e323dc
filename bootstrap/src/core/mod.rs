//! Core bootstrap logic
//!
//! The polling loop, the chain primer and the process supervisor. None of these
//! perform I/O directly; every external effect goes through the traits in
//! `crate::traits`.

pub mod primer;
pub mod probe;
pub mod supervisor;

pub use primer::{ChainPrimer, PrimingReport};
pub use probe::{PollReport, ReadinessProbe};
pub use supervisor::{ProcessHandle, ProcessStatus, ProcessSupervisor};
