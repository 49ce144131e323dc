//! Test fixtures and data for bootstrap tests

use std::collections::HashMap;

use bootstrap::config::{API_SERVER_PROCESS, DAEMON_PROCESS};
use bootstrap::{BootstrapConfig, ProcessSpec, SequencerPlan};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const MINING_ADDRESS: &'static str = "bchreg:qpm2qsznhks23z7629mms6s4cwef74vcwvhanqgjxu";
    pub const RPC_USER: &'static str = "alice";
    pub const RPC_PASS: &'static str = "password";

    /// Environment with only the required variable set
    pub fn minimal_env() -> HashMap<String, String> {
        HashMap::from([("ADDRESS".to_string(), Self::MINING_ADDRESS.to_string())])
    }

    /// Configuration built from [`Self::minimal_env`]
    pub fn config() -> BootstrapConfig {
        let env = Self::minimal_env();
        BootstrapConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
    }

    /// Plan with the default budgets, target and batch size
    pub fn plan() -> SequencerPlan {
        SequencerPlan::from_config(&Self::config())
    }

    pub fn daemon_spec() -> ProcessSpec {
        Self::plan().daemon
    }

    pub fn api_server_spec() -> ProcessSpec {
        Self::plan().api_server
    }

    pub fn process_names() -> Vec<String> {
        let mut names = vec![DAEMON_PROCESS.to_string(), API_SERVER_PROCESS.to_string()];
        names.sort();
        names
    }

    /// Hashes a successful `generate` would print
    pub fn block_hashes(count: u32) -> Vec<String> {
        (0..count).map(|i| format!("{i:064x}")).collect()
    }
}
