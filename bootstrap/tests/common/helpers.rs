//! Test helpers and builder patterns for sequencer tests
//!
//! Every collaborator starts out with a well-behaved default: processes
//! launch, the API server answers, the daemon answers ping and the chain
//! grows by whatever `generate` is asked for. Tests replace only the mocks
//! they care about.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bootstrap::traits::{
    LaunchedProcess, MockApiReadiness, MockHeightSource, MockNodeControl, MockProcessLauncher,
};
use bootstrap::{BootstrapSequencer, SequencerPlan, StageBudgets};
use shared::ChainHeightTarget;

use super::fixtures::TestFixtures;

pub type MockSequencer =
    BootstrapSequencer<MockProcessLauncher, MockApiReadiness, MockNodeControl, MockHeightSource>;

/// Chain height shared between the control and height mocks
#[derive(Clone)]
pub struct SimulatedChain {
    height: Arc<AtomicU64>,
    generate_calls: Arc<AtomicU32>,
}

impl SimulatedChain {
    pub fn starting_at(height: u64) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(height)),
            generate_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Control mock whose ping succeeds and whose generate grows the chain
    pub fn control(&self) -> MockNodeControl {
        let mut control = MockNodeControl::new();
        control.expect_ping().returning(|| Ok(String::new()));

        let height = Arc::clone(&self.height);
        let calls = Arc::clone(&self.generate_calls);
        control.expect_generate().returning(move |blocks| {
            calls.fetch_add(1, Ordering::SeqCst);
            height.fetch_add(u64::from(blocks), Ordering::SeqCst);
            Ok(TestFixtures::block_hashes(blocks))
        });
        control
    }

    /// Height mock reading the simulated chain
    pub fn heights(&self) -> MockHeightSource {
        let mut heights = MockHeightSource::new();
        let height = Arc::clone(&self.height);
        heights
            .expect_best_height()
            .returning(move || Ok(height.load(Ordering::SeqCst)));
        heights
    }
}

/// Builder for sequencers driven entirely by mocks
pub struct SequencerBuilder {
    launcher: MockProcessLauncher,
    api: MockApiReadiness,
    control: MockNodeControl,
    heights: MockHeightSource,
    plan: SequencerPlan,
}

impl SequencerBuilder {
    /// Defaults: detached processes, responsive API server and a chain at height 0
    pub fn new() -> Self {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .returning(|_| Ok(LaunchedProcess::detached(Some(4242))));

        let mut api = MockApiReadiness::new();
        api.expect_probe().returning(|| Ok(()));

        let chain = SimulatedChain::starting_at(0);
        Self {
            launcher,
            api,
            control: chain.control(),
            heights: chain.heights(),
            plan: TestFixtures::plan(),
        }
    }

    /// Replace the launcher mock
    pub fn with_launcher<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockProcessLauncher),
    {
        let mut launcher = MockProcessLauncher::new();
        setup(&mut launcher);
        self.launcher = launcher;
        self
    }

    /// Replace the API readiness mock
    pub fn with_api<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockApiReadiness),
    {
        let mut api = MockApiReadiness::new();
        setup(&mut api);
        self.api = api;
        self
    }

    /// Replace the node control mock
    pub fn with_control<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockNodeControl),
    {
        let mut control = MockNodeControl::new();
        setup(&mut control);
        self.control = control;
        self
    }

    /// Replace the height mock
    pub fn with_heights<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockHeightSource),
    {
        let mut heights = MockHeightSource::new();
        setup(&mut heights);
        self.heights = heights;
        self
    }

    /// Use `chain` for both node control and heights
    pub fn with_chain(mut self, chain: &SimulatedChain) -> Self {
        self.control = chain.control();
        self.heights = chain.heights();
        self
    }

    pub fn with_budgets(mut self, budgets: StageBudgets) -> Self {
        self.plan.budgets = budgets;
        self
    }

    pub fn with_target(mut self, minimum_height: u64) -> Self {
        self.plan.target = ChainHeightTarget::new(minimum_height);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.plan.batch_size = batch_size;
        self
    }

    pub fn build(self) -> MockSequencer {
        BootstrapSequencer::new(self.launcher, self.api, self.control, self.heights, self.plan)
    }
}

impl Default for SequencerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
