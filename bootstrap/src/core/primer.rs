//! Chain priming
//!
//! Generates blocks in fixed-size batches until the node reports at least the
//! target height. The batch size is fixed and never derived from the current
//! deficit.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use shared::{ChainHeightTarget, ProbeOutcome, RetryBudget, Stage, stage_info, stage_warn};

use super::probe::ReadinessProbe;
use crate::error::{BootstrapError, BootstrapResult};
use crate::traits::{HeightSource, NodeControl};

/// Summary of one priming run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimingReport {
    pub reached: bool,
    pub attempts: u32,
    /// Heights in the order they were observed
    pub observed_heights: Vec<u64>,
    pub generation_rounds: u32,
    pub blocks_generated: usize,
}

impl PrimingReport {
    pub fn final_height(&self) -> Option<u64> {
        self.observed_heights.last().copied()
    }
}

/// Drives block generation until the minimum height is reached
#[derive(Debug, Clone, Copy)]
pub struct ChainPrimer {
    target: ChainHeightTarget,
    batch_size: u32,
    budget: RetryBudget,
}

impl ChainPrimer {
    pub fn new(target: ChainHeightTarget, batch_size: u32, budget: RetryBudget) -> Self {
        Self {
            target,
            batch_size,
            budget,
        }
    }

    /// Generate blocks until `heights` reports at least the target
    ///
    /// Any generation failure is fatal and returned as
    /// [`BootstrapError::BlockGeneration`]. Running out of attempts before the
    /// target is reached is not an error; check [`PrimingReport::reached`].
    pub async fn ensure_minimum_height<N, H>(&self, control: &N, heights: &H) -> BootstrapResult<PrimingReport>
    where
        N: NodeControl + ?Sized,
        H: HeightSource + ?Sized,
    {
        let target = self.target;
        let batch_size = self.batch_size;
        let rounds = AtomicU32::new(0);
        let blocks = AtomicUsize::new(0);

        let check = move || async move {
            match heights.best_height().await {
                Ok(height) if target.is_met(height) => ProbeOutcome::Ready(height),
                Ok(height) => ProbeOutcome::NotReady(Some(height)),
                Err(e) => ProbeOutcome::ProbeError(e.to_string()),
            }
        };

        let rounds_ref = &rounds;
        let blocks_ref = &blocks;
        let generate = move |attempt: u32| async move {
            stage_info!(
                Stage::ChainPriming,
                "Waiting blocks to be mined (round {}, requesting {})",
                attempt,
                batch_size
            );
            let hashes = control.generate(batch_size).await.map_err(as_generation_failure)?;
            rounds_ref.fetch_add(1, Ordering::SeqCst);
            blocks_ref.fetch_add(hashes.len(), Ordering::SeqCst);
            Ok::<(), BootstrapError>(())
        };

        let report = ReadinessProbe::new(Stage::ChainPriming, self.budget)
            .poll_with_remedy(check, generate)
            .await?;

        for pair in report.observations.windows(2) {
            if pair[1] < pair[0] {
                stage_warn!(
                    Stage::ChainPriming,
                    "⚠️ Chain height went backwards from {} to {}",
                    pair[0],
                    pair[1]
                );
            }
        }

        Ok(PrimingReport {
            reached: report.is_ready(),
            attempts: report.attempts,
            observed_heights: report.observations,
            generation_rounds: rounds.load(Ordering::SeqCst),
            blocks_generated: blocks.load(Ordering::SeqCst),
        })
    }
}

/// Every way block generation can fail aborts the pipeline
fn as_generation_failure(error: BootstrapError) -> BootstrapError {
    match error {
        BootstrapError::BlockGeneration { .. } => error,
        other => BootstrapError::BlockGeneration {
            stderr: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockHeightSource, MockNodeControl};
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    fn primer() -> ChainPrimer {
        ChainPrimer::new(ChainHeightTarget::default(), 105, RetryBudget::CHAIN_HEIGHT)
    }

    /// Height source backed by a counter the control mock bumps on generate
    fn simulated_chain(start: u64) -> (MockNodeControl, MockHeightSource, Arc<AtomicU64>) {
        let chain = Arc::new(AtomicU64::new(start));

        let mut control = MockNodeControl::new();
        let generated = Arc::clone(&chain);
        control.expect_generate().returning(move |blocks| {
            generated.fetch_add(u64::from(blocks), Ordering::SeqCst);
            Ok((0..blocks).map(|i| format!("{i:064x}")).collect())
        });

        let mut heights = MockHeightSource::new();
        let observed = Arc::clone(&chain);
        heights
            .expect_best_height()
            .returning(move || Ok(observed.load(Ordering::SeqCst)));

        (control, heights, chain)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_batch_reaches_target() {
        let (control, heights, chain) = simulated_chain(0);

        let report = primer().ensure_minimum_height(&control, &heights).await.unwrap();

        assert!(report.reached);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.generation_rounds, 1);
        assert_eq!(report.blocks_generated, 105);
        assert_eq!(report.observed_heights, vec![0, 105]);
        assert_eq!(report.final_height(), Some(105));
        assert_eq!(chain.load(Ordering::SeqCst), 105);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_primed_chain_generates_nothing() {
        let mut control = MockNodeControl::new();
        control.expect_generate().never();
        let mut heights = MockHeightSource::new();
        heights.expect_best_height().times(1).returning(|| Ok(250));

        let report = primer().ensure_minimum_height(&control, &heights).await.unwrap();

        assert!(report.reached);
        assert_eq!(report.generation_rounds, 0);
        assert_eq!(report.observed_heights, vec![250]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_error_is_fatal() {
        let mut control = MockNodeControl::new();
        control.expect_generate().times(1).returning(|_| {
            Err(BootstrapError::BlockGeneration {
                stderr: "-1: No payment addresses specified via --miningaddr".to_string(),
            })
        });
        let mut heights = MockHeightSource::new();
        heights.expect_best_height().times(1).returning(|| Ok(0));

        let err = primer().ensure_minimum_height(&control, &heights).await.unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("--miningaddr"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_failure_becomes_generation_failure() {
        let mut control = MockNodeControl::new();
        control.expect_generate().returning(|_| {
            Err(BootstrapError::CommandFailed {
                program: "bin/bchctl".to_string(),
                message: "No such file or directory".to_string(),
            })
        });
        let mut heights = MockHeightSource::new();
        heights.expect_best_height().returning(|| Ok(3));

        let err = primer().ensure_minimum_height(&control, &heights).await.unwrap_err();

        assert!(matches!(err, BootstrapError::BlockGeneration { .. }));
        assert!(err.to_string().contains("bin/bchctl"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_height_soft_fails() {
        let mut control = MockNodeControl::new();
        control.expect_generate().returning(|_| Ok(Vec::new()));
        let mut heights = MockHeightSource::new();
        heights
            .expect_best_height()
            .returning(|| Err(BootstrapError::rpc("getblockcount", "connection refused")));

        let report = primer().ensure_minimum_height(&control, &heights).await.unwrap();

        assert!(!report.reached);
        assert_eq!(report.attempts, 15);
        assert_eq!(report.generation_rounds, 14);
        assert!(report.observed_heights.is_empty());
        assert_eq!(report.final_height(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observed_heights_never_decrease() {
        // Generation produces fewer blocks than requested each round
        let chain = Arc::new(AtomicU64::new(10));
        let mut control = MockNodeControl::new();
        let generated = Arc::clone(&chain);
        control.expect_generate().returning(move |_| {
            generated.fetch_add(30, Ordering::SeqCst);
            Ok(vec!["hash".to_string(); 30])
        });
        let mut heights = MockHeightSource::new();
        let observed = Arc::clone(&chain);
        heights
            .expect_best_height()
            .returning(move || Ok(observed.load(Ordering::SeqCst)));

        let report = primer().ensure_minimum_height(&control, &heights).await.unwrap();

        assert!(report.reached);
        assert_eq!(report.observed_heights, vec![10, 40, 70, 100]);
        assert!(report.observed_heights.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(report.generation_rounds, 3);
    }
}
