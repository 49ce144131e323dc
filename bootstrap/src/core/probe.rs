//! Bounded readiness polling
//!
//! One loop shape backs every waiting stage: run a check, stop when it reports
//! ready, otherwise sleep for the budget's delay and try again until the
//! attempts run out. Exhausting the budget is reported, never raised; the
//! caller decides whether it matters.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use shared::{ProbeOutcome, RetryBudget, Stage, stage_debug, stage_info};

/// Summary of one polling loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport<T> {
    pub stage: Stage,
    /// Value from the successful check, `None` if the budget ran out
    pub value: Option<T>,
    pub attempts: u32,
    /// Every value observed across attempts, in order
    pub observations: Vec<T>,
    pub elapsed: Duration,
}

impl<T> PollReport<T> {
    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }
}

/// Polls one stage's target within a fixed retry budget
#[derive(Debug, Clone, Copy)]
pub struct ReadinessProbe {
    stage: Stage,
    budget: RetryBudget,
}

impl ReadinessProbe {
    pub fn new(stage: Stage, budget: RetryBudget) -> Self {
        Self { stage, budget }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Poll `check` until it reports ready or the budget is exhausted
    pub async fn poll_until_ready<T, F, Fut>(&self, check: F) -> PollReport<T>
    where
        T: Clone,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeOutcome<T>>,
    {
        let no_remedy = |_attempt: u32| async { Ok::<(), Infallible>(()) };
        match self.poll_with_remedy(check, no_remedy).await {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Poll `check`, running `remedy` before each wait between attempts
    ///
    /// The remedy is only run when another attempt follows, so its effect is
    /// always observed by a later check. A remedy error ends the loop at once
    /// and is returned unchanged.
    pub async fn poll_with_remedy<T, E, F, Fut, R, RFut>(
        &self,
        mut check: F,
        mut remedy: R,
    ) -> Result<PollReport<T>, E>
    where
        T: Clone,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeOutcome<T>>,
        R: FnMut(u32) -> RFut,
        RFut: Future<Output = Result<(), E>>,
    {
        let started = Instant::now();
        let max_attempts = self.budget.max_attempts;
        let mut observations = Vec::new();
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            let outcome = check().await;
            if let Some(observed) = outcome.observed() {
                observations.push(observed.clone());
            }

            match outcome {
                ProbeOutcome::Ready(value) => {
                    stage_debug!(
                        self.stage,
                        "{} ready after {} attempt(s)",
                        self.stage.target(),
                        attempts
                    );
                    return Ok(PollReport {
                        stage: self.stage,
                        value: Some(value),
                        attempts,
                        observations,
                        elapsed: started.elapsed(),
                    });
                }
                ProbeOutcome::NotReady(_) => {
                    stage_debug!(self.stage, "{} not ready (attempt {})", self.stage.target(), attempts);
                }
                ProbeOutcome::ProbeError(cause) => {
                    stage_debug!(
                        self.stage,
                        "{} probe failed (attempt {}): {}",
                        self.stage.target(),
                        attempts,
                        cause
                    );
                }
            }

            if attempts == max_attempts {
                break;
            }

            stage_info!(
                self.stage,
                "⏳ Waiting for {} ({}/{}, next check in {:?})",
                self.stage.target(),
                attempts,
                max_attempts,
                self.budget.delay
            );
            remedy(attempts).await?;
            sleep(self.budget.delay).await;
        }

        Ok(PollReport {
            stage: self.stage,
            value: None,
            attempts,
            observations,
            elapsed: started.elapsed(),
        })
    }
}
