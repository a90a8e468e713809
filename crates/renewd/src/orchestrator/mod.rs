//! Command orchestration: ordered per-platform plans, run step by step
//! into a [`PlanResult`].
//!
//! The two plans deliberately use different policies:
//! - lease renewal stops as soon as its *first* step succeeds, otherwise it
//!   walks the remaining fallback steps unconditionally;
//! - companion restart always runs every step.

pub mod companion;
pub mod lease;

pub use companion::{restart_plan, CompanionRestart};
pub use lease::{lease_plan, LeaseRenewal};

use renew_shared::{CommandSpec, PlanResult, StepReport};
use std::time::Duration;
use tracing::info;

use crate::runner::{self, CommandRunner};

/// How a plan reacts to step outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Stop after the first step if it succeeded; later steps never short-circuit
    StopAfterFirstSuccess,
    /// Run every step regardless of outcome
    RunAll,
}

/// Run `plan` in order, one StepReport per executed step
pub async fn run_plan(
    runner: &dyn CommandRunner,
    plan: &[CommandSpec],
    policy: StepPolicy,
    timeout: Duration,
) -> PlanResult {
    let mut result = PlanResult::new();

    for (index, command) in plan.iter().enumerate() {
        let outcome = runner::execute(runner, command, timeout).await;
        result.push(StepReport::from_outcome(command, &outcome));

        if index == 0
            && outcome.succeeded
            && policy == StepPolicy::StopAfterFirstSuccess
            && plan.len() > 1
        {
            info!("{} succeeded, skipping {} fallback step(s)", command, plan.len() - 1);
            break;
        }
    }

    result
}
