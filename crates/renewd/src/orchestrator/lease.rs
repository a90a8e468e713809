//! Lease renewal plan.

use renew_shared::{CommandSpec, PlanResult, PlatformKind, StepReport};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{run_plan, StepPolicy};
use crate::runner::CommandRunner;

/// Ordered renewal commands for a platform. Total: Unknown is empty.
pub fn lease_plan(platform: PlatformKind, interface: &str) -> Vec<CommandSpec> {
    match platform {
        PlatformKind::Windows => vec![CommandSpec::new(["ipconfig", "/renew6"])],
        PlatformKind::Linux => vec![
            CommandSpec::new(["networkctl", "reconfigure", interface]),
            CommandSpec::new(["dhclient", "-r", interface]),
            CommandSpec::new(["dhclient", interface]),
        ],
        PlatformKind::Unknown => Vec::new(),
    }
}

pub struct LeaseRenewal {
    platform: PlatformKind,
    interface: String,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl LeaseRenewal {
    pub fn new(
        platform: PlatformKind,
        interface: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
    ) -> Self {
        Self {
            platform,
            interface: interface.into(),
            runner,
            timeout,
        }
    }

    pub fn plan(&self) -> Vec<CommandSpec> {
        lease_plan(self.platform, &self.interface)
    }

    /// Renew the lease. Never fails; every failed step is listed.
    pub async fn renew(&self) -> PlanResult {
        let plan = self.plan();
        if plan.is_empty() {
            return PlanResult::single(StepReport::note(format!(
                "no lease renewal commands for platform {}",
                self.platform
            )));
        }

        info!("Renewing lease on {} ({} step plan)", self.platform, plan.len());
        let result = run_plan(
            self.runner.as_ref(),
            &plan,
            StepPolicy::StopAfterFirstSuccess,
            self.timeout,
        )
        .await;
        info!(
            "Lease renewal finished: {}/{} step(s) ok",
            result.steps().iter().filter(|s| s.succeeded).count(),
            result.len()
        );
        result
    }
}
