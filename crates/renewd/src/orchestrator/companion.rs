//! Companion VPN client restart plan.

use renew_shared::{CommandSpec, PlanResult, PlatformKind, StepReport};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{run_plan, StepPolicy};
use crate::probe::{Companion, CompanionProbe};
use crate::runner::CommandRunner;

/// Stop-then-start pair for a platform. Total: Unknown is empty.
pub fn restart_plan(platform: PlatformKind, companion: &Companion) -> Vec<CommandSpec> {
    match platform {
        PlatformKind::Windows => vec![
            CommandSpec::new(["net", "stop", companion.windows_service.as_str()]),
            CommandSpec::new(["net", "start", companion.windows_service.as_str()]),
        ],
        PlatformKind::Linux => vec![
            CommandSpec::new(["systemctl", "stop", companion.linux_unit.as_str()]),
            CommandSpec::new(["systemctl", "start", companion.linux_unit.as_str()]),
        ],
        PlatformKind::Unknown => Vec::new(),
    }
}

pub struct CompanionRestart {
    platform: PlatformKind,
    companion: Companion,
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn CompanionProbe>,
    timeout: Duration,
}

impl CompanionRestart {
    pub fn new(
        platform: PlatformKind,
        companion: Companion,
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn CompanionProbe>,
        timeout: Duration,
    ) -> Self {
        Self {
            platform,
            companion,
            runner,
            probe,
            timeout,
        }
    }

    pub fn companion(&self) -> &Companion {
        &self.companion
    }

    pub fn plan(&self) -> Vec<CommandSpec> {
        restart_plan(self.platform, &self.companion)
    }

    /// Line reported instead of a plan when the client is absent
    pub fn not_installed_message(&self) -> String {
        format!("{} not installed, skipping restart", self.companion.display_name())
    }

    /// Restart the companion if it is installed. Both steps always run.
    pub async fn restart(&self) -> PlanResult {
        if !self.probe.is_installed().await {
            info!("{} not installed, nothing to restart", self.companion.name);
            return PlanResult::single(StepReport::note(self.not_installed_message()));
        }

        let plan = self.plan();
        info!("Restarting {} ({} steps)", self.companion.name, plan.len());
        run_plan(self.runner.as_ref(), &plan, StepPolicy::RunAll, self.timeout).await
    }
}
