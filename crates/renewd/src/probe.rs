//! Capability probe for the companion VPN client.
//!
//! Checks the service registry on Windows and PATH on Linux. Every failure
//! mode (probe error, timeout, unknown platform) reads as "not installed".

use async_trait::async_trait;
use renew_shared::{CommandSpec, PlatformKind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::runner::CommandRunner;

/// Names the companion client goes by on each platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    /// Human-readable name and PATH binary ("tailscale")
    pub name: String,
    /// Windows service name ("Tailscale")
    pub windows_service: String,
    /// systemd unit ("tailscaled")
    pub linux_unit: String,
}

impl Companion {
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        let mut chars = name.chars();
        let windows_service = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self {
            linux_unit: format!("{}d", name),
            windows_service,
            name,
        }
    }

    /// Display name used in reports ("Tailscale")
    pub fn display_name(&self) -> &str {
        &self.windows_service
    }
}

impl Default for Companion {
    fn default() -> Self {
        Self::new("tailscale")
    }
}

#[async_trait]
pub trait CompanionProbe: Send + Sync {
    async fn is_installed(&self) -> bool;
}

/// Probe backed by the host's service registry / PATH
pub struct SystemCompanionProbe {
    platform: PlatformKind,
    companion: Companion,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl SystemCompanionProbe {
    pub fn new(
        platform: PlatformKind,
        companion: Companion,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
    ) -> Self {
        Self {
            platform,
            companion,
            runner,
            timeout,
        }
    }

    async fn query_windows_service(&self) -> bool {
        let spec = CommandSpec::new(["sc", "query", self.companion.windows_service.as_str()]);
        match self.runner.run(&spec, self.timeout).await {
            Ok(outcome) => outcome.succeeded,
            Err(e) => {
                warn!("Service query for {} failed: {}", self.companion.windows_service, e);
                false
            }
        }
    }

    async fn lookup_in_path(&self) -> bool {
        let binary = self.companion.name.clone();
        let lookup = tokio::task::spawn_blocking(move || which::which(&binary));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(Ok(path))) => {
                debug!("Found {} at {}", self.companion.name, path.display());
                true
            }
            Ok(Ok(Err(_))) => false,
            Ok(Err(e)) => {
                warn!("PATH lookup for {} failed: {}", self.companion.name, e);
                false
            }
            Err(_) => {
                warn!("PATH lookup for {} timed out", self.companion.name);
                false
            }
        }
    }
}

#[async_trait]
impl CompanionProbe for SystemCompanionProbe {
    async fn is_installed(&self) -> bool {
        match self.platform {
            PlatformKind::Windows => self.query_windows_service().await,
            PlatformKind::Linux => self.lookup_in_path().await,
            PlatformKind::Unknown => false,
        }
    }
}

/// Fixed-answer probe for tests; counts how often it was asked
pub struct FakeCompanionProbe {
    installed: AtomicBool,
    checks: AtomicUsize,
}

impl FakeCompanionProbe {
    pub fn new(installed: bool) -> Self {
        Self {
            installed: AtomicBool::new(installed),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn set_installed(&self, installed: bool) {
        self.installed.store(installed, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompanionProbe for FakeCompanionProbe {
    async fn is_installed(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.installed.load(Ordering::SeqCst)
    }
}
