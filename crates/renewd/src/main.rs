//! renewd - renews the host's network lease on an authenticated HTTP call
//! and restarts the Tailscale client afterwards.

use anyhow::{Context, Result};
use clap::Parser;
use renew_shared::PlatformKind;
use renewd::config::Config;
use renewd::decoder;
use renewd::probe::{Companion, SystemCompanionProbe};
use renewd::runner::RealCommandRunner;
use renewd::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "renewd", version, about = "Network lease renewal daemon")]
struct Cli {
    /// TOML config file (overrides RENEWD_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen address (overrides RENEWD_BIND)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    info!("[BOOT] renewd v{} starting...", env!("CARGO_PKG_VERSION"));

    if config.uses_default_secret() {
        warn!("[BOOT] Using the default secret; set RENEW_SECRET before exposing this port");
    }

    let platform = PlatformKind::detect();
    info!("[BOOT] Platform: {}", platform);

    let probe_timeout = Duration::from_secs(config.probe_timeout_secs);
    let decoder = decoder::resolve(platform, probe_timeout).await;
    let runner = Arc::new(RealCommandRunner::new(decoder));

    let probe = Arc::new(SystemCompanionProbe::new(
        platform,
        Companion::new(&config.companion_service),
        runner.clone(),
        probe_timeout,
    ));

    info!(
        "[BOOT] Interface: {}, companion: {}",
        config.linux_interface, config.companion_service
    );

    let state = AppState::new(Arc::new(config), platform, runner, probe);
    server::run(state).await
}
