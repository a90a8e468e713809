//! HTTP server for renewd

use crate::config::Config;
use crate::orchestrator::{CompanionRestart, LeaseRenewal};
use crate::probe::{Companion, CompanionProbe};
use crate::routes;
use crate::runner::CommandRunner;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use renew_shared::PlatformKind;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Maximum request body size: 64 KiB. Enforced by the `Json` extractor so
/// an oversized body still gets the JSON error envelope.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Application state shared across handlers.
///
/// Everything here is read-only after start-up except `renewal_lock`.
pub struct AppState {
    pub config: Arc<Config>,
    pub platform: PlatformKind,
    pub probe: Arc<dyn CompanionProbe>,
    pub lease: Arc<LeaseRenewal>,
    pub companion: Arc<CompanionRestart>,
    /// Held for the whole lifetime of one renewal orchestration
    pub renewal_lock: Arc<Mutex<()>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        platform: PlatformKind,
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn CompanionProbe>,
    ) -> Self {
        let command_timeout = Duration::from_secs(config.command_timeout_secs);
        let lease = LeaseRenewal::new(
            platform,
            config.linux_interface.clone(),
            runner.clone(),
            command_timeout,
        );
        let companion = CompanionRestart::new(
            platform,
            Companion::new(&config.companion_service),
            runner,
            probe.clone(),
            command_timeout,
        );

        Self {
            config,
            platform,
            probe,
            lease: Arc::new(lease),
            companion: Arc::new(companion),
            renewal_lock: Arc::new(Mutex::new(())),
            start_time: Instant::now(),
        }
    }
}

/// Build the router with all routes and layers
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::info_routes())
        .merge(routes::renewal_routes())
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C / SIGTERM
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.listen_addr();
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
