//! API routes for renewd
//!
//! - `GET /` plain-text banner
//! - `GET /status` platform and companion presence
//! - `POST /renew` `{secret, action?}`, answered with
//!   `{success, message, platform}` and one of:
//!   200 renewed, 400 unsupported `action` (only "renew" is accepted),
//!   401 invalid secret, 409 another renewal is running,
//!   413 body over 64 KiB, 500 malformed body or internal fault.

use crate::dispatch::{self, DispatchError};
use crate::server::{AppState, MAX_BODY_SIZE};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use renew_shared::{RenewalRequest, RenewalResponse, StatusResponse};
use std::sync::Arc;
use tracing::{error, info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Info Routes
// ============================================================================

pub fn info_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
}

async fn index(State(state): State<AppStateArc>) -> String {
    format!(
        "renewd v{}\nplatform: {}\nuptime: {}s\n\
         POST /renew with {{\"secret\": \"...\"}} to renew the network lease\n",
        env!("CARGO_PKG_VERSION"),
        state.platform,
        state.start_time.elapsed().as_secs()
    )
}

async fn status(State(state): State<AppStateArc>) -> Json<StatusResponse> {
    let tailscale_installed = state.probe.is_installed().await;

    Json(StatusResponse {
        platform: state.platform.to_string(),
        tailscale_installed,
        service: "running".to_string(),
    })
}

// ============================================================================
// Renewal Routes
// ============================================================================

pub fn renewal_routes() -> Router<AppStateArc> {
    Router::new().route("/renew", post(renew))
}

async fn renew(
    State(state): State<AppStateArc>,
    payload: Result<Json<RenewalRequest>, JsonRejection>,
) -> (StatusCode, Json<RenewalResponse>) {
    let platform = state.platform.to_string();

    let result = match payload {
        Ok(Json(request)) => dispatch::dispatch(&state, request).await,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("  Renewal request body over {} bytes", MAX_BODY_SIZE);
            Err(DispatchError::PayloadTooLarge(MAX_BODY_SIZE))
        }
        Err(rejection) => {
            error!("  Malformed renewal request: {}", rejection.body_text());
            Err(DispatchError::MalformedRequest(rejection.body_text()))
        }
    };

    match result {
        Ok(message) => {
            info!("  Renewal completed");
            (StatusCode::OK, Json(RenewalResponse::ok(message, platform)))
        }
        Err(e) => (e.status_code(), Json(RenewalResponse::error(e.to_string(), platform))),
    }
}
