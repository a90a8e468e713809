//! Authenticated dispatch of renewal requests.
//!
//! Received -> secret checked -> (accepted) lease renewed -> companion
//! checked -> responded. A rejected request never runs a command.

use axum::http::StatusCode;
use renew_shared::{PlanResult, RenewalRequest};
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::server::AppState;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid secret")]
    InvalidSecret,

    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("renewal already in progress")]
    Busy,

    #[error("invalid request body: {0}")]
    MalformedRequest(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    Internal(String),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::InvalidSecret => StatusCode::UNAUTHORIZED,
            DispatchError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
            DispatchError::Busy => StatusCode::CONFLICT,
            DispatchError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DispatchError::MalformedRequest(_) | DispatchError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Exact, case-sensitive comparison
pub fn secret_matches(expected: &str, provided: &str) -> bool {
    expected == provided
}

/// Report sent back for a successful renewal
pub fn combine_message(lease: &PlanResult, companion_name: &str, companion: &PlanResult) -> String {
    format!(
        "[lease renewal]\n{}\n\n[{}]\n{}",
        lease,
        companion_name.to_lowercase(),
        companion
    )
}

/// Check the secret, then run lease renewal followed by the companion
/// restart and return the combined report.
///
/// The plans run on their own task: a dropped request does not stop
/// commands that were already started, and the single-flight guard is
/// released only once the plans are done.
pub async fn dispatch(state: &AppState, request: RenewalRequest) -> Result<String, DispatchError> {
    if !secret_matches(&state.config.secret, &request.secret) {
        warn!("Rejected renewal request: invalid secret");
        return Err(DispatchError::InvalidSecret);
    }

    if !request.is_renew() {
        warn!("Rejected renewal request: unsupported action '{}'", request.action);
        return Err(DispatchError::UnsupportedAction(request.action));
    }

    let guard = match Arc::clone(&state.renewal_lock).try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("Renewal already in progress, rejecting concurrent request");
            return Err(DispatchError::Busy);
        }
    };

    info!("Renewal accepted on {}", state.platform);

    let lease = Arc::clone(&state.lease);
    let companion = Arc::clone(&state.companion);
    let task = tokio::spawn(async move {
        let _guard = guard;
        let lease_result = lease.renew().await;
        let companion_result = companion.restart().await;
        (lease_result, companion_result)
    });

    let (lease_result, companion_result) = task.await.map_err(|e| {
        let message = if e.is_panic() {
            panic_message(e.into_panic())
        } else {
            format!("renewal task failed: {}", e)
        };
        error!("Renewal orchestration failed: {}", message);
        DispatchError::Internal(message)
    })?;

    Ok(combine_message(
        &lease_result,
        state.companion.companion().display_name(),
        &companion_result,
    ))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "renewal task panicked".to_string()
    }
}
