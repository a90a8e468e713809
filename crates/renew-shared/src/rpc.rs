//! Request and response bodies of the renewd HTTP API.

use serde::{Deserialize, Serialize};

/// Action performed when a request does not name one
pub const DEFAULT_ACTION: &str = "renew";

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

/// Body of `POST /renew`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalRequest {
    pub secret: String,
    #[serde(default = "default_action")]
    pub action: String,
}

impl RenewalRequest {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            action: default_action(),
        }
    }

    pub fn is_renew(&self) -> bool {
        self.action.trim().eq_ignore_ascii_case(DEFAULT_ACTION)
    }
}

/// Response of `POST /renew`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalResponse {
    pub success: bool,
    pub message: String,
    pub platform: String,
}

impl RenewalResponse {
    pub fn ok(message: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            platform: platform.into(),
        }
    }

    pub fn error(message: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            platform: platform.into(),
        }
    }
}

/// Response of `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub platform: String,
    pub tailscale_installed: bool,
    pub service: String,
}
