//! HTTP dispatch tests for renewd
//!
//! These drive the router directly with FakeCommandRunner and
//! FakeCompanionProbe, so no real command is ever launched.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use renew_shared::{PlatformKind, RenewalResponse, StatusResponse};
use renewd::config::Config;
use renewd::probe::FakeCompanionProbe;
use renewd::runner::{FakeCommandRunner, FakeResponse};
use renewd::server::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "correct-horse-battery-staple";

struct Harness {
    runner: Arc<FakeCommandRunner>,
    probe: Arc<FakeCompanionProbe>,
    app: Router,
}

fn harness(platform: PlatformKind, runner: FakeCommandRunner, installed: bool) -> Harness {
    let config = Config {
        secret: SECRET.to_string(),
        ..Config::default()
    };
    let runner = Arc::new(runner);
    let probe = Arc::new(FakeCompanionProbe::new(installed));
    let state = AppState::new(Arc::new(config), platform, runner.clone(), probe.clone());
    Harness {
        runner,
        probe,
        app: server::app(state),
    }
}

fn renew_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/renew")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn renew(app: &Router, body: &str) -> (StatusCode, RenewalResponse) {
    let (status, bytes) = send(app, renew_request(body)).await;
    let parsed: RenewalResponse = serde_json::from_slice(&bytes).unwrap();
    (status, parsed)
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_wrong_secret_is_unauthorized_and_runs_nothing() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), true);

    for secret in ["", "wrong", "CORRECT-HORSE-BATTERY-STAPLE", "correct-horse-battery-staple "] {
        let body = serde_json::json!({ "secret": secret }).to_string();
        let (status, response) = renew(&h.app, &body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "secret {:?}", secret);
        assert!(!response.success);
        assert_eq!(response.message, "invalid secret");
        assert_eq!(response.platform, "linux");
    }

    assert_eq!(h.runner.total_calls(), 0);
    assert_eq!(h.probe.checks(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_internal_error() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), true);

    let (status, response) = renew(&h.app, "{not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.success);

    let (status, _) = renew(&h.app, r#"{"action":"renew"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(h.runner.total_calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_keeps_json_envelope() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), true);
    let padding = "x".repeat(server::MAX_BODY_SIZE + 6 * 1024);
    let body = serde_json::json!({ "secret": SECRET, "padding": padding }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!response.success);
    assert_eq!(response.message, "request body exceeds 65536 bytes");
    assert_eq!(response.platform, "linux");
    assert_eq!(h.runner.total_calls(), 0);
}

#[tokio::test]
async fn test_unsupported_action_after_auth() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), true);
    let body = serde_json::json!({ "secret": SECRET, "action": "reboot" }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message, "unsupported action: reboot");
    assert_eq!(h.runner.total_calls(), 0);
}

// ============================================================================
// Successful renewal
// ============================================================================

#[tokio::test]
async fn test_linux_renewal_short_circuits_and_restarts_companion() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), true);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.success);
    assert_eq!(response.platform, "linux");
    assert_eq!(
        response.message,
        "[lease renewal]\n✓ networkctl reconfigure eth0\n\n[tailscale]\n\
         ✓ systemctl stop tailscaled\n✓ systemctl start tailscaled"
    );
    assert_eq!(
        h.runner.calls(),
        vec![
            "networkctl reconfigure eth0",
            "systemctl stop tailscaled",
            "systemctl start tailscaled",
        ]
    );
}

#[tokio::test]
async fn test_companion_runs_even_when_lease_renewal_fails() {
    let runner = FakeCommandRunner::new().with_default(FakeResponse::fail("boom"));
    let h = harness(PlatformKind::Linux, runner, true);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.success);
    assert_eq!(h.runner.total_calls(), 5);
    assert!(response.message.contains("✗ dhclient eth0: boom"));
    assert!(response.message.contains("✗ systemctl start tailscaled: boom"));
}

#[tokio::test]
async fn test_windows_without_companion() {
    let h = harness(PlatformKind::Windows, FakeCommandRunner::new(), false);
    let body = serde_json::json!({ "secret": SECRET, "action": "renew" }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response.message,
        "[lease renewal]\n✓ ipconfig /renew6\n\n[tailscale]\n\
         Tailscale not installed, skipping restart"
    );
    assert_eq!(h.runner.calls(), vec!["ipconfig /renew6"]);
}

#[tokio::test]
async fn test_unknown_platform_renewal_is_well_formed() {
    let h = harness(PlatformKind::Unknown, FakeCommandRunner::new(), false);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response
        .message
        .contains("no lease renewal commands for platform unknown"));
    assert_eq!(h.runner.total_calls(), 0);
}

#[tokio::test]
async fn test_sequential_renewals_are_independent() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), false);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let (first_status, first) = renew(&h.app, &body).await;
    let (second_status, second) = renew(&h.app, &body).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert!(first.success && second.success);
    assert_eq!(first.message, second.message);
    assert_eq!(h.runner.total_calls(), 2);
}

#[tokio::test]
async fn test_orchestration_panic_becomes_internal_error() {
    let runner =
        FakeCommandRunner::new().respond("networkctl reconfigure eth0", FakeResponse::panic());
    let h = harness(PlatformKind::Linux, runner, false);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.success);
    assert!(response.message.contains("networkctl reconfigure eth0"));

    // The lock is released after a failed run
    let (status, _) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Single-flight
// ============================================================================

#[tokio::test]
async fn test_concurrent_renewal_is_rejected_as_busy() {
    let runner = FakeCommandRunner::new().respond(
        "networkctl reconfigure eth0",
        FakeResponse::ok("").after(Duration::from_millis(300)),
    );
    let h = harness(PlatformKind::Linux, runner, false);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let app = h.app.clone();
    let first_body = body.clone();
    let first = tokio::spawn(async move { renew(&app, &first_body).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response.message, "renewal already in progress");

    let (first_status, first_response) = first.await.unwrap();
    assert_eq!(first_status, StatusCode::OK);
    assert!(first_response.success);
    assert_eq!(h.runner.total_calls(), 1);
}

#[tokio::test]
async fn test_unauthenticated_request_does_not_take_the_lock() {
    let runner = FakeCommandRunner::new().respond(
        "networkctl reconfigure eth0",
        FakeResponse::ok("").after(Duration::from_millis(300)),
    );
    let h = harness(PlatformKind::Linux, runner, false);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let app = h.app.clone();
    let running = tokio::spawn(async move { renew(&app, &body).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Auth is checked before the busy check
    let (status, _) = renew(&h.app, r#"{"secret":"nope"}"#).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = running.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_dropped_request_finishes_renewal_and_holds_lock() {
    let runner = FakeCommandRunner::new()
        .with_default(FakeResponse::fail("down").after(Duration::from_millis(100)));
    let h = harness(PlatformKind::Linux, runner, true);
    let body = serde_json::json!({ "secret": SECRET }).to_string();

    let client = tokio::spawn(h.app.clone().oneshot(renew_request(&body)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.abort();
    assert!(client.await.unwrap_err().is_cancelled());

    // The orchestration outlives the client and keeps the lock
    let (status, _) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while h.runner.total_calls() < 5 {
        assert!(tokio::time::Instant::now() < deadline, "renewal stalled");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let (status, _) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        h.runner.calls(),
        vec![
            "networkctl reconfigure eth0",
            "dhclient -r eth0",
            "dhclient eth0",
            "systemctl stop tailscaled",
            "systemctl start tailscaled",
        ]
    );

    h.runner.reset_calls();
    let (status, response) = renew(&h.app, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.success);
    assert_eq!(h.runner.total_calls(), 5);
}

// ============================================================================
// Info routes
// ============================================================================

#[tokio::test]
async fn test_status_reflects_probe() {
    for installed in [true, false] {
        let h = harness(PlatformKind::Windows, FakeCommandRunner::new(), installed);
        let request = Request::builder().uri("/status").body(Body::empty()).unwrap();

        let (status, bytes) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        let parsed: StatusResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.tailscale_installed, installed);
        assert_eq!(parsed.platform, "windows");
        assert_eq!(parsed.service, "running");
        assert_eq!(h.runner.total_calls(), 0);
    }
}

#[tokio::test]
async fn test_index_names_platform() {
    let h = harness(PlatformKind::Linux, FakeCommandRunner::new(), false);
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, bytes) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("renewd v"));
    assert!(text.contains("platform: linux"));
}
