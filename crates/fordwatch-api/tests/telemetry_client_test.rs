#![allow(clippy::unwrap_used)]
// Integration tests for `SessionManager` + `VehicleStatusClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fordwatch_api::{Credentials, Endpoints, Error, SessionManager, VehicleStatusClient};

const VIN: &str = "1FTVW1EV0PWG00001";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, VehicleStatusClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let session = SessionManager::new(
        reqwest::Client::new(),
        Credentials {
            username: "driver@example.com".into(),
            password: "hunter2".to_string().into(),
        },
        Endpoints::with_base(&base).unwrap(),
    );
    (server, VehicleStatusClient::new(session, VIN))
}

fn auth_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": 200,
        "access_token": "ford-token-1",
    }))
}

fn exchange_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
}

fn telemetry_body(charge: f64, range: f64) -> serde_json::Value {
    json!({
        "metrics": {
            "xevBatteryActualStateOfCharge": {
                "value": charge,
                "updateTime": "2026-03-01T08:00:00Z"
            },
            "xevBatteryRange": {
                "value": range,
                "updateTime": "2026-03-01T08:00:00Z"
            }
        }
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(auth_ok())
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/oidc/token"))
        .and(body_string_contains("grant_type"))
        .respond_with(exchange_ok("bearer-token-1"))
        .mount(server)
        .await;
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_runs_two_leg_login() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .and(header("Authorization", "Bearer bearer-token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(telemetry_body(62.4, 290.0)))
        .mount(&server)
        .await;

    let status = client.fetch().await.unwrap();
    assert_eq!(status.charge_percent, Some(62.4));
    assert_eq!(status.range_km, Some(290.0));
}

#[tokio::test]
async fn test_token_reused_across_fetches() {
    let (server, client) = setup().await;

    // Each auth leg may be hit exactly once; a second hit fails the test.
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(auth_ok())
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/oidc/token"))
        .respond_with(exchange_ok("bearer-token-1"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(telemetry_body(62.0, 290.0)))
        .mount(&server)
        .await;

    client.fetch().await.unwrap();
    client.fetch().await.unwrap();
}

#[tokio::test]
async fn test_rejected_credentials() {
    let (server, client) = setup().await;

    // HTTP 200 with an inner failure status -- the backend's usual shape.
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 401,
            "message": "The username or password is incorrect",
        })))
        .mount(&server)
        .await;

    let result = client.fetch().await;
    match result {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("incorrect"), "unexpected message: {message}");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_http_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;

    let result = client.fetch().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unauthorized_triggers_single_reauth_retry() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(auth_ok())
        .mount(&server)
        .await;

    // First exchange issues a token the telemetry endpoint rejects;
    // the retry gets a fresh one that works.
    Mock::given(method("POST"))
        .and(path("/v1/auth/oidc/token"))
        .respond_with(exchange_ok("stale-token"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/oidc/token"))
        .respond_with(exchange_ok("fresh-token"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(telemetry_body(65.0, 300.0)))
        .mount(&server)
        .await;

    // One extra round trip, no user-visible error.
    let status = client.fetch().await.unwrap();
    assert_eq!(status.charge_percent, Some(65.0));
}

#[tokio::test]
async fn test_persistent_unauthorized_propagates() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = client.fetch().await;
    assert!(
        matches!(result, Err(Error::SessionExpired { status: 403 })),
        "expected SessionExpired, got: {result:?}"
    );
}

// ── Telemetry parsing tests ─────────────────────────────────────────

#[tokio::test]
async fn test_partial_payload_yields_null_fields() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    // Vendor dropped the charge metric entirely.
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": {
                "xevBatteryRange": { "value": 180.5 }
            }
        })))
        .mount(&server)
        .await;

    let status = client.fetch().await.unwrap();
    assert_eq!(status.charge_percent, None);
    assert_eq!(status.range_km, Some(180.5));
}

#[tokio::test]
async fn test_unparseable_body_is_deserialization_error() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway error</html>"))
        .mount(&server)
        .await;

    let result = client.fetch().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let result = client.fetch().await;
    match result {
        Err(e @ Error::Api { status: 503, .. }) => assert!(e.is_transient()),
        other => panic!("expected Api 503, got: {other:?}"),
    }
}
