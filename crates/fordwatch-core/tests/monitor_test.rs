#![allow(clippy::unwrap_used)]
// End-to-end monitor loop tests against a wiremock backend.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fordwatch_api::{Credentials, Endpoints, SessionManager, VehicleStatusClient};
use fordwatch_core::{
    BackoffConfig, CoreError, DetectPolicy, Monitor, MonitorConfig, NotificationDispatcher,
    NotifyBackend, PersistedState, StateStore, VehicleStatus,
};

const VIN: &str = "1FTVW1EV0PWG00001";

fn client_for(server: &MockServer) -> VehicleStatusClient {
    let base = Url::parse(&server.uri()).unwrap();
    let session = SessionManager::new(
        reqwest::Client::new(),
        Credentials {
            username: "driver@example.com".into(),
            password: "hunter2".to_string().into(),
        },
        Endpoints::with_base(&base).unwrap(),
    );
    VehicleStatusClient::new(session, VIN)
}

fn fast_config(max_auth_failures: u32) -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_millis(10),
        backoff: BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        max_auth_failures,
    }
}

fn console_dispatcher() -> NotificationDispatcher {
    NotificationDispatcher::with_backends(vec![NotifyBackend::Console])
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "access_token": "ford-token",
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/oidc/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-token",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

async fn mount_telemetry(server: &MockServer, charge: f64, range: f64) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": {
                "xevBatteryActualStateOfCharge": { "value": charge },
                "xevBatteryRange": { "value": range },
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn three_consecutive_auth_failures_are_fatal() {
    let server = MockServer::start().await;

    // The backend rejects the credentials inside an HTTP 200 envelope.
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 401,
            "message": "The username or password is incorrect",
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::new(
        client_for(&server),
        StateStore::new(dir.path().join("state.json")),
        console_dispatcher(),
        DetectPolicy::default(),
        fast_config(3),
    );

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run(CancellationToken::new()),
    )
    .await
    .expect("monitor should terminate on its own");

    assert!(
        matches!(result, Err(CoreError::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
}

#[tokio::test]
async fn change_is_detected_and_new_state_persisted() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_telemetry(&server, 65.0, 190.0).await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    // Seed a previous observation so the first cycle sees a delta.
    let store = StateStore::new(&state_path);
    store
        .save(&PersistedState {
            last_known: VehicleStatus {
                charge_percent: Some(62.0),
                range_km: Some(180.0),
                raw_timestamp: None,
                plug_status: None,
                charging_status: None,
            },
            last_notified_at: None,
        })
        .unwrap();

    let monitor = Monitor::new(
        client_for(&server),
        StateStore::new(&state_path),
        console_dispatcher(),
        DetectPolicy::default(),
        fast_config(3),
    );

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    // Wait until the new observation lands on disk.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(state) = StateStore::new(&state_path).load() {
            if state.last_known.charge_percent == Some(65.0) {
                assert_eq!(state.last_known.range_km, Some(190.0));
                assert!(
                    state.last_notified_at.is_some(),
                    "a change notification should stamp last_notified_at"
                );
                break;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "monitor never persisted the new observation"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("monitor should stop promptly after cancellation")
        .unwrap();
    assert!(result.is_ok(), "cancellation is a clean exit: {result:?}");
}

#[tokio::test]
async fn failing_notification_backends_do_not_stall_the_loop() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_telemetry(&server, 65.0, 190.0).await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    StateStore::new(&state_path)
        .save(&PersistedState {
            last_known: VehicleStatus {
                charge_percent: Some(62.0),
                range_km: Some(180.0),
                raw_timestamp: None,
                plug_status: None,
                charging_status: None,
            },
            last_notified_at: None,
        })
        .unwrap();

    // Every backend points at a missing binary; delivery fails but the
    // cycle must still complete and persist the new observation.
    let dispatcher = NotificationDispatcher::with_backends(vec![NotifyBackend::NotifySend {
        program: "/nonexistent/fordwatch-test-notifier".into(),
    }]);

    let monitor = Monitor::new(
        client_for(&server),
        StateStore::new(&state_path),
        dispatcher,
        DetectPolicy::default(),
        fast_config(3),
    );

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(state) = StateStore::new(&state_path).load() {
            if state.last_known.charge_percent == Some(65.0) {
                break;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "loop stalled behind the failing notification backend"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok(), "delivery failure must not be fatal: {result:?}");
}

#[tokio::test]
async fn unchanged_reading_does_not_stamp_notification_time() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_telemetry(&server, 62.0, 180.0).await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let store = StateStore::new(&state_path);
    store
        .save(&PersistedState {
            last_known: VehicleStatus {
                charge_percent: Some(62.0),
                range_km: Some(180.0),
                raw_timestamp: None,
                plug_status: None,
                charging_status: None,
            },
            last_notified_at: None,
        })
        .unwrap();

    let monitor = Monitor::new(
        client_for(&server),
        StateStore::new(&state_path),
        console_dispatcher(),
        DetectPolicy::default(),
        fast_config(3),
    );

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let state = StateStore::new(&state_path).load().unwrap();
    assert!(
        state.last_notified_at.is_none(),
        "no change means no notification timestamp"
    );
}

#[tokio::test]
async fn pre_cancelled_monitor_exits_immediately() {
    // Unreachable server: the loop must observe cancellation before
    // attempting any network call.
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let monitor = Monitor::new(
        client_for(&server),
        StateStore::new(dir.path().join("state.json")),
        console_dispatcher(),
        DetectPolicy::default(),
        fast_config(3),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), monitor.run(cancel))
        .await
        .expect("pre-cancelled run should return at once");
    assert!(result.is_ok());
}

#[tokio::test]
async fn transient_failures_recover_without_terminating() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    // Two 503s, then a healthy response.
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/telemetry/sources/fordpass/vehicles/{VIN}"
        )))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_telemetry(&server, 70.0, 210.0).await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let monitor = Monitor::new(
        client_for(&server),
        StateStore::new(&state_path),
        console_dispatcher(),
        DetectPolicy::default(),
        fast_config(3),
    );

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(state) = StateStore::new(&state_path).load() {
            assert_eq!(state.last_known.charge_percent, Some(70.0));
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "monitor never recovered from transient failures"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
