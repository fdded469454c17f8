// Integration tests for `Coordinator` against a wiremock Rise cloud.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use risegarden_core::{
    Availability, CoordinatorConfig, CoreError, Coordinator, Credentials, CycleState, CycleStatus,
    GardenId, LightCommand,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer, timeout: Duration) -> CoordinatorConfig {
    let credentials = Credentials::new("grower@example.com", SecretString::from("hunter2"));
    let mut config = CoordinatorConfig::new(credentials);
    config.api_base = format!("{}/v2", server.uri());
    config.auth_url = format!("{}/oauth/token", server.uri());
    config.timeout = timeout;
    config.refresh_interval = Duration::ZERO;
    config
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })),
        )
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, gardens: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "gardens": gardens })))
        .mount(server)
        .await;
}

fn detail(id: u64) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path("/v2/device/last_data_sensors"))
        .and(query_param("garden_id", id.to_string()))
}

fn two_gardens() -> serde_json::Value {
    json!([
        { "id": 1, "name": "Kitchen", "is_online": true },
        { "id": 2, "name": "Office", "is_online": true },
    ])
}

// ── Refresh cycles ──────────────────────────────────────────────────

#[tokio::test]
async fn test_successful_cycle_publishes_revision() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, two_gardens()).await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 21.0, "l1": 60 })))
        .mount(&server)
        .await;
    detail(2)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 18.5, "water_depth": 90 })))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let outcome = coordinator.refresh().await.unwrap();

    assert_eq!(outcome.status, CycleStatus::Success);
    assert_eq!(outcome.revision, 1);
    assert_eq!(outcome.fetched, 2);

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.revision, 1);
    let kitchen = snapshot.garden(GardenId(1)).unwrap();
    assert_eq!(kitchen.name, "Kitchen");
    assert!(kitchen.online);
    assert_eq!(kitchen.temperature_c, Some(21.0));
    assert_eq!(kitchen.light.brightness, 60);
    let office = snapshot.garden(GardenId(2)).unwrap();
    assert_eq!(office.water.depth_mm, Some(90.0));
    assert_eq!(*coordinator.availability().borrow(), Availability::Available);
}

#[tokio::test]
async fn test_timed_out_garden_keeps_last_known_state() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, two_gardens()).await;

    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 20.0 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 23.0 })))
        .mount(&server)
        .await;
    detail(2)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 17.0 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    detail(2)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "at": 99.0 }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(1))).unwrap();
    coordinator.refresh().await.unwrap();
    let office_before = coordinator.garden(GardenId(2)).unwrap();

    let outcome = coordinator.refresh().await.unwrap();

    assert_eq!(outcome.status, CycleStatus::PartialFailure);
    assert_eq!(outcome.revision, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].garden, GardenId(2));
    assert!(outcome.failures[0].error.is_transient());

    assert_eq!(coordinator.garden(GardenId(1)).unwrap().temperature_c, Some(23.0));
    let office_after = coordinator.garden(GardenId(2)).unwrap();
    assert_eq!(office_after, office_before);
    assert!(office_after.online);

    assert_eq!(coordinator.last_failures().len(), 1);
    assert_eq!(*coordinator.availability().borrow(), Availability::Degraded);
}

#[tokio::test]
async fn test_rejected_credentials_are_a_total_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "invalid_grant" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let stream = coordinator.subscribe();

    let err = coordinator.refresh().await.unwrap_err();
    assert!(err.is_auth(), "got {err:?}");

    assert_eq!(coordinator.snapshot().revision, 0);
    assert!(coordinator.snapshot().is_empty());
    assert_eq!(stream.latest().revision, 0);
    assert_eq!(*coordinator.availability().borrow(), Availability::AuthFailed);

    // Rejection is sticky: no second identity provider call.
    let again = coordinator.refresh().await.unwrap_err();
    assert!(again.is_auth());
}

#[tokio::test]
async fn test_listing_failure_leaves_snapshot_alone() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "gardens": two_gardens() })))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 20.0 })))
        .mount(&server)
        .await;
    detail(2)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 17.0 })))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let revisions: Vec<u64> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(coordinator.refresh().await.unwrap().revision);
        }
        out
    };
    assert_eq!(revisions, vec![1, 2, 3]);

    let err = coordinator.refresh().await.unwrap_err();
    assert!(matches!(err, CoreError::Api { status: Some(502), .. }), "got {err:?}");
    assert!(err.is_transient());
    assert_eq!(coordinator.snapshot().revision, 3);
    assert_eq!(coordinator.snapshot().len(), 2);
    assert_eq!(*coordinator.availability().borrow(), Availability::Unavailable);
}

#[tokio::test]
async fn test_every_garden_failing_is_a_total_failure() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, two_gardens()).await;
    Mock::given(method("GET"))
        .and(path("/v2/device/last_data_sensors"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, CoreError::RefreshFailed { .. }), "got {err:?}");
    assert_eq!(coordinator.snapshot().revision, 0);
    assert_eq!(coordinator.last_failures().len(), 2);
}

#[tokio::test]
async fn test_empty_account_succeeds_without_revision() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, json!([])).await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let outcome = coordinator.refresh().await.unwrap();

    assert_eq!(outcome.status, CycleStatus::Success);
    assert_eq!(outcome.revision, 0);
    assert_eq!(outcome.fetched, 0);
}

#[tokio::test]
async fn test_emptied_listing_takes_gardens_offline() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gardens": [{ "id": 1, "name": "Kitchen", "is_online": true }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(&server, json!([])).await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 20.0 })))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    coordinator.refresh().await.unwrap();
    assert!(coordinator.garden(GardenId(1)).unwrap().online);

    let mut stream = coordinator.subscribe();
    let outcome = coordinator.refresh().await.unwrap();

    assert_eq!(outcome.status, CycleStatus::Success);
    assert_eq!(outcome.revision, 2);
    assert_eq!(outcome.fetched, 0);
    let garden = coordinator.garden(GardenId(1)).unwrap();
    assert!(!garden.online);
    assert_eq!(garden.temperature_c, Some(20.0));
    let published = tokio::time::timeout(Duration::from_secs(1), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.revision, 2);

    // Nothing left to take offline: no new revision.
    let outcome = coordinator.refresh().await.unwrap();
    assert_eq!(outcome.revision, 2);
}

#[tokio::test]
async fn test_out_of_range_token_lifetime_keeps_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok", "expires_in": u64::MAX })),
        )
        .mount(&server)
        .await;
    mount_listing(&server, json!([{ "id": 1, "name": "Kitchen", "is_online": true }])).await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 20.0 })))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();

    assert_eq!(coordinator.refresh().await.unwrap().revision, 1);
    assert_eq!(coordinator.refresh().await.unwrap().revision, 2);
    assert_eq!(*coordinator.cycle_state().borrow(), CycleState::Idle);
}

// ── Single flight ───────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_share_one_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "gardens": [{ "id": 1, "name": "Kitchen", "is_online": true }] }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 20.0 })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let calls = (0..5).map(|_| coordinator.refresh());
    let results = futures_util::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().revision, 1);
    }
    assert_eq!(coordinator.snapshot().revision, 1);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_light_command_triggers_refresh() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, json!([{ "id": 1, "name": "Kitchen", "is_online": true }])).await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "l1": 40 })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2/gardens/1/device/light-level"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    coordinator.refresh().await.unwrap();
    let mut stream = coordinator.subscribe();

    coordinator
        .set_light(GardenId(1), LightCommand::turn_on(Some(255)))
        .await
        .unwrap();

    let next = tokio::time::timeout(Duration::from_secs(5), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.revision, 2);
}

#[tokio::test]
async fn test_invalid_light_level_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(5))).unwrap();
    let err = coordinator
        .set_light(GardenId(1), LightCommand::level(101))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::InvalidArgument { .. }), "got {err:?}");
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_periodic_loop_polls_until_shutdown() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, json!([{ "id": 1, "name": "Kitchen", "is_online": true }])).await;
    detail(1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "at": 20.0 })))
        .mount(&server)
        .await;

    let mut cfg = config(&server, Duration::from_secs(5));
    cfg.refresh_interval = Duration::from_millis(200);
    let coordinator = Coordinator::new(cfg).unwrap();

    let initial = coordinator.start().await.unwrap();
    assert_eq!(initial.revision, 1);

    let mut stream = coordinator.subscribe();
    let next = tokio::time::timeout(Duration::from_secs(5), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(next.revision >= 2);

    coordinator.shutdown().await;
    let err = coordinator.refresh().await.unwrap_err();
    assert_eq!(err, CoreError::ShutDown);
}

#[tokio::test]
async fn test_shutdown_abandons_cycle_in_flight() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_listing(&server, json!([{ "id": 1, "name": "Kitchen", "is_online": true }])).await;
    detail(1)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "at": 20.0 }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server, Duration::from_secs(30))).unwrap();
    let mut state = coordinator.cycle_state();
    let waiter = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh().await }
    });

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == CycleState::Refreshing),
    )
    .await
    .unwrap()
    .unwrap();

    let started = std::time::Instant::now();
    tokio::time::timeout(Duration::from_secs(5), coordinator.shutdown())
        .await
        .unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();

    assert_eq!(err, CoreError::ShutDown);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(coordinator.snapshot().revision, 0);
    assert!(coordinator.garden(GardenId(1)).is_none());
    assert_eq!(*coordinator.cycle_state().borrow(), CycleState::Idle);
}
