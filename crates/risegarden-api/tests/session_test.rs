// Integration tests for `Session`: re-authentication and argument checks.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use risegarden_api::{Credentials, Error, Session, SessionConfig, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn session(server: &MockServer) -> Session {
    let config = SessionConfig {
        api_base: format!("{}/v2", server.uri()),
        auth_url: format!("{}/oauth/token", server.uri()),
        transport: TransportConfig::default().with_timeout(Duration::from_secs(5)),
        token_margin: Duration::from_secs(60),
    };
    let credentials = Credentials::new("grower@example.com", SecretString::from("hunter2"));
    Session::new(&config, credentials).unwrap()
}

async fn mount_token_sequence(server: &MockServer, tokens: &[&str]) {
    for (i, token) in tokens.iter().enumerate() {
        let mock = Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": token, "expires_in": 3600 })),
            );
        // The last token answers every further exchange.
        let mock = if i + 1 < tokens.len() {
            mock.up_to_n_times(1)
        } else {
            mock
        };
        mock.mount(server).await;
    }
}

// ── Re-authentication ───────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_token_is_replaced_and_call_retried() {
    let server = MockServer::start().await;
    mount_token_sequence(&server, &["stale", "fresh"]).await;

    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "gardens": [{ "id": 1, "name": "Kitchen" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let gardens = session.list_gardens().await.unwrap();

    assert_eq!(gardens.len(), 1);
    assert_eq!(gardens[0].name.as_deref(), Some("Kitchen"));
}

#[tokio::test]
async fn test_second_rejection_escalates_to_auth_error() {
    let server = MockServer::start().await;
    mount_token_sequence(&server, &["first", "second"]).await;

    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let session = session(&server);
    let err = session.list_gardens().await.unwrap_err();

    assert!(matches!(err, Error::Authentication { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_non_auth_errors_are_not_retried() {
    let server = MockServer::start().await;
    mount_token_sequence(&server, &["tok"]).await;

    Mock::given(method("GET"))
        .and(path("/v2/device/last_data_sensors"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let err = session.garden_detail(3).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 500, .. }), "got {err:?}");
}

// ── Light commands ──────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_brightness_makes_no_requests() {
    let server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session(&server);

    for brightness in [-1, 101] {
        let err = session.set_light(1, true, brightness).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }), "got {err:?}");
    }
}

#[tokio::test]
async fn test_brightness_bounds_are_accepted() {
    let server = MockServer::start().await;
    mount_token_sequence(&server, &["tok"]).await;

    for level in [0, 100] {
        Mock::given(method("PUT"))
            .and(path("/v2/gardens/1/device/light-level"))
            .and(body_json(json!({ "light_level": level })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let session = session(&server);
    session.set_light(1, true, 0).await.unwrap();
    session.set_light(1, true, 100).await.unwrap();
}

#[tokio::test]
async fn test_verify_returns_gardens() {
    let server = MockServer::start().await;
    mount_token_sequence(&server, &["tok"]).await;

    Mock::given(method("GET"))
        .and(path("/v2/gardens/list_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gardens": [{ "id": 1, "name": "Kitchen" }, { "id": 2, "name": "Office" }]
        })))
        .mount(&server)
        .await;

    let session = session(&server);
    let gardens = session.verify().await.unwrap();

    let names: Vec<_> = gardens.iter().filter_map(|g| g.name.as_deref()).collect();
    assert_eq!(names, vec!["Kitchen", "Office"]);
}
