//! Wire-level behaviour of `ReqwestTransport` as seen by an HTTP server.

use std::sync::Arc;
use std::time::Duration;

use resource_core::{ApiError, ApiOptions, ListOptions, Parameters, ResourceClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, endpoint: &str) -> ResourceClient {
    ResourceClient::new(endpoint).with_base_url(Arc::new(ApiOptions::new(&server.uri())))
}

#[tokio::test]
async fn get_without_cache_sends_no_cache_headers() {
    // given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("cache-control", "no-cache"))
        .and(header("pragma", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    // when
    let records = client(&server, "users")
        .get_many(None, ListOptions::default())
        .await
        .unwrap();

    // then
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn get_with_cache_sends_no_cache_control() {
    // given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    // when
    let users = client(&server, "users/{id}").with_cache(true);
    users
        .get_one(Some(&Parameters::new().with("id", 1)))
        .await
        .unwrap();

    // then
    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("cache-control").is_none());
}

#[tokio::test]
async fn put_sends_json_body_and_hook_headers() {
    // given
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/users/2"))
        .and(header("content-type", "application/json"))
        .and(header("x-request-id", "abc"))
        .and(body_json(json!({"name": "renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "name": "renamed"})))
        .expect(1)
        .mount(&server)
        .await;

    // when
    let users = client(&server, "users/{id}").with_before_send(|request| {
        request
            .headers
            .push(("x-request-id".to_string(), "abc".to_string()));
    });
    let record = users
        .update(
            &json!({"name": "renamed"}),
            Some(&Parameters::new().with("id", 2)),
        )
        .await
        .unwrap()
        .unwrap();

    // then
    assert_eq!(record.get("name"), Some(&json!("renamed")));
}

#[tokio::test]
async fn delete_with_body() {
    // given
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/3"))
        .and(body_json(json!({"reason": "cleanup"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    // when
    let payload = client(&server, "users/{id}")
        .remove(
            Some(&Parameters::new().with("id", 3)),
            Some(&json!({"reason": "cleanup"})),
        )
        .await
        .unwrap();

    // then
    assert!(payload.is_none());
}

#[tokio::test]
async fn error_status_carries_status_text() {
    // given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // when
    let err = client(&server, "users")
        .get_many(None, ListOptions::default())
        .await
        .unwrap_err();

    // then
    match err {
        ApiError::TransportFailure { status, reason } => {
            assert_eq!(status, Some(503));
            assert_eq!(reason, "Service Unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn timeout_surfaces_as_transport_failure() {
    // given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    // when
    let slow = client(&server, "slow")
        .with_timeout(Duration::from_millis(100));
    let err = slow.get_one(None).await.unwrap_err();

    // then
    assert!(matches!(err, ApiError::TransportFailure { status: None, .. }));
    assert!(!slow.is_working());
}
