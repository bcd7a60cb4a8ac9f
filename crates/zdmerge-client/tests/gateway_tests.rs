//! Contract tests for the Zendesk gateway against a wiremock server.

use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zdmerge_client::{
    ApiCredentials, ClientError, GatewayConfig, RateLimitConfig, ZendeskGateway,
};

/// Gateway wired to the mock server, with spacing disabled so tests run at
/// full speed; rate discipline has its own simulated-time tests.
async fn gateway(server: &MockServer) -> ZendeskGateway {
    ZendeskGateway::new(GatewayConfig {
        base_url: server.uri(),
        credentials: ApiCredentials::new("agent@example.com", "test-token"),
        timeout_secs: 5,
        rate_limit: RateLimitConfig::default()
            .with_min_interval_ms(0)
            .with_reservoir(10_000),
    })
    .expect("gateway construction")
}

#[tokio::test]
async fn search_returns_raw_result_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .and(query_param("query", "email:new@x.com"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 77, "result_type": "ticket"},
                {"id": 42, "result_type": "user", "email": "New@X.com", "external_id": null}
            ]
        })))
        .mount(&server)
        .await;

    let results = gateway(&server).await.search_users("new@x.com").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].id, 42);
    assert!(results[1].is_user());
}

#[tokio::test]
async fn search_malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = gateway(&server).await.search_users("a@x.com").await.unwrap_err();
    assert!(matches!(err, ClientError::Parse { .. }));
}

#[tokio::test]
async fn merge_returns_surviving_account() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/users/42/merge.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": 9, "external_id": "ext-123", "email": "old@x.com"}
        })))
        .mount(&server)
        .await;

    let user = gateway(&server).await.merge_user(42, 9).await.unwrap();
    assert_eq!(user.id, 9);
    assert_eq!(user.external_id.as_deref(), Some("ext-123"));
}

#[tokio::test]
async fn merge_without_user_record_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/users/42/merge.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = gateway(&server).await.merge_user(42, 9).await.unwrap_err();
    assert!(matches!(err, ClientError::Parse { .. }));
}

#[tokio::test]
async fn identities_roundtrip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/9/identities.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identities": [
                {"id": 1, "user_id": 9, "type": "email", "value": "old@x.com", "primary": true},
                {"id": 2, "user_id": 9, "type": "email", "value": "new@x.com", "primary": false}
            ]
        })))
        .mount(&server)
        .await;

    let identities = gateway(&server).await.list_identities(9).await.unwrap();
    assert_eq!(identities.len(), 2);
    assert_eq!(identities[1].value, "new@x.com");
    assert!(!identities[1].primary);
}

#[tokio::test]
async fn make_primary_returns_updated_list() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/users/9/identities/2/make_primary.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identities": [
                {"id": 1, "user_id": 9, "type": "email", "value": "old@x.com", "primary": false},
                {"id": 2, "user_id": 9, "type": "email", "value": "new@x.com", "primary": true}
            ]
        })))
        .mount(&server)
        .await;

    let identities = gateway(&server).await.make_identity_primary(9, 2).await.unwrap();
    assert!(identities.iter().any(|i| i.id == 2 && i.primary));
}

#[tokio::test]
async fn show_user_missing_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/404.json"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "RecordNotFound"})),
        )
        .mount(&server)
        .await;

    let user = gateway(&server).await.show_user(404).await.unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn show_user_error_body_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/9.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "RecordNotFound"})),
        )
        .mount(&server)
        .await;

    let user = gateway(&server).await.show_user(9).await.unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn requested_tickets_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/9/tickets/requested.json"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "RecordNotFound"})),
        )
        .mount(&server)
        .await;

    let page = gateway(&server).await.requested_tickets(9).await.unwrap();
    assert!(page.is_none());
}

#[tokio::test]
async fn requested_tickets_paged_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/9/tickets/requested.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tickets": [],
            "count": 140,
            "next_page": "https://acme.zendesk.com/api/v2/users/9/tickets/requested.json?page=2"
        })))
        .mount(&server)
        .await;

    let page = gateway(&server).await.requested_tickets(9).await.unwrap().unwrap();
    assert_eq!(page.count, 140);
    assert!(page.next_page.is_some());
}

#[tokio::test]
async fn rate_limit_response_maps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "42")
                .set_body_string("rate limited"),
        )
        .mount(&server)
        .await;

    let err = gateway(&server).await.search_users("a@x.com").await.unwrap_err();
    match err {
        ClientError::RateLimited { retry_after_secs } => {
            assert_eq!(retry_after_secs, Some(42));
        }
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_error_maps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/9/identities.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = gateway(&server).await.list_identities(9).await.unwrap_err();
    match err {
        ClientError::Api { status, detail } => {
            assert_eq!(status, 503);
            assert!(detail.contains("maintenance"));
        }
        other => panic!("expected Api, got: {other:?}"),
    }
    assert!(ClientError::Api {
        status: 503,
        detail: String::new()
    }
    .is_retryable());
}

#[tokio::test]
async fn agent_link_strips_trailing_slash() {
    let server = MockServer::start().await;
    let gw = ZendeskGateway::new(GatewayConfig {
        base_url: format!("{}/", server.uri()),
        credentials: ApiCredentials::new("agent@example.com", "t"),
        timeout_secs: 5,
        rate_limit: RateLimitConfig::default(),
    })
    .unwrap();

    assert_eq!(gw.agent_link(7), format!("{}/agent/users/7", server.uri()));
}
