use std::sync::Arc;

use assert_matches::assert_matches;
use mockall::mock;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_client::{HospitalApiClient, TransportError};
use shared_config::AppConfig;
use shared_models::{ApiError, CredentialProvider, StaticCredentials};

mock! {
    pub Credentials {}

    impl CredentialProvider for Credentials {
        fn access_token(&self) -> Option<String>;
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Echo {
    value: i64,
}

fn client_for(server: &MockServer, credentials: Arc<dyn CredentialProvider>) -> HospitalApiClient {
    HospitalApiClient::new(&AppConfig::with_base_url(server.uri()), credentials)
        .expect("client should build")
}

#[tokio::test]
async fn attaches_bearer_token_from_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/echo"))
        .and(header("Authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let mut credentials = MockCredentials::new();
    credentials
        .expect_access_token()
        .times(1)
        .returning(|| Some("session-token".to_string()));

    let client = client_for(&server, Arc::new(credentials));
    let echo: Echo = client.request(Method::GET, "/echo", None).await.unwrap();

    assert_eq!(echo, Echo { value: 7 });
}

#[tokio::test]
async fn typed_request_maps_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "token expired"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(StaticCredentials::new("stale")));
    let result: Result<Echo, ApiError> = client.request(Method::GET, "/echo", None).await;

    assert_eq!(result.unwrap_err(), ApiError::Unauthorized("token expired".to_string()));
}

#[tokio::test]
async fn typed_request_reports_shape_mismatch_as_decoding_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(StaticCredentials::new("t")));
    let result: Result<Echo, ApiError> = client.request(Method::GET, "/echo", None).await;

    assert_matches!(result, Err(ApiError::Decoding(_)));
}

#[tokio::test]
async fn raw_send_returns_error_statuses_as_replies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/appointments/"))
        .and(body_json(json!({"slot_id": 3})))
        .respond_with(ResponseTemplate::new(409).set_body_string("taken"))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(StaticCredentials::new("t")));
    let reply = client
        .send(Method::POST, "/appointments/", Some(json!({"slot_id": 3})))
        .await
        .unwrap();

    assert_eq!(reply.status, 409);
    assert_eq!(reply.body_text(), "taken");
}

#[tokio::test]
async fn missing_base_url_is_rejected_before_sending() {
    let client = HospitalApiClient::new(&AppConfig::default(), Arc::new(StaticCredentials::anonymous()))
        .unwrap();

    let result = client.send(Method::GET, "/doctors/D1/", None).await;

    assert_matches!(result, Err(TransportError::InvalidRequest(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = HospitalApiClient::new(
        &AppConfig::with_base_url("http://127.0.0.1:1"),
        Arc::new(StaticCredentials::new("t")),
    )
    .unwrap();

    let result = client.send(Method::GET, "/doctors/D1/", None).await;

    assert_matches!(result, Err(TransportError::Connect(_) | TransportError::Other(_)));
}
