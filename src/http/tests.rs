//! Tests for the HTTP module

use super::*;
use crate::error::Error;
use crate::types::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector_for(server: &MockServer) -> HttpConnector {
    let config = ConnectorConfig::builder().base_url(server.uri()).build();
    HttpConnector::with_config(config).unwrap()
}

#[test]
fn test_connector_config_default() {
    let config = ConnectorConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.base_url.is_none());
    assert!(config.default_headers.is_empty());
    assert!(config.user_agent.starts_with("solidafy-pager/"));
}

#[test]
fn test_connector_config_builder() {
    let config = ConnectorConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_build_url() {
    let config = ConnectorConfig::builder()
        .base_url("https://api.example.com/v1/")
        .build();
    let connector = HttpConnector::with_config(config).unwrap();

    assert_eq!(
        connector.build_url("/items").unwrap().as_str(),
        "https://api.example.com/v1/items"
    );
    assert_eq!(
        connector
            .build_url("https://other.example.com/x")
            .unwrap()
            .as_str(),
        "https://other.example.com/x"
    );

    let bare = HttpConnector::new().unwrap();
    assert!(matches!(
        bare.build_url("/relative").unwrap_err(),
        Error::InvalidUrl(_)
    ));
}

#[tokio::test]
async fn test_execute_sends_query_headers_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(query_param("page", "2"))
        .and(header("X-Default", "yes"))
        .and(header("X-Request", "abc"))
        .and(body_json(json!({"q": "bat"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1]})))
        .mount(&mock_server)
        .await;

    let config = ConnectorConfig::builder()
        .base_url(mock_server.uri())
        .header("X-Default", "yes")
        .build();
    let connector = HttpConnector::with_config(config).unwrap();

    let request = Request::new(Method::POST, "/api/search")
        .query("page", "2")
        .header("X-Request", "abc")
        .json(json!({"q": "bat"}));

    let response = connector.execute(&request).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json_value().unwrap()["data"], json!([1]));
    assert!(response.url().unwrap().contains("page=2"));
}

#[tokio::test]
async fn test_execute_returns_error_statuses_as_responses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let connector = connector_for(&mock_server);
    let response = connector
        .execute(&Request::get("/api/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert!(response.is_failed());
}

#[tokio::test]
async fn test_send_runs_hooks_on_arrival() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1, 2, 3]})))
        .mount(&mock_server)
        .await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let request = Request::get("/api/items").with_hook(move |response: &Response| -> crate::error::Result<()> {
        let body = response.json_value()?;
        let count = body["data"].as_array().map_or(0, Vec::len);
        counter.fetch_add(count, Ordering::SeqCst);
        Ok(())
    });

    let connector = connector_for(&mock_server);
    connector.send(request).await.unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_send_fails_when_hook_throws() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let request = Request::get("/api/broken").with_hook(|response: &Response| -> crate::error::Result<()> {
        response.throw()?;
        Ok(())
    });

    let connector = connector_for(&mock_server);
    let err = connector.send(request).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_send_async_runs_hooks_without_being_awaited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1, 2]})))
        .mount(&mock_server)
        .await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let request = Request::get("/api/items").with_hook(move |_: &Response| -> crate::error::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let connector = Arc::new(connector_for(&mock_server));
    let pending = send_async(connector, request);
    assert!(!pending.is_ready());

    // Hook fires on arrival even though the future is dropped unawaited
    drop(pending);
    for _ in 0..50 {
        if seen.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_send_async_resolves_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let connector = Arc::new(connector_for(&mock_server));
    let response = send_async(connector, Request::get("/api/items"))
        .await
        .unwrap();

    assert_eq!(response.json_value().unwrap()["ok"], true);
}

#[tokio::test]
async fn test_ready_future() {
    let future = ResponseFuture::ready(Response::new(200, "{}"));
    assert!(future.is_ready());
    assert!(future.is_finished());
    assert_eq!(future.await.unwrap().status(), 200);
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let config = ConnectorConfig::builder()
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(50))
        .build();
    let connector = HttpConnector::with_config(config).unwrap();

    let err = connector
        .execute(&Request::get("/api/slow"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}
