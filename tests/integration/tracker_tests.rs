//! Integration tests for the tracker client
//!
//! These tests use wiremock to stand in for the tracker API.

use serde_json::json;
use shortreap::config::{HttpConfig, TrackerConfig};
use shortreap::generator::ListOptions;
use shortreap::{GeneratorOptions, Submission, Task, TaskId, TrackerClient, TrackerError};
use std::io::Cursor;
use wiremock::matchers::{body_bytes, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TrackerClient {
    let config = TrackerConfig {
        url: format!("{}/v1", server.uri()),
        username: None,
        version: "9.9.9".to_string(),
    };
    TrackerClient::new(&config, &HttpConfig::default()).expect("Failed to create tracker client")
}

fn sample_task() -> Task {
    Task::new(
        TaskId::new("42"),
        "isgd",
        &GeneratorOptions::List(ListOptions {
            list: vec!["a".to_string()],
        }),
    )
}

#[tokio::test]
async fn test_fetch_no_work() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .and(query_param("version", "9.9.9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.fetch().await.unwrap(), None);
}

#[tokio::test]
async fn test_default_config_sends_protocol_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .and(query_param("version", "2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let config = TrackerConfig {
        url: format!("{}/v1/", server.uri()),
        ..Default::default()
    };
    let client = TrackerClient::new(&config, &HttpConfig::default()).unwrap();
    assert_eq!(client.fetch().await.unwrap(), None);
}

#[tokio::test]
async fn test_fetch_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .and(query_param("version", "9.9.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 17,
            "service": "tinyurl",
            "generator_type": "sequence",
            "generator_options": {"charset": "0123456789abcdefghijklmnopqrstuvwxyz", "start": "a", "stop": "zz"}
        })))
        .mount(&server)
        .await;

    let task = client_for(&server).fetch().await.unwrap().unwrap();
    assert_eq!(task.id.as_str(), "17");
    assert_eq!(task.service, "tinyurl");
    assert_eq!(task.generator_type, "sequence");
    assert_eq!(task.generator().unwrap().kind(), "sequence");
}

#[tokio::test]
async fn test_fetch_malformed_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "x",
            "generator_type": "list"
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch().await;
    assert!(matches!(result, Err(TrackerError::MalformedTask(_))));
}

#[tokio::test]
async fn test_fetch_keeps_unknown_generator_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "x",
            "service": "isgd",
            "generator_type": "shuffle",
            "generator_options": {"seed": 1}
        })))
        .mount(&server)
        .await;

    let task = client_for(&server).fetch().await.unwrap().unwrap();
    assert_eq!(task.generator_type, "shuffle");
    assert_eq!(task.generator_options, json!({"seed": 1}));
    assert!(task.generator().is_err());
}

#[tokio::test]
async fn test_fetch_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch().await;
    assert!(matches!(
        result,
        Err(TrackerError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_forbidden_carries_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/get"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("Your client version is outdated\n"),
        )
        .mount(&server)
        .await;

    match client_for(&server).fetch().await {
        Err(TrackerError::Forbidden { reason }) => {
            assert_eq!(reason, "Your client version is outdated")
        }
        other => panic!("Expected Forbidden, got {:?}", other),
    }
}

#[tokio::test]
async fn test_put_accepted() {
    let server = MockServer::start().await;
    let data = b"\x1f\x8b compressed bytes".to_vec();
    Mock::given(method("POST"))
        .and(path("/v1/task/put"))
        .and(query_param("version", "9.9.9"))
        .and(query_param("id", "42"))
        .and(query_param("username", "alice"))
        .and(body_bytes(data.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = Cursor::new(data);
    // Leave the cursor at the end; put must rewind it
    stream.set_position(5);

    let result = client_for(&server)
        .put(&sample_task(), stream, Some("alice"))
        .await
        .unwrap();
    assert_eq!(result, Submission::Accepted);
}

#[tokio::test]
async fn test_put_rejected_on_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/task/put"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .put(&sample_task(), Cursor::new(Vec::new()), None)
        .await
        .unwrap();
    assert_eq!(result, Submission::Rejected);
}

#[tokio::test]
async fn test_put_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/task/put"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .put(&sample_task(), Cursor::new(Vec::new()), None)
        .await;
    assert!(matches!(
        result,
        Err(TrackerError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_clear() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/clear"))
        .and(query_param("version", "9.9.9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).clear().await.unwrap();
}

#[tokio::test]
async fn test_clear_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/task/clear"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(client_for(&server).clear().await.is_err());
}
