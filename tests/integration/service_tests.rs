//! Integration tests for the service adapters
//!
//! Each test points an adapter at a wiremock server through a `base-url` override
//! and checks how one scripted response is classified.

use shortreap::config::{HttpConfig, ServiceOverride};
use shortreap::{create_service, FetchOutcome, RateLimit, Service};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds the named adapter against the mock server
fn service_for(name: &str, server: &MockServer) -> Box<dyn Service> {
    let overrides = ServiceOverride {
        base_url: Some(server.uri()),
        ..Default::default()
    };
    create_service(name, &HttpConfig::default(), Some(&overrides))
        .expect("Failed to create service")
}

async fn mock_head(server: &MockServer, code: &str, response: ResponseTemplate) {
    Mock::given(method("HEAD"))
        .and(path(format!("/{}", code)))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mock_get(server: &MockServer, code: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", code)))
        .respond_with(response)
        .mount(server)
        .await;
}

fn is_transient(outcome: &FetchOutcome) -> bool {
    matches!(outcome, FetchOutcome::TransientError(_))
}

// ===== is.gd / v.gd =====

#[tokio::test]
async fn test_isgd_moved_permanently() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "abc",
        ResponseTemplate::new(301).insert_header("Location", "http://example.org/page"),
    )
    .await;

    let mut service = service_for("isgd", &server);
    assert_eq!(
        service.fetch("abc").await,
        FetchOutcome::resolved("http://example.org/page")
    );
}

#[tokio::test]
async fn test_isgd_not_found_and_blocked() {
    let server = MockServer::start().await;
    mock_head(&server, "gone", ResponseTemplate::new(404)).await;
    mock_head(&server, "bad", ResponseTemplate::new(502)).await;

    let mut service = service_for("isgd", &server);
    assert_eq!(service.fetch("gone").await, FetchOutcome::Absent);
    assert_eq!(service.fetch("bad").await, FetchOutcome::CodeBlocked);
}

#[tokio::test]
async fn test_isgd_disabled_notice_page() {
    let server = MockServer::start().await;
    mock_head(&server, "dis", ResponseTemplate::new(200)).await;
    mock_get(
        &server,
        "dis",
        ResponseTemplate::new(200).set_body_string(
            "<html><head><title>is.gd - URL disabled</title></head><body>\
             <p>This link has been disabled (visit at your own risk, \
             since it may damage your PC): -http://example.org/?a=1&amp;b=2</p>\
             </body></html>",
        ),
    )
    .await;

    let mut service = service_for("isgd", &server);
    assert_eq!(
        service.fetch("dis").await,
        FetchOutcome::resolved("http://example.org/?a=1&b=2")
    );
}

#[tokio::test]
async fn test_vgd_requires_its_own_title() {
    let server = MockServer::start().await;
    mock_head(&server, "dis", ResponseTemplate::new(200)).await;
    mock_get(
        &server,
        "dis",
        ResponseTemplate::new(200).set_body_string(
            "<html><head><title>is.gd - URL disabled</title></head><body>\
             <p>since it may damage your PC): -http://example.org/</p></body></html>",
        ),
    )
    .await;

    let mut service = service_for("vgd", &server);
    assert_eq!(service.name(), "vgd");
    assert!(is_transient(&service.fetch("dis").await));
}

#[tokio::test]
async fn test_isgd_rate_limit_page() {
    let server = MockServer::start().await;
    mock_head(&server, "lim", ResponseTemplate::new(200)).await;
    mock_get(
        &server,
        "lim",
        ResponseTemplate::new(200)
            .set_body_string("<html><body><p>Rate limit exceeded - please wait</p></body></html>"),
    )
    .await;

    let mut service = service_for("isgd", &server);
    assert_eq!(service.fetch("lim").await, FetchOutcome::ServiceBlocked);
}

#[tokio::test]
async fn test_isgd_status_changed_between_head_and_get() {
    let server = MockServer::start().await;
    mock_head(&server, "flip", ResponseTemplate::new(200)).await;
    mock_get(&server, "flip", ResponseTemplate::new(503)).await;

    let mut service = service_for("isgd", &server);
    assert!(is_transient(&service.fetch("flip").await));
}

#[tokio::test]
async fn test_isgd_unexpected_status() {
    let server = MockServer::start().await;
    mock_head(&server, "odd", ResponseTemplate::new(418)).await;

    let mut service = service_for("isgd", &server);
    match service.fetch("odd").await {
        FetchOutcome::TransientError(message) => assert!(message.contains("418")),
        other => panic!("Expected transient error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_isgd_moved_without_location() {
    let server = MockServer::start().await;
    mock_head(&server, "nol", ResponseTemplate::new(301)).await;

    let mut service = service_for("isgd", &server);
    assert!(is_transient(&service.fetch("nol").await));
}

// ===== bit.ly =====

#[tokio::test]
async fn test_bitly_moved_permanently() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "a1",
        ResponseTemplate::new(301).insert_header("Location", "https://example.com/x"),
    )
    .await;

    let mut service = service_for("bitly", &server);
    assert_eq!(
        service.fetch("a1").await,
        FetchOutcome::resolved("https://example.com/x")
    );
}

#[tokio::test]
async fn test_bitly_warning_redirect_unwrapped() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "a1",
        ResponseTemplate::new(302).insert_header(
            "Location",
            "/a/warning?hash=a1&url=http%3A%2F%2Fexample.com%2Fevil%3Fq%3D1%20",
        ),
    )
    .await;

    let mut service = service_for("bitly", &server);
    assert_eq!(
        service.fetch("a1").await,
        FetchOutcome::resolved("http://example.com/evil?q=1")
    );
}

#[tokio::test]
async fn test_bitly_warning_hash_mismatch() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "a1",
        ResponseTemplate::new(302)
            .insert_header("Location", "/a/warning?hash=zz&url=http://example.com/"),
    )
    .await;

    let mut service = service_for("bitly", &server);
    assert!(is_transient(&service.fetch("a1").await));
}

#[tokio::test]
async fn test_bitly_redirect_elsewhere_is_transient() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "a1",
        ResponseTemplate::new(302).insert_header("Location", "http://other.example.org/a/warning?hash=a1&url=x"),
    )
    .await;

    let mut service = service_for("bitly", &server);
    assert!(is_transient(&service.fetch("a1").await));
}

#[tokio::test]
async fn test_bitly_forbidden_and_not_found() {
    let server = MockServer::start().await;
    mock_head(&server, "f", ResponseTemplate::new(403)).await;
    mock_head(&server, "n", ResponseTemplate::new(404)).await;

    let mut service = service_for("bitly", &server);
    assert_eq!(service.fetch("f").await, FetchOutcome::ServiceBlocked);
    assert_eq!(service.fetch("n").await, FetchOutcome::Absent);
}

// ===== tinyurl =====

#[tokio::test]
async fn test_tinyurl_moved_permanently() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "abc",
        ResponseTemplate::new(301).insert_header("Location", "http://example.net/"),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert_eq!(
        service.fetch("abc").await,
        FetchOutcome::resolved("http://example.net/")
    );
}

#[tokio::test]
async fn test_tinyurl_error_header_means_blocked() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "abc",
        ResponseTemplate::new(301).insert_header("X-tiny", "err 1"),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert_eq!(service.fetch("abc").await, FetchOutcome::CodeBlocked);
}

#[tokio::test]
async fn test_tinyurl_found_redirects() {
    let server = MockServer::start().await;
    mock_head(
        &server,
        "blk",
        ResponseTemplate::new(302).insert_header("Location", "http://tinyurl.com/blocked.php"),
    )
    .await;
    mock_head(
        &server,
        "thr",
        ResponseTemplate::new(302).insert_header("Location", "http://tinyurl.com/ratelimit"),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert_eq!(service.fetch("blk").await, FetchOutcome::CodeBlocked);
    assert_eq!(service.fetch("thr").await, FetchOutcome::ServiceBlocked);
}

#[tokio::test]
async fn test_tinyurl_redirecting_page_on_not_found() {
    let server = MockServer::start().await;
    mock_head(&server, "pg", ResponseTemplate::new(404)).await;
    mock_get(
        &server,
        "pg",
        ResponseTemplate::new(404).set_body_string(
            "<html><head><title>Redirecting...</title></head>\
             <body>\nhttp://example.org/legacy\n</body></html>",
        ),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert_eq!(
        service.fetch("pg").await,
        FetchOutcome::resolved("http://example.org/legacy")
    );
}

#[tokio::test]
async fn test_tinyurl_plain_not_found() {
    let server = MockServer::start().await;
    mock_head(&server, "nf", ResponseTemplate::new(404)).await;
    mock_get(
        &server,
        "nf",
        ResponseTemplate::new(404).set_body_string("<html><title>Not Found</title></html>"),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert_eq!(service.fetch("nf").await, FetchOutcome::Absent);
}

#[tokio::test]
async fn test_tinyurl_unparsable_ok_page() {
    let server = MockServer::start().await;
    mock_head(&server, "ok", ResponseTemplate::new(200)).await;
    mock_get(
        &server,
        "ok",
        ResponseTemplate::new(200).set_body_string("<html><title>Home</title></html>"),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert!(is_transient(&service.fetch("ok").await));
}

#[tokio::test]
async fn test_tinyurl_server_error_reconnects() {
    let server = MockServer::start().await;
    mock_head(&server, "err", ResponseTemplate::new(500)).await;
    mock_head(
        &server,
        "fine",
        ResponseTemplate::new(301).insert_header("Location", "http://example.net/ok"),
    )
    .await;

    let mut service = service_for("tinyurl", &server);
    assert!(is_transient(&service.fetch("err").await));
    // The fresh connection pool still works
    assert_eq!(
        service.fetch("fine").await,
        FetchOutcome::resolved("http://example.net/ok")
    );
}

// ===== registry =====

#[test]
fn test_rate_limit_override() {
    let overrides = ServiceOverride {
        base_url: None,
        requests_per_window: Some(10),
        window_seconds: Some(2),
    };
    let service = create_service("tinyurl", &HttpConfig::default(), Some(&overrides)).unwrap();
    assert_eq!(service.name(), "tinyurl");
    assert_eq!(service.rate_limit(), Some(RateLimit::new(10, 2)));
}

#[test]
fn test_partial_rate_limit_override_ignored() {
    let overrides = ServiceOverride {
        base_url: None,
        requests_per_window: Some(10),
        window_seconds: None,
    };
    let service = create_service("isgd", &HttpConfig::default(), Some(&overrides)).unwrap();
    assert_eq!(service.rate_limit(), Some(RateLimit::new(60, 60)));
}
