//! End-to-end coverage of the refresher over HTTP against a stub service.

mod common;

use std::time::Duration;

use appconfig_helper::{
    ClientError, ConfigRefresher, ParsedValue, RefresherConfig, RefresherError,
    SharedConfigRefresher,
};
use common::test_config;
use httptest::matchers::{all_of, contains, eq, json_decoded, request, url_decoded};
use httptest::responders::status_code;
use httptest::{Expectation, Server};
use serde_json::json;

/// Points the canonical test settings at the stub server.
fn server_config(server: &Server) -> RefresherConfig {
    let mut config = test_config();
    config.endpoint = Some(server.url_str(""));
    config.allow_plaintext = true;
    config.request_timeout = Duration::from_secs(5);
    config
}

fn expect_session(server: &Server, token: &'static str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/configurationsessions"),
            request::body(json_decoded(eq(json!({
                "ApplicationIdentifier": "AppConfig-App",
                "EnvironmentIdentifier": "AppConfig-Env",
                "ConfigurationProfileIdentifier": "AppConfig-Profile",
                "RequiredMinimumPollIntervalInSeconds": 15
            }))))
        ])
        .respond_with(status_code(201).body(format!(r#"{{"InitialConfigurationToken":"{token}"}}"#))),
    );
}

fn expect_poll(
    server: &Server,
    token: &'static str,
    next_token: &'static str,
    content_type: &'static str,
    body: &'static str,
) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/configuration"),
            request::query(url_decoded(contains(("configuration_token", token))))
        ])
        .respond_with(
            status_code(200)
                .insert_header("Content-Type", content_type)
                .insert_header("Next-Poll-Configuration-Token", next_token)
                .insert_header("Next-Poll-Interval-In-Seconds", "30")
                .insert_header("Version-Label", "v1")
                .body(body),
        ),
    );
}

#[tokio::test]
async fn fetch_on_init_over_http() {
    let server = Server::run();
    expect_session(&server, "token1234");
    expect_poll(&server, "token1234", "token5678", "application/json", r#"{"hello":"world"}"#);

    let mut config = server_config(&server);
    config.fetch_on_init = true;
    let refresher = ConfigRefresher::new(config).await.unwrap();

    assert_eq!(
        refresher.current_config(),
        Some(&ParsedValue::Structured(json!({"hello": "world"})))
    );
    assert_eq!(refresher.version_label(), Some("v1"));
    assert_eq!(refresher.poll_interval(), Duration::from_secs(30));
}

#[tokio::test]
async fn token_rotates_across_polls() {
    let server = Server::run();
    expect_session(&server, "token1234");
    expect_poll(&server, "token1234", "token5678", "text/plain", "hello");
    expect_poll(&server, "token5678", "token9012", "text/plain", "");
    expect_poll(&server, "token9012", "token3456", "text/plain", "world");

    let mut refresher = ConfigRefresher::new(server_config(&server)).await.unwrap();
    assert!(refresher.update(false).await.unwrap());
    assert!(!refresher.update(true).await.unwrap());
    assert_eq!(refresher.current_config().and_then(ParsedValue::as_text), Some("hello"));
    assert!(refresher.update(true).await.unwrap());
    assert_eq!(refresher.current_config().and_then(ParsedValue::as_text), Some("world"));
}

#[tokio::test]
async fn invalid_identity_surfaces_as_transport_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/configurationsessions")).respond_with(
            status_code(400).body(r#"{"Message":"Invalid ApplicationIdentifier"}"#),
        ),
    );

    let mut config = server_config(&server);
    config.source.application = String::new();
    let mut refresher = ConfigRefresher::new(config).await.unwrap();

    let err = refresher.update(false).await.unwrap_err();
    assert!(
        matches!(err, RefresherError::Transport(ClientError::BadRequest(ref msg)) if msg.contains("ApplicationIdentifier")),
        "{err}"
    );
    assert!(refresher.raw_config().is_none());
}

#[tokio::test]
async fn expired_token_starts_new_session_when_enabled() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/configurationsessions"))
            .times(2)
            .respond_with(status_code(201).body(r#"{"InitialConfigurationToken":"token1234"}"#)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/configuration"),
            request::query(url_decoded(contains(("configuration_token", "token1234"))))
        ])
        .times(2)
        .respond_with(httptest::cycle![
            status_code(200)
                .insert_header("Content-Type", "text/plain")
                .insert_header("Next-Poll-Configuration-Token", "token5678")
                .insert_header("Next-Poll-Interval-In-Seconds", "30")
                .body("hello"),
            status_code(200)
                .insert_header("Content-Type", "text/plain")
                .insert_header("Next-Poll-Configuration-Token", "token9012")
                .insert_header("Next-Poll-Interval-In-Seconds", "30")
                .body("world"),
        ]),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/configuration"),
            request::query(url_decoded(contains(("configuration_token", "token5678"))))
        ])
        .respond_with(status_code(400).body(r#"{"Message":"Request contains an expired token"}"#)),
    );

    let mut config = server_config(&server);
    config.restart_session_on_bad_request = true;
    let mut refresher = ConfigRefresher::new(config).await.unwrap();

    assert!(refresher.update(false).await.unwrap());
    assert!(refresher.update(true).await.unwrap());
    assert_eq!(refresher.current_config().and_then(ParsedValue::as_text), Some("world"));
}

#[tokio::test]
async fn shared_refresher_over_http() {
    let server = Server::run();
    expect_session(&server, "token1234");
    expect_poll(&server, "token1234", "token5678", "image/jpeg", "hello world");

    let mut config = server_config(&server);
    config.fetch_on_read = true;
    let shared = SharedConfigRefresher::new(config).await.unwrap();

    let cached = shared.config().await.unwrap().expect("configuration present");
    assert_eq!(cached.value(), &ParsedValue::Bytes(b"hello world".to_vec()));
    assert_eq!(shared.content_type().as_deref(), Some("image/jpeg"));

    // Still inside the 30s window: served from cache without another request.
    let again = shared.config().await.unwrap().expect("configuration present");
    assert_eq!(again.raw(), b"hello world");
}
