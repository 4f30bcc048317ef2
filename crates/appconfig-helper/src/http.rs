//! HTTP implementation of the configuration data service contract.
//!
//! Speaks the AppConfigData REST shape: a JSON session-start call followed
//! by token-driven `GET /configuration` polls whose metadata travels in
//! response headers. Requests are not SigV4-signed, so the base URL must be a
//! signing proxy in front of the service rather than the public
//! `appconfigdata.{region}.amazonaws.com` endpoint. Static headers for the
//! proxy go through [`HttpClientOptions::extra_headers`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ClientError, ConfigurationDataClient, LatestConfiguration, StartSessionRequest};
use crate::config::{RefresherConfig, DEFAULT_REQUEST_TIMEOUT};

/// Endpoint starting a configuration session.
const SESSION_ENDPOINT: &str = "/configurationsessions";
/// Endpoint returning the latest configuration for a poll token.
const CONFIGURATION_ENDPOINT: &str = "/configuration";
/// Query parameter carrying the poll token.
const TOKEN_QUERY_PARAM: &str = "configuration_token";
/// Response header carrying the next poll token.
const NEXT_TOKEN_HEADER: &str = "next-poll-configuration-token";
/// Response header carrying the recommended poll interval in seconds.
const NEXT_INTERVAL_HEADER: &str = "next-poll-interval-in-seconds";
/// Response header carrying the configuration version label.
const VERSION_LABEL_HEADER: &str = "version-label";
/// Content type assumed when the service omits one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Options governing how the HTTP client is constructed.
#[derive(Debug, Clone)]
pub struct HttpClientOptions {
    /// Whether plaintext (HTTP) endpoints are allowed.
    pub allow_plaintext: bool,
    /// Timeout applied to each request.
    pub timeout: Duration,
    /// Headers attached to every request.
    pub extra_headers: Vec<(String, String)>,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            allow_plaintext: false,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            extra_headers: Vec::new(),
        }
    }
}

impl From<&RefresherConfig> for HttpClientOptions {
    fn from(config: &RefresherConfig) -> Self {
        Self {
            allow_plaintext: config.allow_plaintext,
            timeout: config.request_timeout,
            extra_headers: config.extra_headers.clone(),
        }
    }
}

/// Session-start body in the service's field naming.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartSessionBody<'a> {
    application_identifier: &'a str,
    environment_identifier: &'a str,
    configuration_profile_identifier: &'a str,
    required_minimum_poll_interval_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartSessionResponse {
    initial_configuration_token: String,
}

/// Error body returned by the service alongside 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Reusable HTTP client bound to one service endpoint.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpClient {
    /// Builds a client for `base_url`, enforcing the plaintext policy.
    pub fn new(base_url: impl Into<String>, options: HttpClientOptions) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !options.allow_plaintext && base_url.starts_with("http://") {
            return Err(ClientError::InsecureUrl(base_url));
        }

        let mut headers = HeaderMap::new();
        let user_agent = format!("appconfig-helper/{}", env!("CARGO_PKG_VERSION"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|_| ClientError::InvalidHeader(USER_AGENT.as_str().to_string()))?,
        );
        for (name, value) in &options.extra_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attaches headers, sends the request and classifies the HTTP status.
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        // The poll token travels in the query string, so only the path is logged.
        debug!(
            method = %method,
            path = %path,
            headers = ?redact_headers(&self.headers),
            "appconfig HTTP request"
        );

        let builder = self
            .client
            .request(method.clone(), url)
            .headers(self.headers.clone());
        let response = build(builder).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_bytes = response.bytes().await.unwrap_or_default();
            let body = String::from_utf8_lossy(&body_bytes);
            debug!(
                method = %method,
                path = %path,
                status = %status,
                body = %body,
                "appconfig HTTP response"
            );
            return Err(classify_status(status, &body));
        }

        debug!(
            method = %method,
            path = %path,
            status = %status,
            content_length = ?response.content_length(),
            "appconfig HTTP response"
        );
        Ok(response)
    }
}

#[async_trait]
impl ConfigurationDataClient for HttpClient {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<String, ClientError> {
        let body = StartSessionBody {
            application_identifier: &request.application,
            environment_identifier: &request.environment,
            configuration_profile_identifier: &request.profile,
            required_minimum_poll_interval_in_seconds: request
                .required_minimum_poll_interval
                .as_secs(),
        };
        let response = self
            .send(Method::POST, SESSION_ENDPOINT, |builder| builder.json(&body))
            .await?;
        let bytes = response.bytes().await?;
        let parsed: StartSessionResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::InvalidResponse(format!("session response: {err}")))?;
        Ok(parsed.initial_configuration_token)
    }

    async fn get_latest_configuration(
        &self,
        token: &str,
    ) -> Result<LatestConfiguration, ClientError> {
        let response = self
            .send(Method::GET, CONFIGURATION_ENDPOINT, |builder| {
                builder.query(&[(TOKEN_QUERY_PARAM, token)])
            })
            .await?;

        let headers = response.headers().clone();
        let next_poll_token = header_str(&headers, NEXT_TOKEN_HEADER)
            .ok_or_else(|| ClientError::InvalidResponse(format!("missing {NEXT_TOKEN_HEADER}")))?
            .to_string();
        let next_poll_interval = header_str(&headers, NEXT_INTERVAL_HEADER)
            .ok_or_else(|| ClientError::InvalidResponse(format!("missing {NEXT_INTERVAL_HEADER}")))?
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|err| ClientError::InvalidResponse(format!("{NEXT_INTERVAL_HEADER}: {err}")))?;
        let content_type = header_str(&headers, CONTENT_TYPE.as_str())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let version_label = header_str(&headers, VERSION_LABEL_HEADER)
            .filter(|label| !label.is_empty())
            .map(str::to_string);
        let payload = response.bytes().await?.to_vec();

        Ok(LatestConfiguration {
            next_poll_token,
            next_poll_interval,
            content_type,
            payload,
            version_label,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Maps a non-success status (and its error body) to [`ClientError`].
fn classify_status(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| body.trim().to_string());
    match status {
        StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ClientError::Throttled,
        other => ClientError::Status(other.as_u16()),
    }
}

/// Returns a redacted view of request headers suitable for debug logging.
fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "x-amz-security-token", "x-api-key"];

    headers
        .iter()
        .map(|(name, value)| {
            let lower = name.as_str().to_ascii_lowercase();
            let display = if SENSITIVE_HEADERS.contains(&lower.as_str()) {
                "<redacted>".to_string()
            } else {
                value
                    .to_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "<non-utf8>".to_string())
            };
            (lower, display)
        })
        .collect()
}
