//! Contract of the configuration data service consumed by the refresher.
//!
//! The service hands out an opaque poll token when a session starts and
//! rotates it on every poll, together with a recommended poll interval. An
//! empty payload means the configuration has not changed since the token
//! was issued.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SourceIdentity;

/// Errors raised by a [`ConfigurationDataClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service rejected the request parameters (including an expired or
    /// unknown poll token).
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Credentials were missing or rejected.
    #[error("unauthorized - credentials rejected by the configuration service")]
    Unauthorized,
    /// The service asked the caller to slow down.
    #[error("request throttled by the configuration service")]
    Throttled,
    /// The identified application, environment or profile does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// Any other non-success status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The configured base URL violates the transport policy.
    #[error("insecure endpoint requires explicit opt-in: {0}")]
    InsecureUrl(String),
    /// A configured header could not be encoded.
    #[error("invalid header {0}")]
    InvalidHeader(String),
    /// Transport-level issue (DNS, TLS, socket, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a response missing required fields.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Parameters of a session-start call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSessionRequest {
    pub application: String,
    pub environment: String,
    pub profile: String,
    /// Lower bound the service must respect when recommending poll intervals.
    pub required_minimum_poll_interval: Duration,
}

impl StartSessionRequest {
    pub fn new(source: &SourceIdentity, required_minimum_poll_interval: Duration) -> Self {
        Self {
            application: source.application.clone(),
            environment: source.environment.clone(),
            profile: source.profile.clone(),
            required_minimum_poll_interval,
        }
    }
}

/// Response to a poll call.
#[derive(Clone, PartialEq, Eq)]
pub struct LatestConfiguration {
    /// Token to present on the next poll.
    pub next_poll_token: String,
    /// Recommended delay before the next poll.
    pub next_poll_interval: Duration,
    /// Declared MIME type of `payload`.
    pub content_type: String,
    /// Configuration bytes; empty when nothing changed.
    pub payload: Vec<u8>,
    /// Version label attached to the configuration, when the service sends one.
    pub version_label: Option<String>,
}

impl fmt::Debug for LatestConfiguration {
    /// Keeps the poll token out of debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatestConfiguration")
            .field("next_poll_token", &"<redacted>")
            .field("next_poll_interval", &self.next_poll_interval)
            .field("content_type", &self.content_type)
            .field("payload_len", &self.payload.len())
            .field("version_label", &self.version_label)
            .finish()
    }
}

/// Session-token long-poll API serving one configuration document per session.
///
/// Implementations are shared behind an `Arc`, so a caller may keep its own
/// handle to a pre-authenticated client while a refresher uses it.
#[async_trait]
pub trait ConfigurationDataClient: Send + Sync {
    /// Starts a session and returns the initial poll token.
    async fn start_session(&self, request: &StartSessionRequest) -> Result<String, ClientError>;

    /// Polls for the latest configuration using `token`.
    async fn get_latest_configuration(
        &self,
        token: &str,
    ) -> Result<LatestConfiguration, ClientError>;
}
