//! Caller-driven refresh state machine.
//!
//! A [`ConfigRefresher`] owns one polling session and the last configuration
//! it received. Nothing runs in the background: every network call happens
//! inside [`ConfigRefresher::update`], either invoked directly or through
//! [`ConfigRefresher::config`] when `fetch_on_read` is enabled.
//!
//! Each `update` walks the same steps:
//! 1. return early while the throttle window (the service's last poll
//!    interval hint) is still open, unless forced;
//! 2. start a session if no poll token is held yet;
//! 3. poll with the current token, adopting the returned token and interval;
//! 4. stamp the poll time;
//! 5. treat an empty payload as "unchanged";
//! 6. decode a non-empty payload and replace the cached configuration whole.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ClientError, ConfigurationDataClient, LatestConfiguration, StartSessionRequest};
use crate::config::{RefresherConfig, SourceIdentity};
use crate::content::{ContentDecoder, ParsedValue};
use crate::error::RefresherError;
use crate::http::{HttpClient, HttpClientOptions};

/// Configuration received from the service, decoded according to its
/// declared content type. Instances are immutable; an update publishes a
/// new one.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedConfiguration {
    raw: Vec<u8>,
    content_type: String,
    version_label: Option<String>,
    value: ParsedValue,
}

impl CachedConfiguration {
    /// Exact payload bytes as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Declared MIME type of the payload.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn version_label(&self) -> Option<&str> {
        self.version_label.as_deref()
    }

    /// Parsed form of the payload.
    pub fn value(&self) -> &ParsedValue {
        &self.value
    }
}

/// Polling session state. The token never leaves this struct.
struct Session {
    source: SourceIdentity,
    min_poll_interval: Duration,
    poll_token: Option<String>,
    poll_interval: Duration,
    last_poll: Option<Instant>,
}

impl Session {
    fn new(source: SourceIdentity, min_poll_interval: Duration) -> Self {
        Self {
            source,
            min_poll_interval,
            poll_token: None,
            poll_interval: min_poll_interval,
            last_poll: None,
        }
    }

    /// Whether the throttle window opened by the last poll is still running.
    fn is_throttled(&self, now: Instant) -> bool {
        match self.last_poll {
            Some(previous) => now.duration_since(previous) < self.poll_interval,
            None => false,
        }
    }

    fn start(&mut self, token: String) {
        self.poll_token = Some(token);
        self.poll_interval = self.min_poll_interval;
    }

    /// Adopts the token and interval from a poll response, unconditionally.
    fn advance(&mut self, response: &LatestConfiguration) {
        self.poll_token = Some(response.next_poll_token.clone());
        self.poll_interval = response.next_poll_interval;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source)
            .field("min_poll_interval", &self.min_poll_interval)
            .field("active", &self.poll_token.is_some())
            .field("poll_interval", &self.poll_interval)
            .field("last_poll", &self.last_poll)
            .finish()
    }
}

/// Polls one configuration document and caches the latest value.
///
/// Mutating operations take `&mut self`; wrap the refresher in
/// [`crate::SharedConfigRefresher`] to share it between tasks.
pub struct ConfigRefresher {
    session: Session,
    client: Arc<dyn ConfigurationDataClient>,
    decoder: ContentDecoder,
    cached: Option<Arc<CachedConfiguration>>,
    fetch_on_read: bool,
    restart_session_on_bad_request: bool,
}

impl fmt::Debug for ConfigRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigRefresher")
            .field("session", &self.session)
            .field("decoder", &self.decoder)
            .field("cached", &self.cached)
            .field("fetch_on_read", &self.fetch_on_read)
            .finish()
    }
}

impl ConfigRefresher {
    /// Builds a refresher that owns an [`HttpClient`] pointed at
    /// `config.endpoint`, which must be set.
    pub async fn new(config: RefresherConfig) -> Result<Self, RefresherError> {
        config.validate()?;
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            RefresherError::InvalidConfiguration(
                "endpoint must be set to a SigV4 signing proxy when the refresher owns its client"
                    .to_string(),
            )
        })?;
        let client = HttpClient::new(endpoint, HttpClientOptions::from(&config))?;
        Self::build(config, Arc::new(client)).await
    }

    /// Builds a refresher around a caller-supplied client. The caller keeps
    /// its own handle and remains responsible for the client's setup.
    pub async fn with_client(
        config: RefresherConfig,
        client: Arc<dyn ConfigurationDataClient>,
    ) -> Result<Self, RefresherError> {
        config.validate()?;
        Self::build(config, client).await
    }

    /// Assembles an already validated configuration and client.
    async fn build(
        config: RefresherConfig,
        client: Arc<dyn ConfigurationDataClient>,
    ) -> Result<Self, RefresherError> {
        let mut refresher = Self {
            session: Session::new(config.source, config.min_poll_interval),
            client,
            decoder: config.decoder,
            cached: None,
            fetch_on_read: config.fetch_on_read,
            restart_session_on_bad_request: config.restart_session_on_bad_request,
        };
        if config.fetch_on_init {
            refresher.update(false).await?;
        }
        Ok(refresher)
    }

    pub fn source(&self) -> &SourceIdentity {
        &self.session.source
    }

    pub fn application(&self) -> &str {
        &self.session.source.application
    }

    pub fn environment(&self) -> &str {
        &self.session.source.environment
    }

    pub fn profile(&self) -> &str {
        &self.session.source.profile
    }

    /// Interval the next throttle check will use.
    pub fn poll_interval(&self) -> Duration {
        self.session.poll_interval
    }

    /// Whether a polling session has been started.
    pub fn has_session(&self) -> bool {
        self.session.poll_token.is_some()
    }

    /// Requests the latest configuration.
    ///
    /// Returns `Ok(true)` when a new configuration was received and cached,
    /// `Ok(false)` when the call was throttled or the service reported no
    /// change. `force` skips the throttle check. On error the cached
    /// configuration is left as it was.
    pub async fn update(&mut self, force: bool) -> Result<bool, RefresherError> {
        if !force && self.session.is_throttled(Instant::now()) {
            return Ok(false);
        }

        let response = self.poll().await?;
        if response.payload.is_empty() {
            debug!(
                application = %self.session.source.application,
                next_poll_interval = ?response.next_poll_interval,
                "appconfig: configuration unchanged"
            );
            return Ok(false);
        }

        let value = self
            .decoder
            .decode(&response.content_type, &response.payload)?;
        debug!(
            application = %self.session.source.application,
            profile = %self.session.source.profile,
            content_type = %response.content_type,
            bytes = response.payload.len(),
            version_label = ?response.version_label,
            "appconfig: received new configuration"
        );
        self.cached = Some(Arc::new(CachedConfiguration {
            raw: response.payload,
            content_type: response.content_type,
            version_label: response.version_label,
            value,
        }));
        Ok(true)
    }

    /// Returns the parsed configuration, refreshing first when
    /// `fetch_on_read` is enabled. `None` until a configuration arrives.
    pub async fn config(&mut self) -> Result<Option<&ParsedValue>, RefresherError> {
        if self.fetch_on_read {
            self.update(false).await?;
        }
        Ok(self.cached.as_deref().map(CachedConfiguration::value))
    }

    /// Parsed configuration without any refresh attempt.
    pub fn current_config(&self) -> Option<&ParsedValue> {
        self.cached.as_deref().map(CachedConfiguration::value)
    }

    pub fn raw_config(&self) -> Option<&[u8]> {
        self.cached.as_deref().map(CachedConfiguration::raw)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.cached.as_deref().map(CachedConfiguration::content_type)
    }

    pub fn version_label(&self) -> Option<&str> {
        self.cached
            .as_deref()
            .and_then(CachedConfiguration::version_label)
    }

    /// Shared handle to the cached configuration.
    pub fn snapshot(&self) -> Option<Arc<CachedConfiguration>> {
        self.cached.clone()
    }

    /// Performs the session bootstrap (if needed) and one poll, stamping the
    /// poll time once the request has been issued.
    async fn poll(&mut self) -> Result<LatestConfiguration, RefresherError> {
        let token = self.session_token().await?;
        let result = self.client.get_latest_configuration(&token).await;

        let result = match result {
            Err(ClientError::BadRequest(message)) if self.restart_session_on_bad_request => {
                warn!(
                    application = %self.session.source.application,
                    error = %message,
                    "appconfig: poll token rejected, starting a new session"
                );
                self.session.poll_token = None;
                match self.session_token().await {
                    Ok(token) => self.client.get_latest_configuration(&token).await,
                    Err(err) => {
                        self.session.last_poll = Some(Instant::now());
                        return Err(err);
                    }
                }
            }
            other => other,
        };

        self.session.last_poll = Some(Instant::now());
        let response = result?;
        self.session.advance(&response);
        Ok(response)
    }

    /// Returns the current poll token, starting a session when none exists.
    async fn session_token(&mut self) -> Result<String, RefresherError> {
        if let Some(token) = &self.session.poll_token {
            return Ok(token.clone());
        }

        let request = StartSessionRequest::new(&self.session.source, self.session.min_poll_interval);
        let token = self.client.start_session(&request).await?;
        debug!(
            application = %request.application,
            environment = %request.environment,
            profile = %request.profile,
            "appconfig: started configuration session"
        );
        self.session.start(token.clone());
        Ok(token)
    }
}
