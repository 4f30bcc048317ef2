//! Construction-time settings for the configuration refresher.
//!
//! Settings are either assembled by hand or derived from the host process
//! environment. Validation runs once, before the refresher touches the
//! network; the live poll interval is owned by the service afterwards.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::content::ContentDecoder;
use crate::error::RefresherError;

/// Lowest minimum poll interval accepted at construction, to avoid service throttling.
pub const MIN_POLL_INTERVAL_FLOOR: Duration = Duration::from_secs(15);
/// Default timeout applied to each request issued by the internal HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application name or ID.
const ENV_APPLICATION: &str = "APPCONFIG_APPLICATION";
/// Environment name or ID.
const ENV_ENVIRONMENT: &str = "APPCONFIG_ENVIRONMENT";
/// Configuration profile name or ID.
const ENV_PROFILE: &str = "APPCONFIG_PROFILE";
/// Minimum poll interval, in whole seconds.
const ENV_MIN_POLL_INTERVAL: &str = "APPCONFIG_MIN_POLL_INTERVAL";
/// Fetch once while constructing the refresher.
const ENV_FETCH_ON_INIT: &str = "APPCONFIG_FETCH_ON_INIT";
/// Refresh (subject to throttling) whenever the configuration is read.
const ENV_FETCH_ON_READ: &str = "APPCONFIG_FETCH_ON_READ";
/// Base URL of the signing proxy in front of AppConfigData.
const ENV_ENDPOINT: &str = "APPCONFIG_ENDPOINT";
/// Start a new session when the service rejects the poll token.
const ENV_RESTART_SESSION: &str = "APPCONFIG_RESTART_SESSION_ON_BAD_REQUEST";

/// Names or IDs of the application, environment and profile that locate one
/// configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceIdentity {
    pub application: String,
    pub environment: String,
    pub profile: String,
}

impl SourceIdentity {
    pub fn new(
        application: impl Into<String>,
        environment: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            environment: environment.into(),
            profile: profile.into(),
        }
    }
}

/// Settings consumed by [`crate::ConfigRefresher`] at construction.
#[derive(Debug, Clone)]
pub struct RefresherConfig {
    /// Which configuration document to poll.
    pub source: SourceIdentity,
    /// Minimum interval between polls requested from the service. Must be at
    /// least [`MIN_POLL_INTERVAL_FLOOR`].
    pub min_poll_interval: Duration,
    /// Perform one update while constructing the refresher.
    pub fetch_on_init: bool,
    /// Attempt an update (subject to throttling) on every configuration read.
    pub fetch_on_read: bool,
    /// Start a fresh session and poll once more when the service rejects the
    /// current poll token as a bad request.
    pub restart_session_on_bad_request: bool,
    /// Base URL used by the internal client. Requests are sent unsigned, so
    /// this must point at a proxy that adds SigV4 authentication; the public
    /// `appconfigdata` endpoints reject them. Required by
    /// [`crate::ConfigRefresher::new`], ignored when the caller supplies a client.
    pub endpoint: Option<String>,
    /// Timeout applied to each request issued by the internal client.
    pub request_timeout: Duration,
    /// Whether `http://` endpoints are accepted (local agents, tests).
    pub allow_plaintext: bool,
    /// Static headers attached to every request (e.g. for a signing proxy).
    pub extra_headers: Vec<(String, String)>,
    /// Decoders available to the content-type dispatch.
    pub decoder: ContentDecoder,
}

impl RefresherConfig {
    /// Builds settings for `source` with every optional knob at its default.
    pub fn new(source: SourceIdentity, min_poll_interval: Duration) -> Self {
        Self {
            source,
            min_poll_interval,
            fetch_on_init: false,
            fetch_on_read: false,
            restart_session_on_bad_request: false,
            endpoint: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            allow_plaintext: false,
            extra_headers: Vec::new(),
            decoder: ContentDecoder::default(),
        }
    }

    /// Builds settings from the current process environment.
    pub fn from_os_env() -> Result<Self, RefresherError> {
        Self::from_env_iter(env::vars())
    }

    /// Builds settings from an iterator of key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Result<Self, RefresherError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let required = |name: &str| {
            non_empty(map.get(name)).ok_or_else(|| {
                RefresherError::InvalidConfiguration(format!("{name} must be set"))
            })
        };
        let source = SourceIdentity::new(
            required(ENV_APPLICATION)?,
            required(ENV_ENVIRONMENT)?,
            required(ENV_PROFILE)?,
        );

        let min_poll_interval = match non_empty(map.get(ENV_MIN_POLL_INTERVAL)) {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                RefresherError::InvalidConfiguration(format!(
                    "{ENV_MIN_POLL_INTERVAL} must be a whole number of seconds, got '{raw}'"
                ))
            })?,
            None => MIN_POLL_INTERVAL_FLOOR,
        };

        let mut config = Self::new(source, min_poll_interval);
        config.fetch_on_init = parse_flag(ENV_FETCH_ON_INIT, map.get(ENV_FETCH_ON_INIT))?;
        config.fetch_on_read = parse_flag(ENV_FETCH_ON_READ, map.get(ENV_FETCH_ON_READ))?;
        config.restart_session_on_bad_request =
            parse_flag(ENV_RESTART_SESSION, map.get(ENV_RESTART_SESSION))?;

        if let Some(endpoint) = non_empty(map.get(ENV_ENDPOINT)) {
            config.allow_plaintext = endpoint.starts_with("http://");
            config.endpoint = Some(endpoint.trim_end_matches('/').to_string());
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that must hold before the refresher is built.
    pub fn validate(&self) -> Result<(), RefresherError> {
        if self.min_poll_interval < MIN_POLL_INTERVAL_FLOOR {
            return Err(RefresherError::InvalidConfiguration(format!(
                "min_poll_interval must be at least {} seconds, got {}",
                MIN_POLL_INTERVAL_FLOOR.as_secs(),
                self.min_poll_interval.as_secs()
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(RefresherError::InvalidConfiguration(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Trimmed value of an optional variable; blank counts as unset.
fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|raw| raw.trim())
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

/// Reads an on/off flag. Unset or blank means off; anything unrecognised is
/// rejected rather than guessed.
fn parse_flag(name: &str, value: Option<&String>) -> Result<bool, RefresherError> {
    let Some(raw) = non_empty(value) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(RefresherError::InvalidConfiguration(format!(
            "{name} must be a boolean, got '{raw}'"
        ))),
    }
}
