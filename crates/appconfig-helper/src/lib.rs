//! Caller-driven poller and cache for a single AWS AppConfig configuration
//! profile.
//!
//! A [`ConfigRefresher`] starts a configuration session on first use, polls
//! with the rotating session token at most once per service-recommended
//! interval, and keeps the latest payload decoded by content type (JSON and
//! YAML into a [`serde_json::Value`] tree, text into a `String`, anything
//! else as bytes). [`SharedConfigRefresher`] offers the same contract to
//! concurrent callers.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use appconfig_helper::{ConfigRefresher, RefresherConfig, SourceIdentity};
//!
//! # async fn example() -> Result<(), appconfig_helper::RefresherError> {
//! let mut config = RefresherConfig::new(
//!     SourceIdentity::new("DemoApp", "prod", "main"),
//!     Duration::from_secs(15),
//! );
//! // Requests are unsigned; route them through a SigV4 signing proxy.
//! config.endpoint = Some("https://appconfig-proxy.internal".to_string());
//! let mut refresher = ConfigRefresher::new(config).await?;
//! if refresher.update(false).await? {
//!     tracing::info!("received new configuration");
//! }
//! let reverse = refresher
//!     .current_config()
//!     .and_then(|value| value.get("transform_reverse"))
//!     .and_then(|flag| flag.as_bool())
//!     .unwrap_or(true);
//! # let _ = reverse;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod refresher;
pub mod shared;
#[cfg(test)]
mod test_support;

pub use client::{ClientError, ConfigurationDataClient, LatestConfiguration, StartSessionRequest};
pub use config::{RefresherConfig, SourceIdentity, MIN_POLL_INTERVAL_FLOOR};
pub use content::{ContentDecoder, ContentType, ParsedValue};
pub use error::RefresherError;
pub use http::{HttpClient, HttpClientOptions};
pub use refresher::{CachedConfiguration, ConfigRefresher};
pub use shared::SharedConfigRefresher;
