//! Thread-safe wrapper around [`ConfigRefresher`].
//!
//! Updates are serialised behind one async mutex per instance, so the whole
//! throttle/bootstrap/poll/decode sequence runs as a single critical section.
//! The cached configuration is published through an [`ArcSwapOption`];
//! readers load it without touching the update lock and always observe a
//! complete [`CachedConfiguration`].

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

use crate::client::ConfigurationDataClient;
use crate::config::{RefresherConfig, SourceIdentity};
use crate::error::RefresherError;
use crate::refresher::{CachedConfiguration, ConfigRefresher};

/// A [`ConfigRefresher`] that can be shared between tasks (e.g. request
/// handlers) through an `Arc`.
#[derive(Debug)]
pub struct SharedConfigRefresher {
    inner: Mutex<ConfigRefresher>,
    published: ArcSwapOption<CachedConfiguration>,
    source: SourceIdentity,
    fetch_on_read: bool,
}

impl SharedConfigRefresher {
    /// Builds a shared refresher owning an internal HTTP client.
    pub async fn new(config: RefresherConfig) -> Result<Self, RefresherError> {
        let fetch_on_read = config.fetch_on_read;
        let refresher = ConfigRefresher::new(config).await?;
        Ok(Self::from_refresher(refresher, fetch_on_read))
    }

    /// Builds a shared refresher around a caller-supplied client.
    pub async fn with_client(
        config: RefresherConfig,
        client: Arc<dyn ConfigurationDataClient>,
    ) -> Result<Self, RefresherError> {
        let fetch_on_read = config.fetch_on_read;
        let refresher = ConfigRefresher::with_client(config, client).await?;
        Ok(Self::from_refresher(refresher, fetch_on_read))
    }

    fn from_refresher(refresher: ConfigRefresher, fetch_on_read: bool) -> Self {
        Self {
            published: ArcSwapOption::new(refresher.snapshot()),
            source: refresher.source().clone(),
            inner: Mutex::new(refresher),
            fetch_on_read,
        }
    }

    pub fn source(&self) -> &SourceIdentity {
        &self.source
    }

    pub fn application(&self) -> &str {
        &self.source.application
    }

    pub fn environment(&self) -> &str {
        &self.source.environment
    }

    pub fn profile(&self) -> &str {
        &self.source.profile
    }

    /// Same contract as [`ConfigRefresher::update`]. Concurrent callers
    /// queue on the update lock; once the first one has polled, the others
    /// usually find the throttle window open and return `Ok(false)`.
    pub async fn update(&self, force: bool) -> Result<bool, RefresherError> {
        let mut guard = self.inner.lock().await;
        let changed = guard.update(force).await?;
        if changed {
            self.published.store(guard.snapshot());
        }
        Ok(changed)
    }

    /// Returns the cached configuration, refreshing first when
    /// `fetch_on_read` is enabled.
    pub async fn config(&self) -> Result<Option<Arc<CachedConfiguration>>, RefresherError> {
        if self.fetch_on_read {
            self.update(false).await?;
        }
        Ok(self.snapshot())
    }

    /// Current cached configuration without any refresh attempt.
    pub fn snapshot(&self) -> Option<Arc<CachedConfiguration>> {
        self.published.load_full()
    }

    pub fn raw_config(&self) -> Option<Vec<u8>> {
        self.snapshot().map(|cached| cached.raw().to_vec())
    }

    pub fn content_type(&self) -> Option<String> {
        self.snapshot().map(|cached| cached.content_type().to_string())
    }

    pub fn version_label(&self) -> Option<String> {
        self.snapshot()
            .and_then(|cached| cached.version_label().map(str::to_string))
    }
}
