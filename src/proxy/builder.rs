use super::core::{Clock, SuggestionProxy};
use super::stats::AtomicStats;
use crate::cache::{CacheStore, MemoryStore, RedisStore, TtlPolicy};
use crate::config::{CachingOptions, ProxyConfig};
use crate::transport::{HttpUpstream, Upstream};
use crate::{Error, ErrorContext, Result};
use chrono::Utc;
use std::sync::Arc;

/// Builder for [`SuggestionProxy`].
///
/// Upstream and store are required unless the proxy is built from a full
/// [`ProxyConfig`] via [`SuggestionProxyBuilder::from_config`].
pub struct SuggestionProxyBuilder {
    caching: CachingOptions,
    upstream: Option<Arc<dyn Upstream>>,
    store: Option<Arc<dyn CacheStore>>,
    clock: Option<Clock>,
}

impl SuggestionProxyBuilder {
    pub fn new() -> Self {
        Self {
            caching: CachingOptions::default(),
            upstream: None,
            store: None,
            clock: None,
        }
    }

    /// Cache lifetimes and daily quota.
    pub fn caching(mut self, options: CachingOptions) -> Self {
        self.caching = options;
        self
    }

    pub fn upstream(mut self, upstream: Arc<dyn Upstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the UTC date source (primarily for tests that cross midnight).
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the HTTP upstream and the store described by `config`.
    ///
    /// Without `store.redis_url` the proxy falls back to a [`MemoryStore`].
    pub async fn from_config(config: &ProxyConfig) -> Result<Self> {
        let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::new(&config.upstream)?);
        let store: Arc<dyn CacheStore> = match config.store.redis_url.as_deref() {
            Some(url) => Arc::new(RedisStore::connect(url).await?),
            None => {
                tracing::warn!("no redis_url configured, using in-process store");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new()
            .caching(config.caching.clone())
            .upstream(upstream)
            .store(store))
    }

    pub fn build(self) -> Result<SuggestionProxy> {
        self.caching.validate()?;
        let upstream = self.upstream.ok_or_else(|| missing("upstream"))?;
        let store = self.store.ok_or_else(|| missing("store"))?;
        let clock: Clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(|| Utc::now().date_naive()),
        };

        Ok(SuggestionProxy {
            upstream,
            store,
            policy: TtlPolicy::new(self.caching),
            clock,
            stats: AtomicStats::default(),
        })
    }
}

fn missing(field: &str) -> Error {
    Error::configuration_with_context(
        "proxy component not provided",
        ErrorContext::new()
            .with_field_path(field)
            .with_source("proxy_builder"),
    )
}

impl Default for SuggestionProxyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
