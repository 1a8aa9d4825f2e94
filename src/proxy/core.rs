use crate::cache::{self, CacheStore, RequestClass, TtlPolicy};
use crate::transport::Upstream;
use crate::{inn, Error, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::stats::{AtomicStats, ProxyStats};

/// Source of the current UTC calendar date.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Caching, quota-enforcing front for the DaData suggestions API.
///
/// Cheap to share behind an `Arc`; every request runs independently and the
/// only shared mutable state lives in the store.
pub struct SuggestionProxy {
    pub(crate) upstream: Arc<dyn Upstream>,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) policy: TtlPolicy,
    pub(crate) clock: Clock,
    pub(crate) stats: AtomicStats,
}

impl SuggestionProxy {
    /// Proxy one request: `path` is the part after `suggestions/api/4_1/rs/`,
    /// `body` the raw JSON the caller sent.
    ///
    /// Order of work: quota check, cache lookup, upstream call, counter
    /// increment, primary cache write, secondary INN index write. Failures
    /// before the upstream call answers leave the store untouched.
    pub async fn handle_request(&self, path: &str, body: &str) -> Result<String> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("dadata_request", %request_id, path);
        let result = self.process(path, body).instrument(span).await;
        match &result {
            Err(Error::QuotaExceeded { .. }) => AtomicStats::bump(&self.stats.quota_rejections),
            Err(_) => AtomicStats::bump(&self.stats.errors),
            Ok(_) => {}
        }
        result
    }

    pub fn stats(&self) -> ProxyStats {
        self.stats.to_stats()
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    async fn process(&self, path: &str, body: &str) -> Result<String> {
        let options = self.policy.options();
        let counter_key = cache::daily_counter_key((self.clock)());

        if options.quota_enabled() {
            let count = self.store.get_count(&counter_key).await?;
            if count >= options.daily_request_limit {
                warn!(count, limit = options.daily_request_limit, "daily DaData limit reached");
                return Err(Error::QuotaExceeded {
                    limit: options.daily_request_limit,
                });
            }
        }

        let key = cache::request_key(path, body);
        if let Some(cached) = self.store.get_string(key.as_str()).await? {
            debug!(%key, "cache hit");
            AtomicStats::bump(&self.stats.hits);
            return Ok(cached);
        }
        debug!(%key, "cache miss");
        AtomicStats::bump(&self.stats.misses);

        info!(upstream = self.upstream.name(), "calling DaData");
        AtomicStats::bump(&self.stats.upstream_calls);
        let result = self.upstream.call(path, body).await.map_err(|e| {
            warn!(error = %e, "DaData call failed");
            Error::UpstreamIntegration(e)
        })?;

        if result.is_empty() {
            debug!("empty DaData response, nothing to cache");
            AtomicStats::bump(&self.stats.empty_results);
            return Ok(result);
        }

        if options.quota_enabled() {
            let count = self
                .store
                .increment_counter(&counter_key, options.counter_expiry())
                .await?;
            debug!(count, "daily request counter incremented");
        }

        let ttl = self.policy.select(path, Some(&result))?;
        self.store.set_string(key.as_str(), &result, ttl).await?;
        debug!(%key, ttl_secs = ttl.as_secs(), "response cached");

        if RequestClass::of(path) == RequestClass::LegalEntity {
            if let Some(query) = query_inn(body) {
                let inn_key = cache::inn_key(&query);
                self.store
                    .set_string(&inn_key, &result, options.legal_entity_ttl())
                    .await?;
                AtomicStats::bump(&self.stats.secondary_writes);
                debug!(key = %inn_key, "INN index entry cached");
            }
        }

        Ok(result)
    }
}

/// The `query` field of a lookup body, if it is a checksum-valid INN.
fn query_inn(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let query = value.get("query")?.as_str()?;
    inn::is_valid(query).then(|| query.to_string())
}
