//! End-to-end behavior of the proxy orchestrator with an in-process store and
//! a scripted upstream.

use async_trait::async_trait;
use chrono::NaiveDate;
use dadata_proxy::cache::{daily_counter_key, inn_key, request_key, CacheStore, MemoryStore};
use dadata_proxy::config::CachingOptions;
use dadata_proxy::transport::{TransportError, Upstream};
use dadata_proxy::{Error, ErrorContext, SuggestionProxy, SuggestionProxyBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DAY: u64 = 86_400;

/// Upstream that answers every call with the same scripted outcome.
struct ScriptedUpstream {
    response: Mutex<Result<String, String>>,
    calls: AtomicUsize,
}

impl ScriptedUpstream {
    fn ok(body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(body.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn call(&self, _path: &str, _body: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .unwrap()
            .clone()
            .map_err(TransportError::Other)
    }
}

/// Store whose every operation fails, standing in for an unreachable Redis.
struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get_string(&self, key: &str) -> dadata_proxy::Result<Option<String>> {
        Err(broken(key))
    }
    async fn set_string(&self, key: &str, _: &str, _: Duration) -> dadata_proxy::Result<()> {
        Err(broken(key))
    }
    async fn get_count(&self, key: &str) -> dadata_proxy::Result<u64> {
        Err(broken(key))
    }
    async fn increment_counter(&self, key: &str, _: Duration) -> dadata_proxy::Result<u64> {
        Err(broken(key))
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

fn broken(key: &str) -> Error {
    Error::store_with_context("broken", "connection refused", ErrorContext::new().with_field_path(key))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

fn caching(limit: u64) -> CachingOptions {
    CachingOptions {
        legal_entity_days: 30,
        empty_legal_entity_days: 1,
        address_days: 7,
        default_hours: 1,
        daily_request_limit: limit,
        request_counter_expiration_hours: 24,
    }
}

fn proxy(upstream: Arc<ScriptedUpstream>, store: Arc<MemoryStore>, limit: u64) -> SuggestionProxy {
    SuggestionProxyBuilder::new()
        .caching(caching(limit))
        .upstream(upstream)
        .store(store)
        .clock(Arc::new(today))
        .build()
        .expect("proxy builds")
}

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let upstream = ScriptedUpstream::ok(r#"{"suggestions":[{"value":"Москва"}]}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream.clone(), store.clone(), 0);

    let body = r#"{"query":"москва"}"#;
    let first = proxy.handle_request("suggest/address", body).await.unwrap();
    let second = proxy.handle_request("suggest/address", body).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(upstream.calls(), 1);
    let stats = proxy.stats();
    assert_eq!((stats.hits, stats.misses, stats.upstream_calls), (1, 1, 1));
    assert_eq!(
        store.ttl_of(request_key("suggest/address", body).as_str()).await,
        Some(Duration::from_secs(7 * DAY))
    );
}

#[tokio::test]
async fn cached_value_is_returned_without_counting() {
    let upstream = ScriptedUpstream::ok("fresh");
    let store = Arc::new(MemoryStore::new());
    let key = request_key("test/path", r#"{"query":"test body"}"#);
    store
        .set_string(key.as_str(), "cached result", Duration::from_secs(60))
        .await
        .unwrap();
    let proxy = proxy(upstream.clone(), store.clone(), 1000);

    let result = proxy
        .handle_request("test/path", r#"{"query":"test body"}"#)
        .await
        .unwrap();

    assert_eq!(result, "cached result");
    assert_eq!(upstream.calls(), 0);
    assert_eq!(store.get_count(&daily_counter_key(today())).await.unwrap(), 0);
}

#[tokio::test]
async fn default_requests_use_default_lifetime() {
    let upstream = ScriptedUpstream::ok(r#"{"response":"test response"}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    proxy
        .handle_request("suggest/party", r#"{"query":"сбер"}"#)
        .await
        .unwrap();

    let key = request_key("suggest/party", r#"{"query":"сбер"}"#);
    assert_eq!(store.ttl_of(key.as_str()).await, Some(Duration::from_secs(3_600)));
}

#[tokio::test]
async fn quota_blocks_before_upstream() {
    let upstream = ScriptedUpstream::ok(r#"{"suggestions":[]}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream.clone(), store.clone(), 1);

    proxy
        .handle_request("suggest/party", r#"{"query":"a"}"#)
        .await
        .unwrap();
    let err = proxy
        .handle_request("suggest/party", r#"{"query":"b"}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QuotaExceeded { limit: 1 }));
    assert_eq!(err.status_code(), 429);
    assert_eq!(upstream.calls(), 1);
    assert_eq!(proxy.stats().quota_rejections, 1);
}

#[tokio::test]
async fn quota_also_blocks_cached_requests() {
    let upstream = ScriptedUpstream::ok("x");
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream.clone(), store.clone(), 1);

    proxy.handle_request("suggest/party", "{}").await.unwrap();
    let err = proxy.handle_request("suggest/party", "{}").await.unwrap_err();

    assert!(matches!(err, Error::QuotaExceeded { .. }));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn first_increment_of_the_day_sets_counter_expiry() {
    let upstream = ScriptedUpstream::ok("x");
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 10);

    proxy.handle_request("suggest/party", r#"{"query":"1"}"#).await.unwrap();
    proxy.handle_request("suggest/party", r#"{"query":"2"}"#).await.unwrap();

    let counter = daily_counter_key(today());
    assert_eq!(store.get_count(&counter).await.unwrap(), 2);
    assert_eq!(store.ttl_of(&counter).await, Some(Duration::from_secs(24 * 3_600)));
}

#[tokio::test]
async fn unlimited_quota_does_not_count() {
    let upstream = ScriptedUpstream::ok("x");
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    proxy.handle_request("suggest/party", "{}").await.unwrap();

    assert_eq!(store.get_count(&daily_counter_key(today())).await.unwrap(), 0);
}

#[tokio::test]
async fn valid_inn_lookup_writes_secondary_index() {
    let response = r#"{"suggestions":[{"value":"ПАО СБЕРБАНК","data":{"inn":"7707083893"}}]}"#;
    let upstream = ScriptedUpstream::ok(response);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    let body = r#"{"query":"7707083893"}"#;
    let result = proxy.handle_request("findById/party", body).await.unwrap();
    assert_eq!(result, response);

    let primary = request_key("findById/party", body);
    let secondary = inn_key("7707083893");
    assert_eq!(store.get_string(primary.as_str()).await.unwrap().as_deref(), Some(response));
    assert_eq!(store.get_string(&secondary).await.unwrap().as_deref(), Some(response));
    assert_eq!(store.ttl_of(primary.as_str()).await, Some(Duration::from_secs(30 * DAY)));
    assert_eq!(store.ttl_of(&secondary).await, Some(Duration::from_secs(30 * DAY)));
    assert_eq!(proxy.stats().secondary_writes, 1);
}

#[tokio::test]
async fn empty_inn_lookup_keeps_long_secondary_lifetime() {
    let upstream = ScriptedUpstream::ok(r#"{"suggestions":[]}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    let body = r#"{"query":"7707083893"}"#;
    proxy.handle_request("findById/party", body).await.unwrap();

    let primary = request_key("findById/party", body);
    assert_eq!(store.ttl_of(primary.as_str()).await, Some(Duration::from_secs(DAY)));
    assert_eq!(
        store.ttl_of(&inn_key("7707083893")).await,
        Some(Duration::from_secs(30 * DAY))
    );
}

#[tokio::test]
async fn invalid_inn_skips_secondary_index() {
    let upstream = ScriptedUpstream::ok(r#"{"suggestions":[{"x":1}]}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    proxy
        .handle_request("findById/party", r#"{"query":"7707083894"}"#)
        .await
        .unwrap();

    assert_eq!(store.get_string(&inn_key("7707083894")).await.unwrap(), None);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn inn_outside_lookup_path_skips_secondary_index() {
    let upstream = ScriptedUpstream::ok(r#"{"suggestions":[{"x":1}]}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    proxy
        .handle_request("suggest/party", r#"{"query":"7707083893"}"#)
        .await
        .unwrap();

    assert_eq!(store.get_string(&inn_key("7707083893")).await.unwrap(), None);
}

#[tokio::test]
async fn empty_upstream_result_is_not_cached_or_counted() {
    let upstream = ScriptedUpstream::ok("");
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream.clone(), store.clone(), 5);

    let result = proxy
        .handle_request("findById/party", r#"{"query":"7707083893"}"#)
        .await
        .unwrap();

    assert_eq!(result, "");
    assert!(store.is_empty().await);
    assert_eq!(proxy.stats().empty_results, 1);

    // nothing remembered, so the next call goes upstream again
    proxy
        .handle_request("findById/party", r#"{"query":"7707083893"}"#)
        .await
        .unwrap();
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn upstream_failure_is_wrapped_and_not_cached() {
    let upstream = ScriptedUpstream::failing("connection reset");
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 5);

    let err = proxy
        .handle_request("suggest/party", r#"{"query":"x"}"#)
        .await
        .unwrap_err();

    match &err {
        Error::UpstreamIntegration(TransportError::Other(msg)) => assert_eq!(msg, "connection reset"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status_code(), 503);
    assert!(store.is_empty().await);
    assert_eq!(proxy.stats().errors, 1);
}

#[tokio::test]
async fn malformed_lookup_response_is_surfaced() {
    let upstream = ScriptedUpstream::ok("<html>gateway</html>");
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream, store.clone(), 0);

    let err = proxy
        .handle_request("findById/party", r#"{"query":"7707083893"}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedUpstreamResponse { .. }));
    assert_eq!(store.get_string(&inn_key("7707083893")).await.unwrap(), None);
}

#[tokio::test]
async fn lookup_response_without_suggestion_array_is_cached_as_empty() {
    let upstream = ScriptedUpstream::ok(r#"{"suggestions":"none"}"#);
    let store = Arc::new(MemoryStore::new());
    let proxy = proxy(upstream.clone(), store.clone(), 5);

    let body = r#"{"query":"7707083893"}"#;
    let first = proxy.handle_request("findById/party", body).await.unwrap();
    let second = proxy.handle_request("findById/party", body).await.unwrap();

    assert_eq!(first, r#"{"suggestions":"none"}"#);
    assert_eq!(first, second);
    assert_eq!(upstream.calls(), 1);
    assert_eq!(
        store.get_count(&daily_counter_key(today())).await.unwrap(),
        1
    );
    let primary = request_key("findById/party", body);
    assert_eq!(store.ttl_of(primary.as_str()).await, Some(Duration::from_secs(DAY)));
    assert_eq!(
        store.ttl_of(&inn_key("7707083893")).await,
        Some(Duration::from_secs(30 * DAY))
    );
}

#[tokio::test]
async fn store_failure_fails_the_request() {
    let upstream = ScriptedUpstream::ok("x");
    let proxy = SuggestionProxyBuilder::new()
        .caching(caching(10))
        .upstream(upstream.clone())
        .store(Arc::new(BrokenStore))
        .build()
        .unwrap();

    let err = proxy.handle_request("suggest/party", "{}").await.unwrap_err();

    assert!(matches!(err, Error::Store { backend: "broken", .. }));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn new_day_starts_a_new_counter() {
    let upstream = ScriptedUpstream::ok("x");
    let store = Arc::new(MemoryStore::new());
    let day = Arc::new(Mutex::new(today()));
    let clock_day = day.clone();
    let proxy = SuggestionProxyBuilder::new()
        .caching(caching(1))
        .upstream(upstream.clone())
        .store(store.clone())
        .clock(Arc::new(move || *clock_day.lock().unwrap()))
        .build()
        .unwrap();

    proxy.handle_request("suggest/party", r#"{"query":"1"}"#).await.unwrap();
    assert!(proxy.handle_request("suggest/party", r#"{"query":"2"}"#).await.is_err());

    *day.lock().unwrap() = today().succ_opt().unwrap();
    proxy.handle_request("suggest/party", r#"{"query":"2"}"#).await.unwrap();
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn concurrent_identical_misses_may_both_call_upstream() {
    let upstream = ScriptedUpstream::ok("x");
    let store = Arc::new(MemoryStore::new());
    let proxy = Arc::new(proxy(upstream.clone(), store.clone(), 0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let proxy = proxy.clone();
        handles.push(tokio::spawn(async move {
            proxy.handle_request("suggest/party", r#"{"query":"same"}"#).await
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap(), "x");
    }

    let calls = upstream.calls();
    assert!((1..=8).contains(&calls));
    assert_eq!(store.len().await, 1);
}

#[test]
fn builder_requires_components() {
    let err = SuggestionProxyBuilder::new().build().err().unwrap();
    assert!(matches!(err, Error::Configuration { .. }));

    let err = SuggestionProxyBuilder::new()
        .caching(CachingOptions {
            address_days: 0,
            ..Default::default()
        })
        .upstream(ScriptedUpstream::ok("x"))
        .store(Arc::new(MemoryStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("caching.address_days"));
}
