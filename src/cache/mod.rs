//! 缓存模块：请求缓存键、缓存时长策略与共享存储后端。
//!
//! # Response Caching Module
//!
//! Everything the proxy needs to avoid paying for the same DaData call twice.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`request_key`] | SHA-256 cache key of a proxied request |
//! | [`daily_counter_key`] / [`inn_key`] | Counter and secondary index keys |
//! | [`TtlPolicy`] | Content-aware cache lifetime selection |
//! | [`CacheStore`] | Trait for the shared key-value store |
//! | [`MemoryStore`] | In-process store for a single instance and tests |
//! | [`RedisStore`] | Redis store shared by all instances |
//!
//! ## Example
//!
//! ```rust
//! use dadata_proxy::cache::{request_key, CacheStore, MemoryStore, TtlPolicy};
//! use dadata_proxy::config::CachingOptions;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let policy = TtlPolicy::new(CachingOptions::default());
//!
//! let key = request_key("suggest/address", r#"{"query":"москва"}"#);
//! let ttl = policy.select("suggest/address", None).unwrap();
//! store.set_string(key.as_str(), "{}", ttl).await.unwrap();
//! assert!(store.get_string(key.as_str()).await.unwrap().is_some());
//! # });
//! ```

mod backend;
mod key;
mod policy;
mod redis_store;

pub use backend::{CacheStore, MemoryStore};
pub use key::{daily_counter_key, inn_key, request_key, CacheKey};
pub use policy::{RequestClass, TtlPolicy, ADDRESS_MARKER, LEGAL_ENTITY_MARKER};
pub use redis_store::RedisStore;
