//! Redis-backed store shared by every proxy instance.

use super::backend::CacheStore;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;
use tracing::debug;

/// INCR and, for a freshly created counter, EXPIRE in one server-side step.
const INCREMENT_WITH_EXPIRY: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

pub struct RedisStore {
    conn: ConnectionManager,
    increment: Script,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// The connection manager reconnects on its own after network errors;
    /// commands issued while disconnected fail with [`Error::Store`].
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| store_error("open", url, e))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| store_error("connect", url, e))?;
        debug!(%url, "connected to redis");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            increment: Script::new(INCREMENT_WITH_EXPIRY),
        }
    }
}

fn store_error(op: &str, key: &str, e: redis::RedisError) -> Error {
    Error::store_with_context(
        "redis",
        format!("{} failed: {}", op, e),
        ErrorContext::new()
            .with_field_path(key)
            .with_source("redis_store"),
    )
}

/// Redis expiries are whole seconds; sub-second lifetimes round up to one.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| store_error("GET", key, e))
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await
            .map_err(|e| store_error("SET", key, e))
    }

    async fn get_count(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn.get(key).await.map_err(|e| store_error("GET", key, e))?;
        Ok(count.unwrap_or(0))
    }

    async fn increment_counter(&self, key: &str, expiry: Duration) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = self
            .increment
            .key(key)
            .arg(ttl_secs(expiry))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("INCR", key, e))?;
        Ok(count)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
