//! Cache key generation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Opaque primary cache key derived from a proxied request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// SHA-256 of `"{path}:{body}"`, base64 encoded.
///
/// The body is hashed as received. Two JSON bodies that differ only in
/// whitespace or key order get different keys.
pub fn request_key(path: &str, body: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b":");
    hasher.update(body.as_bytes());
    CacheKey::new(STANDARD.encode(hasher.finalize()))
}

/// Key of the shared request counter for one UTC day.
pub fn daily_counter_key(date: NaiveDate) -> String {
    format!("dadata:daily_request_counter:{}", date.format("%Y%m%d"))
}

/// Secondary index key for an INN lookup.
pub fn inn_key(inn: &str) -> String {
    format!("inn:{}", inn)
}
