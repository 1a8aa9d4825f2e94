//! Cache lifetime selection.

use crate::config::CachingOptions;
use crate::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Path marker of the lookup-by-identifier endpoint (legal entities by INN).
pub const LEGAL_ENTITY_MARKER: &str = "findById/party";

/// Path marker of address suggestions and lookups.
pub const ADDRESS_MARKER: &str = "address";

/// Request category, decided by case-sensitive substring match on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    LegalEntity,
    Address,
    Other,
}

impl RequestClass {
    pub fn of(path: &str) -> Self {
        if path.contains(LEGAL_ENTITY_MARKER) {
            RequestClass::LegalEntity
        } else if path.contains(ADDRESS_MARKER) {
            RequestClass::Address
        } else {
            RequestClass::Other
        }
    }
}

/// Chooses how long a successful upstream response stays cached.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    options: CachingOptions,
}

impl TtlPolicy {
    pub fn new(options: CachingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CachingOptions {
        &self.options
    }

    /// Lifetime for a response to `path`.
    ///
    /// Legal-entity responses are inspected: a non-empty `suggestions` array
    /// earns the long lifetime, anything else (missing, null, wrong type, a
    /// body that is not an object) the short negative one. Only a body that
    /// is not JSON at all fails with [`Error::MalformedUpstreamResponse`].
    pub fn select(&self, path: &str, response: Option<&str>) -> Result<Duration> {
        match RequestClass::of(path) {
            RequestClass::LegalEntity => {
                let value: Value = serde_json::from_str(response.unwrap_or("")).map_err(|source| {
                    Error::MalformedUpstreamResponse {
                        path: path.to_string(),
                        source,
                    }
                })?;
                let found = value
                    .get("suggestions")
                    .and_then(Value::as_array)
                    .map_or(false, |s| !s.is_empty());
                Ok(if found {
                    self.options.legal_entity_ttl()
                } else {
                    self.options.empty_legal_entity_ttl()
                })
            }
            RequestClass::Address => Ok(self.options.address_ttl()),
            RequestClass::Other => Ok(self.options.default_ttl()),
        }
    }
}
