//! Proxy configuration
//!
//! Options are read from an optional YAML file, then overridden by `DADATA_*`
//! environment variables, then validated. Every cache lifetime is a
//! configuration input; nothing in the policy is hard-coded.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Cache lifetimes and the daily quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingOptions {
    /// Lifetime of legal-entity lookups that found something.
    pub legal_entity_days: u32,
    /// Lifetime of legal-entity lookups with no suggestions (e.g. freshly
    /// registered companies).
    pub empty_legal_entity_days: u32,
    pub address_days: u32,
    pub default_hours: u32,
    /// Maximum successful upstream calls per UTC day. 0 disables the quota.
    pub daily_request_limit: u64,
    /// Expiry attached to a day's counter on its first increment.
    pub request_counter_expiration_hours: u32,
}

impl Default for CachingOptions {
    fn default() -> Self {
        Self {
            legal_entity_days: 30,
            empty_legal_entity_days: 1,
            address_days: 7,
            default_hours: 1,
            daily_request_limit: 0,
            request_counter_expiration_hours: 24,
        }
    }
}

impl CachingOptions {
    pub fn legal_entity_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.legal_entity_days) * SECS_PER_DAY)
    }

    pub fn empty_legal_entity_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.empty_legal_entity_days) * SECS_PER_DAY)
    }

    pub fn address_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.address_days) * SECS_PER_DAY)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.default_hours) * SECS_PER_HOUR)
    }

    pub fn counter_expiry(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_counter_expiration_hours) * SECS_PER_HOUR)
    }

    pub fn quota_enabled(&self) -> bool {
        self.daily_request_limit > 0
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("caching.legal_entity_days", self.legal_entity_days),
            ("caching.empty_legal_entity_days", self.empty_legal_entity_days),
            ("caching.address_days", self.address_days),
            ("caching.default_hours", self.default_hours),
            (
                "caching.request_counter_expiration_hours",
                self.request_counter_expiration_hours,
            ),
        ];
        for (field, value) in positive {
            if value < 1 {
                return Err(Error::configuration_with_context(
                    "value must be at least 1",
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_details(format!("got {}", value))
                        .with_source("config_loader"),
                ));
            }
        }
        Ok(())
    }
}

/// Connection settings for the DaData API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamOptions {
    pub base_url: String,
    pub api_key: String,
    pub secret: String,
    pub timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for UpstreamOptions {
    fn default() -> Self {
        Self {
            base_url: "https://suggestions.dadata.ru".to_string(),
            api_key: String::new(),
            secret: String::new(),
            timeout_secs: 30,
            pool_max_idle_per_host: 32,
        }
    }
}

impl UpstreamOptions {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("upstream.api_key", &self.api_key),
            ("upstream.secret", &self.secret),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::configuration_with_context(
                    "value is required",
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("config_loader"),
                ));
            }
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                "base URL is not a valid URL",
                ErrorContext::new()
                    .with_field_path("upstream.base_url")
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;

        if self.timeout_secs == 0 {
            return Err(Error::configuration_with_context(
                "value must be at least 1",
                ErrorContext::new()
                    .with_field_path("upstream.timeout_secs")
                    .with_source("config_loader"),
            ));
        }
        Ok(())
    }
}

/// Where counters and cache entries live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// `redis://` URL. Without it the proxy keeps state in process memory,
    /// which is only correct for a single instance.
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub caching: CachingOptions,
    pub upstream: UpstreamOptions,
    pub store: StoreOptions,
}

impl ProxyConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            Error::configuration_with_context(
                "invalid YAML configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Load from an optional file, apply process environment overrides and
    /// validate the caching section.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.caching.validate()?;
        Ok(config)
    }

    /// Override fields from `DADATA_*` variables provided by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DADATA_BASE_URL") {
            self.upstream.base_url = v;
        }
        if let Some(v) = lookup("DADATA_API_KEY") {
            self.upstream.api_key = v;
        }
        if let Some(v) = lookup("DADATA_SECRET") {
            self.upstream.secret = v;
        }
        if let Some(v) = lookup("DADATA_REDIS_URL") {
            self.store.redis_url = Some(v).filter(|s| !s.is_empty());
        }

        parse_env(&lookup, "DADATA_TIMEOUT_SECS", &mut self.upstream.timeout_secs)?;
        parse_env(
            &lookup,
            "DADATA_POOL_MAX_IDLE_PER_HOST",
            &mut self.upstream.pool_max_idle_per_host,
        )?;
        let caching = &mut self.caching;
        parse_env(&lookup, "DADATA_DAILY_REQUEST_LIMIT", &mut caching.daily_request_limit)?;
        parse_env(
            &lookup,
            "DADATA_REQUEST_COUNTER_EXPIRATION_HOURS",
            &mut caching.request_counter_expiration_hours,
        )?;
        parse_env(&lookup, "DADATA_LEGAL_ENTITY_CACHE_DAYS", &mut caching.legal_entity_days)?;
        parse_env(
            &lookup,
            "DADATA_EMPTY_LEGAL_ENTITY_CACHE_DAYS",
            &mut caching.empty_legal_entity_days,
        )?;
        parse_env(&lookup, "DADATA_ADDRESS_CACHE_DAYS", &mut caching.address_days)?;
        parse_env(&lookup, "DADATA_DEFAULT_CACHE_HOURS", &mut caching.default_hours)?;
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, name: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<T>().map_err(|e| {
            Error::configuration_with_context(
                "environment override is not a number",
                ErrorContext::new()
                    .with_field_path(name)
                    .with_details(format!("{:?}: {}", raw, e))
                    .with_source("config_loader"),
            )
        })?;
    }
    Ok(())
}
