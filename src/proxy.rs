//! Request proxy orchestrator.
//!
//! [`SuggestionProxy`] ties the cache key, TTL policy, shared store and
//! upstream client together. Build it with [`SuggestionProxyBuilder`].

pub mod builder;
pub mod core;
mod stats;

pub use builder::SuggestionProxyBuilder;
pub use self::core::{Clock, SuggestionProxy};
pub use stats::ProxyStats;
