//! # dadata-proxy
//!
//! Caching and rate-limiting engine in front of the DaData suggestions API.
//!
//! ## Overview
//!
//! Every DaData call costs money and counts against a daily allowance. This
//! crate sits between the web layer and the API and makes sure each distinct
//! request is paid for as rarely as possible:
//!
//! - **Deduplication**: identical `(path, body)` pairs are answered from a
//!   shared cache keyed by a SHA-256 digest of the request
//! - **Content-aware lifetimes**: legal-entity lookups that found something
//!   live for a month, empty ones for a day, addresses for a week, the rest
//!   for an hour (all configurable)
//! - **Daily quota**: one counter per UTC day, shared by every instance
//!   through the store's atomic increment
//! - **INN index**: successful lookups by a valid INN are also stored under
//!   `inn:{inn}` for identifier-keyed reads elsewhere
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dadata_proxy::config::ProxyConfig;
//! use dadata_proxy::SuggestionProxyBuilder;
//!
//! #[tokio::main]
//! async fn main() -> dadata_proxy::Result<()> {
//!     let config = ProxyConfig::load(None)?;
//!     let proxy = SuggestionProxyBuilder::from_config(&config).await?.build()?;
//!
//!     let json = proxy
//!         .handle_request("findById/party", r#"{"query":"7707083893"}"#)
//!         .await?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`proxy`] | Request orchestrator and its builder |
//! | [`cache`] | Cache keys, TTL policy, memory and Redis stores |
//! | [`transport`] | Upstream seam and the HTTP DaData client |
//! | [`inn`] | INN checksum validation |
//! | [`config`] | Configuration loading and validation |

pub mod cache;
pub mod config;
pub mod inn;
pub mod proxy;
pub mod transport;

pub use proxy::{ProxyStats, SuggestionProxy, SuggestionProxyBuilder};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
