//! Upstream transport: the seam between the proxy and the DaData API.
//!
//! The orchestrator only sees [`Upstream`], an opaque async call that returns
//! the raw JSON text or fails. [`HttpUpstream`] is the production
//! implementation on top of `reqwest`.

mod http;

pub use http::HttpUpstream;

use async_trait::async_trait;

/// A single upstream call: POST `body` to `path`, return the response text.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn call(&self, path: &str, body: &str) -> Result<String, TransportError>;

    fn name(&self) -> &'static str {
        "upstream"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Other(String),
}
