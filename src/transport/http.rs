use super::{TransportError, Upstream};
use crate::config::UpstreamOptions;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

/// Prefix of every suggestions API path.
const API_PREFIX: &str = "suggestions/api/4_1/rs/";

/// Longest error body kept in a [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// DaData suggestions client.
///
/// Sends the caller's body verbatim and returns the response text verbatim;
/// the proxy never interprets the upstream protocol beyond that.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(options: &UpstreamOptions) -> Result<Self> {
        options.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Token {}", options.api_key), "upstream.api_key")?,
        );
        headers.insert("x-secret", header_value(&options.secret, "upstream.secret")?);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::UpstreamIntegration(TransportError::Http(e)))?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for a proxied path, e.g. `findById/party`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, API_PREFIX, path.trim_start_matches('/'))
    }
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        Error::configuration_with_context(
            "credential is not a valid HTTP header value",
            ErrorContext::new()
                .with_field_path(field)
                .with_details(e.to_string())
                .with_source("http_upstream"),
        )
    })
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, path: &str, body: &str) -> std::result::Result<String, TransportError> {
        let url = self.url_for(path);
        debug!(%url, "calling DaData");

        let response = self.client.post(&url).body(body.to_string()).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "dadata-http"
    }
}
