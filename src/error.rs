use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for configuration and store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key or store key that caused the error (e.g., "caching.address_days")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "redis_store")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the proxy engine.
///
/// Cache misses and empty upstream results are ordinary outcomes and never
/// show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// The shared daily request limit has been reached.
    #[error("Daily request limit of {limit} DaData calls has been exceeded")]
    QuotaExceeded { limit: u64 },

    /// The upstream call failed (transport, HTTP status, body read).
    #[error("DaData integration error: {0}")]
    UpstreamIntegration(#[source] TransportError),

    /// A legal-entity lookup answered with something that is not JSON.
    #[error("Malformed DaData response for '{path}': {source}")]
    MalformedUpstreamResponse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store error ({backend}): {message}{}", format_context(.context))]
    Store {
        backend: &'static str,
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new store error with structured context
    pub fn store_with_context(
        backend: &'static str,
        msg: impl Into<String>,
        context: ErrorContext,
    ) -> Self {
        Error::Store {
            backend,
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Store { context, .. } | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// HTTP status the surrounding web layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::QuotaExceeded { .. } => 429,
            Error::UpstreamIntegration(_) => 503,
            _ => 500,
        }
    }

    /// Short problem title for the web layer's error body.
    pub fn title(&self) -> &'static str {
        match self {
            Error::QuotaExceeded { .. } => "Too Many Requests",
            Error::UpstreamIntegration(_) => "DaData Integration Error",
            _ => "Internal Server Error",
        }
    }

    /// Whether the caller may succeed by trying again later.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::QuotaExceeded { .. } | Error::UpstreamIntegration(_)
        )
    }
}
