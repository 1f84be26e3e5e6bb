//! Render client abstraction
//!
//! A render client turns a URL into a fully rendered document. The pipeline
//! only depends on the contract defined here; the default implementation is a
//! plain HTTP client, but anything that can navigate, reload, and hand back
//! page content fits (a headless browser, a fixture server in tests).

mod http;

pub use http::{HttpClientFactory, HttpRenderClient};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by render clients
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No page loaded")]
    NoPage,

    #[error("Failed to provision render client: {0}")]
    Provision(String),
}

impl RenderError {
    /// Returns true if this error indicates the remote rate-limited the client.
    ///
    /// Prefers the structured status code when the client surfaces one and
    /// falls back to matching the error text, since some render engines only
    /// report failures as strings.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status == 429,
            Self::Navigation { message, .. } => message.contains("429"),
            _ => false,
        }
    }
}

/// Result type for render client operations
pub type RenderResult<T> = Result<T, RenderError>;

/// A client that fetches and renders pages
///
/// Each extraction worker owns exactly one live client. Clients are replaced,
/// never reused, after a rate-limit recovery.
#[async_trait]
pub trait RenderClient: Send {
    /// Navigates to a URL and renders the document
    async fn navigate(&mut self, url: &str) -> RenderResult<()>;

    /// Returns the URL the client is currently on, if any
    fn current_url(&self) -> Option<&str>;

    /// Returns the rendered content of the current page
    fn rendered_content(&self) -> &str;

    /// Re-fetches the current page
    async fn reload(&mut self) -> RenderResult<()>;

    /// Triggers incremental content reveal (e.g. scroll-to-end).
    ///
    /// Clients that deliver the full document in one shot treat this as a
    /// no-op; the producer's reveal loop terminates on the attempt budget.
    async fn reveal_more(&mut self) -> RenderResult<()>;
}

/// Provisions render clients for the pool and for recovery replacements
#[async_trait]
pub trait RenderClientFactory: Send + Sync {
    async fn provision(&self) -> RenderResult<Box<dyn RenderClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_from_status() {
        let err = RenderError::HttpStatus {
            status: 429,
            url: "https://example.com/jobs/view/1".to_string(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_non_429_status_is_not_rate_limit() {
        let err = RenderError::HttpStatus {
            status: 503,
            url: "https://example.com/jobs/view/1".to_string(),
        };
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn test_rate_limit_from_error_text() {
        let err = RenderError::Navigation {
            url: "https://example.com/jobs/view/1".to_string(),
            message: "upstream said: 429 too many requests".to_string(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_timeout_is_not_rate_limit() {
        let err = RenderError::Timeout {
            url: "https://example.com/jobs/view/1".to_string(),
        };
        assert!(!err.is_rate_limit());
    }
}
