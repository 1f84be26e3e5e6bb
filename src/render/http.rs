//! HTTP-backed render client
//!
//! Fetches pages with reqwest and treats the response body as the rendered
//! document. Sites that need script execution would swap in a browser-backed
//! client behind the same trait; the pipeline does not care.

use crate::config::RenderConfig;
use crate::render::{RenderClient, RenderClientFactory, RenderError, RenderResult};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::time::Duration;

/// Render client that performs plain HTTP GETs
pub struct HttpRenderClient {
    http: Client,
    current: Option<String>,
    body: String,
}

impl HttpRenderClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            current: None,
            body: String::new(),
        }
    }

    async fn fetch(&mut self, url: &str) -> RenderResult<()> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RenderError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Redirects are followed by the client; record where we landed.
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.current = Some(final_url);
        self.body = body;
        Ok(())
    }
}

#[async_trait]
impl RenderClient for HttpRenderClient {
    async fn navigate(&mut self, url: &str) -> RenderResult<()> {
        self.fetch(url).await
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn rendered_content(&self) -> &str {
        &self.body
    }

    async fn reload(&mut self) -> RenderResult<()> {
        let url = self.current.clone().ok_or(RenderError::NoPage)?;
        self.fetch(&url).await
    }

    async fn reveal_more(&mut self) -> RenderResult<()> {
        // A plain GET already returns the complete document.
        Ok(())
    }
}

/// Factory that builds [`HttpRenderClient`]s with a randomized user agent
pub struct HttpClientFactory {
    config: RenderConfig,
}

impl HttpClientFactory {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn pick_user_agent(&self) -> String {
        let mut rng = rand::thread_rng();
        self.config
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| "magpie/1.0".to_string())
    }
}

#[async_trait]
impl RenderClientFactory for HttpClientFactory {
    async fn provision(&self) -> RenderResult<Box<dyn RenderClient>> {
        // blocked_resources is a throughput hint for browser-backed clients;
        // an HTTP client never fetches sub-resources in the first place.
        let client = Client::builder()
            .user_agent(self.pick_user_agent())
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| RenderError::Provision(e.to_string()))?;

        Ok(Box::new(HttpRenderClient::new(client)))
    }
}
