//! Page fetcher over plain HTTP(S).

use super::PageSource;
use crate::config::Config;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;

pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MonitorError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let fetch_err = |details: String| MonitorError::Fetch {
            url: url.to_string(),
            details,
        };

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status)));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| fetch_err(format!("response read failed: {}", e)))?;
        tracing::debug!(url, bytes = body.len(), "page fetched");
        Ok(body)
    }
}
