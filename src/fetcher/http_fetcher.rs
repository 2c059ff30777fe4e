use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::config::FetcherConfig;
use crate::domain::FeedDocument;
use crate::fetcher::document::decode;
use crate::fetcher::Fetcher;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_config(&FetcherConfig::default())
    }

    pub fn with_config(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<FeedDocument> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let body = response.bytes().await?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), url);

        decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_custom_config() {
        let config = FetcherConfig {
            user_agent: "gator-test".into(),
            request_timeout_secs: 5,
        };
        assert!(HttpFetcher::with_config(&config).is_ok());
        assert!(HttpFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        let fetcher = HttpFetcher::new().unwrap();
        assert!(fetcher.fetch_feed("not a url").await.is_err());
    }
}
