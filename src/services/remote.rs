// src/services/remote.rs

//! Upstream sources of novel snapshots.
//!
//! Scraping individual providers is someone else's job; this crate talks to
//! them through [`RemoteSource`]. [`HttpRemoteSource`] reaches a snapshot
//! gateway that serves already-scraped snapshots as JSON:
//!
//! ```text
//! GET {base}/providers/{provider}/novels/{novel}   -> RemoteSnapshot
//! GET {base}/providers/{provider}/rank?{options}   -> [RankItem]
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{NovelKey, RankItem, RankOptions, RemoteConfig, RemoteSnapshot};

/// Fetches canonical snapshots and rankings from upstream providers.
///
/// Failures are ordinary results: callers decide whether a failure is fatal.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn get_metadata(&self, key: &NovelKey) -> Result<RemoteSnapshot>;

    async fn list_rank(&self, provider_id: &str, options: &RankOptions) -> Result<Vec<RankItem>>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &RemoteConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Remote source backed by a snapshot gateway over HTTP.
pub struct HttpRemoteSource {
    client: Client,
    base_url: Url,
}

impl HttpRemoteSource {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self::new(client, base_url))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("base URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, context: &str, url: Url) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::remote(context, "not found upstream"));
        }
        if !status.is_success() {
            return Err(AppError::remote(context, format!("gateway returned {}", status)));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::remote(context, format!("malformed payload: {}", e)))
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn get_metadata(&self, key: &NovelKey) -> Result<RemoteSnapshot> {
        let url = self.endpoint(&["providers", &key.provider_id, "novels", &key.novel_id])?;
        self.get_json(&key.to_string(), url).await
    }

    async fn list_rank(&self, provider_id: &str, options: &RankOptions) -> Result<Vec<RankItem>> {
        let mut url = self.endpoint(&["providers", provider_id, "rank"])?;
        if !options.is_empty() {
            url.query_pairs_mut().extend_pairs(options.iter());
        }
        self.get_json(&format!("{} rank", provider_id), url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: &str) -> HttpRemoteSource {
        let config = RemoteConfig {
            base_url: base.to_string(),
            ..RemoteConfig::default()
        };
        HttpRemoteSource::from_config(&config).unwrap()
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let remote = source("http://gateway.local/api/");
        let url = remote
            .endpoint(&["providers", "pixiv", "novels", "s/123"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://gateway.local/api/providers/pixiv/novels/s%2F123"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let remote = source("http://gateway.local");
        let url = remote.endpoint(&["providers", "kakuyomu", "rank"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway.local/providers/kakuyomu/rank");
    }
}
