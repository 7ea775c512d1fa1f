//! Upstream match-history client.
//!
//! Fetches recent match windows and single full matches from the stats
//! provider. Errors are typed so callers can tell an auth failure from a
//! transient outage; the leaderboard engine treats any failure as "skip
//! this identity for this pass".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::models::MatchRecord;

/// Errors that can occur while fetching match data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, 5xx, or upstream rate limiting. Transient.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 401/403, a bad or missing API key. Needs operator attention.
    #[error("upstream auth failure (HTTP {status})")]
    UpstreamAuth { status: u16 },

    /// Player or match does not exist (or history is private).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid riot id: {0}")]
    InvalidRiotId(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::UpstreamUnavailable(err.to_string())
    }
}

/// Source of raw match data, abstracted for testing.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Most-recent-first window of matches for one identity.
    async fn recent_matches(
        &self,
        name: &str,
        tag: &str,
        size: usize,
    ) -> Result<Vec<MatchRecord>, FetchError>;

    /// One full match by id (timeline path).
    async fn match_by_id(&self, match_id: &str) -> Result<MatchRecord, FetchError>;
}

/// Configuration for the HTTP match fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Provider base URL.
    pub base_url: Url,

    /// Upstream region shard.
    pub region: String,

    /// API key sent with every request.
    pub api_key: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.henrikdev.xyz").expect("static URL"),
            region: "ap".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("valo-tracker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Upstream response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: Option<T>,
}

/// HTTP client for the upstream provider.
pub struct MatchFetcher {
    client: Client,
    config: FetcherConfig,
}

impl MatchFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    fn matches_url(&self, name: &str, tag: &str, size: usize) -> Result<Url, FetchError> {
        if name.is_empty() || tag.is_empty() {
            return Err(FetchError::InvalidRiotId(format!("{}#{}", name, tag)));
        }

        let path = format!("valorant/v3/matches/{}/{}/{}", self.config.region, name, tag);
        let mut url = self
            .config
            .base_url
            .join(&path)
            .map_err(|e| FetchError::InvalidRiotId(e.to_string()))?;
        url.query_pairs_mut().append_pair("size", &size.to_string());
        Ok(url)
    }

    fn match_url(&self, match_id: &str) -> Result<Url, FetchError> {
        if match_id.is_empty() {
            return Err(FetchError::NotFound("empty match id".to_string()));
        }
        self.config
            .base_url
            .join(&format!("valorant/v2/match/{}", match_id))
            .map_err(|e| FetchError::NotFound(e.to_string()))
    }

    async fn get_envelope<T: serde::de::DeserializeOwned>(
        &self,
        mut url: Url,
    ) -> Result<Option<T>, FetchError> {
        if let Some(key) = self.config.api_key.as_deref() {
            url.query_pairs_mut().append_pair("api_key", key);
        }

        debug!("Fetching {}", url.path());
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => FetchError::UpstreamAuth {
                    status: status.as_u16(),
                },
                404 => FetchError::NotFound(status.to_string()),
                429 => FetchError::UpstreamUnavailable("rate limited".to_string()),
                code if code >= 500 => FetchError::UpstreamUnavailable(status.to_string()),
                code => FetchError::HttpStatus {
                    status: code,
                    message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                },
            });
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl MatchSource for MatchFetcher {
    async fn recent_matches(
        &self,
        name: &str,
        tag: &str,
        size: usize,
    ) -> Result<Vec<MatchRecord>, FetchError> {
        let url = self.matches_url(name, tag, size)?;
        let matches: Vec<MatchRecord> = self.get_envelope(url).await?.unwrap_or_default();
        info!("Fetched {} matches for {}#{}", matches.len(), name, tag);
        Ok(matches)
    }

    async fn match_by_id(&self, match_id: &str) -> Result<MatchRecord, FetchError> {
        let url = self.match_url(match_id)?;
        self.get_envelope(url)
            .await?
            .ok_or_else(|| FetchError::NotFound(match_id.to_string()))
    }
}
