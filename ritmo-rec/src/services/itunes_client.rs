//! iTunes Search API client
//!
//! Best-effort enrichment of a recognized track with a preview URL and
//! artwork. One request per recognition, limit 1 result, rate limited.

use super::MetadataLookup;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const ITUNES_BASE_URL: &str = "https://itunes.apple.com/search";
const USER_AGENT: &str = "ritmo/0.1.0 (https://github.com/ritmo/ritmo)";
const RATE_LIMIT_MS: u64 = 3000; // iTunes allows roughly 20 requests per minute

/// iTunes client errors
///
/// All of these collapse to "no enrichment" at the session layer.
#[derive(Debug, Error)]
pub enum ItunesError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("No results for search term")]
    NoResults,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// iTunes search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(rename = "resultCount")]
    pub result_count: i64,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    /// 30-second preview stream URL
    #[serde(rename = "previewUrl")]
    pub preview_url: Option<String>,
    /// 100x100 thumbnail artwork URL
    #[serde(rename = "artworkUrl100")]
    pub artwork_url_100: Option<String>,
}

/// Enrichment fields extracted from the best search result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub preview_url: Option<String>,
    pub artwork_url: Option<String>,
}

/// Rate limiter spacing out search requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("iTunes rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// iTunes Search API client
#[derive(Clone)]
pub struct ItunesClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl ItunesClient {
    pub fn new() -> Result<Self, ItunesError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ItunesError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// Search for one track by "{title} {artist}" and extract enrichment URLs
    pub async fn search_track(&self, title: &str, artist: &str) -> Result<Enrichment, ItunesError> {
        // Rate limit
        self.rate_limiter.wait().await;

        let term = format!("{} {}", title, artist);
        let params = [
            ("term", term.as_str()),
            ("media", "music"),
            ("entity", "song"),
            ("limit", "1"),
        ];

        tracing::debug!(term = %term, "Querying iTunes Search API");

        let response = self
            .http_client
            .get(ITUNES_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| ItunesError::NetworkError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ItunesError::ApiError(status.as_u16(), error_text));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| ItunesError::ParseError(e.to_string()))?;

        let track = search_response
            .results
            .first()
            .ok_or(ItunesError::NoResults)?;

        let artwork_url = track
            .artwork_url_100
            .as_deref()
            .map(upgrade_artwork_url);

        tracing::info!(
            term = %term,
            has_preview = track.preview_url.is_some(),
            has_artwork = artwork_url.is_some(),
            "iTunes lookup successful"
        );

        Ok(Enrichment {
            preview_url: track.preview_url.clone(),
            artwork_url,
        })
    }
}

impl MetadataLookup for ItunesClient {
    async fn lookup(&self, title: &str, artist: &str) -> Result<Enrichment, ItunesError> {
        self.search_track(title, artist).await
    }
}

/// Rewrite the fixed-size thumbnail URL to a higher-resolution form
///
/// iTunes returns a 100x100 artwork convention; the same asset exists at
/// 600x600. URLs without the token pass through unchanged.
pub fn upgrade_artwork_url(url: &str) -> String {
    url.replace("100x100", "600x600")
}
