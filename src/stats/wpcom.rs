//! WordPress.com Stats REST gateway (the API behind Jetpack Stats).
//!
//! Endpoints used:
//! - `GET {base}/sites/{site}/stats/top-posts?max=N&summarize=1&num=D`
//! - `GET {base}/sites/{site}/stats/post/{id}?fields=views`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::backend::{StatsError, StatsGateway, StatsResult};
use super::{with_retries, RetryPolicy};
use crate::config::StatsConfig;
use crate::models::{EntityId, EntityType, RankedEntry};

/// `top-posts` response.
#[derive(Debug, Deserialize)]
struct TopPostsResponse {
    summary: Option<TopPostsSummary>,
}

#[derive(Debug, Deserialize)]
struct TopPostsSummary {
    #[serde(default)]
    postviews: Vec<PostViewRow>,
}

#[derive(Debug, Deserialize)]
struct PostViewRow {
    #[serde(default)]
    id: u64,
    #[serde(rename = "type", default)]
    entity_type: Option<String>,
    #[serde(default)]
    views: u64,
}

/// `post/{id}` response.
#[derive(Debug, Deserialize)]
struct PostViewsResponse {
    views: Option<u64>,
}

/// HTTP gateway to the WordPress.com stats API.
#[derive(Clone)]
pub struct WpcomStatsGateway {
    client: Client,
    base_url: Url,
    site: String,
    token: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl WpcomStatsGateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    /// Returns [`StatsError::Unavailable`] if the base URL is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &StatsConfig) -> StatsResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("postrank/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StatsError::Unavailable(format!("HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StatsError::Unavailable(format!("Invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StatsError::Unavailable(format!(
                "Invalid base URL: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            site: config.site.clone().unwrap_or_default(),
            token: config.token.clone(),
            timeout,
            retry: RetryPolicy {
                retries: config.retries,
                base_delay_ms: config.retry_base_ms,
            },
        })
    }

    /// Build `{base}/sites/{site}/stats/{segments...}`.
    fn endpoint(&self, segments: &[&str]) -> StatsResult<Url> {
        if self.site.is_empty() {
            return Err(StatsError::Unavailable("No stats site configured".to_string()));
        }

        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StatsError::Unavailable("Invalid base URL".to_string()))?;
            path.pop_if_empty()
                .extend(["sites", self.site.as_str(), "stats"])
                .extend(segments);
        }
        Ok(url)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> StatsError {
        if e.is_timeout() {
            StatsError::Timeout(self.timeout)
        } else if e.is_decode() {
            StatsError::MalformedResponse(e.to_string())
        } else {
            StatsError::Unavailable(e.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> StatsResult<T> {
        debug!("GET {}", url);
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(StatsError::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            // 4xx other than 429 will not get better by retrying.
            return Err(StatsError::MalformedResponse(format!("HTTP {}", status)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| StatsError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl StatsGateway for WpcomStatsGateway {
    async fn fetch_top_entities(
        &self,
        max_count: usize,
        window_days: u32,
    ) -> StatsResult<Vec<RankedEntry>> {
        let mut url = self.endpoint(&["top-posts"])?;
        url.query_pairs_mut()
            .append_pair("max", &max_count.to_string())
            .append_pair("summarize", "1")
            .append_pair("num", &window_days.to_string());

        let response: TopPostsResponse =
            with_retries(self.retry, || self.get_json(&url)).await?;

        let summary = response.summary.ok_or_else(|| {
            StatsError::MalformedResponse("top-posts response has no summary".to_string())
        })?;

        // Rows with id 0 are the site front page, not an entity.
        let entries = summary
            .postviews
            .into_iter()
            .filter(|row| row.id != 0)
            .map(|row| RankedEntry {
                id: EntityId(row.id),
                entity_type: EntityType::new(row.entity_type.as_deref().unwrap_or("post")),
                views: row.views,
            })
            .collect();

        Ok(entries)
    }

    async fn fetch_entity_views(&self, id: EntityId) -> StatsResult<Option<u64>> {
        let id_segment = id.to_string();
        let mut url = self.endpoint(&["post", id_segment.as_str()])?;
        url.query_pairs_mut().append_pair("fields", "views");

        let response: PostViewsResponse =
            with_retries(self.retry, || self.get_json(&url)).await?;
        Ok(response.views)
    }

    async fn probe(&self) -> bool {
        let url = match self.endpoint(&[]) {
            Ok(url) => url,
            Err(e) => {
                warn!("Stats probe skipped: {}", e);
                return false;
            }
        };

        match self.get_json::<serde_json::Value>(&url).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Stats probe failed: {}", e);
                false
            }
        }
    }
}
