//! YouTube Data API v3 client.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use isc_models::{ProviderMetadata, Thumbnail};

use super::{check_status, ProviderError, ProviderResult};

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Metadata lookups against the `videos` endpoint.
pub struct YoutubeClient {
    http: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

impl From<VideoItem> for ProviderMetadata {
    fn from(item: VideoItem) -> Self {
        Self {
            title: item.snippet.title,
            channel_title: item.snippet.channel_title,
            description: item.snippet.description,
            view_count: item.statistics.view_count,
            duration: item.content_details.duration,
            thumbnails: item.snippet.thumbnails,
            published_at: item.snippet.published_at,
            tags: item.snippet.tags,
        }
    }
}

impl YoutubeClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: YOUTUBE_API_BASE.to_string(),
        })
    }

    /// Point the client at another host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch snippet, statistics and content details for one video.
    ///
    /// `Ok(None)` when YouTube knows no such video.
    pub async fn fetch(&self, external_id: &str) -> ProviderResult<Option<ProviderMetadata>> {
        let url = format!("{}/videos", self.base_url);
        debug!(video_id = external_id, "Fetching YouTube metadata");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("id", external_id),
                ("part", "snippet,statistics,contentDetails"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body: VideoListResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(body.items.into_iter().next().map(ProviderMetadata::from))
    }
}
