//! Raw metadata as returned by a video metadata provider.
//!
//! Field names follow the YouTube Data API so a `snippet`/`statistics`
//! payload can be mapped with minimal glue. Every field is optional: the
//! normalizer decides on defaults.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Thumbnail qualities, best first.
pub const THUMBNAIL_PREFERENCE: [&str; 5] = ["maxres", "standard", "high", "medium", "default"];

/// Single thumbnail variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Provider metadata for one video, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub channel_title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// String or number; YouTube sends counts as strings
    #[serde(default)]
    pub view_count: Option<serde_json::Value>,

    /// Compact ISO-8601 duration token (`PT4M13S`)
    #[serde(default)]
    pub duration: Option<String>,

    /// Thumbnails keyed by quality name (`maxres`, `high`, ...)
    #[serde(default)]
    pub thumbnails: HashMap<String, Thumbnail>,

    #[serde(default)]
    pub published_at: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProviderMetadata {
    /// Best available thumbnail URL, following [`THUMBNAIL_PREFERENCE`].
    pub fn best_thumbnail(&self) -> Option<&str> {
        THUMBNAIL_PREFERENCE
            .iter()
            .filter_map(|quality| self.thumbnails.get(*quality))
            .map(|t| t.url.trim())
            .find(|url| !url.is_empty())
    }
}
