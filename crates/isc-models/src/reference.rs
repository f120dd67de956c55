//! Video references: the provider-scoped identity of a catalog entry.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Video hosting provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Youtube,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies a video independently of its catalog storage id.
///
/// Two records with the same `(provider, external_id)` pair may never coexist
/// in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct VideoReference {
    pub provider: Provider,
    pub external_id: String,
}

impl VideoReference {
    /// Reference to a YouTube video.
    ///
    /// The id is taken as-is; use [`crate::resolver::resolve`] for untrusted input.
    pub fn youtube(external_id: impl Into<String>) -> Self {
        Self {
            provider: Provider::Youtube,
            external_id: external_id.into(),
        }
    }

    /// Canonical watch URL.
    pub fn watch_url(&self) -> String {
        match self.provider {
            Provider::Youtube => format!("https://www.youtube.com/watch?v={}", self.external_id),
        }
    }

    /// Conventional thumbnail URL, usable without any API call.
    pub fn default_thumbnail_url(&self) -> String {
        match self.provider {
            Provider::Youtube => format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.external_id),
        }
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.external_id)
    }
}
