//! Catalog video records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::normalize::{clean_keywords, NormalizedMetadata};
use crate::reference::VideoReference;
use crate::theme::{Theme, ThemeId};

/// Unique identifier for a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A registered video in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique record ID
    pub id: VideoId,

    /// Provider reference (unique across the catalog)
    pub reference: VideoReference,

    pub title: String,

    /// Channel name
    pub uploader: String,

    /// Original provider description
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub view_count: u64,

    /// Display duration (`H:MM:SS`, `M:SS` or `N/A`)
    #[serde(default = "default_duration")]
    pub duration: String,

    #[serde(default)]
    pub thumbnail_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    /// AI-generated summary, or a sentinel
    pub ai_summary: String,

    /// Cleaned keywords, never blank
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Shared subject tag
    #[serde(default)]
    pub theme: Option<Theme>,

    /// Curator note, independent of AI output
    #[serde(default)]
    pub admin_annotation: String,

    /// Hidden from the public listing when false
    #[serde(default = "default_published")]
    pub is_published: bool,

    /// Metadata or summary came from placeholders
    #[serde(default)]
    pub simulated: bool,

    /// Creation timestamp, never mutated
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

fn default_duration() -> String {
    crate::duration::UNKNOWN_DURATION.to_string()
}

fn default_published() -> bool {
    true
}

impl VideoRecord {
    /// Build a new record from normalized metadata.
    ///
    /// `theme` is the already-resolved theme; proposed names are turned into
    /// themes by the persistence layer before this is called.
    pub fn new(
        reference: VideoReference,
        metadata: NormalizedMetadata,
        theme: Option<Theme>,
        admin_annotation: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let details = metadata.details;

        Self {
            id: VideoId::new(),
            reference,
            title: details.title,
            uploader: details.uploader,
            description: details.description,
            view_count: details.view_count,
            duration: details.duration,
            thumbnail_url: details.thumbnail_url,
            published_at: details.published_at,
            ai_summary: metadata.summary,
            keywords: metadata.keywords,
            theme,
            admin_annotation: admin_annotation.into(),
            is_published: true,
            simulated: details.simulated || metadata.simulated,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the admin annotation.
    pub fn annotate(&mut self, annotation: impl Into<String>) {
        self.admin_annotation = annotation.into();
        self.touch();
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn theme_id(&self) -> Option<&ThemeId> {
        self.theme.as_ref().map(|t| &t.id)
    }

    pub fn watch_url(&self) -> String {
        self.reference.watch_url()
    }
}

/// Partial update of a record. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoPatch {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub uploader: Option<String>,

    #[serde(default, alias = "summary")]
    pub ai_summary: Option<String>,

    #[serde(default)]
    pub keywords: Option<Vec<String>>,

    #[serde(default)]
    pub admin_annotation: Option<String>,

    /// `null` clears the theme, absent leaves it alone
    #[serde(default, deserialize_with = "double_option")]
    pub theme_id: Option<Option<ThemeId>>,

    #[serde(default)]
    pub is_published: Option<bool>,
}

fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

impl VideoPatch {
    pub fn is_empty(&self) -> bool {
        self == &VideoPatch::default()
    }

    /// Apply every field except the theme, which needs a catalog lookup.
    ///
    /// Keywords are re-cleaned. Always refreshes `updated_at`.
    pub fn apply_fields(&self, record: &mut VideoRecord) {
        if let Some(title) = &self.title {
            record.title = title.trim().to_string();
        }
        if let Some(uploader) = &self.uploader {
            record.uploader = uploader.trim().to_string();
        }
        if let Some(summary) = &self.ai_summary {
            record.ai_summary = summary.trim().to_string();
        }
        if let Some(keywords) = &self.keywords {
            record.keywords = clean_keywords(keywords.iter().map(String::as_str));
        }
        if let Some(annotation) = &self.admin_annotation {
            record.admin_annotation = annotation.clone();
        }
        if let Some(published) = self.is_published {
            record.is_published = published;
        }
        record.touch();
    }
}
