//! Public catalog handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use isc_models::{Theme, VideoFilter, VideoId, VideoRecord};
use isc_store::CatalogError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Theme as embedded in a video.
#[derive(Debug, Serialize)]
pub struct ThemeSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Video as exposed to the frontend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: String,
    pub youtube_video_id: String,
    pub watch_url: String,
    pub title: String,
    pub uploader: String,
    pub views: u64,
    pub duration: String,
    pub ai_summary: String,
    pub original_description: String,
    /// Admin annotation
    pub admin_description: String,
    pub keywords: Vec<String>,
    pub theme: Option<ThemeSummary>,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub is_published: bool,
    pub simulated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&VideoRecord> for VideoView {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.to_string(),
            youtube_video_id: record.reference.external_id.clone(),
            watch_url: record.watch_url(),
            title: record.title.clone(),
            uploader: record.uploader.clone(),
            views: record.view_count,
            duration: record.duration.clone(),
            ai_summary: record.ai_summary.clone(),
            original_description: record.description.clone(),
            admin_description: record.admin_annotation.clone(),
            keywords: record.keywords.clone(),
            theme: record.theme.as_ref().map(|t| ThemeSummary {
                id: t.id.to_string(),
                name: t.name.clone(),
                color: t.color.clone(),
            }),
            thumbnail_url: record.thumbnail_url.clone(),
            published_at: record.published_at.clone(),
            is_published: record.is_published,
            simulated: record.simulated,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Listing filters. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Theme id
    pub theme: Option<String>,
    pub keyword: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    fn to_filter(&self) -> VideoFilter {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        let mut filter = VideoFilter::published();
        if let Some(theme) = present(&self.theme) {
            filter = filter.with_theme(theme);
        }
        if let Some(keyword) = present(&self.keyword) {
            filter = filter.with_keyword(keyword);
        }
        if let Some(search) = present(&self.search) {
            filter = filter.with_search(search);
        }
        filter
    }
}

/// List published videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<VideoView>>> {
    let records = state.catalog.list(&query.to_filter()).await?;
    Ok(Json(records.iter().map(VideoView::from).collect()))
}

/// Get one published video.
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VideoView>> {
    let id = VideoId::from_string(id);
    let record = state.catalog.get(&id).await?;
    if !record.is_published {
        return Err(CatalogError::NotFound(id).into());
    }
    Ok(Json(VideoView::from(&record)))
}

/// List all themes.
pub async fn list_themes(State(state): State<AppState>) -> ApiResult<Json<Vec<Theme>>> {
    Ok(Json(state.catalog.themes().await?))
}

/// Sorted unique keywords of published videos.
pub async fn list_keywords(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.catalog.keywords().await?))
}

/// Fallback for unknown `/api` routes.
pub async fn api_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use isc_models::{NormalizedMetadata, VideoReference};

    #[test]
    fn test_view_field_names() {
        let reference = VideoReference::youtube("abc123");
        let mut record = VideoRecord::new(
            reference.clone(),
            NormalizedMetadata::defaults(&reference),
            Some(Theme::new("Langage").with_color("#ff0000")),
            "note",
        );
        record.keywords = vec!["memory".to_string()];

        let json = serde_json::to_value(VideoView::from(&record)).unwrap();
        assert_eq!(json["youtubeVideoId"], "abc123");
        assert_eq!(json["adminDescription"], "note");
        assert_eq!(json["views"], 0);
        assert_eq!(json["theme"]["name"], "Langage");
        assert_eq!(json["theme"]["color"], "#ff0000");
        assert_eq!(json["watchUrl"], "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_blank_query_values_are_ignored() {
        let query = ListQuery {
            theme: Some("  ".to_string()),
            keyword: Some("sleep".to_string()),
            search: None,
        };
        let filter = query.to_filter();
        assert!(filter.theme_id.is_none());
        assert_eq!(filter.keyword.as_deref(), Some("sleep"));
        assert!(filter.published_only);
    }
}
