//! Provider passthrough handlers: YouTube metadata, thumbnails, AI summaries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use isc_models::normalize::shape_provider_metadata;
use isc_models::{
    parse_ai_response, resolve_bare_id, AiResponseFormat, NormalizationIssue, ThemeId,
    ThemeResolution, VideoDetails,
};

use crate::error::{ApiError, ApiResult};
use crate::services::SummaryRequest;
use crate::state::AppState;

/// Shaped YouTube metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,
    pub channel_title: String,
    pub description: String,
    pub view_count: u64,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub thumbnail: String,
    pub tags: Vec<String>,
}

impl From<VideoDetails> for VideoInfo {
    fn from(details: VideoDetails) -> Self {
        Self {
            title: details.title,
            channel_title: details.uploader,
            description: details.description,
            view_count: details.view_count,
            duration: details.duration,
            published_at: details.published_at,
            thumbnail: details.thumbnail_url,
            tags: details.tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoInfoResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub simulated: bool,
    pub data: VideoInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<NormalizationIssue>,
}

/// YouTube metadata for one video id.
///
/// Without an API key, placeholder data is returned with 503 and
/// `simulated: true`.
pub async fn youtube_info(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Response> {
    let reference = resolve_bare_id(&video_id)?;

    if !state.ingest.has_youtube() {
        let body = VideoInfoResponse {
            error: Some("YouTube API not configured".to_string()),
            simulated: true,
            data: VideoDetails::placeholder(&reference).into(),
            issues: Vec::new(),
        };
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response());
    }

    let metadata = state
        .ingest
        .fetch_metadata(&reference)
        .await
        .map_err(|e| {
            warn!(reference = %reference, error = %e, "YouTube lookup failed");
            ApiError::upstream("YouTube lookup failed")
        })?
        .ok_or_else(|| ApiError::not_found("YouTube video not found"))?;

    let (details, issues) = shape_provider_metadata(&reference, Some(&metadata));
    let body = VideoInfoResponse {
        error: None,
        simulated: false,
        data: details.into(),
        issues,
    };
    Ok(Json(body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailQuery {
    #[serde(default)]
    pub v: String,
}

/// Redirect to the conventional thumbnail of a video id.
pub async fn thumbnail(Query(query): Query<ThumbnailQuery>) -> ApiResult<Redirect> {
    let reference = resolve_bare_id(&query.v)?;
    Ok(Redirect::temporary(&reference.default_thumbnail_url()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: String,
    pub keywords: Vec<String>,
    /// Theme name proposed by the model
    pub theme: Option<String>,
    /// Set when the proposed theme already exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<ThemeId>,
    pub format: AiResponseFormat,
    pub simulated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<NormalizationIssue>,
}

/// Generate summary, keywords and theme for a title/description pair.
///
/// Without an AI provider, the all-default result is returned with 503 and
/// `simulated: true`.
pub async fn generate_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> ApiResult<Response> {
    if !state.ingest.has_ai() {
        let parsed = parse_ai_response(None);
        let body = SummaryResponse {
            summary: parsed.summary,
            keywords: parsed.keywords,
            theme: None,
            theme_id: None,
            format: parsed.format,
            simulated: true,
            issues: Vec::new(),
        };
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response());
    }

    if request.is_blank() {
        return Err(ApiError::bad_request("Title or description required"));
    }

    let themes = state.catalog.themes().await?;
    let text = state.ingest.summarize(&request, &themes).await.map_err(|e| {
        warn!(error = %e, "AI summary failed");
        ApiError::upstream("Summary generation failed")
    })?;

    let parsed = parse_ai_response(text.as_deref());
    let theme_id = parsed
        .theme_name
        .as_deref()
        .map(|name| ThemeResolution::resolve(name, &themes))
        .and_then(|resolution| match resolution {
            ThemeResolution::Existing { theme } => Some(theme.id),
            ThemeResolution::Proposed { .. } => None,
        });

    let simulated = parsed.is_simulated();
    let body = SummaryResponse {
        summary: parsed.summary,
        keywords: parsed.keywords,
        theme: parsed.theme_name,
        theme_id,
        format: parsed.format,
        simulated,
        issues: parsed.issues,
    };
    Ok(Json(body).into_response())
}
