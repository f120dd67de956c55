//! Admin catalog handlers. Every handler requires [`AdminUser`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use isc_models::{resolve, ThemeId, VideoId, VideoPatch};
use isc_store::{CatalogError, Registration};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::videos::VideoView;
use crate::metrics;
use crate::state::AppState;

/// Register a video from a URL.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVideoRequest {
    #[serde(alias = "url")]
    #[validate(length(min = 1, max = 2048))]
    pub video_url: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub admin_annotation: Option<String>,
    #[serde(default)]
    pub theme_id: Option<ThemeId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnnotationRequest {
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub annotation: String,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoView>,
}

impl MutationResponse {
    fn with_video(message: &str, video: VideoView) -> Self {
        Self {
            message: message.to_string(),
            video: Some(video),
        }
    }
}

/// Resolve, enrich and register a video.
pub async fn register_video(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<RegisterVideoRequest>,
) -> ApiResult<(StatusCode, Json<MutationResponse>)> {
    request.validate()?;

    let reference = resolve(&request.video_url).inspect_err(|e| {
        metrics::record_url_rejection(e.code());
    })?;

    // Skip provider calls for a known duplicate; register re-checks atomically
    if state.catalog.contains(&reference).await? {
        return Err(CatalogError::DuplicateReference(reference).into());
    }

    let themes = state.catalog.themes().await?;
    let metadata = state.ingest.enrich(&reference, &themes).await;

    let registration = Registration {
        admin_annotation: request.admin_annotation.unwrap_or_default().trim().to_string(),
        theme_id: request.theme_id,
    };
    let record = state.catalog.register(reference, metadata, registration).await?;

    info!(admin = %admin.subject, video_id = %record.id, "Video added");
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::with_video("Video added", VideoView::from(&record))),
    ))
}

/// Partial update of a video.
pub async fn update_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _admin: AdminUser,
    Json(patch): Json<VideoPatch>,
) -> ApiResult<Json<MutationResponse>> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let record = state.catalog.update(&VideoId::from_string(id), &patch).await?;
    Ok(Json(MutationResponse::with_video("Video updated", VideoView::from(&record))))
}

/// Replace the admin annotation.
pub async fn annotate_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _admin: AdminUser,
    Json(request): Json<AnnotationRequest>,
) -> ApiResult<Json<MutationResponse>> {
    request.validate()?;

    let record = state
        .catalog
        .annotate(&VideoId::from_string(id), request.annotation.trim())
        .await?;
    Ok(Json(MutationResponse::with_video("Annotation saved", VideoView::from(&record))))
}

/// Delete a video.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminUser,
) -> ApiResult<Json<MutationResponse>> {
    let id = VideoId::from_string(id);
    state.catalog.remove(&id).await?;

    info!(admin = %admin.subject, video_id = %id, "Video deleted");
    Ok(Json(MutationResponse {
        message: "Video deleted".to_string(),
        video: None,
    }))
}
