//! Supabase (PostgREST) catalog backend.
//!
//! - `videos` table keyed by `id`, unique on `youtube_video_id`
//! - `themes` table, unique on `name`
//! - Retry with backoff on transient failures
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, Instrument};

use isc_models::duration::UNKNOWN_DURATION;
use isc_models::theme::find_by_name;
use isc_models::{Theme, ThemeId, VideoFilter, VideoId, VideoRecord, VideoReference};

use crate::error::{StoreError, StoreResult};
use crate::metrics::{record_request, record_rows_returned, record_theme_created};
use crate::repository::CatalogRepository;
use crate::retry::{with_retry, RetryConfig};

const VIDEOS: &str = "videos";
const THEMES: &str = "themes";

/// Columns returned for video queries, with the theme embedded.
const VIDEO_SELECT: &str = "*,themes(id,name,color,description)";
const THEME_SELECT: &str = "id,name,color,description";

// =============================================================================
// Configuration
// =============================================================================

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL (`https://<ref>.supabase.co`)
    pub url: String,
    /// Service or anon key, sent as `apikey` and bearer token
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        let url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StoreError::config("SUPABASE_URL must be set to use the Supabase backend"))?;

        let api_key = std::env::var("SUPABASE_KEY")
            .or_else(|_| std::env::var("SUPABASE_SERVICE_ROLE_KEY"))
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StoreError::config("SUPABASE_KEY must be set to use the Supabase backend"))?;

        let connect_timeout_secs: u64 = std::env::var("SUPABASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            url,
            api_key,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// `videos` table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VideoRow {
    id: String,
    youtube_video_id: String,
    title: String,
    uploader: String,
    #[serde(default)]
    views: Option<i64>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    ai_summary: Option<String>,
    #[serde(default)]
    original_description: Option<String>,
    #[serde(default)]
    admin_annotation: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    theme_id: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    is_published: Option<bool>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    /// Embedded by `select=*,themes(...)`; never written
    #[serde(default, skip_serializing)]
    themes: Option<Theme>,
}

impl From<&VideoRecord> for VideoRow {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.to_string(),
            youtube_video_id: record.reference.external_id.clone(),
            title: record.title.clone(),
            uploader: record.uploader.clone(),
            views: Some(i64::try_from(record.view_count).unwrap_or(i64::MAX)),
            duration: Some(record.duration.clone()),
            ai_summary: Some(record.ai_summary.clone()),
            original_description: Some(record.description.clone()),
            admin_annotation: Some(record.admin_annotation.clone()),
            keywords: Some(record.keywords.clone()),
            theme_id: record.theme_id().map(ToString::to_string),
            thumbnail_url: Some(record.thumbnail_url.clone()),
            published_at: record.published_at.clone(),
            is_published: Some(record.is_published),
            created_at: record.created_at,
            updated_at: Some(record.updated_at),
            themes: None,
        }
    }
}

impl From<VideoRow> for VideoRecord {
    fn from(row: VideoRow) -> Self {
        let reference = VideoReference::youtube(row.youtube_video_id);
        let thumbnail_url = row
            .thumbnail_url
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| reference.default_thumbnail_url());

        VideoRecord {
            id: VideoId::from(row.id),
            reference,
            title: row.title,
            uploader: row.uploader,
            description: row.original_description.unwrap_or_default(),
            view_count: row.views.and_then(|v| u64::try_from(v).ok()).unwrap_or(0),
            duration: row.duration.unwrap_or_else(|| UNKNOWN_DURATION.to_string()),
            thumbnail_url,
            published_at: row.published_at,
            ai_summary: row.ai_summary.unwrap_or_default(),
            keywords: row.keywords.unwrap_or_default(),
            theme: row.themes,
            admin_annotation: row.admin_annotation.unwrap_or_default(),
            is_published: row.is_published.unwrap_or(true),
            simulated: false,
            created_at: row.created_at,
            updated_at: row.updated_at.unwrap_or(row.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct NewThemeRow<'a> {
    id: &'a ThemeId,
    name: &'a str,
}

// =============================================================================
// Client
// =============================================================================

/// Catalog backend on a Supabase project.
#[derive(Clone)]
pub struct SupabaseRepository {
    http: Client,
    config: SupabaseConfig,
    rest_url: String,
}

impl SupabaseRepository {
    /// Create a new client.
    pub fn new(config: SupabaseConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| StoreError::config("SUPABASE_KEY contains invalid header characters"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| StoreError::config("SUPABASE_KEY contains invalid header characters"))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .default_headers(headers)
            .user_agent(concat!("isc-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let rest_url = format!("{}/rest/v1", config.url.trim_end_matches('/'));

        info!(url = %config.url, "Supabase backend configured");

        Ok(Self {
            http,
            config,
            rest_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Send a request (with retry) and decode the JSON array it returns.
    async fn fetch_rows<T, B>(&self, operation: &'static str, table: &str, build: B) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
        B: Fn() -> RequestBuilder,
    {
        let build = &build;
        let rows: Vec<T> = with_retry(&self.config.retry, operation, move || async move {
            self.execute_request(operation, table, async {
                let response = build().send().await?;
                let response = check_status(response).await?;
                Ok(response.json::<Vec<T>>().await?)
            })
            .await
        })
        .await?;

        record_rows_returned(table, rows.len());
        Ok(rows)
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(&self, operation: &str, table: &str, fut: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        let span = info_span!("supabase_request", operation = %operation, table = %table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn select_one(&self, operation: &'static str, column: &str, value: &str) -> StoreResult<Option<VideoRecord>> {
        let url = self.table_url(VIDEOS);
        let filter = format!("eq.{}", value);
        let rows: Vec<VideoRow> = self
            .fetch_rows(operation, VIDEOS, || {
                self.http.get(&url).query(&[
                    ("select", VIDEO_SELECT),
                    (column, filter.as_str()),
                    ("limit", "1"),
                ])
            })
            .await?;
        Ok(rows.into_iter().next().map(VideoRecord::from))
    }
}

/// Turn a non-success status into an error, honoring Retry-After on 429.
async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(secs) = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            return Err(StoreError::RateLimited(secs * 1000));
        }
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::from_http_status(
        status.as_u16(),
        format!("{} failed: {}", url, body),
    ))
}

#[async_trait]
impl CatalogRepository for SupabaseRepository {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn find_by_reference(&self, reference: &VideoReference) -> StoreResult<Option<VideoRecord>> {
        self.select_one("find_by_reference", "youtube_video_id", &reference.external_id)
            .await
    }

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        self.select_one("get_video", "id", id.as_str()).await
    }

    async fn insert(&self, record: &VideoRecord) -> StoreResult<()> {
        let url = self.table_url(VIDEOS);
        let row = VideoRow::from(record);
        let rows: Vec<VideoRow> = self
            .fetch_rows("insert_video", VIDEOS, || {
                self.http
                    .post(&url)
                    .query(&[("select", VIDEO_SELECT)])
                    .header("Prefer", "return=representation")
                    .json(&row)
            })
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists(_) => StoreError::AlreadyExists(record.reference.to_string()),
                other => other,
            })?;

        if rows.is_empty() {
            return Err(StoreError::InvalidResponse("insert returned no row".to_string()));
        }
        debug!(video_id = %record.id, reference = %record.reference, "Inserted video row");
        Ok(())
    }

    async fn update(&self, record: &VideoRecord) -> StoreResult<bool> {
        let url = self.table_url(VIDEOS);
        let filter = format!("eq.{}", record.id);
        let row = VideoRow::from(record);
        let rows: Vec<VideoRow> = self
            .fetch_rows("update_video", VIDEOS, || {
                self.http
                    .patch(&url)
                    .query(&[("id", filter.as_str()), ("select", VIDEO_SELECT)])
                    .header("Prefer", "return=representation")
                    .json(&row)
            })
            .await?;
        Ok(!rows.is_empty())
    }

    async fn delete(&self, id: &VideoId) -> StoreResult<bool> {
        let url = self.table_url(VIDEOS);
        let filter = format!("eq.{}", id);
        let rows: Vec<serde_json::Value> = self
            .fetch_rows("delete_video", VIDEOS, || {
                self.http
                    .delete(&url)
                    .query(&[("id", filter.as_str()), ("select", "id")])
                    .header("Prefer", "return=representation")
            })
            .await?;
        Ok(!rows.is_empty())
    }

    async fn list(&self, filter: &VideoFilter) -> StoreResult<Vec<VideoRecord>> {
        let url = self.table_url(VIDEOS);

        // Exact filters go to PostgREST; search runs locally on the result
        let mut params: Vec<(&str, String)> = vec![
            ("select", VIDEO_SELECT.to_string()),
            ("order", "created_at.desc,id.asc".to_string()),
        ];
        if filter.published_only {
            params.push(("is_published", "eq.true".to_string()));
        }
        if let Some(theme_id) = &filter.theme_id {
            params.push(("theme_id", format!("eq.{}", theme_id)));
        }
        if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            params.push(("keywords", format!("cs.{{\"{}\"}}", keyword.replace('"', "\\\""))));
        }

        let rows: Vec<VideoRow> = self
            .fetch_rows("list_videos", VIDEOS, || self.http.get(&url).query(&params))
            .await?;

        let records: Vec<VideoRecord> = rows.into_iter().map(VideoRecord::from).collect();
        Ok(filter.apply(&records))
    }

    async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        let url = self.table_url(THEMES);
        self.fetch_rows("list_themes", THEMES, || {
            self.http
                .get(&url)
                .query(&[("select", THEME_SELECT), ("order", "name.asc")])
        })
        .await
    }

    async fn find_or_create_theme(&self, name: &str) -> StoreResult<Theme> {
        if let Some(theme) = find_by_name(&self.list_themes().await?, name) {
            return Ok(theme.clone());
        }

        let url = self.table_url(THEMES);
        let theme = Theme::new(name);
        let row = NewThemeRow {
            id: &theme.id,
            name: &theme.name,
        };

        let created: StoreResult<Vec<Theme>> = self
            .fetch_rows("create_theme", THEMES, || {
                self.http
                    .post(&url)
                    .query(&[("select", THEME_SELECT)])
                    .header("Prefer", "return=representation")
                    .json(&row)
            })
            .await;

        match created {
            Ok(rows) => {
                record_theme_created(self.backend());
                info!(theme = %theme.name, "Created theme");
                Ok(rows.into_iter().next().unwrap_or(theme))
            }
            // Another writer created it first
            Err(StoreError::AlreadyExists(_)) => find_by_name(&self.list_themes().await?, name)
                .cloned()
                .ok_or_else(|| StoreError::not_found(format!("theme {}", name))),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use isc_models::NormalizedMetadata;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(server: &MockServer) -> SupabaseRepository {
        let mut config = SupabaseConfig::new(server.uri(), "test-key");
        config.retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        SupabaseRepository::new(config).unwrap()
    }

    fn video_row(id: &str, youtube_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "youtube_video_id": youtube_id,
            "title": "Le cerveau prédictif",
            "uploader": "ISC UQAM",
            "views": 1200,
            "duration": "12:04",
            "ai_summary": "Résumé.",
            "original_description": "",
            "admin_annotation": "",
            "keywords": ["cognition"],
            "theme_id": "t-1",
            "thumbnail_url": null,
            "is_published": true,
            "created_at": "2025-11-04T10:00:00.123456+00:00",
            "updated_at": "2025-11-04T10:00:00.123456+00:00",
            "themes": {"id": "t-1", "name": "Neuroscience", "color": "#3366ff"}
        })
    }

    #[tokio::test]
    async fn test_find_by_reference_maps_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .and(query_param("youtube_video_id", "eq.abc123"))
            .and(header("apikey", "test-key"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([video_row("v-1", "abc123")])))
            .mount(&server)
            .await;

        let record = repo(&server)
            .find_by_reference(&VideoReference::youtube("abc123"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id.as_str(), "v-1");
        assert_eq!(record.view_count, 1200);
        assert_eq!(record.theme.unwrap().name, "Neuroscience");
        assert_eq!(record.thumbnail_url, "https://img.youtube.com/vi/abc123/hqdefault.jpg");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(repo(&server).get(&VideoId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_conflict_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/videos"))
            .and(header("prefer", "return=representation"))
            .and(body_partial_json(json!({"youtube_video_id": "abc123"})))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reference = VideoReference::youtube("abc123");
        let record = VideoRecord::new(reference.clone(), NormalizedMetadata::defaults(&reference), None, "");
        let err = repo(&server).insert(&record).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref r) if r == "youtube:abc123"));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "t-1", "name": "Neuroscience", "color": null, "description": null}
            ])))
            .mount(&server)
            .await;

        let themes = repo(&server).list_themes().await.unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].name, "Neuroscience");
    }

    #[tokio::test]
    async fn test_delete_reports_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/videos"))
            .and(query_param("id", "eq.v-404"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(!repo(&server).delete(&VideoId::from("v-404")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_pushes_exact_filters_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .and(query_param("is_published", "eq.true"))
            .and(query_param("theme_id", "eq.t-1"))
            .and(query_param("keywords", "cs.{\"cognition\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                video_row("v-1", "abc123"),
                video_row("v-2", "def456")
            ])))
            .mount(&server)
            .await;

        let filter = VideoFilter::published()
            .with_theme("t-1")
            .with_keyword("cognition");
        let records = repo(&server).list(&filter).await.unwrap();
        assert_eq!(records.len(), 2);
        // Same timestamp: ordered by id
        assert_eq!(records[0].id.as_str(), "v-1");
    }

    #[tokio::test]
    async fn test_find_or_create_theme_refetches_on_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "t-9", "name": "Linguistique"}
            ])))
            .mount(&server)
            .await;

        let theme = repo(&server).find_or_create_theme("linguistique").await.unwrap();
        assert_eq!(theme.id.as_str(), "t-9");
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_url() {
        std::env::remove_var("SUPABASE_URL");
        assert!(matches!(SupabaseConfig::from_env(), Err(StoreError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::set_var("SUPABASE_URL", "https://example.supabase.co");
        std::env::set_var("SUPABASE_KEY", "key");
        std::env::remove_var("SUPABASE_CONNECT_TIMEOUT_SECS");
        let config = SupabaseConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 3);
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_KEY");
    }
}
