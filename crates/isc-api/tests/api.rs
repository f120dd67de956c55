//! Router-level tests against in-memory state.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use isc_api::services::{AiProvider, GeminiClient, YoutubeClient};
use isc_api::{create_router, ApiConfig, AppState, Ingestor};
use isc_store::{Catalog, JsonFileRepository};

const PASSWORD: &str = "isc2025";

/// Argon2id hash with low cost parameters, for fast logins in tests.
fn password_hash(password: &str) -> String {
    let params = Params::new(1024, 1, 1, None).unwrap();
    let salt = SaltString::encode_b64(b"isc-fixed-salt16").unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn config(static_dir: &TempDir) -> ApiConfig {
    ApiConfig {
        admin_password_hash: Some(password_hash(PASSWORD)),
        static_dir: static_dir.path().to_path_buf(),
        ..Default::default()
    }
}

fn app_with(state: AppState) -> Router {
    create_router(state, None)
}

fn app(static_dir: &TempDir) -> Router {
    app_with(AppState::in_memory(config(static_dir)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router) -> String {
    let (status, body) = send(app, json_request("POST", "/api/auth/login", None, json!({"password": PASSWORD}))).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn register(app: &Router, token: &str, url: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request("POST", "/api/admin/videos", Some(token), json!({"videoUrl": url, "adminAnnotation": " à voir "})),
    )
    .await
}

#[tokio::test]
async fn test_health_and_ready() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["catalog"]["backend"], "memory");
    assert_eq!(body["providers"]["youtube"], false);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let body = json!({"videoUrl": "https://youtu.be/abc123"});

    let (status, err) = send(&app, json_request("POST", "/api/admin/videos", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "unauthorized");

    let (status, _) = send(&app, json_request("POST", "/api/admin/videos", Some("garbage"), body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get("/api/auth/verify")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, _) = send(&app, json_request("POST", "/api/auth/login", None, json!({"password": "nope"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, json_request("POST", "/api/auth/login", None, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let token = login(&app).await;
    let (status, body) = send(&app, authed("GET", "/api/auth/verify", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["adminId"], "admin");
}

#[tokio::test]
async fn test_login_disabled_without_password() {
    let dir = TempDir::new().unwrap();
    let config = ApiConfig {
        admin_password_hash: None,
        ..config(&dir)
    };
    let app = app_with(AppState::in_memory(config));

    let (status, _) = send(&app, json_request("POST", "/api/auth/login", None, json!({"password": "x"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_register_without_providers() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let token = login(&app).await;

    let (status, body) = register(&app, &token, "https://youtu.be/abc123?t=5").await;
    assert_eq!(status, StatusCode::CREATED);
    let video = &body["video"];
    assert_eq!(video["youtubeVideoId"], "abc123");
    assert_eq!(video["title"], "pending");
    assert_eq!(video["views"], 0);
    assert_eq!(video["aiSummary"], "pending");
    assert_eq!(video["keywords"], json!([]));
    assert_eq!(video["theme"], Value::Null);
    assert_eq!(video["adminDescription"], "à voir");
    assert_eq!(video["simulated"], true);

    let (status, listed) = send(&app, get("/api/videos")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let id = video["id"].as_str().unwrap();
    let (status, fetched) = send(&app, get(&format!("/api/videos/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["youtubeVideoId"], "abc123");
}

#[tokio::test]
async fn test_register_rejections() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let token = login(&app).await;

    let (status, _) = register(&app, &token, "https://youtu.be/abc123").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, &token, "https://www.youtube.com/watch?v=abc123&t=1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_reference");

    let (status, body) = register(&app, &token, "https://vimeo.com/123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unrecognized_url");

    let (status, body) = register(&app, &token, "not a url").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_url");

    let (status, body) = register(&app, &token, "https://www.youtube.com/watch?v=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_identifier");

    let (status, body) = register(&app, &token, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_failed");

    let (_, listed) = send(&app, get("/api/videos")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_with_unknown_theme() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/admin/videos",
            Some(&token),
            json!({"videoUrl": "https://youtu.be/abc123", "themeId": "missing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "theme_not_found");
}

#[tokio::test]
async fn test_update_annotate_delete() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let token = login(&app).await;

    let (_, body) = register(&app, &token, "https://youtu.be/abc123").await;
    let id = body["video"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/admin/videos/{id}"),
            Some(&token),
            json!({"title": "Le sommeil", "keywords": ["sleep", " memory. ", ""]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["video"]["title"], "Le sommeil");
    assert_eq!(body["video"]["keywords"], json!(["sleep", "memory"]));

    let (status, _) = send(&app, json_request("PUT", &format!("/api/admin/videos/{id}"), Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/admin/videos/{id}/annotation"),
            Some(&token),
            json!({"annotation": "Classique"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["video"]["adminDescription"], "Classique");

    let (_, keywords) = send(&app, get("/api/keywords")).await;
    assert_eq!(keywords, json!(["memory", "sleep"]));

    let (_, found) = send(&app, get("/api/videos?keyword=sleep")).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, found) = send(&app, get("/api/videos?search=SOMMEIL")).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, found) = send(&app, get("/api/videos?keyword=other")).await;
    assert!(found.as_array().unwrap().is_empty());

    let (status, _) = send(&app, authed("DELETE", &format!("/api/admin/videos/{id}"), &token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, authed("DELETE", &format!("/api/admin/videos/{id}"), &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = send(&app, get(&format!("/api/videos/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unpublished_video_is_hidden() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let token = login(&app).await;

    let (_, body) = register(&app, &token, "https://youtu.be/abc123").await;
    let id = body["video"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request("PUT", &format!("/api/admin/videos/{id}"), Some(&token), json!({"isPublished": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send(&app, get("/api/videos")).await;
    assert!(listed.as_array().unwrap().is_empty());
    let (status, _) = send(&app, get(&format!("/api/videos/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_routes_without_keys() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/api/youtube-info/dQw4w9WgXcQ")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["simulated"], true);
    assert_eq!(body["data"]["viewCount"], 0);
    assert_eq!(body["data"]["duration"], "N/A");

    let (status, _) = send(&app, get("/api/youtube-info/bad%20id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/generate-summary", None, json!({"title": "Sleep", "channelTitle": "ISC"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["simulated"], true);
    assert_eq!(body["keywords"], json!([]));
}

#[tokio::test]
async fn test_thumbnail_redirect() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let response = app.clone().oneshot(get("/api/thumbnail?v=dQw4w9WgXcQ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
    );

    let (status, _) = send(&app, get("/api/thumbnail")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_api_route_and_static_fallback() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>ISC</h1>").unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("<h1>ISC</h1>".to_string()));
}

#[tokio::test]
async fn test_register_with_providers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "snippet": {
                    "title": "Plasticité cérébrale",
                    "channelTitle": "ISC UQAM",
                    "description": "Conférence",
                    "thumbnails": {"maxres": {"url": "https://i.ytimg.com/max.jpg"}}
                },
                "statistics": {"viewCount": "2048"},
                "contentDetails": {"duration": "PT1H2M3S"}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{
                "text": "```json\n{\"summary\": \"Une conférence.\", \"keywords\": [\"plasticité\", \"Neuroplasticity\"], \"theme\": \"Neuroscience\"}\n```"
            }]}}]
        })))
        .mount(&server)
        .await;

    let timeout = Duration::from_secs(5);
    let youtube = YoutubeClient::new("k", timeout).unwrap().with_base_url(server.uri());
    let gemini = GeminiClient::new("k", "gemini-2.0-flash", timeout)
        .unwrap()
        .with_base_url(server.uri());
    let ai: Arc<dyn AiProvider> = Arc::new(gemini);
    let ingest = Ingestor::new(Some(youtube), Some(ai), timeout);

    let dir = TempDir::new().unwrap();
    let app = app_with(AppState::with_parts(config(&dir), Catalog::in_memory(), ingest));
    let token = login(&app).await;

    let (status, body) = register(&app, &token, "https://www.youtube.com/watch?v=dQw4w9WgXcQ").await;
    assert_eq!(status, StatusCode::CREATED);
    let video = &body["video"];
    assert_eq!(video["title"], "Plasticité cérébrale");
    assert_eq!(video["uploader"], "ISC UQAM");
    assert_eq!(video["views"], 2048);
    assert_eq!(video["duration"], "1:02:03");
    assert_eq!(video["thumbnailUrl"], "https://i.ytimg.com/max.jpg");
    assert_eq!(video["aiSummary"], "Une conférence.");
    assert_eq!(video["keywords"], json!(["plasticité", "Neuroplasticity"]));
    assert_eq!(video["theme"]["name"], "Neuroscience");
    assert_eq!(video["simulated"], false);

    let (_, themes) = send(&app, get("/api/themes")).await;
    assert_eq!(themes.as_array().unwrap().len(), 1);
    let theme_id = themes[0]["id"].as_str().unwrap();

    let (_, by_theme) = send(&app, get(&format!("/api/videos?theme={theme_id}"))).await;
    assert_eq!(by_theme.as_array().unwrap().len(), 1);

    let (status, info) = send(&app, get("/api/youtube-info/dQw4w9WgXcQ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["simulated"], false);
    assert_eq!(info["data"]["channelTitle"], "ISC UQAM");

    let (status, summary) = send(
        &app,
        json_request("POST", "/api/generate-summary", None, json!({"title": "Plasticité"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["theme"], "Neuroscience");
    assert_eq!(summary["themeId"], theme_id);
    assert_eq!(summary["format"], "structured");
}

#[tokio::test]
async fn test_file_backend_persists_registrations() {
    let data = TempDir::new().unwrap();
    let static_dir = TempDir::new().unwrap();

    let repo = JsonFileRepository::open(data.path()).await.unwrap();
    let catalog = Catalog::new(Arc::new(repo));
    let app = app_with(AppState::with_parts(config(&static_dir), catalog, Ingestor::offline()));
    let token = login(&app).await;

    let (status, _) = register(&app, &token, "https://youtu.be/abc123").await;
    assert_eq!(status, StatusCode::CREATED);

    let reopened = JsonFileRepository::open(data.path()).await.unwrap();
    let app = app_with(AppState::with_parts(
        config(&static_dir),
        Catalog::new(Arc::new(reopened)),
        Ingestor::offline(),
    ));
    let (_, listed) = send(&app, get("/api/videos")).await;
    assert_eq!(listed[0]["youtubeVideoId"], "abc123");
}
