//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

use isc_models::NormalizationIssue;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "isc_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "isc_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "isc_http_requests_in_flight";

    // Provider metrics
    pub const PROVIDER_REQUESTS_TOTAL: &str = "isc_provider_requests_total";
    pub const PROVIDER_LATENCY_SECONDS: &str = "isc_provider_latency_seconds";

    // Ingestion metrics
    pub const URL_REJECTIONS_TOTAL: &str = "isc_url_rejections_total";
    pub const NORMALIZATION_ISSUES_TOTAL: &str = "isc_normalization_issues_total";

    // Auth metrics
    pub const LOGIN_ATTEMPTS_TOTAL: &str = "isc_login_attempts_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "isc_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a metadata or AI provider call.
pub fn record_provider_call(provider: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("provider", provider.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::PROVIDER_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::PROVIDER_LATENCY_SECONDS, "provider" => provider.to_string()).record(duration_secs);
}

/// Record a submitted URL the resolver refused.
pub fn record_url_rejection(code: &str) {
    counter!(names::URL_REJECTIONS_TOTAL, "code" => code.to_string()).increment(1);
}

/// Count normalization issues by kind.
pub fn record_normalization_issues(issues: &[NormalizationIssue]) {
    for issue in issues {
        let kind = match issue {
            NormalizationIssue::InvalidViewCount(_) => "invalid_view_count",
            NormalizationIssue::InvalidDuration(_) => "invalid_duration",
            NormalizationIssue::MissingThumbnail => "missing_thumbnail",
            NormalizationIssue::IncompleteStructuredResponse => "incomplete_structured_response",
            NormalizationIssue::MissingSummary => "missing_summary",
            NormalizationIssue::MissingKeywords => "missing_keywords",
            NormalizationIssue::MissingTheme => "missing_theme",
        };
        counter!(names::NORMALIZATION_ISSUES_TOTAL, "kind" => kind).increment(1);
    }
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(names::LOGIN_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("valid regex")
});

static YOUTUBE_ID_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/youtube-info/[A-Za-z0-9_-]+").expect("valid regex"));

/// Sanitize path for metrics labels (collapse ids into placeholders).
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    let path = YOUTUBE_ID_SEGMENT.replace_all(&path, "/youtube-info/:video_id");
    if path.starts_with("/api") {
        path.into_owned()
    } else {
        // Static assets and unknown paths share one label
        match path.as_ref() {
            "/health" | "/healthz" | "/ready" | "/metrics" => path.into_owned(),
            _ => "/static".to_string(),
        }
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
