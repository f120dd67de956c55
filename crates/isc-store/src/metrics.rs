//! Store metrics collection.
//!
//! - Supabase request counters by operation and status
//! - Latency histograms
//! - Retry counters
//! - Catalog mutation counters by backend

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total Supabase requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "supabase_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "supabase_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "supabase_latency_seconds";

    /// Rows returned by list queries, by table.
    pub const ROWS_RETURNED_TOTAL: &str = "supabase_rows_returned_total";

    /// Catalog mutations by kind and outcome.
    pub const CATALOG_MUTATIONS_TOTAL: &str = "catalog_mutations_total";

    /// Themes created on demand.
    pub const THEMES_CREATED_TOTAL: &str = "catalog_themes_created_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed Supabase request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    let status_str = status.to_string();

    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_str
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_rows_returned(table: &str, rows: usize) {
    counter!(
        names::ROWS_RETURNED_TOTAL,
        "table" => table.to_string()
    )
    .increment(rows as u64);
}

/// Record a catalog mutation (`register`, `annotate`, ...) and its outcome.
pub fn record_mutation(kind: &'static str, backend: &'static str, outcome: &'static str) {
    counter!(
        names::CATALOG_MUTATIONS_TOTAL,
        "kind" => kind,
        "backend" => backend,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_theme_created(backend: &'static str) {
    counter!(names::THEMES_CREATED_TOTAL, "backend" => backend).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
