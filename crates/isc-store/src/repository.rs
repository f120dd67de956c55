//! Persistence seam for the catalog.

use async_trait::async_trait;

use isc_models::{Theme, VideoFilter, VideoId, VideoRecord, VideoReference};

use crate::error::StoreResult;

/// Storage backend for catalog records and themes.
///
/// Implementations only store; uniqueness checks that span several calls are
/// serialized by [`crate::Catalog`]. Backends that can enforce uniqueness
/// themselves (Supabase) report violations as [`crate::StoreError::AlreadyExists`].
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;

    async fn find_by_reference(&self, reference: &VideoReference) -> StoreResult<Option<VideoRecord>>;

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>>;

    /// Insert a new record. Fails with `AlreadyExists` if its reference is taken.
    async fn insert(&self, record: &VideoRecord) -> StoreResult<()>;

    /// Replace a stored record. Returns `false` when no record has this id.
    async fn update(&self, record: &VideoRecord) -> StoreResult<bool>;

    /// Returns `false` when no record has this id.
    async fn delete(&self, id: &VideoId) -> StoreResult<bool>;

    /// Matching records, newest first.
    async fn list(&self, filter: &VideoFilter) -> StoreResult<Vec<VideoRecord>>;

    /// All themes, sorted by name.
    async fn list_themes(&self) -> StoreResult<Vec<Theme>>;

    /// Case-insensitive lookup, creating the theme when absent.
    async fn find_or_create_theme(&self, name: &str) -> StoreResult<Theme>;
}
