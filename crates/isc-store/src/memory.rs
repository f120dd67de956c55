//! In-memory catalog backend.

use async_trait::async_trait;
use tokio::sync::RwLock;

use isc_models::{Theme, VideoFilter, VideoId, VideoRecord, VideoReference};

use crate::document::CatalogDocument;
use crate::error::StoreResult;
use crate::metrics::record_theme_created;
use crate::repository::CatalogRepository;

/// Volatile backend, used in tests and with `STORAGE_BACKEND=memory`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    doc: RwLock<CatalogDocument>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing themes.
    pub fn with_themes(themes: Vec<Theme>) -> Self {
        Self {
            doc: RwLock::new(CatalogDocument {
                videos: Vec::new(),
                themes,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.doc.read().await.videos.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CatalogRepository for MemoryRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_by_reference(&self, reference: &VideoReference) -> StoreResult<Option<VideoRecord>> {
        Ok(self.doc.read().await.find_by_reference(reference).cloned())
    }

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.doc.read().await.get(id).cloned())
    }

    async fn insert(&self, record: &VideoRecord) -> StoreResult<()> {
        self.doc.write().await.insert(record)
    }

    async fn update(&self, record: &VideoRecord) -> StoreResult<bool> {
        Ok(self.doc.write().await.update(record))
    }

    async fn delete(&self, id: &VideoId) -> StoreResult<bool> {
        Ok(self.doc.write().await.delete(id))
    }

    async fn list(&self, filter: &VideoFilter) -> StoreResult<Vec<VideoRecord>> {
        Ok(self.doc.read().await.list(filter))
    }

    async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        Ok(self.doc.read().await.themes_sorted())
    }

    async fn find_or_create_theme(&self, name: &str) -> StoreResult<Theme> {
        let (theme, created) = self.doc.write().await.find_or_create_theme(name);
        if created {
            record_theme_created(self.backend());
        }
        Ok(theme)
    }
}
