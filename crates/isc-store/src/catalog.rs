//! Catalog mutation service.
//!
//! Every write goes through [`Catalog`], which holds a writer lock so that the
//! duplicate check and the insert of `register` are atomic with respect to
//! other writers. Reads bypass the lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use isc_models::theme::find_by_name;
use isc_models::{
    collect_keywords, NormalizedMetadata, Theme, ThemeId, ThemeResolution, VideoFilter, VideoId,
    VideoPatch, VideoRecord, VideoReference,
};

use crate::error::{CatalogError, CatalogResult, StoreError};
use crate::memory::MemoryRepository;
use crate::metrics::record_mutation;
use crate::repository::CatalogRepository;

/// Admin-supplied fields accompanying a registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub admin_annotation: String,
    /// Explicit theme, taking precedence over the AI-proposed one
    pub theme_id: Option<ThemeId>,
}

pub struct Catalog {
    repo: Arc<dyn CatalogRepository>,
    writer: Mutex<()>,
}

impl Catalog {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self {
            repo,
            writer: Mutex::new(()),
        }
    }

    /// Catalog backed by a fresh [`MemoryRepository`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRepository::new()))
    }

    pub fn backend(&self) -> &'static str {
        self.repo.backend()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Register a resolved reference with its normalized metadata.
    ///
    /// Fails with [`CatalogError::DuplicateReference`] when the reference is
    /// already present; the existing record is never touched.
    pub async fn register(
        &self,
        reference: VideoReference,
        metadata: NormalizedMetadata,
        registration: Registration,
    ) -> CatalogResult<VideoRecord> {
        let _guard = self.writer.lock().await;

        let result = self.register_locked(reference, metadata, registration).await;
        self.record("register", &result);
        result
    }

    async fn register_locked(
        &self,
        reference: VideoReference,
        metadata: NormalizedMetadata,
        registration: Registration,
    ) -> CatalogResult<VideoRecord> {
        if self.repo.find_by_reference(&reference).await?.is_some() {
            warn!(reference = %reference, "Rejected duplicate registration");
            return Err(CatalogError::DuplicateReference(reference));
        }

        let theme = match registration.theme_id {
            Some(theme_id) => Some(self.theme_by_id(&theme_id).await?),
            None => self.resolve_theme(metadata.theme.clone()).await?,
        };

        let record = VideoRecord::new(reference, metadata, theme, registration.admin_annotation);

        self.repo.insert(&record).await.map_err(|e| match e {
            StoreError::AlreadyExists(_) => CatalogError::DuplicateReference(record.reference.clone()),
            other => CatalogError::Store(other),
        })?;

        info!(
            video_id = %record.id,
            reference = %record.reference,
            theme = record.theme.as_ref().map(|t| t.name.as_str()).unwrap_or("-"),
            simulated = record.simulated,
            backend = self.backend(),
            "Registered video"
        );
        Ok(record)
    }

    /// Replace the admin annotation of a record.
    pub async fn annotate(&self, id: &VideoId, annotation: impl Into<String>) -> CatalogResult<VideoRecord> {
        let annotation = annotation.into();
        let _guard = self.writer.lock().await;

        let result: CatalogResult<VideoRecord> = async {
            let mut record = self.require(id).await?;
            record.annotate(annotation);
            self.store_update(&record).await?;
            debug!(video_id = %id, "Annotated video");
            Ok(record)
        }
        .await;

        self.record("annotate", &result);
        result
    }

    /// Apply a partial update.
    pub async fn update(&self, id: &VideoId, patch: &VideoPatch) -> CatalogResult<VideoRecord> {
        let _guard = self.writer.lock().await;

        let result: CatalogResult<VideoRecord> = async {
            let mut record = self.require(id).await?;

            if let Some(theme_id) = &patch.theme_id {
                record.theme = match theme_id {
                    Some(theme_id) => Some(self.theme_by_id(theme_id).await?),
                    None => None,
                };
            }
            patch.apply_fields(&mut record);

            self.store_update(&record).await?;
            info!(video_id = %id, "Updated video");
            Ok(record)
        }
        .await;

        self.record("update", &result);
        result
    }

    /// Delete a record.
    pub async fn remove(&self, id: &VideoId) -> CatalogResult<()> {
        let _guard = self.writer.lock().await;

        let result = match self.repo.delete(id).await {
            Ok(true) => {
                info!(video_id = %id, "Removed video");
                Ok(())
            }
            Ok(false) => Err(CatalogError::NotFound(id.clone())),
            Err(e) => Err(CatalogError::Store(e)),
        };

        self.record("remove", &result);
        result
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: &VideoId) -> CatalogResult<VideoRecord> {
        self.require(id).await
    }

    /// Whether `reference` is already registered. Advisory only: `register`
    /// repeats the check under the writer lock.
    pub async fn contains(&self, reference: &VideoReference) -> CatalogResult<bool> {
        Ok(self.repo.find_by_reference(reference).await?.is_some())
    }

    /// Matching records, newest first.
    pub async fn list(&self, filter: &VideoFilter) -> CatalogResult<Vec<VideoRecord>> {
        Ok(self.repo.list(filter).await?)
    }

    /// Sorted unique keywords across published records.
    pub async fn keywords(&self) -> CatalogResult<Vec<String>> {
        let records = self.repo.list(&VideoFilter::published()).await?;
        Ok(collect_keywords(&records))
    }

    /// All themes, sorted by name.
    pub async fn themes(&self) -> CatalogResult<Vec<Theme>> {
        Ok(self.repo.list_themes().await?)
    }

    /// Backend reachability probe.
    pub async fn ping(&self) -> CatalogResult<()> {
        self.repo.list_themes().await?;
        Ok(())
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn require(&self, id: &VideoId) -> CatalogResult<VideoRecord> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    async fn store_update(&self, record: &VideoRecord) -> CatalogResult<()> {
        if self.repo.update(record).await? {
            Ok(())
        } else {
            Err(CatalogError::NotFound(record.id.clone()))
        }
    }

    async fn theme_by_id(&self, id: &ThemeId) -> CatalogResult<Theme> {
        self.repo
            .list_themes()
            .await?
            .into_iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| CatalogError::ThemeNotFound(id.clone()))
    }

    /// Turn the normalizer's theme outcome into a stored theme.
    async fn resolve_theme(&self, resolution: Option<ThemeResolution>) -> CatalogResult<Option<Theme>> {
        match resolution {
            None => Ok(None),
            Some(ThemeResolution::Existing { theme }) => {
                // The theme list may have changed since normalization
                let themes = self.repo.list_themes().await?;
                match themes.iter().find(|t| t.id == theme.id) {
                    Some(current) => Ok(Some(current.clone())),
                    None => Ok(Some(self.find_or_create(&theme.name, &themes).await?)),
                }
            }
            Some(ThemeResolution::Proposed { name }) => {
                let themes = self.repo.list_themes().await?;
                Ok(Some(self.find_or_create(&name, &themes).await?))
            }
        }
    }

    async fn find_or_create(&self, name: &str, known: &[Theme]) -> CatalogResult<Theme> {
        if let Some(theme) = find_by_name(known, name) {
            return Ok(theme.clone());
        }
        Ok(self.repo.find_or_create_theme(name).await?)
    }

    fn record<T>(&self, kind: &'static str, result: &CatalogResult<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(CatalogError::DuplicateReference(_)) => "duplicate",
            Err(CatalogError::NotFound(_)) | Err(CatalogError::ThemeNotFound(_)) => "not_found",
            Err(CatalogError::Store(_)) => "error",
        };
        record_mutation(kind, self.backend(), outcome);
    }
}
