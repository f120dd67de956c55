//! Flat JSON file backend (`db.json`).
//!
//! The whole document lives in memory and is rewritten after every mutation:
//! serialized to a sibling temp file, then renamed over `db.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use isc_models::{Theme, VideoFilter, VideoId, VideoRecord, VideoReference};

use crate::document::CatalogDocument;
use crate::error::StoreResult;
use crate::metrics::record_theme_created;
use crate::repository::CatalogRepository;

/// File name inside the data directory.
pub const DB_FILE_NAME: &str = "db.json";

/// Single-node backend persisting to a JSON file.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    doc: RwLock<CatalogDocument>,
}

impl JsonFileRepository {
    /// Open `<data_dir>/db.json`, creating the directory and an empty document
    /// when missing.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(DB_FILE_NAME);

        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => CatalogDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Catalog file missing, creating an empty one");
                let doc = CatalogDocument::default();
                write_atomically(&path, &doc).await?;
                doc
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            videos = doc.videos.len(),
            themes = doc.themes.len(),
            "Loaded catalog file"
        );

        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, doc: &CatalogDocument) -> StoreResult<()> {
        write_atomically(&self.path, doc).await?;
        debug!(path = %self.path.display(), videos = doc.videos.len(), "Catalog file written");
        Ok(())
    }
}

async fn write_atomically(path: &Path, doc: &CatalogDocument) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CatalogRepository for JsonFileRepository {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn find_by_reference(&self, reference: &VideoReference) -> StoreResult<Option<VideoRecord>> {
        Ok(self.doc.read().await.find_by_reference(reference).cloned())
    }

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.doc.read().await.get(id).cloned())
    }

    async fn insert(&self, record: &VideoRecord) -> StoreResult<()> {
        let mut doc = self.doc.write().await;
        doc.insert(record)?;
        if let Err(e) = self.persist(&doc).await {
            // Keep memory and disk consistent
            doc.delete(&record.id);
            return Err(e);
        }
        Ok(())
    }

    async fn update(&self, record: &VideoRecord) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        let Some(previous) = doc.get(&record.id).cloned() else {
            return Ok(false);
        };
        doc.update(record);
        if let Err(e) = self.persist(&doc).await {
            doc.update(&previous);
            return Err(e);
        }
        Ok(true)
    }

    async fn delete(&self, id: &VideoId) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        let Some(previous) = doc.get(id).cloned() else {
            return Ok(false);
        };
        doc.delete(id);
        if let Err(e) = self.persist(&doc).await {
            doc.videos.push(previous);
            return Err(e);
        }
        Ok(true)
    }

    async fn list(&self, filter: &VideoFilter) -> StoreResult<Vec<VideoRecord>> {
        Ok(self.doc.read().await.list(filter))
    }

    async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        Ok(self.doc.read().await.themes_sorted())
    }

    async fn find_or_create_theme(&self, name: &str) -> StoreResult<Theme> {
        let mut doc = self.doc.write().await;
        let (theme, created) = doc.find_or_create_theme(name);
        if created {
            if let Err(e) = self.persist(&doc).await {
                doc.themes.retain(|t| t.id != theme.id);
                return Err(e);
            }
            record_theme_created(self.backend());
        }
        Ok(theme)
    }
}
