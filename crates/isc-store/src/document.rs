//! In-process catalog document shared by the memory and JSON-file backends.

use serde::{Deserialize, Serialize};

use isc_models::theme::find_by_name;
use isc_models::{Theme, VideoFilter, VideoId, VideoRecord, VideoReference};

use crate::error::{StoreError, StoreResult};

/// Whole catalog state: the on-disk layout of `db.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub videos: Vec<VideoRecord>,
    #[serde(default)]
    pub themes: Vec<Theme>,
}

impl CatalogDocument {
    pub fn find_by_reference(&self, reference: &VideoReference) -> Option<&VideoRecord> {
        self.videos.iter().find(|v| &v.reference == reference)
    }

    pub fn get(&self, id: &VideoId) -> Option<&VideoRecord> {
        self.videos.iter().find(|v| &v.id == id)
    }

    pub fn insert(&mut self, record: &VideoRecord) -> StoreResult<()> {
        if self.find_by_reference(&record.reference).is_some() {
            return Err(StoreError::AlreadyExists(record.reference.to_string()));
        }
        self.videos.push(record.clone());
        Ok(())
    }

    pub fn update(&mut self, record: &VideoRecord) -> bool {
        match self.videos.iter_mut().find(|v| v.id == record.id) {
            Some(slot) => {
                *slot = record.clone();
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &VideoId) -> bool {
        let before = self.videos.len();
        self.videos.retain(|v| &v.id != id);
        self.videos.len() != before
    }

    pub fn list(&self, filter: &VideoFilter) -> Vec<VideoRecord> {
        filter.apply(&self.videos)
    }

    pub fn themes_sorted(&self) -> Vec<Theme> {
        let mut themes = self.themes.clone();
        themes.sort_by_key(|t| t.name.to_lowercase());
        themes
    }

    /// Returns the theme and whether it was created.
    pub fn find_or_create_theme(&mut self, name: &str) -> (Theme, bool) {
        if let Some(existing) = find_by_name(&self.themes, name) {
            return (existing.clone(), false);
        }
        let theme = Theme::new(name);
        self.themes.push(theme.clone());
        (theme, true)
    }
}
