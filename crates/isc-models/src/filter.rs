//! Catalog listing filters and ordering.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::theme::ThemeId;
use crate::video::VideoRecord;

/// Filter applied by catalog listings. All conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoFilter {
    /// Exact theme id
    #[serde(default)]
    pub theme_id: Option<ThemeId>,

    /// Exact keyword membership
    #[serde(default)]
    pub keyword: Option<String>,

    /// Case-insensitive substring over title, uploader, summary and annotation
    #[serde(default)]
    pub search: Option<String>,

    /// Hide unpublished records
    #[serde(default)]
    pub published_only: bool,
}

impl VideoFilter {
    /// Filter for the public listing.
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }

    pub fn with_theme(mut self, theme_id: impl Into<ThemeId>) -> Self {
        self.theme_id = Some(theme_id.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn matches(&self, record: &VideoRecord) -> bool {
        if self.published_only && !record.is_published {
            return false;
        }

        if let Some(theme_id) = &self.theme_id {
            if record.theme_id() != Some(theme_id) {
                return false;
            }
        }

        if let Some(keyword) = non_empty(self.keyword.as_deref()) {
            if !record.keywords.iter().any(|k| k == keyword) {
                return false;
            }
        }

        if let Some(search) = non_empty(self.search.as_deref()) {
            let needle = search.to_lowercase();
            let haystacks = [
                &record.title,
                &record.uploader,
                &record.ai_summary,
                &record.admin_annotation,
            ];
            if !haystacks.iter().any(|h| h.to_lowercase().contains(&needle)) {
                return false;
            }
        }

        true
    }

    /// Filter and sort newest first.
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a VideoRecord>) -> Vec<VideoRecord> {
        let mut out: Vec<VideoRecord> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        out
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// `created_at` descending, ties broken by id.
pub fn newest_first(a: &VideoRecord, b: &VideoRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_newest_first(records: &mut [VideoRecord]) {
    records.sort_by(newest_first);
}

/// Sorted, de-duplicated keywords across the given records.
pub fn collect_keywords<'a>(records: impl IntoIterator<Item = &'a VideoRecord>) -> Vec<String> {
    records
        .into_iter()
        .flat_map(|r| r.keywords.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::normalize::NormalizedMetadata;
    use crate::reference::VideoReference;
    use crate::theme::Theme;

    fn record(id: &str, minutes_ago: i64) -> VideoRecord {
        let reference = VideoReference::youtube(id);
        let mut r = VideoRecord::new(
            reference.clone(),
            NormalizedMetadata::defaults(&reference),
            None,
            "",
        );
        r.id = id.into();
        r.created_at = Utc::now() - Duration::minutes(minutes_ago);
        r
    }

    fn catalog() -> Vec<VideoRecord> {
        let neuro = Theme::new("Neuroscience");

        let mut a = record("a", 30);
        a.title = "Le cerveau bayésien".into();
        a.keywords = vec!["cognition".into(), "Bayes".into()];
        a.theme = Some(neuro.clone());

        let mut b = record("b", 10);
        b.uploader = "Chaire ISC".into();
        b.keywords = vec!["langage".into()];

        let mut c = record("c", 20);
        c.admin_annotation = "Cerveau et langage".into();
        c.is_published = false;
        c.theme = Some(neuro);

        vec![a, b, c]
    }

    fn ids(records: &[VideoRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_default_filter_sorts_newest_first() {
        let records = catalog();
        assert_eq!(ids(&VideoFilter::default().apply(&records)), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_published_only() {
        let records = catalog();
        assert_eq!(ids(&VideoFilter::published().apply(&records)), vec!["b", "a"]);
    }

    #[test]
    fn test_theme_filter() {
        let records = catalog();
        let theme_id = records[0].theme_id().unwrap().clone();
        let filter = VideoFilter::default().with_theme(theme_id);
        assert_eq!(ids(&filter.apply(&records)), vec!["c", "a"]);
    }

    #[test]
    fn test_keyword_filter_is_exact() {
        let records = catalog();
        assert_eq!(
            ids(&VideoFilter::default().with_keyword("Bayes").apply(&records)),
            vec!["a"]
        );
        assert!(VideoFilter::default().with_keyword("bayes").apply(&records).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let records = catalog();
        let filter = VideoFilter::default().with_search("CERVEAU");
        assert_eq!(ids(&filter.apply(&records)), vec!["c", "a"]);

        let filter = VideoFilter::default().with_search("chaire");
        assert_eq!(ids(&filter.apply(&records)), vec!["b"]);

        // Blank search is ignored
        let filter = VideoFilter::default().with_search("   ");
        assert_eq!(filter.apply(&records).len(), 3);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let a = record("a", 0);
        let mut b = record("b", 0);
        b.created_at = a.created_at;
        let sorted = VideoFilter::default().apply(&[b, a]);
        assert_eq!(ids(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let records = catalog();
        let filter = VideoFilter::published().with_search("e");
        assert_eq!(filter.apply(&records), filter.apply(&records));
    }

    #[test]
    fn test_collect_keywords() {
        let records = catalog();
        assert_eq!(
            collect_keywords(&records),
            vec!["Bayes", "cognition", "langage"]
        );
    }
}
