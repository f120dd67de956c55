//! Metadata normalization.
//!
//! Shapes raw provider metadata and AI responses into catalog-ready values.
//! Nothing in this module fails: malformed input degrades to defaults and is
//! reported through [`NormalizationIssue`]s.
//!
//! AI responses come in two forms:
//! - a JSON object with `summary` and `keywords` (optionally fenced in markdown)
//! - free text with labeled sections:
//!
//! ```text
//! Résumé: <summary text>
//! Mots-clés: <comma-separated keywords>
//! Thématique: <theme name>
//! ```

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::duration::display_duration;
use crate::provider::ProviderMetadata;
use crate::reference::VideoReference;
use crate::theme::{Theme, ThemeResolution, DEFAULT_THEME_NAME};

/// Placeholder title before enrichment.
pub const PENDING_TITLE: &str = "pending";

/// Placeholder uploader before enrichment.
pub const UNKNOWN_UPLOADER: &str = "unknown channel";

/// Summary stored when no AI provider produced anything.
pub const PENDING_SUMMARY: &str = "pending";

/// Summary stored when an AI response had no usable summary section.
pub const NO_SUMMARY: &str = "no summary generated";

// ============================================================================
// Output Types
// ============================================================================

/// Something the normalizer could not use as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NormalizationIssue {
    /// View count present but not a non-negative integer
    InvalidViewCount(String),
    /// Duration token present but unparseable
    InvalidDuration(String),
    /// No thumbnail variant; a conventional URL was synthesized
    MissingThumbnail,
    /// Response looked like JSON but lacked `summary`/`keywords`
    IncompleteStructuredResponse,
    /// No summary section found
    MissingSummary,
    /// No keywords section found
    MissingKeywords,
    /// No theme section found
    MissingTheme,
}

/// Display metadata for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoDetails {
    pub title: String,
    pub uploader: String,
    pub description: String,
    pub view_count: u64,
    /// `H:MM:SS` / `M:SS`, or `N/A`
    pub duration: String,
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// True when no provider metadata was available
    pub simulated: bool,
}

impl VideoDetails {
    /// Placeholder details for a reference that has not been enriched.
    pub fn placeholder(reference: &VideoReference) -> Self {
        Self {
            title: PENDING_TITLE.to_string(),
            uploader: UNKNOWN_UPLOADER.to_string(),
            description: String::new(),
            view_count: 0,
            duration: crate::duration::UNKNOWN_DURATION.to_string(),
            thumbnail_url: reference.default_thumbnail_url(),
            published_at: None,
            tags: Vec::new(),
            simulated: true,
        }
    }
}

/// Which shape the AI response was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AiResponseFormat {
    /// JSON object with summary/keywords
    Structured,
    /// Labeled text sections
    Labeled,
    /// Nothing to parse (skipped, unavailable, or blank)
    Absent,
}

/// Summary, keywords and theme name extracted from an AI response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AiSummary {
    pub summary: String,
    pub keywords: Vec<String>,
    /// `None` only when the response was absent
    pub theme_name: Option<String>,
    pub format: AiResponseFormat,
    #[serde(default)]
    pub issues: Vec<NormalizationIssue>,
}

impl AiSummary {
    /// All-defaults result used when no AI output is available.
    pub fn absent() -> Self {
        Self {
            summary: PENDING_SUMMARY.to_string(),
            keywords: Vec::new(),
            theme_name: None,
            format: AiResponseFormat::Absent,
            issues: Vec::new(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.format == AiResponseFormat::Absent
    }
}

/// Fully normalized metadata, ready to be merged into a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedMetadata {
    pub details: VideoDetails,
    pub summary: String,
    pub keywords: Vec<String>,
    /// `None` when no AI output was available
    pub theme: Option<ThemeResolution>,
    /// True when the AI step was skipped or produced nothing
    pub simulated: bool,
    #[serde(default)]
    pub issues: Vec<NormalizationIssue>,
}

impl NormalizedMetadata {
    /// All-defaults metadata for an un-enriched reference.
    pub fn defaults(reference: &VideoReference) -> Self {
        normalize(reference, None, None, &[])
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Normalize provider metadata and AI output for one video.
pub fn normalize(
    reference: &VideoReference,
    provider_metadata: Option<&ProviderMetadata>,
    ai_response: Option<&str>,
    existing_themes: &[Theme],
) -> NormalizedMetadata {
    let (details, mut issues) = shape_provider_metadata(reference, provider_metadata);
    let ai = parse_ai_response(ai_response);
    issues.extend(ai.issues.iter().cloned());

    let simulated = ai.is_simulated();
    let theme = ai
        .theme_name
        .as_deref()
        .map(|name| ThemeResolution::resolve(name, existing_themes));

    NormalizedMetadata {
        details,
        summary: ai.summary,
        keywords: ai.keywords,
        theme,
        simulated,
        issues,
    }
}

// ============================================================================
// Provider Metadata
// ============================================================================

/// Map provider metadata to display details.
pub fn shape_provider_metadata(
    reference: &VideoReference,
    metadata: Option<&ProviderMetadata>,
) -> (VideoDetails, Vec<NormalizationIssue>) {
    let Some(meta) = metadata else {
        return (VideoDetails::placeholder(reference), Vec::new());
    };

    let mut issues = Vec::new();

    let view_count = match &meta.view_count {
        None | Some(Value::Null) => 0,
        Some(raw) => parse_view_count(raw).unwrap_or_else(|| {
            issues.push(NormalizationIssue::InvalidViewCount(raw.to_string()));
            0
        }),
    };

    let duration = display_duration(meta.duration.as_deref());
    if let Some(token) = meta.duration.as_deref() {
        if duration == crate::duration::UNKNOWN_DURATION {
            issues.push(NormalizationIssue::InvalidDuration(token.to_string()));
        }
    }

    let thumbnail_url = match meta.best_thumbnail() {
        Some(url) => url.to_string(),
        None => {
            issues.push(NormalizationIssue::MissingThumbnail);
            reference.default_thumbnail_url()
        }
    };

    let details = VideoDetails {
        title: non_blank(meta.title.as_deref()).unwrap_or(PENDING_TITLE).to_string(),
        uploader: non_blank(meta.channel_title.as_deref())
            .unwrap_or(UNKNOWN_UPLOADER)
            .to_string(),
        description: meta.description.clone().unwrap_or_default(),
        view_count,
        duration,
        thumbnail_url,
        published_at: meta.published_at.clone(),
        tags: clean_keywords(meta.tags.iter().map(String::as_str)),
        simulated: false,
    };

    (details, issues)
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts `42`, `"42"` and `" 42 "`. Negative or fractional values are rejected.
fn parse_view_count(raw: &Value) -> Option<u64> {
    match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

// ============================================================================
// AI Response Parsing
// ============================================================================

/// Parse an AI response into summary, keywords and theme name.
///
/// Absent or blank input yields [`AiSummary::absent`].
pub fn parse_ai_response(text: Option<&str>) -> AiSummary {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return AiSummary::absent();
    };

    if let Some(parsed) = parse_structured(text) {
        return parsed;
    }

    parse_labeled(text)
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches("json"),
    };
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

/// Structured parse. `None` means "fall back to labeled sections".
fn parse_structured(text: &str) -> Option<AiSummary> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).ok()?;
    let obj = value.as_object()?;

    let (Some(summary), Some(keywords)) = (obj.get("summary"), obj.get("keywords")) else {
        return None;
    };

    let mut issues = Vec::new();

    let summary = match summary.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => {
            issues.push(NormalizationIssue::MissingSummary);
            NO_SUMMARY.to_string()
        }
    };

    let keywords = match keywords {
        Value::Array(items) => clean_keywords(items.iter().filter_map(Value::as_str)),
        Value::String(s) => split_keywords(s),
        _ => {
            issues.push(NormalizationIssue::MissingKeywords);
            Vec::new()
        }
    };

    let theme_name = ["theme", "thematique", "thématique"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(Value::as_str)
        .find_map(clean_theme)
        .unwrap_or_else(|| {
            issues.push(NormalizationIssue::MissingTheme);
            DEFAULT_THEME_NAME.to_string()
        });

    Some(AiSummary {
        summary,
        keywords,
        theme_name: Some(theme_name),
        format: AiResponseFormat::Structured,
        issues,
    })
}

/// Section labels, accented French first, then unaccented and English aliases.
/// A label only counts at the start of a line, optionally after spaces or
/// markdown bold markers, so label words inside prose stay content.
static SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t*]*(résumé|resume|summary|mots[ \t-]*cl[ée]s|keywords|th[ée]matique|th[èe]me)[ \t*]*:",
    )
    .expect("valid section label regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Keywords,
    Theme,
}

fn section_for(label: &str) -> Section {
    let label = label.to_lowercase();
    if label.starts_with("mots") || label == "keywords" {
        Section::Keywords
    } else if label.starts_with("th") {
        Section::Theme
    } else {
        Section::Summary
    }
}

/// Labeled-section parse. Each section runs to the next recognized label.
fn parse_labeled(text: &str) -> AiSummary {
    let labels: Vec<(Section, usize, usize)> = SECTION_LABEL
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?;
            Some((section_for(label.as_str()), whole.start(), whole.end()))
        })
        .collect();

    let content = |wanted: Section| section_content(text, &labels, wanted);

    let mut issues = Vec::new();

    let summary = match content(Section::Summary).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => {
            issues.push(NormalizationIssue::MissingSummary);
            NO_SUMMARY.to_string()
        }
    };

    let keywords = match content(Section::Keywords) {
        Some(s) => split_keywords(s),
        None => {
            issues.push(NormalizationIssue::MissingKeywords);
            Vec::new()
        }
    };

    let theme_name = content(Section::Theme)
        .and_then(|s| s.lines().next())
        .and_then(clean_theme)
        .unwrap_or_else(|| {
            issues.push(NormalizationIssue::MissingTheme);
            DEFAULT_THEME_NAME.to_string()
        });

    AiSummary {
        summary,
        keywords,
        theme_name: Some(theme_name),
        format: AiResponseFormat::Labeled,
        issues,
    }
}

/// Content of the first `wanted` section, up to the next label.
fn section_content<'a>(
    text: &'a str,
    labels: &[(Section, usize, usize)],
    wanted: Section,
) -> Option<&'a str> {
    let idx = labels.iter().position(|(section, _, _)| *section == wanted)?;
    let content_start = labels[idx].2;
    let content_end = labels.get(idx + 1).map(|label| label.1).unwrap_or(text.len());
    Some(text[content_start..content_end].trim_matches(|c: char| c.is_whitespace() || c == '*'))
}

// ============================================================================
// Keyword Cleaning
// ============================================================================

/// Split a keyword section on commas (and line breaks) and clean each item.
pub fn split_keywords(section: &str) -> Vec<String> {
    clean_keywords(section.split([',', '\n']))
}

/// Trim, strip one trailing period, drop empties. Order is preserved.
pub fn clean_keywords<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(clean_keyword)
        .collect()
}

fn clean_keyword(item: &str) -> Option<String> {
    let item = item.trim();
    let item = item.strip_suffix('.').unwrap_or(item).trim();
    (!item.is_empty()).then(|| item.to_string())
}

fn clean_theme(raw: &str) -> Option<String> {
    clean_keyword(raw.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '"'))
}
