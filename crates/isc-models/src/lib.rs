//! Shared data models for the ISC video catalog.
//!
//! This crate provides:
//! - URL resolution for user-submitted video links
//! - Provider metadata and AI response normalization
//! - Catalog records, themes and listing filters

pub mod duration;
pub mod filter;
pub mod normalize;
pub mod provider;
pub mod reference;
pub mod resolver;
pub mod theme;
pub mod video;

// Re-export common types
pub use duration::{display_duration, parse_iso8601_duration, DurationError};
pub use filter::{collect_keywords, VideoFilter};
pub use normalize::{
    normalize, parse_ai_response, AiResponseFormat, AiSummary, NormalizationIssue,
    NormalizedMetadata, VideoDetails,
};
pub use provider::{ProviderMetadata, Thumbnail};
pub use reference::{Provider, VideoReference};
pub use resolver::{resolve, resolve_bare_id, ResolveError, ResolveResult};
pub use theme::{Theme, ThemeId, ThemeResolution};
pub use video::{VideoId, VideoPatch, VideoRecord};
