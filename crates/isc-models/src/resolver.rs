//! URL resolution for user-submitted video links.
//!
//! Only two YouTube shapes are accepted:
//! - `https://youtu.be/VIDEO_ID` (anything after the first path segment is ignored)
//! - `https://www.youtube.com/watch?v=VIDEO_ID` (other query parameters are ignored)
//!
//! Resolution is purely syntactic. No network access happens here.

use thiserror::Error;
use url::Url;

use crate::reference::VideoReference;

/// Why a URL could not be turned into a [`VideoReference`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Input is not a parseable absolute URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Parseable URL, but not a supported video URL shape
    #[error("unrecognized video URL: {0}")]
    UnrecognizedUrl(String),
    /// Supported shape, but the video identifier is empty
    #[error("video identifier missing from URL: {0}")]
    MissingIdentifier(String),
}

impl ResolveError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::InvalidUrl(_) => "invalid_url",
            ResolveError::UnrecognizedUrl(_) => "unrecognized_url",
            ResolveError::MissingIdentifier(_) => "missing_identifier",
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;

const SHORT_HOST: &str = "youtu.be";
const LONG_HOST: &str = "youtube.com";

/// Resolve a raw URL into a video reference.
pub fn resolve(raw_url: &str) -> ResolveResult<VideoReference> {
    let raw = raw_url.trim();
    let url = Url::parse(raw).map_err(|e| ResolveError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResolveError::UnrecognizedUrl(raw.to_string()));
    }

    let host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| ResolveError::UnrecognizedUrl(raw.to_string()))?;

    let id = if host == SHORT_HOST {
        short_form_id(&url)
    } else if is_long_host(&host) {
        long_form_id(&url).ok_or_else(|| ResolveError::UnrecognizedUrl(raw.to_string()))?
    } else {
        return Err(ResolveError::UnrecognizedUrl(raw.to_string()));
    };

    if id.is_empty() {
        return Err(ResolveError::MissingIdentifier(raw.to_string()));
    }

    if !is_valid_id_chars(&id) {
        return Err(ResolveError::UnrecognizedUrl(raw.to_string()));
    }

    Ok(VideoReference::youtube(id))
}

/// `youtube.com` itself or any of its subdomains (`www.`, `m.`, `music.`).
fn is_long_host(host: &str) -> bool {
    host == LONG_HOST || host.ends_with(".youtube.com")
}

/// First path segment of a `youtu.be` link. The url crate already splits off
/// the query string and fragment.
fn short_form_id(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Value of the `v` query parameter, `None` when the parameter is absent.
fn long_form_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.trim().to_string())
}

/// YouTube ids only use URL-safe base64 characters.
fn is_valid_id_chars(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate a bare video id, as received in a route parameter.
pub fn resolve_bare_id(raw_id: &str) -> ResolveResult<VideoReference> {
    let id = raw_id.trim();
    if id.is_empty() {
        return Err(ResolveError::MissingIdentifier(raw_id.to_string()));
    }
    if !is_valid_id_chars(id) {
        return Err(ResolveError::UnrecognizedUrl(raw_id.to_string()));
    }
    Ok(VideoReference::youtube(id))
}
