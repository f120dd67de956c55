//! Provider clients and the ingestion pipeline.

pub mod ai;
pub mod ingest;
pub mod youtube;

use thiserror::Error;

pub use ai::{AiProvider, GeminiClient, GroqClient, SummaryRequest};
pub use ingest::Ingestor;
pub use youtube::YoutubeClient;

/// Failure talking to a metadata or AI provider.
///
/// Never surfaced by registration: the ingestor logs it and falls back to
/// defaults.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("timed out")]
    Timeout,
}

impl ProviderError {
    /// Label used in metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProviderError::Http(_) => "network",
            ProviderError::Status { .. } => "status",
            ProviderError::Decode(_) => "decode",
            ProviderError::Timeout => "timeout",
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Turn a non-2xx response into [`ProviderError::Status`].
pub(crate) async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    })
}
