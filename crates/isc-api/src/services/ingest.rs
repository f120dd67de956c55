//! Registration enrichment: provider lookups bounded by a timeout, then
//! normalization.
//!
//! Provider trouble never fails an ingest. Unconfigured, failing or slow
//! providers all degrade to the normalizer's defaults.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use isc_models::{normalize, NormalizedMetadata, ProviderMetadata, Theme, VideoReference};

use super::ai::{build_summary_prompt, provider_from_config, AiProvider, SummaryRequest};
use super::youtube::YoutubeClient;
use super::{ProviderError, ProviderResult};
use crate::config::ProvidersConfig;
use crate::metrics;

pub struct Ingestor {
    youtube: Option<YoutubeClient>,
    ai: Option<Arc<dyn AiProvider>>,
    timeout: Duration,
}

impl Ingestor {
    pub fn new(
        youtube: Option<YoutubeClient>,
        ai: Option<Arc<dyn AiProvider>>,
        timeout: Duration,
    ) -> Self {
        Self { youtube, ai, timeout }
    }

    /// No providers: every ingest yields simulated defaults.
    pub fn offline() -> Self {
        Self::new(None, None, Duration::from_secs(10))
    }

    pub fn from_config(config: &ProvidersConfig) -> Result<Self, reqwest::Error> {
        let youtube = match &config.youtube_api_key {
            Some(key) => Some(YoutubeClient::new(key.clone(), config.timeout)?),
            None => {
                info!("YOUTUBE_API_KEY not set, video metadata will be simulated");
                None
            }
        };
        let ai = provider_from_config(config)?;
        Ok(Self::new(youtube, ai, config.timeout))
    }

    pub fn has_youtube(&self) -> bool {
        self.youtube.is_some()
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Look up provider metadata. `Ok(None)` when unconfigured or unknown to
    /// the provider.
    pub async fn fetch_metadata(
        &self,
        reference: &VideoReference,
    ) -> ProviderResult<Option<ProviderMetadata>> {
        let Some(youtube) = &self.youtube else {
            return Ok(None);
        };
        self.timed("youtube", youtube.fetch(&reference.external_id)).await
    }

    /// Ask the AI provider for a summary. `Ok(None)` when unconfigured.
    pub async fn summarize(
        &self,
        request: &SummaryRequest,
        themes: &[Theme],
    ) -> ProviderResult<Option<String>> {
        let Some(ai) = &self.ai else {
            return Ok(None);
        };
        let prompt = build_summary_prompt(request, themes);
        self.timed(ai.name(), ai.complete(&prompt)).await.map(Some)
    }

    /// Fetch everything available for `reference` and normalize it.
    ///
    /// The AI is only asked when provider metadata exists; a summary of an
    /// unknown title would be invented.
    pub async fn enrich(&self, reference: &VideoReference, themes: &[Theme]) -> NormalizedMetadata {
        let metadata = self.fetch_metadata(reference).await.unwrap_or_else(|e| {
            warn!(reference = %reference, error = %e, "Metadata lookup failed, using defaults");
            None
        });

        let ai_text = match &metadata {
            Some(meta) => {
                let request = SummaryRequest {
                    title: meta.title.clone().unwrap_or_default(),
                    description: meta.description.clone().unwrap_or_default(),
                    channel_title: meta.channel_title.clone().unwrap_or_default(),
                };
                self.summarize(&request, themes).await.unwrap_or_else(|e| {
                    warn!(reference = %reference, error = %e, "AI summary failed, using defaults");
                    None
                })
            }
            None => None,
        };

        let normalized = normalize(reference, metadata.as_ref(), ai_text.as_deref(), themes);
        if !normalized.issues.is_empty() {
            debug!(reference = %reference, issues = ?normalized.issues, "Normalization issues");
            metrics::record_normalization_issues(&normalized.issues);
        }
        normalized
    }

    async fn timed<T>(
        &self,
        provider: &'static str,
        call: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::record_provider_call(provider, outcome, start.elapsed().as_secs_f64());
        result
    }
}
