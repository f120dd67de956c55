//! AI summary providers.
//!
//! Clients return the raw model text; shaping it into summary, keywords and
//! theme is the normalizer's job, so a chatty or malformed answer is never an
//! error here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use isc_models::Theme;

use super::{check_status, ProviderError, ProviderResult};
use crate::config::ProvidersConfig;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

const TEMPERATURE: f32 = 0.3;

/// What the model is told about a video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
}

impl SummaryRequest {
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}

/// Build the summary prompt, listing existing themes so the model reuses them.
pub fn build_summary_prompt(request: &SummaryRequest, themes: &[Theme]) -> String {
    let or_default = |s: &str, default: &'static str| -> String {
        let s = s.trim();
        if s.is_empty() { default.to_string() } else { s.to_string() }
    };

    let mut prompt = format!(
        r#"Tu es un assistant expert en sciences cognitives pour l'Institut des Sciences Cognitives (ISC) de l'UQAM.

Analyse les informations suivantes sur une vidéo YouTube :
Titre: {}
Chaîne: {}
Description: {}

Tâche :
1. Génère un résumé concis et informatif (3-5 phrases) en FRANÇAIS, ton professionnel académique.
2. Extrais une liste de 5 à 8 mots-clés pertinents, mélange de FRANÇAIS et d'ANGLAIS.
3. Propose une thématique courte (1 à 3 mots)."#,
        or_default(&request.title, "Non spécifié"),
        or_default(&request.channel_title, "Non spécifié"),
        or_default(&request.description, "Non disponible"),
    );

    if !themes.is_empty() {
        let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
        prompt.push_str("\nRéutilise si possible une thématique existante : ");
        prompt.push_str(&names.join(", "));
        prompt.push('.');
    }

    prompt.push_str(
        r#"

Réponds UNIQUEMENT au format JSON valide suivant, sans balises markdown :
{
  "summary": "Le résumé en français ici...",
  "keywords": ["MotClé1", "Keyword2", "MotClé3"],
  "theme": "Thématique"
}"#,
    );

    prompt
}

/// A model able to answer the summary prompt.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider label for logs and metrics.
    fn name(&self) -> &'static str;

    /// Raw response text for `prompt`.
    async fn complete(&self, prompt: &str) -> ProviderResult<String>;
}

/// Pick the AI provider from config. `None` when no key is configured.
pub fn provider_from_config(
    config: &ProvidersConfig,
) -> Result<Option<Arc<dyn AiProvider>>, reqwest::Error> {
    let gemini = || -> Result<Option<Arc<dyn AiProvider>>, reqwest::Error> {
        let Some(key) = &config.gemini_api_key else {
            return Ok(None);
        };
        let client: Arc<dyn AiProvider> =
            Arc::new(GeminiClient::new(key, &config.gemini_model, config.timeout)?);
        Ok(Some(client))
    };
    let groq = || -> Result<Option<Arc<dyn AiProvider>>, reqwest::Error> {
        let Some(key) = &config.groq_api_key else {
            return Ok(None);
        };
        let client: Arc<dyn AiProvider> =
            Arc::new(GroqClient::new(key, &config.groq_model, config.timeout)?);
        Ok(Some(client))
    };

    let provider = match config.ai_provider.as_deref() {
        Some("groq") => groq()?.or(gemini()?),
        Some("gemini") | None => gemini()?.or(groq()?),
        Some(other) => {
            warn!(provider = other, "Unknown AI_PROVIDER, using the first configured provider");
            gemini()?.or(groq()?)
        }
    };

    match &provider {
        Some(p) => info!(provider = p.name(), "AI summaries enabled"),
        None => info!("No AI provider configured, summaries will be simulated"),
    }
    Ok(provider)
}

fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
}

// ============================================================================
// Gemini
// ============================================================================

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let body: GeminiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ProviderError::Decode("no content in Gemini response".to_string()))
    }
}

// ============================================================================
// Groq (OpenAI-compatible chat completions)
// ============================================================================

/// Groq chat completions client.
pub struct GroqClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GROQ_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AiProvider for GroqClient {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Decode("no choices in Groq response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_prompt_lists_existing_themes() {
        let request = SummaryRequest {
            title: "Sleep and memory".to_string(),
            description: String::new(),
            channel_title: "ISC".to_string(),
        };
        let prompt = build_summary_prompt(&request, &[Theme::new("Neuroscience"), Theme::new("Langage")]);
        assert!(prompt.contains("Titre: Sleep and memory"));
        assert!(prompt.contains("Description: Non disponible"));
        assert!(prompt.contains("Neuroscience, Langage"));
        assert!(prompt.contains("\"theme\""));
    }

    #[test]
    fn test_blank_request() {
        assert!(SummaryRequest::default().is_blank());
        let request = SummaryRequest {
            description: "x".to_string(),
            ..Default::default()
        };
        assert!(!request.is_blank());
    }

    #[test]
    fn test_provider_selection() {
        let mut config = ProvidersConfig::default();
        assert!(provider_from_config(&config).unwrap().is_none());

        config.groq_api_key = Some("g".to_string());
        assert_eq!(provider_from_config(&config).unwrap().unwrap().name(), "groq");

        config.gemini_api_key = Some("k".to_string());
        assert_eq!(provider_from_config(&config).unwrap().unwrap().name(), "gemini");

        config.ai_provider = Some("groq".to_string());
        assert_eq!(provider_from_config(&config).unwrap().unwrap().name(), "groq");
    }

    #[tokio::test]
    async fn test_gemini_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "k"))
            .and(body_partial_json(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "{\"summary\": \"S\", \"keywords\": [\"k\"]}"}]}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k", "gemini-2.0-flash", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        let text = client.complete("prompt").await.unwrap();
        assert!(text.contains("\"summary\""));
    }

    #[tokio::test]
    async fn test_gemini_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k", "m", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        assert!(matches!(client.complete("p").await, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_groq_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer g"))
            .and(body_partial_json(json!({"model": "llama-3.1-8b-instant"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Résumé: Ok.\nMots-clés: a, b"}}]
            })))
            .mount(&server)
            .await;

        let client = GroqClient::new("g", "llama-3.1-8b-instant", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        assert_eq!(client.complete("p").await.unwrap(), "Résumé: Ok.\nMots-clés: a, b");
    }

    #[tokio::test]
    async fn test_groq_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = GroqClient::new("g", "m", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        assert!(matches!(
            client.complete("p").await,
            Err(ProviderError::Status { status: 500, .. })
        ));
    }
}
