use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AssistantConfig;
use crate::error::GenerateError;

/// The external text-generation collaborator.
///
/// One prompt in, at most one reply out. `Ok(None)` means the provider
/// answered but produced no usable text.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<String>, GenerateError>> + Send;
}

impl<G: Generator> Generator for Arc<G> {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<String>, GenerateError>> + Send {
        (**self).generate(prompt)
    }
}

// -- Gemini generateContent types ---------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts joined in order. `None` when empty.
    pub fn reply_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

// -- GeminiGenerator ------------------------------------------------------------

/// [`Generator`] backed by the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    config: AssistantConfig,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, config: AssistantConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            config,
        }
    }

    /// Credential from `GEMINI_API_KEY` / `API_KEY`; empty when neither is set.
    pub fn from_env(config: AssistantConfig) -> Self {
        Self::new(crate::config::api_key_from_env(), config)
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    pub fn request_body(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerateError> {
        let url = self.endpoint();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| GenerateError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| GenerateError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(GenerateError::Http {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_slice(&bytes).map_err(|e| GenerateError::Json {
                field: "candidates".into(),
                detail: e.to_string(),
            })?;
        Ok(parsed.reply_text())
    }
}

/// Best-effort message from an error body: the structured `error.message`
/// when present, otherwise the raw body cut to 200 chars.
pub fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ProviderErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{status}: {}", parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => String::from_utf8_lossy(body).chars().take(200).collect(),
    }
}
