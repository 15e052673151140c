//! Gemini generative API client.
//!
//! Thin REST client for the `models/{model}:generateContent` endpoint, used
//! by both the persona classifier (text in, text out) and the speech
//! synthesizer (text in, inline base64 PCM out). The API accepts JSON
//! requests and returns JSON responses; audio is carried as base64-encoded
//! inline data inside the first candidate part.
//!
//! The base URL is configurable so tests can point the client at a local
//! mock server.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::voice::VoiceName;

/// Default Gemini REST API endpoint prefix.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Errors raised by the Gemini client.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for Gemini client operations.
pub type GeminiResult<T> = Result<T, GeminiError>;

/// One text part of a request content.
#[derive(Debug, Clone, Serialize)]
pub struct RequestPart {
    pub text: String,
}

/// A request content block: an ordered list of parts.
#[derive(Debug, Clone, Serialize)]
pub struct RequestContent {
    pub parts: Vec<RequestPart>,
}

/// Prebuilt voice selection for speech output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: VoiceName,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

/// Generation options: present only for speech requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// A plain text-in/text-out request with a single prompt part.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.into(),
                }],
            }],
            generation_config: None,
        }
    }

    /// A speech request: audio response modality plus a prebuilt voice.
    pub fn speech(prompt: impl Into<String>, voice: VoiceName) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.into(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice },
                    },
                }),
            }),
        }
    }
}

/// Inline binary payload inside a response part.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// Base64-encoded payload.
    pub data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

/// Response body for `generateContent`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> Option<&[ResponsePart]> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
    }

    /// Concatenated text of the first candidate's parts.
    pub fn first_text(&self) -> Option<String> {
        let parts = self.first_parts()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() { None } else { Some(text) }
    }

    /// Base64 payload of the first inline-data part, if any.
    pub fn inline_audio(&self) -> Option<&str> {
        self.first_parts()?
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
    }
}

/// HTTP client for the Gemini REST API.
///
/// One client is shared by all remote boundaries; `reqwest` pools the
/// underlying connections.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client for the given API key and base URL.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> GeminiResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(GeminiError::Configuration(
                "Gemini API key is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GeminiError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Issue a `generateContent` call against `model`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, url = %url, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))
    }
}
