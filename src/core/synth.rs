//! Speech synthesis client.
//!
//! Turns one paragraph of text plus a voice/persona plan into raw PCM audio
//! bytes. By contract the synthesizer returns `None` on every failure path
//! (network error, HTTP error status, missing or malformed payload); callers
//! treat `None` as a synthesis failure for that paragraph, never as silence.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use tracing::{debug, warn};

use super::providers::gemini::{GeminiClient, GenerateContentRequest};
use super::voice::VoiceName;

/// Synthesizes speech for a paragraph. `None` means synthesis failed.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: VoiceName, persona: &str) -> Option<Bytes>;
}

fn speech_prompt(text: &str, persona: &str) -> String {
    format!(
        "You are a professional voice actor. Read the following content \
         aloud, vividly, in the manner of [{persona}]: {text}"
    )
}

/// Gemini-backed speech synthesizer.
///
/// The persona is woven into the prompt; the voice is selected through the
/// request's speech configuration. The inline base64 payload is unwrapped
/// here so the rest of the pipeline deals in raw PCM bytes.
pub struct GeminiSynthesizer {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiSynthesizer {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(&self, text: &str, voice: VoiceName, persona: &str) -> Option<Bytes> {
        let request = GenerateContentRequest::speech(speech_prompt(text, persona), voice);

        let response = match self.client.generate_content(&self.model, &request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(voice = voice.as_str(), error = %e, "speech synthesis request failed");
                return None;
            }
        };

        let Some(payload) = response.inline_audio() else {
            warn!(voice = voice.as_str(), "synthesis response carried no audio payload");
            return None;
        };

        match BASE64.decode(payload) {
            Ok(bytes) => {
                debug!(
                    voice = voice.as_str(),
                    bytes = bytes.len(),
                    "synthesized paragraph audio"
                );
                Some(Bytes::from(bytes))
            }
            Err(e) => {
                warn!(voice = voice.as_str(), error = %e, "synthesis payload was not valid base64");
                None
            }
        }
    }
}
