//! Persona classifier: pick a voice and speaking persona for one paragraph.
//!
//! In smart-voice mode every paragraph is sent to the classifier, which asks
//! the language model what kind of speaker the paragraph belongs to and maps
//! the answer onto a fixed voice/persona pair. The classifier never fails
//! toward its caller: any network or parse problem silently falls back to
//! the narrator plan.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::providers::gemini::{GeminiClient, GenerateContentRequest};
use super::voice::{VoiceName, VoicePlan};

/// Classifies a paragraph into a voice/persona plan. Infallible by contract.
#[async_trait]
pub trait PersonaClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> VoicePlan;
}

/// Map a model reply onto a voice plan.
///
/// Matching is keyword-based over a small fixed vocabulary, case-insensitive,
/// first match wins. Anything unrecognized falls back to the narrator.
pub(crate) fn plan_from_reply(reply: &str) -> VoicePlan {
    let reply = reply.to_lowercase();

    let table: [(&str, VoiceName, &str); 5] = [
        ("young-female", VoiceName::Kore, "warm, intelligent female character"),
        ("elder-male", VoiceName::Fenrir, "stern, aged male character"),
        ("child", VoiceName::Puck, "innocent, playful child"),
        ("young-adult", VoiceName::Zephyr, "gentle young adult character"),
        ("dialogue", VoiceName::Zephyr, "gentle young adult character"),
    ];

    for (keyword, voice, persona) in table {
        if reply.contains(keyword) {
            return VoicePlan {
                voice,
                persona: persona.to_string(),
            };
        }
    }

    VoicePlan::narrator()
}

fn classify_prompt(text: &str) -> String {
    format!(
        "Analyze the speaker of the following novel excerpt. If it is \
         narration, reply \"narrator\". If it is dialogue, judge from context \
         whether the speaker is: young-female, elder-male, child, or \
         young-adult. Reply with the keyword only. Excerpt: {text}"
    )
}

/// Gemini-backed persona classifier.
pub struct GeminiClassifier {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiClassifier {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl PersonaClassifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> VoicePlan {
        let request = GenerateContentRequest::text(classify_prompt(text));

        match self.client.generate_content(&self.model, &request).await {
            Ok(response) => match response.first_text() {
                Some(reply) => {
                    let plan = plan_from_reply(&reply);
                    debug!(voice = plan.voice.as_str(), "classified paragraph speaker");
                    plan
                }
                None => {
                    warn!("classifier response carried no text, using narrator fallback");
                    VoicePlan::narrator()
                }
            },
            Err(e) => {
                warn!(error = %e, "persona classification failed, using narrator fallback");
                VoicePlan::narrator()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::voice::NARRATOR_PERSONA;

    #[test]
    fn test_keyword_mapping() {
        assert_eq!(plan_from_reply("young-female").voice, VoiceName::Kore);
        assert_eq!(plan_from_reply("elder-male").voice, VoiceName::Fenrir);
        assert_eq!(plan_from_reply("child").voice, VoiceName::Puck);
        assert_eq!(plan_from_reply("young-adult").voice, VoiceName::Zephyr);
        assert_eq!(plan_from_reply("dialogue").voice, VoiceName::Zephyr);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        assert_eq!(plan_from_reply("Young-Female").voice, VoiceName::Kore);
        assert_eq!(plan_from_reply("ELDER-MALE speaking").voice, VoiceName::Fenrir);
    }

    #[test]
    fn test_first_match_wins() {
        // "young-female" appears before "child" in the vocabulary.
        let plan = plan_from_reply("young-female child");
        assert_eq!(plan.voice, VoiceName::Kore);
    }

    #[test]
    fn test_unrecognized_reply_falls_back_to_narrator() {
        let plan = plan_from_reply("I have no idea");
        assert_eq!(plan.voice, VoiceName::Charon);
        assert_eq!(plan.persona, NARRATOR_PERSONA);
    }

    #[test]
    fn test_narrator_reply_maps_to_narrator() {
        assert_eq!(plan_from_reply("narrator"), VoicePlan::narrator());
    }
}
