//! Voice enumeration and persona defaults.
//!
//! The remote speech service exposes a fixed, closed set of prebuilt voices.
//! Each voice carries a human-readable label and description so embedding
//! layers can present them as selectable "preferred voice" defaults. The
//! narrator voice doubles as the fallback whenever persona classification
//! fails or is disabled.

use serde::{Deserialize, Serialize};

/// Prebuilt voice identifiers accepted by the speech synthesis API.
///
/// The serialized form matches the wire name expected by the service
/// (e.g. `"Kore"`), so the derived serde representation is the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceName {
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
}

/// The default narrator voice used when no preference is set and as the
/// classification fallback.
pub const DEFAULT_VOICE: VoiceName = VoiceName::Charon;

/// Persona description paired with the narrator fallback voice.
pub const NARRATOR_PERSONA: &str = "steady narrator";

/// Persona description used when smart-voice mode is off.
pub const GENERIC_PERSONA: &str = "natural read-aloud";

impl VoiceName {
    /// All selectable voices, in display order.
    pub const ALL: [VoiceName; 5] = [
        VoiceName::Charon,
        VoiceName::Zephyr,
        VoiceName::Kore,
        VoiceName::Puck,
        VoiceName::Fenrir,
    ];

    /// Wire identifier sent to the synthesis API.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceName::Kore => "Kore",
            VoiceName::Puck => "Puck",
            VoiceName::Charon => "Charon",
            VoiceName::Fenrir => "Fenrir",
            VoiceName::Zephyr => "Zephyr",
        }
    }

    /// Short label for voice pickers.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceName::Charon => "Storyteller (default)",
            VoiceName::Zephyr => "Gentle young adult",
            VoiceName::Kore => "Warm female broadcaster",
            VoiceName::Puck => "Playful child",
            VoiceName::Fenrir => "Stern elder",
        }
    }

    /// Longer description of the voice character.
    pub fn description(&self) -> &'static str {
        match self {
            VoiceName::Charon => "Deep and resonant, suited to narration",
            VoiceName::Zephyr => "Even-paced and mild, suited to prose",
            VoiceName::Kore => "Clear and natural, rich in emotion",
            VoiceName::Puck => "Bright and mischievous, suited to tales",
            VoiceName::Fenrir => "Weathered and forceful, suited to epics",
        }
    }

    /// Look up a voice by its wire identifier, case-insensitively.
    pub fn from_id(id: &str) -> Option<VoiceName> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(id))
    }
}

/// A voice/persona pair chosen for one paragraph.
///
/// Produced by the persona classifier in smart-voice mode, or assembled from
/// the user's preferred voice plus [`GENERIC_PERSONA`] otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePlan {
    pub voice: VoiceName,
    pub persona: String,
}

impl VoicePlan {
    /// The fixed narrator fallback used on classification failure.
    pub fn narrator() -> Self {
        Self {
            voice: DEFAULT_VOICE,
            persona: NARRATOR_PERSONA.to_string(),
        }
    }
}
