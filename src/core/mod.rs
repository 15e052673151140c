pub mod audio;
pub mod classify;
pub mod library;
pub mod prefetch;
pub mod providers;
pub mod reader;
pub mod sequencer;
pub mod synth;
pub mod voice;

// Re-export commonly used types for convenience
pub use audio::{AudioBuffer, AudioOutput, ClockOutput, DecodeError, PlayOutcome, SAMPLE_RATE};
pub use classify::{GeminiClassifier, PersonaClassifier};
pub use library::{Content, Library};
pub use prefetch::PrefetchEngine;
pub use reader::{Reader, ReaderError, ReaderResult};
pub use sequencer::{PlaybackEvent, PlaybackState, Sequencer, StopReason};
pub use synth::{GeminiSynthesizer, SpeechSynthesizer};
pub use voice::{VoiceName, VoicePlan, DEFAULT_VOICE};
