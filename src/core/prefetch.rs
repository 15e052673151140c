//! Prefetch cache and scheduler.
//!
//! The engine owns all per-session audio state: the cache of decoded buffers
//! keyed by paragraph index, the set of indices currently in flight, the
//! active content, and the voice settings. [`PrefetchEngine::ensure`] is the
//! single resolve path: classify (in smart-voice mode), synthesize, decode,
//! insert. Concurrent calls for different indices run independently;
//! concurrent calls for the same index are collapsed to one winner by the
//! in-flight guard, which is checked and set under one lock acquisition.
//!
//! Every whole-cache invalidation (content switch, voice change, smart-voice
//! toggle, cursor jump) increments a session epoch. A resolve that finishes
//! after its epoch has passed writes nothing: stale audio can never populate
//! a newer session's cache, and a stale task never clears the in-flight mark
//! of a fresh request for the same index.
//!
//! Lock discipline: the state mutex guards short, synchronous sections only
//! and is never held across an await.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::audio::{decode_pcm, AudioBuffer};
use super::classify::PersonaClassifier;
use super::library::Content;
use super::synth::SpeechSynthesizer;
use super::voice::{VoiceName, VoicePlan, GENERIC_PERSONA};

struct SessionState {
    content: Option<Arc<Content>>,
    cache: HashMap<usize, AudioBuffer>,
    in_flight: HashSet<usize>,
    epoch: u64,
    voice: VoiceName,
    smart_voice: bool,
}

impl SessionState {
    fn invalidate(&mut self) {
        self.epoch += 1;
        self.cache.clear();
        self.in_flight.clear();
    }
}

/// Bounded audio cache plus the scheduler that fills it.
pub struct PrefetchEngine {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    classifier: Arc<dyn PersonaClassifier>,
    state: Mutex<SessionState>,
}

impl PrefetchEngine {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        classifier: Arc<dyn PersonaClassifier>,
        voice: VoiceName,
        smart_voice: bool,
    ) -> Self {
        Self {
            synthesizer,
            classifier,
            state: Mutex::new(SessionState {
                content: None,
                cache: HashMap::new(),
                in_flight: HashSet::new(),
                epoch: 0,
                voice,
                smart_voice,
            }),
        }
    }

    /// Replace the active content, invalidating the whole cache first.
    pub fn set_content(&self, content: Option<Arc<Content>>) {
        let mut state = self.state.lock();
        state.invalidate();
        state.content = content;
    }

    pub fn content(&self) -> Option<Arc<Content>> {
        self.state.lock().content.clone()
    }

    /// Paragraph count of the active content, 0 when none is selected.
    pub fn paragraph_count(&self) -> usize {
        self.state
            .lock()
            .content
            .as_ref()
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub fn selected_voice(&self) -> VoiceName {
        self.state.lock().voice
    }

    /// Change the manually selected voice. Invalidates the whole cache.
    pub fn set_voice(&self, voice: VoiceName) {
        let mut state = self.state.lock();
        state.invalidate();
        state.voice = voice;
    }

    pub fn smart_voice(&self) -> bool {
        self.state.lock().smart_voice
    }

    /// Toggle smart-voice mode. Invalidates the whole cache.
    pub fn set_smart_voice(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.invalidate();
        state.smart_voice = enabled;
    }

    /// Invalidate the whole cache without changing content or settings
    /// (used for cursor jumps by direct selection).
    pub fn invalidate(&self) {
        self.state.lock().invalidate();
    }

    /// The cached buffer for `index`, if present.
    pub fn cached(&self, index: usize) -> Option<AudioBuffer> {
        self.state.lock().cache.get(&index).cloned()
    }

    /// Whether `index` currently has a cache entry.
    pub fn contains(&self, index: usize) -> bool {
        self.state.lock().cache.contains_key(&index)
    }

    /// Indices currently cached, in no particular order.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.state.lock().cache.keys().copied().collect()
    }

    /// Drop the cache entry for `index` (natural-completion eviction).
    pub fn evict(&self, index: usize) {
        if self.state.lock().cache.remove(&index).is_some() {
            debug!(paragraph = index, "evicted played paragraph audio");
        }
    }

    /// Resolve audio for one paragraph into the cache.
    ///
    /// No-op when the index is out of range, already cached, or already in
    /// flight. Classification failures fall back to the narrator plan inside
    /// the classifier; synthesis and decode failures leave the cache without
    /// an entry and are logged, not surfaced. The in-flight mark is cleared
    /// on every exit path of the same epoch, so a later retry is possible.
    pub async fn ensure(&self, index: usize) {
        let (epoch, text, voice, smart_voice) = {
            let mut state = self.state.lock();
            let Some(content) = state.content.clone() else {
                return;
            };
            let Some(text) = content.paragraph(index) else {
                return;
            };
            if state.cache.contains_key(&index) || state.in_flight.contains(&index) {
                return;
            }
            state.in_flight.insert(index);
            (state.epoch, text.to_string(), state.voice, state.smart_voice)
        };

        let plan = if smart_voice {
            self.classifier.classify(&text).await
        } else {
            VoicePlan {
                voice,
                persona: GENERIC_PERSONA.to_string(),
            }
        };

        let buffer = match self
            .synthesizer
            .synthesize(&text, plan.voice, &plan.persona)
            .await
        {
            Some(raw) => match decode_pcm(&raw) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    warn!(paragraph = index, error = %e, "failed to decode synthesized audio");
                    None
                }
            },
            None => {
                warn!(paragraph = index, "no audio produced for paragraph");
                None
            }
        };

        let mut state = self.state.lock();
        if state.epoch != epoch {
            // The session moved on while we were in flight; the current
            // epoch's in-flight set no longer contains our mark.
            debug!(paragraph = index, "dropping stale audio resolve");
            return;
        }
        state.in_flight.remove(&index);
        if let Some(buffer) = buffer {
            debug!(
                paragraph = index,
                samples = buffer.len(),
                "cached paragraph audio"
            );
            state.cache.insert(index, buffer);
        }
    }

    /// Resolve `index` for playback: cache hit, or a synchronous `ensure`
    /// followed by a re-read. `None` after this is a playback-fatal miss.
    pub async fn resolve(&self, index: usize) -> Option<AudioBuffer> {
        if let Some(buffer) = self.cached(index) {
            return Some(buffer);
        }
        self.ensure(index).await;
        self.cached(index)
    }

    /// Fire-and-forget look-ahead for `index`.
    pub fn prefetch(self: &Arc<Self>, index: usize) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.ensure(index).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSynth {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for FixedSynth {
        async fn synthesize(&self, _: &str, _: VoiceName, _: &str) -> Option<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Four bytes = two PCM frames.
            Some(Bytes::from_static(&[0, 0, 0, 64]))
        }
    }

    struct NarratorOnly;

    #[async_trait]
    impl PersonaClassifier for NarratorOnly {
        async fn classify(&self, _: &str) -> VoicePlan {
            VoicePlan::narrator()
        }
    }

    fn engine_with(content: &str) -> (Arc<PrefetchEngine>, Arc<FixedSynth>) {
        let synth = Arc::new(FixedSynth {
            calls: AtomicUsize::new(0),
        });
        let engine = Arc::new(PrefetchEngine::new(
            synth.clone(),
            Arc::new(NarratorOnly),
            VoiceName::Charon,
            false,
        ));
        engine.set_content(Some(Arc::new(Content::from_text("t", content))));
        (engine, synth)
    }

    #[tokio::test]
    async fn test_ensure_populates_cache() {
        let (engine, synth) = engine_with("one\n\ntwo");
        engine.ensure(0).await;
        assert!(engine.contains(0));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_is_noop_when_cached() {
        let (engine, synth) = engine_with("one");
        engine.ensure(0).await;
        engine.ensure(0).await;
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_fills_then_hits_cache() {
        let (engine, synth) = engine_with("one");
        assert!(engine.resolve(0).await.is_some());
        assert!(engine.resolve(0).await.is_some());
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_out_of_range_is_noop() {
        let (engine, synth) = engine_with("one");
        engine.ensure(7).await;
        assert!(!engine.contains(7));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidation_clears_everything() {
        let (engine, _) = engine_with("one\n\ntwo");
        engine.ensure(0).await;
        engine.ensure(1).await;
        engine.set_voice(VoiceName::Kore);
        assert!(engine.cached_indices().is_empty());
    }

    #[tokio::test]
    async fn test_failed_synthesis_clears_in_flight_for_retry() {
        struct FailingSynth {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl SpeechSynthesizer for FailingSynth {
            async fn synthesize(&self, _: &str, _: VoiceName, _: &str) -> Option<Bytes> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                None
            }
        }

        let synth = Arc::new(FailingSynth {
            calls: AtomicUsize::new(0),
        });
        let engine = PrefetchEngine::new(
            synth.clone(),
            Arc::new(NarratorOnly),
            VoiceName::Charon,
            false,
        );
        engine.set_content(Some(Arc::new(Content::from_text("t", "one"))));

        engine.ensure(0).await;
        assert!(!engine.contains(0));
        // The in-flight mark was cleared, so a retry issues a second call.
        engine.ensure(0).await;
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_audio_leaves_no_entry() {
        struct OddSynth;

        #[async_trait]
        impl SpeechSynthesizer for OddSynth {
            async fn synthesize(&self, _: &str, _: VoiceName, _: &str) -> Option<Bytes> {
                Some(Bytes::from_static(&[1, 2, 3]))
            }
        }

        let engine = PrefetchEngine::new(
            Arc::new(OddSynth),
            Arc::new(NarratorOnly),
            VoiceName::Charon,
            false,
        );
        engine.set_content(Some(Arc::new(Content::from_text("t", "one"))));
        engine.ensure(0).await;
        assert!(!engine.contains(0));
    }
}
