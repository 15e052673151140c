//! Reader facade.
//!
//! Ties the library, the prefetch engine, and the sequencer together into
//! one session object with the operations an embedding layer needs: import,
//! select, delete, voice settings, play/stop/seek. All cache-invalidation
//! and look-ahead rules live here so callers cannot get the ordering wrong:
//! invalidation always happens synchronously before any new prefetch is
//! issued for the new context.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::audio::{AudioOutput, ClockOutput};
use super::classify::{GeminiClassifier, PersonaClassifier};
use super::library::{Content, Library};
use super::prefetch::PrefetchEngine;
use super::providers::gemini::{GeminiClient, GeminiError};
use super::sequencer::{PlaybackEvent, PlaybackState, Sequencer};
use super::synth::{GeminiSynthesizer, SpeechSynthesizer};
use super::voice::VoiceName;
use crate::config::ReaderConfig;

/// Delay between stopping the previous output and restarting after a seek,
/// letting the replaced output fully release.
const SEEK_RESTART_DELAY: Duration = Duration::from_millis(100);

/// Errors for reader operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReaderError {
    #[error("no content selected")]
    NoActiveContent,

    #[error("content index {0} out of range")]
    UnknownContent(usize),

    #[error("paragraph index {0} out of range")]
    UnknownParagraph(usize),
}

/// Result type for reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// A reading session: library, settings, and the playback pipeline.
pub struct Reader {
    library: RwLock<Library>,
    active: Mutex<Option<usize>>,
    engine: Arc<PrefetchEngine>,
    sequencer: Arc<Sequencer>,
}

impl Reader {
    /// Build a reader over explicit component implementations.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        classifier: Arc<dyn PersonaClassifier>,
        output: Arc<dyn AudioOutput>,
        voice: VoiceName,
        smart_voice: bool,
    ) -> Self {
        let engine = Arc::new(PrefetchEngine::new(
            synthesizer,
            classifier,
            voice,
            smart_voice,
        ));
        let sequencer = Arc::new(Sequencer::new(Arc::clone(&engine), output));
        Self {
            library: RwLock::new(Library::new()),
            active: Mutex::new(None),
            engine,
            sequencer,
        }
    }

    /// Build a reader wired to the Gemini classifier and synthesizer, with
    /// the clock output.
    pub fn with_gemini(config: &ReaderConfig) -> Result<Self, GeminiError> {
        let client = Arc::new(GeminiClient::new(
            &config.api_key,
            &config.base_url,
            Duration::from_secs(config.request_timeout_seconds),
        )?);
        Ok(Self::new(
            Arc::new(GeminiSynthesizer::new(
                Arc::clone(&client),
                &config.tts_model,
            )),
            Arc::new(GeminiClassifier::new(client, &config.classify_model)),
            Arc::new(ClockOutput),
            config.default_voice,
            config.smart_voice,
        ))
    }

    /// Register the playback event callback.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(PlaybackEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
    {
        self.sequencer.on_event(callback);
    }

    // ------------------------------------------------------------------
    // Library
    // ------------------------------------------------------------------

    /// Import a text blob under `title`, select it, and return its index.
    pub async fn import_text(
        &self,
        title: impl Into<String>,
        text: &str,
    ) -> ReaderResult<usize> {
        let content = Content::from_text(title, text);
        info!(title = content.title(), paragraphs = content.len(), "imported content");
        let index = self.library.write().add(content);
        self.select(index).await?;
        Ok(index)
    }

    pub fn content_count(&self) -> usize {
        self.library.read().len()
    }

    pub fn content(&self, index: usize) -> Option<Arc<Content>> {
        self.library.read().get(index)
    }

    /// Index of the active content, if any.
    pub fn active(&self) -> Option<usize> {
        *self.active.lock()
    }

    pub fn active_content(&self) -> Option<Arc<Content>> {
        self.engine.content()
    }

    /// Make the content at `index` active: playback stops, the cursor
    /// resets, the cache is invalidated, and look-ahead starts for the
    /// first two paragraphs.
    pub async fn select(&self, index: usize) -> ReaderResult<()> {
        let content = self
            .library
            .read()
            .get(index)
            .ok_or(ReaderError::UnknownContent(index))?;

        self.sequencer.stop().await;
        *self.active.lock() = Some(index);
        self.sequencer.set_cursor(0);
        // Invalidates synchronously before any prefetch for the new context.
        self.engine.set_content(Some(content));
        self.engine.prefetch(0);
        self.engine.prefetch(1);
        debug!(content = index, "selected content");
        Ok(())
    }

    /// Delete the content at `index`. If it is active, playback and the
    /// cache session are torn down first.
    pub async fn delete(&self, index: usize) -> ReaderResult<()> {
        if self.library.read().get(index).is_none() {
            return Err(ReaderError::UnknownContent(index));
        }

        if *self.active.lock() == Some(index) {
            self.sequencer.stop().await;
            self.engine.set_content(None);
        }

        self.library.write().remove(index);
        // Recompute in one lock acquisition: a select() that ran while the
        // stop above was awaited must not be overwritten with a stale value.
        {
            let mut active = self.active.lock();
            *active = match *active {
                Some(current) if current == index => None,
                // Later items shift down by one.
                Some(current) if current > index => Some(current - 1),
                other => other,
            };
        }
        debug!(content = index, "deleted content");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn voice(&self) -> VoiceName {
        self.engine.selected_voice()
    }

    /// Change the preferred voice. Invalidates the cache and stops any
    /// active playback.
    pub async fn set_voice(&self, voice: VoiceName) {
        if self.sequencer.is_playing() {
            self.sequencer.stop().await;
        }
        self.engine.set_voice(voice);
        info!(voice = voice.as_str(), "preferred voice changed");
    }

    pub fn smart_voice(&self) -> bool {
        self.engine.smart_voice()
    }

    /// Toggle smart-voice mode. Invalidates the cache; playback continues.
    pub fn set_smart_voice(&self, enabled: bool) {
        self.engine.set_smart_voice(enabled);
        info!(enabled, "smart-voice mode changed");
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn playback_state(&self) -> PlaybackState {
        self.sequencer.state()
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    pub fn is_buffering(&self) -> bool {
        self.sequencer.is_buffering()
    }

    /// Current paragraph cursor.
    pub fn cursor(&self) -> usize {
        self.sequencer.cursor()
    }

    /// Paragraph count of the active content.
    pub fn paragraph_count(&self) -> usize {
        self.engine.paragraph_count()
    }

    /// Start playback at the current cursor.
    pub async fn play(&self) -> ReaderResult<()> {
        if self.engine.content().is_none() {
            return Err(ReaderError::NoActiveContent);
        }
        self.sequencer.play().await;
        Ok(())
    }

    /// Stop playback; pending prefetch work is left to finish on its own.
    pub async fn stop(&self) {
        self.sequencer.stop().await;
    }

    /// Jump the cursor to `paragraph` by direct selection.
    ///
    /// The cache is invalidated and look-ahead restarts from the new
    /// position. If playback was active it is stopped, given a short delay
    /// to release the output, and restarted at the new paragraph.
    pub async fn seek(&self, paragraph: usize) -> ReaderResult<()> {
        let count = self.paragraph_count();
        if self.engine.content().is_none() {
            return Err(ReaderError::NoActiveContent);
        }
        if paragraph >= count {
            return Err(ReaderError::UnknownParagraph(paragraph));
        }

        let was_playing = self.sequencer.is_playing();
        self.sequencer.stop().await;
        self.sequencer.set_cursor(paragraph);
        self.engine.invalidate();
        self.engine.prefetch(paragraph);
        self.engine.prefetch(paragraph + 1);

        if was_playing {
            tokio::time::sleep(SEEK_RESTART_DELAY).await;
            self.sequencer.play().await;
        }
        debug!(paragraph, was_playing, "seeked to paragraph");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{OutputHandle, PlayOutcome};
    use crate::core::voice::VoicePlan;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    struct SilenceSynth;

    #[async_trait]
    impl SpeechSynthesizer for SilenceSynth {
        async fn synthesize(&self, _: &str, _: VoiceName, _: &str) -> Option<Bytes> {
            Some(Bytes::from_static(&[0, 0, 0, 0]))
        }
    }

    struct NarratorOnly;

    #[async_trait]
    impl PersonaClassifier for NarratorOnly {
        async fn classify(&self, _: &str) -> VoicePlan {
            VoicePlan::narrator()
        }
    }

    struct InstantOutput;

    impl AudioOutput for InstantOutput {
        fn start(&self, _: crate::core::audio::AudioBuffer) -> OutputHandle {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(PlayOutcome::Completed);
            OutputHandle::new(CancellationToken::new(), rx)
        }
    }

    fn reader() -> Reader {
        Reader::new(
            Arc::new(SilenceSynth),
            Arc::new(NarratorOnly),
            Arc::new(InstantOutput),
            VoiceName::Charon,
            false,
        )
    }

    #[tokio::test]
    async fn test_import_selects_and_resets_cursor() {
        let reader = reader();
        let index = reader.import_text("story", "one\n\ntwo\n\nthree").await.unwrap();
        assert_eq!(index, 0);
        assert_eq!(reader.active(), Some(0));
        assert_eq!(reader.cursor(), 0);
        assert_eq!(reader.paragraph_count(), 3);
    }

    #[tokio::test]
    async fn test_select_unknown_index_errors() {
        let reader = reader();
        assert_eq!(
            reader.select(3).await,
            Err(ReaderError::UnknownContent(3))
        );
    }

    #[tokio::test]
    async fn test_play_without_content_errors() {
        let reader = reader();
        assert_eq!(reader.play().await, Err(ReaderError::NoActiveContent));
    }

    #[tokio::test]
    async fn test_delete_active_tears_down_session() {
        let reader = reader();
        reader.import_text("story", "one").await.unwrap();
        reader.delete(0).await.unwrap();
        assert_eq!(reader.active(), None);
        assert!(reader.active_content().is_none());
        assert_eq!(reader.content_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_earlier_item_shifts_active_index() {
        let reader = reader();
        reader.import_text("a", "one").await.unwrap();
        reader.import_text("b", "two").await.unwrap();
        assert_eq!(reader.active(), Some(1));

        reader.delete(0).await.unwrap();
        assert_eq!(reader.active(), Some(0));
        assert_eq!(reader.active_content().unwrap().title(), "b");
    }

    #[tokio::test]
    async fn test_delete_later_item_keeps_active_index() {
        let reader = reader();
        reader.import_text("a", "one").await.unwrap();
        reader.import_text("b", "two").await.unwrap();
        reader.select(0).await.unwrap();

        reader.delete(1).await.unwrap();
        assert_eq!(reader.active(), Some(0));
        assert_eq!(reader.active_content().unwrap().title(), "a");
    }

    #[tokio::test]
    async fn test_seek_moves_cursor_when_stopped() {
        let reader = reader();
        reader.import_text("story", "one\n\ntwo\n\nthree").await.unwrap();
        reader.seek(2).await.unwrap();
        assert_eq!(reader.cursor(), 2);
        assert!(!reader.is_playing());
    }

    #[tokio::test]
    async fn test_seek_out_of_range_errors() {
        let reader = reader();
        reader.import_text("story", "one\n\ntwo").await.unwrap();
        assert_eq!(reader.seek(2).await, Err(ReaderError::UnknownParagraph(2)));
    }

    #[tokio::test]
    async fn test_voice_settings_round_trip() {
        let reader = reader();
        assert_eq!(reader.voice(), VoiceName::Charon);
        reader.set_voice(VoiceName::Kore).await;
        assert_eq!(reader.voice(), VoiceName::Kore);

        assert!(!reader.smart_voice());
        reader.set_smart_voice(true);
        assert!(reader.smart_voice());
    }
}
