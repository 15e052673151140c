//! Playback sequencer.
//!
//! Owns the single active audio output and the driver task that plays
//! paragraphs back-to-back: resolve the current paragraph's buffer (from
//! cache, or synchronously through the engine while flagging buffering),
//! issue look-ahead prefetch for the next two paragraphs, start the output,
//! and on natural completion evict the finished entry, advance the cursor,
//! and chain into the next paragraph.
//!
//! Only one output is ever active: starting playback first stops and awaits
//! the previous driver, which in turn stops and detaches its output before
//! exiting.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::audio::{AudioOutput, PlayOutcome};
use super::prefetch::PrefetchEngine;

/// Playback state of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Why playback stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The user (or an interrupting operation) requested the stop.
    Requested,
    /// The cursor advanced past the last paragraph.
    EndOfContent,
    /// Audio for a paragraph could not be loaded even after a synchronous
    /// resolve. This is the only user-visible failure.
    LoadFailed { index: usize },
}

/// Events surfaced to the embedding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The cursor is now at `index` and playback of it is beginning.
    Paragraph { index: usize },
    /// The sequencer is blocked waiting for `index` to resolve.
    Buffering { index: usize },
    /// The wait for `index` resolved and playback is resuming.
    BufferingEnded { index: usize },
    /// Playback stopped.
    Stopped { reason: StopReason },
}

/// Async callback type for playback events.
pub type PlaybackEventCallback =
    Arc<dyn Fn(PlaybackEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct Driver {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Sequential paragraph player over a [`PrefetchEngine`].
pub struct Sequencer {
    engine: Arc<PrefetchEngine>,
    output: Arc<dyn AudioOutput>,
    cursor: AtomicUsize,
    playing: AtomicBool,
    buffering: AtomicBool,
    driver: tokio::sync::Mutex<Option<Driver>>,
    callback: RwLock<Option<PlaybackEventCallback>>,
}

impl Sequencer {
    pub fn new(engine: Arc<PrefetchEngine>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            engine,
            output,
            cursor: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            buffering: AtomicBool::new(false),
            driver: tokio::sync::Mutex::new(None),
            callback: RwLock::new(None),
        }
    }

    /// Register the event callback, replacing any previous one.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(PlaybackEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Arc::new(callback));
    }

    pub fn state(&self) -> PlaybackState {
        if self.playing.load(Ordering::SeqCst) {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Whether the driver is currently blocked on a cache miss.
    pub fn is_buffering(&self) -> bool {
        self.buffering.load(Ordering::SeqCst)
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Move the cursor. Call only while stopped; playback reads the cursor
    /// when it starts.
    pub fn set_cursor(&self, index: usize) {
        self.cursor.store(index, Ordering::SeqCst);
    }

    /// Begin playback at the current cursor, replacing any previous driver.
    pub async fn play(self: &Arc<Self>) {
        // Stop-then-release-then-create: the old output is fully detached
        // before a new one can start.
        self.stop().await;

        let cancel = CancellationToken::new();
        self.playing.store(true, Ordering::SeqCst);
        let task = tokio::spawn(Self::drive(Arc::clone(self), cancel.clone()));
        *self.driver.lock().await = Some(Driver { cancel, task });
    }

    /// Stop playback and wait for the driver (and its output) to release.
    pub async fn stop(&self) {
        let driver = self.driver.lock().await.take();
        if let Some(driver) = driver {
            driver.cancel.cancel();
            if let Err(e) = driver.task.await {
                error!(error = %e, "playback driver task panicked");
            }
        }
    }

    async fn drive(self: Arc<Self>, cancel: CancellationToken) {
        let reason = self.run(&cancel).await;
        self.playing.store(false, Ordering::SeqCst);
        self.buffering.store(false, Ordering::SeqCst);
        info!(?reason, "playback stopped");
        self.emit(PlaybackEvent::Stopped { reason }).await;
    }

    async fn run(&self, cancel: &CancellationToken) -> StopReason {
        loop {
            if cancel.is_cancelled() {
                return StopReason::Requested;
            }

            let index = self.cursor.load(Ordering::SeqCst);
            if index >= self.engine.paragraph_count() {
                return StopReason::EndOfContent;
            }

            self.emit(PlaybackEvent::Paragraph { index }).await;

            let buffer = match self.engine.cached(index) {
                Some(buffer) => buffer,
                None => {
                    self.buffering.store(true, Ordering::SeqCst);
                    self.emit(PlaybackEvent::Buffering { index }).await;
                    // The resolve runs in its own task: a stop must only
                    // cancel the audio output, never abort synthesis midway,
                    // or the index would stay marked in-flight forever.
                    let resolve = tokio::spawn({
                        let engine = Arc::clone(&self.engine);
                        async move { engine.ensure(index).await }
                    });
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            self.buffering.store(false, Ordering::SeqCst);
                            return StopReason::Requested;
                        }
                        join = resolve => {
                            if let Err(e) = join {
                                error!(error = %e, "paragraph resolve task panicked");
                            }
                        }
                    }
                    self.buffering.store(false, Ordering::SeqCst);
                    match self.engine.cached(index) {
                        Some(buffer) => {
                            self.emit(PlaybackEvent::BufferingEnded { index }).await;
                            buffer
                        }
                        None => {
                            error!(paragraph = index, "cannot load audio for this segment");
                            return StopReason::LoadFailed { index };
                        }
                    }
                }
            };

            // Look-ahead while the current paragraph plays.
            self.engine.prefetch(index + 1);
            self.engine.prefetch(index + 2);

            debug!(paragraph = index, duration = ?buffer.duration(), "starting paragraph audio");
            let handle = self.output.start(buffer);
            let control = handle.control();

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    control.stop();
                    PlayOutcome::Interrupted
                }
                outcome = handle.finished() => outcome,
            };

            match outcome {
                PlayOutcome::Completed => {
                    // Evict before advancing: played audio never lingers.
                    self.engine.evict(index);
                    let next = index + 1;
                    if next >= self.engine.paragraph_count() {
                        return StopReason::EndOfContent;
                    }
                    self.cursor.store(next, Ordering::SeqCst);
                }
                PlayOutcome::Interrupted => return StopReason::Requested,
            }
        }
    }

    async fn emit(&self, event: PlaybackEvent) {
        let callback = { self.callback.read().clone() };
        if let Some(callback) = callback {
            callback(event).await;
        }
    }
}
