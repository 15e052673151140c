//! Playback output seam.
//!
//! The sequencer owns at most one active audio output at a time. An
//! [`AudioOutput`] implementation starts a buffer playing and hands back an
//! [`OutputHandle`]: awaiting the handle resolves on natural completion,
//! while stopping it detaches the output so no completion is ever observed
//! for a replaced buffer.
//!
//! The crate ships [`ClockOutput`], which "plays" a buffer by waiting out
//! its exact duration on the tokio clock. Embedding layers that render to a
//! real device implement [`AudioOutput`] themselves and plug it into the
//! reader; the sequencing contract is identical.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::AudioBuffer;

/// How a started buffer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The buffer played to its natural end.
    Completed,
    /// The output was stopped before the buffer finished.
    Interrupted,
}

/// Clonable stop control for an active output.
#[derive(Debug, Clone)]
pub struct OutputControl {
    cancel: CancellationToken,
}

impl OutputControl {
    /// Stop and detach the output. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Handle to a single started buffer.
#[derive(Debug)]
pub struct OutputHandle {
    control: OutputControl,
    done: oneshot::Receiver<PlayOutcome>,
}

impl OutputHandle {
    /// Pair a cancellation token with the completion channel receiver.
    pub fn new(cancel: CancellationToken, done: oneshot::Receiver<PlayOutcome>) -> Self {
        Self {
            control: OutputControl { cancel },
            done,
        }
    }

    /// A clonable control that can stop this output from another task.
    pub fn control(&self) -> OutputControl {
        self.control.clone()
    }

    /// Stop and detach the output.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Wait for the buffer to finish. A dropped or stopped output resolves
    /// as [`PlayOutcome::Interrupted`].
    pub async fn finished(self) -> PlayOutcome {
        self.done.await.unwrap_or(PlayOutcome::Interrupted)
    }
}

/// An audio output device.
///
/// Implementations must allow `start` to be called again only after the
/// previous handle has been stopped or has completed; the sequencer enforces
/// this ordering, so implementations may assume a single active buffer.
pub trait AudioOutput: Send + Sync {
    /// Begin playing `buffer` and return the handle for it.
    fn start(&self, buffer: AudioBuffer) -> OutputHandle;
}

/// Output that advances on the tokio clock instead of a sound device.
///
/// Completion fires after exactly the buffer's duration, which preserves the
/// sequencer's timing semantics in headless and test environments.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockOutput;

impl AudioOutput for ClockOutput {
    fn start(&self, buffer: AudioBuffer) -> OutputHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let token = cancel.clone();
        let duration = buffer.duration();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(?duration, "clock output interrupted");
                    let _ = tx.send(PlayOutcome::Interrupted);
                }
                _ = tokio::time::sleep(duration) => {
                    let _ = tx.send(PlayOutcome::Completed);
                }
            }
        });

        OutputHandle::new(cancel, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn short_buffer() -> AudioBuffer {
        // 240 samples at 24 kHz = 10 ms.
        AudioBuffer::new(vec![0.0; 240], 24_000)
    }

    #[tokio::test]
    async fn test_clock_output_completes_naturally() {
        let output = ClockOutput;
        let handle = output.start(short_buffer());
        assert_eq!(handle.finished().await, PlayOutcome::Completed);
    }

    #[tokio::test]
    async fn test_stopped_output_reports_interrupted() {
        let output = ClockOutput;
        let handle = output.start(AudioBuffer::new(vec![0.0; 240_000], 24_000));
        handle.stop();
        assert_eq!(handle.finished().await, PlayOutcome::Interrupted);
    }

    #[tokio::test]
    async fn test_control_stops_from_outside() {
        let output = ClockOutput;
        let handle = output.start(AudioBuffer::new(vec![0.0; 240_000], 24_000));
        let control = handle.control();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            control.stop();
        });

        assert_eq!(handle.finished().await, PlayOutcome::Interrupted);
        stopper.await.unwrap();
    }
}
