//! Audio buffer model, PCM decoding, and the playback output seam.

mod decode;
mod output;

pub use decode::{decode_base64_pcm, decode_pcm, DecodeError, CHANNELS, SAMPLE_RATE};
pub use output::{AudioOutput, ClockOutput, OutputControl, OutputHandle, PlayOutcome};

use std::sync::Arc;
use std::time::Duration;

/// A decoded, ready-to-play audio buffer.
///
/// Samples are mono f32 in `[-1.0, 1.0]`. The sample data is shared behind an
/// `Arc`, so cloning a buffer (e.g. handing a cached entry to the sequencer)
/// is cheap and never copies audio.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exact duration: sample count divided by sample rate, no rounding
    /// beyond f64 precision.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}
