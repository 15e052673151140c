//! Audio decode adapter: raw PCM payloads to playable buffers.
//!
//! The synthesis service returns 16-bit little-endian mono PCM at 24 kHz,
//! base64-encoded inside the response. Decoding is pure and stateless: the
//! resulting buffer's duration is exactly sample count / sample rate, with
//! no resampling.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

use super::AudioBuffer;

/// Fixed output sample rate of the synthesis service.
pub const SAMPLE_RATE: u32 = 24_000;

/// Fixed channel count of the synthesis service.
pub const CHANNELS: u16 = 1;

/// Errors raised for malformed audio payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// 16-bit PCM requires an even byte count; a trailing odd byte means the
    /// payload was truncated mid-frame.
    #[error("PCM payload truncated mid-frame ({0} bytes)")]
    TruncatedFrame(usize),
}

/// Decode raw 16-bit little-endian mono PCM bytes into an [`AudioBuffer`].
pub fn decode_pcm(bytes: &[u8]) -> Result<AudioBuffer, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::TruncatedFrame(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|frame| i16::from_le_bytes([frame[0], frame[1]]) as f32 / 32_768.0)
        .collect();

    Ok(AudioBuffer::new(samples, SAMPLE_RATE))
}

/// Decode a base64-encoded PCM payload into an [`AudioBuffer`].
pub fn decode_base64_pcm(payload: &str) -> Result<AudioBuffer, DecodeError> {
    let bytes = BASE64.decode(payload)?;
    decode_pcm(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_decode_pcm_samples() {
        // 0, i16::MAX, i16::MIN as little-endian frames.
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80];
        let buffer = decode_pcm(&bytes).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.sample_rate(), SAMPLE_RATE);
        assert_eq!(buffer.samples()[0], 0.0);
        assert!((buffer.samples()[1] - 0.99997).abs() < 1e-4);
        assert_eq!(buffer.samples()[2], -1.0);
    }

    #[test]
    fn test_decode_duration_is_exact() {
        // 24_000 frames of silence = exactly one second.
        let bytes = vec![0u8; 48_000];
        let buffer = decode_pcm(&bytes).unwrap();
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        let result = decode_pcm(&[0x00, 0x01, 0x02]);
        assert!(matches!(result, Err(DecodeError::TruncatedFrame(3))));
    }

    #[test]
    fn test_decode_base64_round() {
        use base64::engine::general_purpose::STANDARD;
        let pcm = [0x00u8, 0x00, 0x00, 0x40];
        let payload = STANDARD.encode(pcm);
        let buffer = decode_base64_pcm(&payload).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.samples()[1], 0.5);
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(matches!(
            decode_base64_pcm("not-base64!!"),
            Err(DecodeError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        let buffer = decode_pcm(&[]).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration(), Duration::ZERO);
    }
}
