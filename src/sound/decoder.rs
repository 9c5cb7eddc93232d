//! Sound chunk decoder trait and error types

use super::formats::AudioFormat;

/// Errors from sound chunk decoding and audio output
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Payload is malformed for the selected codec
    #[error("Invalid audio data: {0}")]
    InvalidData(String),

    /// A predictor left the valid sample range
    #[error("Predictor overflow on channel {channel}: {value}")]
    PredictorOverflow { channel: usize, value: i32 },

    /// The audio output refused a buffer
    #[error("Audio output failed: {0}")]
    OutputFailed(String),
}

/// Result type for decoder operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Decoder for the payload of one sound chunk
///
/// One instance lives for the whole stream; state carried between chunks
/// is cleared by `reset` when playback restarts.
pub trait SoundDecoder {
    /// Returns the decoder name (e.g., "ADPCM", "raw PCM")
    fn name(&self) -> &'static str;

    /// Sample layout of the decoded output
    fn format(&self) -> AudioFormat;

    /// Decodes one chunk payload into PCM bytes
    ///
    /// # Returns
    /// Decoded little-endian PCM, possibly empty
    fn decode_chunk(&mut self, payload: &[u8]) -> DecodeResult<Vec<u8>>;

    /// Forgets all per-stream state
    fn reset(&mut self);
}
