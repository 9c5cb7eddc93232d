//! Uncompressed sound chunks

use super::decoder::{DecodeError, DecodeResult, SoundDecoder};
use super::formats::AudioFormat;

/// Trailing bytes of a raw sound payload that are not samples
const RAW_TRAILER: usize = 2;

/// Passes raw PCM payloads through unchanged
#[derive(Debug, Clone)]
pub struct RawDecoder {
    format: AudioFormat,
}

impl RawDecoder {
    pub fn new(format: AudioFormat) -> Self {
        Self { format }
    }
}

impl SoundDecoder for RawDecoder {
    fn name(&self) -> &'static str {
        "raw PCM"
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn decode_chunk(&mut self, payload: &[u8]) -> DecodeResult<Vec<u8>> {
        let len = payload.len().checked_sub(RAW_TRAILER).ok_or_else(|| {
            DecodeError::InvalidData(format!("raw sound payload of {} bytes", payload.len()))
        })?;
        Ok(payload[..len].to_vec())
    }

    fn reset(&mut self) {}
}
