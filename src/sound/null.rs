//! Null (silent) audio output
//!
//! Accepts decoded buffers and discards them. Used when playback runs
//! headless or no output device is available, so pacing and queue
//! accounting still behave as with a real device.

use super::decoder::DecodeResult;
use super::queue::{AudioBuffer, AudioSink};

/// Audio output that discards everything it is given
#[derive(Debug, Default)]
pub struct NullSink {
    buffers: u64,
    bytes: u64,
    played_ms: f64,
}

impl NullSink {
    /// Create a new null sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers accepted
    pub fn buffers(&self) -> u64 {
        self.buffers
    }

    /// Total bytes accepted
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Playing time of everything accepted, in milliseconds
    pub fn played_ms(&self) -> f64 {
        self.played_ms
    }
}

impl AudioSink for NullSink {
    fn has_free_slot(&self) -> bool {
        true
    }

    fn queue_audio(&mut self, buffer: AudioBuffer) -> DecodeResult<()> {
        self.buffers += 1;
        self.bytes += buffer.len() as u64;
        self.played_ms += buffer.duration_ms();
        Ok(())
    }
}
