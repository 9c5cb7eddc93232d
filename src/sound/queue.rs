//! Bounded queue of decoded stream audio
//!
//! Decoded sound chunks are held back until the first frame is presented,
//! then handed to the audio output whenever it reports a free slot.

use std::collections::{TryReserveError, VecDeque};

use super::decoder::DecodeResult;
use super::formats::AudioFormat;

/// One decoded sound chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    pub data: Vec<u8>,
    pub format: AudioFormat,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(data: Vec<u8>, format: AudioFormat, sample_rate: u32) -> Self {
        Self {
            data,
            format,
            sample_rate,
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playing time in milliseconds
    pub fn duration_ms(&self) -> f64 {
        let frames = self.data.len() / self.format.bytes_per_sample();
        frames as f64 * 1000.0 / self.sample_rate.max(1) as f64
    }
}

/// Audio output with a bounded number of queued buffers
pub trait AudioSink {
    /// Whether another buffer can be queued now
    fn has_free_slot(&self) -> bool;

    /// Queues a buffer for playback after those already queued
    fn queue_audio(&mut self, buffer: AudioBuffer) -> DecodeResult<()>;
}

/// Pending buffers waiting for playback to start or for sink space
#[derive(Debug)]
pub struct SoundQueue {
    pending: VecDeque<AudioBuffer>,
    capacity: usize,
    started: bool,
    queued: u64,
    dropped: u64,
}

impl SoundQueue {
    /// Creates a queue holding at most `capacity` pending buffers
    pub fn new(capacity: usize) -> Result<Self, TryReserveError> {
        let mut pending = VecDeque::new();
        pending.try_reserve_exact(capacity)?;
        Ok(Self {
            pending,
            capacity,
            started: false,
            queued: 0,
            dropped: 0,
        })
    }

    /// Accepts a decoded buffer
    ///
    /// Once started, buffers go straight to the sink when it has room.
    /// Otherwise they are held; a full queue drops the buffer.
    ///
    /// # Returns
    /// `true` if the buffer was kept (sent or held)
    pub fn push(&mut self, buffer: AudioBuffer, sink: &mut dyn AudioSink) -> DecodeResult<bool> {
        if self.started && self.pending.is_empty() && sink.has_free_slot() {
            sink.queue_audio(buffer)?;
            self.queued += 1;
            return Ok(true);
        }
        if self.pending.len() < self.capacity {
            self.pending.push_back(buffer);
            return Ok(true);
        }
        log::warn!(
            "Sound queue full ({} buffers), dropping {} bytes",
            self.capacity,
            buffer.len()
        );
        self.dropped += 1;
        Ok(false)
    }

    /// Marks playback as started and hands held buffers to the sink
    ///
    /// # Returns
    /// Number of buffers queued to the sink
    pub fn release(&mut self, sink: &mut dyn AudioSink) -> DecodeResult<usize> {
        self.started = true;
        let mut released = 0;
        while sink.has_free_slot() {
            let Some(buffer) = self.pending.pop_front() else {
                break;
            };
            sink.queue_audio(buffer)?;
            self.queued += 1;
            released += 1;
        }
        Ok(released)
    }

    /// Drops held buffers and returns to the not-started state
    pub fn reset(&mut self) {
        self.pending.clear();
        self.started = false;
        self.queued = 0;
        self.dropped = 0;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Buffers handed to the sink since the last reset
    pub fn queued(&self) -> u64 {
        self.queued
    }

    /// Buffers dropped for lack of space since the last reset
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
