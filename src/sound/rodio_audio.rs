//! Rodio-backed audio output
//!
//! Decoded buffers are appended to a single rodio `Sink`, which plays them
//! back to back. The sink's queue length stands in for the ring depth.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use super::decoder::{DecodeError, DecodeResult};
use super::queue::{AudioBuffer, AudioSink};

/// Audio output on the default device
pub struct RodioSink {
    // Dropping the stream stops playback, so it lives as long as the sink.
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    sink: Sink,
    depth: usize,
}

impl RodioSink {
    /// Opens the default output device
    ///
    /// # Arguments
    /// * `depth` - Maximum number of buffers queued on the device
    pub fn open(depth: usize) -> DecodeResult<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| DecodeError::OutputFailed(format!("failed to open output - {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| DecodeError::OutputFailed(format!("sink error - {}", e)))?;
        log::info!("Opened audio output (depth {})", depth);
        Ok(Self {
            _stream: stream,
            _handle: handle,
            sink,
            depth: depth.max(1),
        })
    }

    /// Blocks until every queued buffer has played
    pub fn drain(&self) {
        self.sink.sleep_until_end();
    }
}

impl AudioSink for RodioSink {
    fn has_free_slot(&self) -> bool {
        self.sink.len() < self.depth
    }

    fn queue_audio(&mut self, buffer: AudioBuffer) -> DecodeResult<()> {
        let samples = buffer.format.to_i16_samples(&buffer.data);
        log::debug!(
            "Queue audio: {} samples, rate={} ch={}",
            samples.len(),
            buffer.sample_rate,
            buffer.format.channels()
        );
        self.sink.append(SamplesBuffer::new(
            buffer.format.channels(),
            buffer.sample_rate,
            samples,
        ));
        Ok(())
    }
}
