//! Sound decoding and output for stream audio
//!
//! # Architecture
//!
//! - `SoundDecoder` trait turns one sound chunk payload into PCM
//! - `RawDecoder` and `AdpcmDecoder` are the two chunk codecs
//! - `SoundQueue` holds decoded buffers until playback starts
//! - `AudioSink` is the output side; `NullSink` discards, `RodioSink`
//!   (feature `rodio_output`) plays on the default device

pub mod adpcm;
pub mod decoder;
pub mod formats;
pub mod null;
pub mod queue;
pub mod raw;
#[cfg(feature = "rodio_output")]
pub mod rodio_audio;

pub use adpcm::{AdpcmDecoder, DeltaTable};
pub use decoder::{DecodeError, DecodeResult, SoundDecoder};
pub use formats::AudioFormat;
pub use null::NullSink;
pub use queue::{AudioBuffer, AudioSink, SoundQueue};
pub use raw::RawDecoder;
#[cfg(feature = "rodio_output")]
pub use rodio_audio::RodioSink;
