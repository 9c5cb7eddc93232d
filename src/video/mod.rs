//! Video subsystem for HNM cutscene streams
//!
//! This module provides the container, codecs and playback scheduler for
//! the HNM (.hnm) format used for pre-rendered full-motion video.
//!
//! # HNM Format
//!
//! An HNM stream is a single file:
//! - a 64-byte header with dimensions, frame count and read-buffer size
//! - a sequence of frame blocks, each prefixed by a 24-bit block size
//! - inside each block, tagged chunks (`PL`, `IZ`, `IU`, `sd`/`SD`, ...)
//!
//! # Example
//!
//! ```
//! use hnm_rust::video::{HnmHeader, DEFAULT_FRAME_RATE};
//!
//! // Calculate stream duration
//! fn stream_duration(header: &HnmHeader) -> f32 {
//!     header.frame_count as f32 / DEFAULT_FRAME_RATE
//! }
//! ```

pub mod delta;
pub mod demux;
pub mod frame;
pub mod lz;
pub mod palette;
pub mod player;
pub mod source;

use std::io;

use crate::sound::{AudioFormat, DecodeError};

// ============================================================================
// Constants
// ============================================================================

/// Frame rate used when neither configuration nor header provide one
pub const DEFAULT_FRAME_RATE: f32 = 12.5;

/// Size of the stream header in bytes
pub const HNM_HEADER_SIZE: usize = 64;

/// Slack added to the header's declared buffer size
pub const HNM_BUFFER_SLACK: usize = 4096;

/// Size of a chunk header (length word, tag, two flag bytes)
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Mask applied to length words of frame blocks and chunks
pub const LENGTH_MASK: u32 = 0x00FF_FFFF;

/// Lateness (ms) beyond which audio sync is dropped for a frame
pub const DEFAULT_SYNC_THRESHOLD_MS: u32 = 1000;

/// Default depth of the decoded sound ring
pub const DEFAULT_SOUND_BUFFERS: usize = 5;

/// Default output rate for stream audio
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

// ============================================================================
// Error Types
// ============================================================================

/// Broad classes of playback failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Playback of the current stream must stop; no retry
    StreamFatal,
    /// Buffers could not be set up; nothing was decoded
    ResourceFatal,
}

/// Errors that can occur during stream playback
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// Invalid or corrupted container structure
    #[error("Bad file: {0}")]
    BadFile(String),

    /// Stream ended in the middle of a structure
    #[error("Unexpected end of stream")]
    Eof,

    /// Data does not fit in the buffer it must be decoded into
    #[error("Buffer overflow: {0}")]
    OutOfBuffer(String),

    /// Compressed image data is malformed
    #[error("Corrupt image data: {0}")]
    Corrupt(String),

    /// Bitstream variant this player does not implement
    #[error("Unsupported bitstream: {0}")]
    Unsupported(String),

    /// Frame or sound buffers could not be allocated
    #[error("Failed to allocate {what} ({bytes} bytes)")]
    Alloc { what: &'static str, bytes: usize },

    /// Audio codec failure
    #[error("Audio decode failed: {0}")]
    Audio(#[from] DecodeError),

    /// A collaborator (presenter or audio output) refused the data
    #[error("Output failed: {0}")]
    Output(String),

    /// I/O error from the byte source
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VideoError {
    /// Classifies the error for the caller of the playback entry point
    pub fn kind(&self) -> ErrorKind {
        match self {
            VideoError::Alloc { .. } => ErrorKind::ResourceFatal,
            _ => ErrorKind::StreamFatal,
        }
    }
}

pub type VideoResult<T> = Result<T, VideoError>;

// ============================================================================
// HNM Header
// ============================================================================

/// Header information from the first 64 bytes of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnmHeader {
    /// Four-character signature (not validated)
    pub signature: [u8; 4],
    /// Bits per pixel as declared (always 8 in practice)
    pub bpp: u8,
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
    /// Declared file size
    pub file_size: u32,
    /// Number of frames to present
    pub frame_count: u32,
    /// Declared playback speed; zero when absent
    pub speed: i16,
    /// Size of the largest frame block, including slack
    pub buffer_size: usize,
    /// Copyright text, NUL padded
    pub copyright: [u8; 16],
}

impl HnmHeader {
    /// Parses a header from raw little-endian bytes
    ///
    /// # Returns
    ///
    /// * `Ok(HnmHeader)` - Parsed header
    /// * `Err(VideoError::BadFile)` - If data is too short or dimensions are invalid
    pub fn from_bytes(data: &[u8]) -> VideoResult<Self> {
        if data.len() < HNM_HEADER_SIZE {
            return Err(VideoError::BadFile(format!(
                "Header too short: {} bytes, expected {}",
                data.len(),
                HNM_HEADER_SIZE
            )));
        }

        let signature = [data[0], data[1], data[2], data[3]];
        let bpp = data[7];
        let width = u16::from_le_bytes([data[8], data[9]]);
        let height = u16::from_le_bytes([data[10], data[11]]);
        let file_size = i32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        let frame_count = i32::from_le_bytes([data[16], data[17], data[18], data[19]]);
        let speed = i16::from_le_bytes([data[24], data[25]]);
        let buffer_size = i32::from_le_bytes([data[28], data[29], data[30], data[31]]);

        if width == 0 || height == 0 {
            return Err(VideoError::BadFile(format!(
                "Invalid dimensions {}x{}",
                width, height
            )));
        }
        if frame_count < 0 || buffer_size < 0 {
            return Err(VideoError::BadFile(format!(
                "Negative frame count ({}) or buffer size ({})",
                frame_count, buffer_size
            )));
        }

        let mut copyright = [0u8; 16];
        copyright.copy_from_slice(&data[48..64]);

        Ok(Self {
            signature,
            bpp,
            width,
            height,
            file_size: file_size.max(0) as u32,
            frame_count: frame_count as u32,
            speed,
            buffer_size: buffer_size as usize + HNM_BUFFER_SLACK,
            copyright,
        })
    }

    /// Number of pixels in one frame
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Frame rate declared by the header, if any
    pub fn declared_rate(&self) -> Option<f32> {
        (self.speed > 0).then_some(self.speed as f32)
    }
}

// ============================================================================
// Player configuration
// ============================================================================

/// How image chunks are laid out in the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterlaceMode {
    /// Follow bit 0 of each image chunk's first flag byte
    #[default]
    Auto,
    /// Treat every image as interlaced pixel pairs
    Interlaced,
    /// Treat every image as progressive scanlines
    Progressive,
}

impl InterlaceMode {
    /// Resolves the layout of one image chunk from its flag byte
    pub fn is_interlaced(self, flags: u8) -> bool {
        match self {
            InterlaceMode::Auto => flags & 1 == 0,
            InterlaceMode::Interlaced => true,
            InterlaceMode::Progressive => false,
        }
    }
}

/// Codec used for `sd`/`SD` chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioCodec {
    /// Payload is PCM in [`PlayerConfig::raw_format`]
    Raw,
    /// Payload is predictive delta indices against a per-stream table
    #[default]
    Adpcm,
}

/// Process-wide codec and scheduler configuration
///
/// Set once before a stream is opened; not mutated during playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub interlace: InterlaceMode,
    /// Force palette index 0 to black
    pub preserve_color0: bool,
    /// Force palette index 0 to white and 255 to black
    pub mac_palette: bool,
    /// Sub-range pushed to the presenter after a palette update: (first, count)
    pub palette_range: Option<(u8, u16)>,
    pub use_sound: bool,
    pub audio_codec: AudioCodec,
    pub raw_format: AudioFormat,
    pub sample_rate: u32,
    pub sound_buffers: usize,
    /// Overrides the header speed when set
    pub frame_rate: Option<f32>,
    pub sync_threshold_ms: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            interlace: InterlaceMode::Auto,
            preserve_color0: false,
            mac_palette: false,
            palette_range: None,
            use_sound: true,
            audio_codec: AudioCodec::Adpcm,
            raw_format: AudioFormat::Mono8,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sound_buffers: DEFAULT_SOUND_BUFFERS,
            frame_rate: None,
            sync_threshold_ms: DEFAULT_SYNC_THRESHOLD_MS,
        }
    }
}

impl PlayerConfig {
    /// Frame rate for a stream: configuration, then header, then default
    pub fn effective_rate(&self, header: &HnmHeader) -> f32 {
        self.frame_rate
            .filter(|r| *r > 0.0)
            .or_else(|| header.declared_rate())
            .unwrap_or(DEFAULT_FRAME_RATE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn header_bytes(width: u16, height: u16, frames: i32, buffer: i32) -> Vec<u8> {
        let mut data = vec![0u8; HNM_HEADER_SIZE];
        data[0..4].copy_from_slice(b"HNM1");
        data[7] = 8;
        data[8..10].copy_from_slice(&width.to_le_bytes());
        data[10..12].copy_from_slice(&height.to_le_bytes());
        data[16..20].copy_from_slice(&frames.to_le_bytes());
        data[28..32].copy_from_slice(&buffer.to_le_bytes());
        data[48..56].copy_from_slice(b"(C) CRYO");
        data
    }

    #[test]
    fn test_video_error_display() {
        assert_eq!(
            VideoError::BadFile("intro.hnm".into()).to_string(),
            "Bad file: intro.hnm"
        );
        assert_eq!(VideoError::Eof.to_string(), "Unexpected end of stream");
        assert_eq!(
            VideoError::Alloc {
                what: "frame buffer",
                bytes: 64000
            }
            .to_string(),
            "Failed to allocate frame buffer (64000 bytes)"
        );
    }

    #[test]
    fn test_error_kind() {
        let alloc = VideoError::Alloc {
            what: "sound ring",
            bytes: 1,
        };
        assert_eq!(alloc.kind(), ErrorKind::ResourceFatal);
        assert_eq!(VideoError::Eof.kind(), ErrorKind::StreamFatal);
        assert_eq!(
            VideoError::Corrupt("x".into()).kind(),
            ErrorKind::StreamFatal
        );
    }

    #[test]
    fn test_video_error_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let video_err: VideoError = io_err.into();
        assert!(matches!(video_err, VideoError::Io(_)));
    }

    #[test]
    fn test_header_from_bytes() {
        let mut data = header_bytes(320, 200, 42, 30000);
        data[24..26].copy_from_slice(&15i16.to_le_bytes());

        let header = HnmHeader::from_bytes(&data).unwrap();
        assert_eq!(&header.signature, b"HNM1");
        assert_eq!(header.width, 320);
        assert_eq!(header.height, 200);
        assert_eq!(header.frame_count, 42);
        assert_eq!(header.buffer_size, 30000 + HNM_BUFFER_SLACK);
        assert_eq!(header.pixel_count(), 64000);
        assert_eq!(header.declared_rate(), Some(15.0));
        assert_eq!(&header.copyright[..8], b"(C) CRYO");
    }

    #[test]
    fn test_header_too_short() {
        let result = HnmHeader::from_bytes(&[0u8; 10]);
        assert!(matches!(result, Err(VideoError::BadFile(_))));
    }

    #[test]
    fn test_header_zero_dimensions() {
        let data = header_bytes(0, 200, 1, 100);
        assert!(matches!(
            HnmHeader::from_bytes(&data),
            Err(VideoError::BadFile(_))
        ));
    }

    #[test]
    fn test_header_negative_frame_count() {
        let data = header_bytes(8, 8, -1, 100);
        assert!(HnmHeader::from_bytes(&data).is_err());
    }

    #[test]
    fn test_interlace_mode() {
        assert!(InterlaceMode::Auto.is_interlaced(0));
        assert!(!InterlaceMode::Auto.is_interlaced(1));
        assert!(InterlaceMode::Interlaced.is_interlaced(1));
        assert!(!InterlaceMode::Progressive.is_interlaced(0));
    }

    #[test]
    fn test_effective_rate() {
        let mut data = header_bytes(8, 8, 1, 100);
        let header = HnmHeader::from_bytes(&data).unwrap();
        let mut config = PlayerConfig::default();
        assert_eq!(config.effective_rate(&header), DEFAULT_FRAME_RATE);

        data[24..26].copy_from_slice(&10i16.to_le_bytes());
        let header = HnmHeader::from_bytes(&data).unwrap();
        assert_eq!(config.effective_rate(&header), 10.0);

        config.frame_rate = Some(25.0);
        assert_eq!(config.effective_rate(&header), 25.0);
    }
}
