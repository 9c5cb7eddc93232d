//! Frame block and chunk demultiplexing
//!
//! After the 64-byte header the stream is a run of frame blocks. Each block
//! starts with a length word and holds tagged chunks:
//!
//! ```text
//! block: [u32 size incl. prefix, low 24 bits] [chunks...]
//! chunk: [u32 len incl. header, low 24 bits] [tag: 2 bytes] [h6] [h7] [payload]
//! ```
//!
//! A zero block size ends the stream; a zero chunk length ends the block.

use std::io;

use super::source::ByteSource;
use super::{HnmHeader, VideoError, VideoResult, CHUNK_HEADER_SIZE, HNM_HEADER_SIZE, LENGTH_MASK};

/// Size of the frame block length prefix
pub const BLOCK_PREFIX_SIZE: usize = 4;

/// Chunk types the player understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    /// `PL`
    Palette,
    /// `IZ`
    Keyframe,
    /// `IU`
    Delta,
    /// `sd` or `SD`
    Sound,
    /// Anything else, passed to the application hook
    Unknown([u8; 2]),
}

impl ChunkTag {
    pub fn from_bytes(tag: [u8; 2]) -> Self {
        match &tag {
            b"PL" => ChunkTag::Palette,
            b"IZ" => ChunkTag::Keyframe,
            b"IU" => ChunkTag::Delta,
            b"sd" | b"SD" => ChunkTag::Sound,
            _ => ChunkTag::Unknown(tag),
        }
    }

    /// Whether this chunk carries the frame's image
    pub fn is_image(self) -> bool {
        matches!(self, ChunkTag::Keyframe | ChunkTag::Delta)
    }
}

/// One chunk borrowed from the current frame block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: ChunkTag,
    /// Tag bytes as stored
    pub raw_tag: [u8; 2],
    /// Flag bytes `h6` and `h7`
    pub flags: [u8; 2],
    pub payload: &'a [u8],
}

impl Chunk<'_> {
    /// Total length including the header
    pub fn len(&self) -> usize {
        self.payload.len() + CHUNK_HEADER_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Printable tag for log messages
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.raw_tag).into_owned()
    }
}

/// Iterator over the chunks of one frame block
///
/// Always advances by the declared chunk length, whatever the tag.
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    block: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ChunkIter<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            block,
            pos: 0,
            done: false,
        }
    }

    /// Offset of the next chunk within the block
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_chunk(&mut self) -> VideoResult<Option<Chunk<'a>>> {
        let rest = &self.block[self.pos..];
        if rest.len() < 4 {
            return Ok(None);
        }
        let word = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let len = (word & LENGTH_MASK) as usize;
        if len == 0 {
            return Ok(None);
        }
        if len < CHUNK_HEADER_SIZE || len > rest.len() {
            return Err(VideoError::BadFile(format!(
                "chunk length {} at block offset {} (block has {} bytes left)",
                len,
                self.pos,
                rest.len()
            )));
        }

        let raw_tag = [rest[4], rest[5]];
        let chunk = Chunk {
            tag: ChunkTag::from_bytes(raw_tag),
            raw_tag,
            flags: [rest[6], rest[7]],
            payload: &rest[CHUNK_HEADER_SIZE..len],
        };
        self.pos += len;
        Ok(Some(chunk))
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = VideoResult<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn map_eof(e: io::Error) -> VideoError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        VideoError::Eof
    } else {
        VideoError::Io(e)
    }
}

/// Reads the header and frame blocks of one stream
pub struct Demuxer<S> {
    source: S,
    header: HnmHeader,
    source_len: u64,
    pos: u64,
    block: Vec<u8>,
    block_len: usize,
    frames_read: u32,
    finished: bool,
}

impl<S: ByteSource> Demuxer<S> {
    /// Reads the stream header and allocates the block buffer
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::BadFile)` - If the header is short or invalid
    /// * `Err(VideoError::Alloc)` - If the block buffer cannot be reserved
    pub fn open(mut source: S) -> VideoResult<Self> {
        let source_len = source.len()?;
        let mut raw = [0u8; HNM_HEADER_SIZE];
        source.read_at(0, &mut raw).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => VideoError::BadFile(format!(
                "stream of {} bytes has no header",
                source_len
            )),
            _ => VideoError::Io(e),
        })?;
        let header = HnmHeader::from_bytes(&raw)?;

        // no block can be larger than the source itself
        let capacity = header
            .buffer_size
            .min(usize::try_from(source_len).unwrap_or(usize::MAX));
        let mut block = Vec::new();
        block
            .try_reserve_exact(capacity)
            .map_err(|_| VideoError::Alloc {
                what: "frame block buffer",
                bytes: capacity,
            })?;
        block.resize(capacity, 0);

        log::info!(
            "Opened HNM stream: {}x{}, {} frames, buffer {} bytes",
            header.width,
            header.height,
            header.frame_count,
            header.buffer_size
        );

        Ok(Self {
            source,
            header,
            source_len,
            pos: HNM_HEADER_SIZE as u64,
            block,
            block_len: 0,
            frames_read: 0,
            finished: false,
        })
    }

    pub fn header(&self) -> &HnmHeader {
        &self.header
    }

    /// Frame blocks read since open or the last rewind
    pub fn frames_read(&self) -> u32 {
        self.frames_read
    }

    /// Whether the end-of-stream marker has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reads the next frame block
    ///
    /// # Returns
    ///
    /// * `Ok(Some(chunks))` - Chunks of the next frame
    /// * `Ok(None)` - A zero block size or the end of the source was reached
    pub fn read_frame(&mut self) -> VideoResult<Option<ChunkIter<'_>>> {
        if self.finished {
            return Ok(None);
        }
        if self.pos >= self.source_len {
            log::debug!("Stream ends without terminator after {} frames", self.frames_read);
            self.finished = true;
            return Ok(None);
        }

        let mut prefix = [0u8; BLOCK_PREFIX_SIZE];
        self.source.read_at(self.pos, &mut prefix).map_err(map_eof)?;
        let size = (u32::from_le_bytes(prefix) & LENGTH_MASK) as usize;
        if size == 0 {
            self.finished = true;
            return Ok(None);
        }
        if size < BLOCK_PREFIX_SIZE {
            return Err(VideoError::BadFile(format!(
                "frame block of {} bytes at offset {}",
                size, self.pos
            )));
        }
        if size > self.header.buffer_size {
            return Err(VideoError::OutOfBuffer(format!(
                "frame block of {} bytes exceeds buffer of {}",
                size, self.header.buffer_size
            )));
        }

        let body = size - BLOCK_PREFIX_SIZE;
        if body > self.block.len() {
            log::debug!("Frame block of {} bytes runs past the end of the source", size);
            return Err(VideoError::Eof);
        }
        self.source
            .read_at(self.pos + BLOCK_PREFIX_SIZE as u64, &mut self.block[..body])
            .map_err(map_eof)?;
        self.pos += size as u64;
        self.block_len = body;
        self.frames_read += 1;
        Ok(Some(ChunkIter::new(&self.block[..self.block_len])))
    }

    /// Returns to the first frame block
    pub fn rewind(&mut self) {
        self.pos = HNM_HEADER_SIZE as u64;
        self.block_len = 0;
        self.frames_read = 0;
        self.finished = false;
    }

    /// Gives the byte source back
    pub fn into_inner(self) -> S {
        self.source
    }
}
