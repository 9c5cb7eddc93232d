//! Random-access byte sources for stream data.

use std::io::{self, Read, Seek, SeekFrom};

/// Random-access reader yielding `buf.len()` bytes at an offset
///
/// Implemented for every `Read + Seek`, so both `File` and
/// `Cursor<Vec<u8>>` can back a stream.
pub trait ByteSource {
    /// Total length of the source in bytes
    fn len(&mut self) -> io::Result<u64>;

    /// Fills `buf` completely from `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl<T: Read + Seek> ByteSource for T {
    fn len(&mut self) -> io::Result<u64> {
        let here = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(here))?;
        Ok(end)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }
}
