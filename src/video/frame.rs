//! Frame buffer set for one stream
//!
//! Two working buffers alternate as "new" and "old" each frame; the final
//! buffer holds what is lent to the presenter.

use super::delta;
use super::lz;
use super::{VideoError, VideoResult};

/// Bytes at the start of a keyframe payload before the LZ stream
pub const KEYFRAME_SUBHEADER: usize = 4;

fn alloc(what: &'static str, bytes: usize) -> VideoResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| VideoError::Alloc { what, bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

/// Working and presentation buffers for one stream
#[derive(Debug)]
pub struct FrameBuffers {
    width: usize,
    height: usize,
    work: [Vec<u8>; 2],
    final_frame: Vec<u8>,
    /// Index of the working buffer playing "new" this frame
    current: usize,
}

impl FrameBuffers {
    /// Allocates zeroed buffers for a `width` x `height` stream
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::Alloc)` - If any buffer cannot be reserved
    pub fn new(width: u16, height: u16) -> VideoResult<Self> {
        let pixels = width as usize * height as usize;
        Ok(Self {
            width: width as usize,
            height: height as usize,
            work: [alloc("frame buffer", pixels)?, alloc("frame buffer", pixels)?],
            final_frame: alloc("final frame buffer", pixels)?,
            current: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Zeroes every buffer
    pub fn clear(&mut self) {
        for buf in self.work.iter_mut() {
            buf.fill(0);
        }
        self.final_frame.fill(0);
        self.current = 0;
    }

    /// Selects the working buffers for the image with index `image_num`
    pub fn select(&mut self, image_num: u32) {
        self.current = (image_num % 2) as usize;
    }

    /// Buffer written by this frame's image chunk
    pub fn new_frame(&self) -> &[u8] {
        &self.work[self.current]
    }

    /// Buffer holding the previous frame
    pub fn old_frame(&self) -> &[u8] {
        &self.work[1 - self.current]
    }

    /// Buffer lent to the presenter
    pub fn final_frame(&self) -> &[u8] {
        &self.final_frame
    }

    fn split(&mut self) -> (&mut [u8], &mut [u8]) {
        let (a, b) = self.work.split_at_mut(1);
        if self.current == 0 {
            (a[0].as_mut_slice(), b[0].as_mut_slice())
        } else {
            (b[0].as_mut_slice(), a[0].as_mut_slice())
        }
    }

    /// Decodes a keyframe payload into both working buffers
    pub fn apply_keyframe(&mut self, payload: &[u8], interlaced: bool) -> VideoResult<()> {
        let data = payload.get(KEYFRAME_SUBHEADER..).ok_or_else(|| {
            VideoError::Corrupt(format!("keyframe payload of {} bytes", payload.len()))
        })?;
        let (new, old) = self.split();
        lz::decompress(data, new)?;
        old.copy_from_slice(new);
        self.finish(interlaced);
        Ok(())
    }

    /// Applies a delta payload to the new buffer against the old one
    pub fn apply_delta(&mut self, payload: &[u8], interlaced: bool) -> VideoResult<()> {
        let width = self.width;
        let (new, old) = self.split();
        if interlaced {
            delta::decode_interlaced(payload, new, old, width)?;
        } else {
            delta::decode_progressive(payload, new, old, width)?;
        }
        self.finish(interlaced);
        Ok(())
    }

    /// Produces the final buffer from the new one
    fn finish(&mut self, interlaced: bool) {
        let new = &self.work[self.current];
        if interlaced {
            deinterlace(new, &mut self.final_frame, self.width, self.height);
        } else {
            self.final_frame.copy_from_slice(new);
        }
    }
}

/// Reorders pixel pairs into scanlines
///
/// Each pair of rows is stored as `width` pairs, the even row's pixel first.
/// An odd last row is left untouched.
pub fn deinterlace(src: &[u8], dst: &mut [u8], width: usize, height: usize) {
    for pair in 0..height / 2 {
        let base = pair * 2 * width;
        let (even, odd) = dst[base..base + 2 * width].split_at_mut(width);
        for (x, px) in src[base..base + 2 * width].chunks_exact(2).enumerate() {
            even[x] = px[0];
            odd[x] = px[1];
        }
    }
}
