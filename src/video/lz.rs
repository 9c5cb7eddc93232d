//! Bit/byte back-reference decompressor
//!
//! Used for keyframe images and for static resources. The stream mixes
//! 16-bit flag words with literal bytes:
//!
//! ```text
//! 1              literal byte follows
//! 0 0 b1 b0      short copy, len = b1b0 + 2, offset byte o -> o - 256
//! 0 1            long copy, u16 w: len = (w & 7) + 2,
//!                offset = (w >> 3) | 0xE000 as i16;
//!                w & 7 == 0 reads an extra length byte, 0 ends the stream
//! ```
//!
//! Flag words are fetched little-endian only when the previous word is used
//! up, so they sit between data bytes wherever the decoder happened to need
//! them. [`compress`] writes the same layout.

use super::{VideoError, VideoResult};

/// Longest back-reference distance the long form can express
pub const MAX_DISTANCE: usize = 0x2000;

/// Longest back-reference distance the short form can express
pub const MAX_SHORT_DISTANCE: usize = 0x100;

/// Shortest copy the format can express
pub const MIN_MATCH: usize = 2;

/// Longest copy the format can express (extra length byte 255, plus bias)
pub const MAX_MATCH: usize = 255 + MIN_MATCH;

/// Reads bytes and flag bits from the compressed input
struct BitReader<'a> {
    input: &'a [u8],
    pos: usize,
    queue: u16,
}

impl<'a> BitReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            queue: 0,
        }
    }

    fn byte(&mut self) -> VideoResult<u8> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or_else(|| VideoError::Corrupt("input exhausted before terminator".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn word(&mut self) -> VideoResult<u16> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn bit(&mut self) -> VideoResult<bool> {
        let mut bit = self.queue & 1;
        self.queue >>= 1;
        if self.queue == 0 {
            let word = self.word()?;
            bit = word & 1;
            self.queue = (word >> 1) | 0x8000;
        }
        Ok(bit != 0)
    }
}

/// Decompresses `input` into `output`, returning the number of bytes written
///
/// Decoding stops at the terminator; the output length is whatever the
/// terminator leaves behind. Exhausted input, a write past `output`, or a
/// reference before the start of `output` is reported as corruption.
pub fn decompress(input: &[u8], output: &mut [u8]) -> VideoResult<usize> {
    let mut reader = BitReader::new(input);
    let mut out = 0usize;

    loop {
        if reader.bit()? {
            let b = reader.byte()?;
            let slot = output
                .get_mut(out)
                .ok_or_else(|| VideoError::Corrupt("literal past end of output".into()))?;
            *slot = b;
            out += 1;
            continue;
        }

        let (len, distance) = if reader.bit()? {
            let w = reader.word()?;
            let mut len = (w & 7) as usize;
            let offset = ((w >> 3) | 0xE000) as i16;
            if len == 0 {
                len = reader.byte()? as usize;
                if len == 0 {
                    break;
                }
            }
            (len, -(offset as isize) as usize)
        } else {
            let mut len = reader.bit()? as usize;
            len = (len << 1) | reader.bit()? as usize;
            let offset = (0xFF00 | reader.byte()? as u16) as i16;
            (len, -(offset as isize) as usize)
        };

        let len = len + MIN_MATCH;
        if distance > out {
            return Err(VideoError::Corrupt(format!(
                "back-reference {} bytes before start (at {})",
                distance, out
            )));
        }
        if out + len > output.len() {
            return Err(VideoError::Corrupt(format!(
                "copy of {} bytes at {} exceeds output of {}",
                len,
                out,
                output.len()
            )));
        }
        // Overlapping copies repeat the pattern, so go byte by byte.
        for i in out..out + len {
            output[i] = output[i - distance];
        }
        out += len;
    }

    Ok(out)
}

/// Decompresses a resource whose size is only bounded, not known
pub fn decompress_to_vec(input: &[u8], max_len: usize) -> VideoResult<Vec<u8>> {
    let mut output = Vec::new();
    output
        .try_reserve_exact(max_len)
        .map_err(|_| VideoError::Alloc {
            what: "decompression buffer",
            bytes: max_len,
        })?;
    output.resize(max_len, 0);
    let len = decompress(input, &mut output)?;
    output.truncate(len);
    Ok(output)
}

// ============================================================================
// Encoder
// ============================================================================

/// Writes flag bits into reserved words between data bytes
struct BitWriter {
    out: Vec<u8>,
    word_pos: usize,
    bits_used: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            word_pos: 0,
            // Forces a fresh word on the first bit.
            bits_used: 16,
        }
    }

    fn bit(&mut self, set: bool) {
        if self.bits_used == 16 {
            self.word_pos = self.out.len();
            self.out.extend_from_slice(&[0, 0]);
            self.bits_used = 0;
        }
        if set {
            let mask = 1u16 << self.bits_used;
            let word = u16::from_le_bytes([self.out[self.word_pos], self.out[self.word_pos + 1]]) | mask;
            self.out[self.word_pos..self.word_pos + 2].copy_from_slice(&word.to_le_bytes());
        }
        self.bits_used += 1;
    }

    fn byte(&mut self, b: u8) {
        self.out.push(b);
    }

    fn word(&mut self, w: u16) {
        self.out.extend_from_slice(&w.to_le_bytes());
    }
}

fn longest_match(input: &[u8], pos: usize) -> (usize, usize) {
    let max_len = MAX_MATCH.min(input.len() - pos);
    let mut best = (0usize, 0usize);
    if max_len < MIN_MATCH {
        return best;
    }
    let window = pos.saturating_sub(MAX_DISTANCE);
    for start in (window..pos).rev() {
        let len = input[pos..pos + max_len]
            .iter()
            .enumerate()
            .take_while(|&(i, b)| input[start + i] == *b)
            .count();
        if len > best.0 {
            best = (len, pos - start);
            if len == max_len {
                break;
            }
        }
    }
    best
}

/// Compresses `input` into the format read by [`decompress`]
///
/// Greedy longest-match encoder; it exists so streams and resources can be
/// authored, not for ratio.
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut w = BitWriter::new();
    let mut pos = 0usize;

    while pos < input.len() {
        let (len, distance) = longest_match(input, pos);
        let short_ok = len >= MIN_MATCH && distance <= MAX_SHORT_DISTANCE;
        let long_ok = len > MIN_MATCH;

        if short_ok && (len <= 5 || !long_ok) {
            let len = len.min(5);
            let code = len - MIN_MATCH;
            w.bit(false);
            w.bit(false);
            w.bit(code & 2 != 0);
            w.bit(code & 1 != 0);
            w.byte((MAX_SHORT_DISTANCE - distance) as u8);
            pos += len;
        } else if long_ok {
            let code = len - MIN_MATCH;
            let field = ((MAX_DISTANCE - distance) as u16) << 3;
            w.bit(false);
            w.bit(true);
            if code <= 7 {
                w.word(field | code as u16);
            } else {
                w.word(field);
                w.byte(code as u8);
            }
            pos += len;
        } else {
            w.bit(true);
            w.byte(input[pos]);
            pos += 1;
        }
    }

    w.bit(false);
    w.bit(true);
    w.word(0);
    w.byte(0);
    w.out
}
