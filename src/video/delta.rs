//! Delta ("IU") frame decoding
//!
//! A delta payload rewrites the new frame buffer, which still holds the
//! frame before the previous one, using the previous frame and already
//! written parts of itself as copy sources. Two layouts exist: interlaced
//! pixel pairs and progressive scanline pairs.

use super::{VideoError, VideoResult};

/// Sequential reader over a delta payload
struct OpReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> OpReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn byte(&mut self) -> VideoResult<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| VideoError::Corrupt("delta payload truncated".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn word(&mut self) -> VideoResult<u16> {
        Ok(u16::from_le_bytes([self.byte()?, self.byte()?]))
    }
}

fn out_of_range(what: &str, index: isize, len: usize) -> VideoError {
    VideoError::Corrupt(format!("{} index {} outside frame of {}", what, index, len))
}

/// Checks that `count` bytes from `start` lie inside a buffer of `len`
fn check_span(what: &str, start: isize, count: usize, len: usize) -> VideoResult<()> {
    if start < 0 || start as usize + count > len {
        return Err(out_of_range(what, start, len));
    }
    Ok(())
}

/// Applies an interlaced delta payload
///
/// # Arguments
///
/// * `payload` - Chunk payload
/// * `cur` - New frame buffer, rewritten in place
/// * `prev` - Previous frame buffer
/// * `width` - Frame width in pixels
pub fn decode_interlaced(payload: &[u8], cur: &mut [u8], prev: &[u8], width: usize) -> VideoResult<()> {
    let len = cur.len();
    let line_pair = 2 * width as isize;
    let mut ops = OpReader::new(payload);
    let mut w = 0usize;

    while !ops.at_end() {
        let b = ops.byte()?;
        let count = (b & 0x1F) as usize;

        if count == 0 {
            match b >> 5 {
                0 => {
                    check_span("write", w as isize, 2, len)?;
                    cur[w] = ops.byte()?;
                    cur[w + 1] = ops.byte()?;
                    w += 2;
                }
                1 => w += 2 * ops.byte()? as usize,
                2 => w += 2 * ops.word()? as usize,
                3 => {
                    let n = 2 * ops.byte()? as usize;
                    let value = ops.byte()?;
                    check_span("fill", w as isize, n, len)?;
                    cur[w..w + n].fill(value);
                    w += n;
                }
                _ => break,
            }
            if w > len {
                return Err(out_of_range("skip", w as isize, len));
            }
            continue;
        }

        let from_prev = b & 0x20 != 0;
        let backline = b & 0x40 != 0;
        let backward = b & 0x80 != 0;
        let v = ops.word()?;
        let swap = v & 1 != 0;
        let mut src = w as isize + 2 * ((v >> 1) & 0x7FFF) as isize - 0x8000;

        check_span("copy destination", w as isize, 2 * count, len)?;

        for _ in 0..count {
            let (first, second) = if backline {
                (src - line_pair + 1, src)
            } else {
                (src, src + 1)
            };
            check_span("copy source", first, 1, len)?;
            check_span("copy source", second, 1, len)?;
            let (a, c) = if from_prev {
                (prev[first as usize], prev[second as usize])
            } else {
                (cur[first as usize], cur[second as usize])
            };
            // each pair lands swapped before the next one is read
            if swap {
                cur[w] = c;
                cur[w + 1] = a;
            } else {
                cur[w] = a;
                cur[w + 1] = c;
            }
            w += 2;
            src += 2;
            if backward {
                src -= 4;
            }
        }
    }

    Ok(())
}

/// Applies a progressive delta payload
///
/// Every operation writes two scanlines at once: the cursor position and
/// the pixel one row below it.
pub fn decode_progressive(payload: &[u8], cur: &mut [u8], prev: &[u8], width: usize) -> VideoResult<()> {
    let len = cur.len();
    let mut ops = OpReader::new(payload);
    let mut w = 0usize;

    while !ops.at_end() {
        let b = ops.byte()?;
        let count = (b & 0x3F) as usize;

        if count == 0 {
            match b >> 6 {
                0 => w += ops.byte()? as usize,
                1 => {
                    check_span("write", (w + width) as isize, 1, len)?;
                    cur[w] = ops.byte()?;
                    cur[w + width] = ops.byte()?;
                    w += 1;
                }
                2 => w += width,
                _ => break,
            }
            if w > len {
                return Err(out_of_range("skip", w as isize, len));
            }
            continue;
        }

        let from_prev = b & 0x40 != 0;
        let mut src = w as isize + ops.word()? as isize;
        if b & 0x80 != 0 {
            src -= 0x10000;
        }

        check_span("copy source", src, width + count, len)?;
        check_span("copy destination", w as isize, width + count, len)?;

        let mut src = src as usize;
        for _ in 0..count {
            if from_prev {
                cur[w] = prev[src];
                cur[w + width] = prev[src + width];
            } else {
                cur[w] = cur[src];
                cur[w + width] = cur[src + width];
            }
            w += 1;
            src += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 8;
    const H: usize = 4;

    fn frames() -> (Vec<u8>, Vec<u8>) {
        let prev: Vec<u8> = (0..(W * H) as u8).collect();
        (vec![0u8; W * H], prev)
    }

    /// Encodes a source index relative to the cursor the way the copy op expects
    fn rel(w: usize, src: usize, swap: bool) -> [u8; 2] {
        let v = (((src as isize - w as isize + 0x8000) / 2) as u16) << 1 | swap as u16;
        v.to_le_bytes()
    }

    #[test]
    fn test_interlaced_literal_skip_fill() {
        let (mut cur, prev) = frames();
        // literal pair, skip 1 pair, fill 2 pairs with 9, end
        let payload = [0x00, 0xAA, 0xBB, 0x20, 0x01, 0x60, 0x02, 0x09, 0xE0];
        decode_interlaced(&payload, &mut cur, &prev, W).unwrap();
        assert_eq!(&cur[..8], &[0xAA, 0xBB, 0, 0, 9, 9, 9, 9]);
    }

    #[test]
    fn test_interlaced_copy_from_previous() {
        let (mut cur, prev) = frames();
        let mut payload = vec![0x20 | 3];
        payload.extend_from_slice(&rel(0, 10, false));
        decode_interlaced(&payload, &mut cur, &prev, W).unwrap();
        assert_eq!(&cur[..6], &[10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_interlaced_copy_swapped() {
        let (mut cur, prev) = frames();
        let mut payload = vec![0x20 | 2];
        payload.extend_from_slice(&rel(0, 4, true));
        decode_interlaced(&payload, &mut cur, &prev, W).unwrap();
        assert_eq!(&cur[..4], &[5, 4, 7, 6]);
    }

    #[test]
    fn test_interlaced_copy_backward_backline() {
        let (mut cur, prev) = frames();
        // move the cursor to the second line pair, then copy 2 pairs walking back
        let mut payload = vec![0x20, 8];
        payload.push(0x20 | 0x40 | 0x80 | 2);
        payload.extend_from_slice(&rel(16, 20, false));
        decode_interlaced(&payload, &mut cur, &prev, W).unwrap();
        // pair 1: (20 - 16 + 1, 20), pair 2: (18 - 16 + 1, 18)
        assert_eq!(&cur[16..20], &[5, 20, 3, 18]);
    }

    #[test]
    fn test_interlaced_copy_from_current_overlaps() {
        let (mut cur, prev) = frames();
        let mut payload = vec![0x00, 1, 2];
        payload.push(3);
        payload.extend_from_slice(&rel(2, 0, false));
        decode_interlaced(&payload, &mut cur, &prev, W).unwrap();
        assert_eq!(&cur[..8], &[1, 2, 1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn test_interlaced_swapped_copy_reads_swapped_pairs() {
        let (mut cur, prev) = frames();
        let mut payload = vec![0x00, 1, 2];
        payload.push(2);
        payload.extend_from_slice(&rel(2, 0, true));
        decode_interlaced(&payload, &mut cur, &prev, W).unwrap();
        // the second pair copies the first one after it was swapped
        assert_eq!(&cur[..6], &[1, 2, 2, 1, 1, 2]);
    }

    #[test]
    fn test_interlaced_source_out_of_range() {
        let (mut cur, prev) = frames();
        let mut payload = vec![0x20 | 1];
        payload.extend_from_slice(&rel(0, 40, false));
        assert!(matches!(
            decode_interlaced(&payload, &mut cur, &prev, W),
            Err(VideoError::Corrupt(_))
        ));
    }

    #[test]
    fn test_interlaced_skip_past_end() {
        let (mut cur, prev) = frames();
        let payload = [0x40, 0xFF, 0x00];
        assert!(decode_interlaced(&payload, &mut cur, &prev, W).is_err());
    }

    #[test]
    fn test_interlaced_truncated() {
        let (mut cur, prev) = frames();
        assert!(decode_interlaced(&[0x00, 0x01], &mut cur, &prev, W).is_err());
    }

    #[test]
    fn test_progressive_ops() {
        let (mut cur, prev) = frames();
        // skip 2, write pair, copy 3 columns from previous at +4, end
        let payload = [0x00, 0x02, 0x40, 0x11, 0x22, 0x40 | 3, 0x04, 0x00, 0xC0];
        decode_progressive(&payload, &mut cur, &prev, W).unwrap();
        assert_eq!(cur[2], 0x11);
        assert_eq!(cur[2 + W], 0x22);
        assert_eq!(&cur[3..6], &prev[7..10]);
        assert_eq!(&cur[3 + W..6 + W], &prev[7 + W..10 + W]);
    }

    #[test]
    fn test_progressive_skip_line_and_negative_source() {
        let (mut cur, prev) = frames();
        cur[..W].copy_from_slice(&[9; W]);
        cur[W..2 * W].copy_from_slice(&[8; W]);
        // skip two lines, copy 2 columns from current at -(2 * W) via the 0x80 form
        let rel = (0x10000 - 2 * W) as u16;
        let mut payload = vec![0x80, 0x80, 0x80 | 2];
        payload.extend_from_slice(&rel.to_le_bytes());
        decode_progressive(&payload, &mut cur, &prev, W).unwrap();
        assert_eq!(&cur[2 * W..2 * W + 2], &[9, 9]);
        assert_eq!(&cur[3 * W..3 * W + 2], &[8, 8]);
    }

    #[test]
    fn test_progressive_out_of_range() {
        let (mut cur, prev) = frames();
        let payload = [0x40 | 2, 0x00, 0x01];
        assert!(decode_progressive(&payload, &mut cur, &prev, W).is_err());
    }
}
