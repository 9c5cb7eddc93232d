//! Builders for synthetic HNM streams used by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use hnm_rust::sound::{AudioBuffer, AudioSink, DecodeResult};
use hnm_rust::time::{Clock, ManualClock};
use hnm_rust::video::lz;
use hnm_rust::video::palette::Palette;
use hnm_rust::video::player::Presenter;
use hnm_rust::video::{VideoResult, CHUNK_HEADER_SIZE, HNM_HEADER_SIZE};

/// Assembles a header and frame blocks into one stream
pub struct StreamBuilder {
    width: u16,
    height: u16,
    speed: i16,
    frame_count: Option<i32>,
    blocks: Vec<Vec<u8>>,
    terminated: bool,
}

impl StreamBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            speed: 0,
            frame_count: None,
            blocks: Vec::new(),
            terminated: true,
        }
    }

    /// Declared playback speed in the header
    pub fn speed(mut self, fps: i16) -> Self {
        self.speed = fps;
        self
    }

    /// Overrides the header frame count (defaults to the number of blocks)
    pub fn frame_count(mut self, n: i32) -> Self {
        self.frame_count = Some(n);
        self
    }

    /// Leaves out the zero-size end marker
    pub fn unterminated(mut self) -> Self {
        self.terminated = false;
        self
    }

    /// Appends one frame block made of `chunks`
    pub fn frame(mut self, chunks: &[Vec<u8>]) -> Self {
        self.blocks.push(chunks.concat());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let largest = self.blocks.iter().map(|b| b.len() + 4).max().unwrap_or(0);
        let frames = self.frame_count.unwrap_or(self.blocks.len() as i32);

        let mut data = vec![0u8; HNM_HEADER_SIZE];
        data[0..4].copy_from_slice(b"HNM4");
        data[7] = 8;
        data[8..10].copy_from_slice(&self.width.to_le_bytes());
        data[10..12].copy_from_slice(&self.height.to_le_bytes());
        data[16..20].copy_from_slice(&frames.to_le_bytes());
        data[24..26].copy_from_slice(&self.speed.to_le_bytes());
        data[28..32].copy_from_slice(&(largest as i32).to_le_bytes());

        for block in &self.blocks {
            data.extend_from_slice(&((block.len() + 4) as u32).to_le_bytes());
            data.extend_from_slice(block);
        }
        if self.terminated {
            data.extend_from_slice(&[0; 4]);
        }
        let total = data.len() as i32;
        data[12..16].copy_from_slice(&total.to_le_bytes());
        data
    }

    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build())
    }
}

pub fn chunk(tag: &[u8; 2], h6: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = ((payload.len() + CHUNK_HEADER_SIZE) as u32).to_le_bytes().to_vec();
    data.extend_from_slice(tag);
    data.extend_from_slice(&[h6, 0]);
    data.extend_from_slice(payload);
    data
}

/// `IZ` chunk; `progressive` sets bit 0 of the first flag byte
pub fn keyframe(pixels: &[u8], progressive: bool) -> Vec<u8> {
    let mut payload = vec![0u8; 4];
    payload.extend(lz::compress(pixels));
    chunk(b"IZ", progressive as u8, &payload)
}

pub fn delta(payload: &[u8], progressive: bool) -> Vec<u8> {
    chunk(b"IU", progressive as u8, payload)
}

/// `PL` chunk with a single record of 6-bit colors
pub fn palette(first: u8, colors: &[[u8; 3]]) -> Vec<u8> {
    let mut payload = vec![first, colors.len() as u8];
    for c in colors {
        payload.extend_from_slice(c);
    }
    payload.extend_from_slice(&[0xFF, 0xFF]);
    chunk(b"PL", 0, &payload)
}

pub fn sound(payload: &[u8]) -> Vec<u8> {
    chunk(b"sd", 0, payload)
}

/// ADPCM delta table where index `i` adds `i - 128`
pub fn ramp_table() -> Vec<u8> {
    (0..256i16).flat_map(|i| (i - 128).to_le_bytes()).collect()
}

/// Presenter that keeps a copy of everything it is shown
#[derive(Default)]
pub struct Recorder {
    pub frames: Vec<Vec<u8>>,
    pub palettes: Vec<(u8, u16)>,
}

impl Presenter for Recorder {
    fn set_palette(&mut self, _palette: &Palette, first: u8, count: u16) -> VideoResult<()> {
        self.palettes.push((first, count));
        Ok(())
    }

    fn present(&mut self, pixels: &[u8], _width: u16, _height: u16, _palette: &Palette) -> VideoResult<()> {
        self.frames.push(pixels.to_vec());
        Ok(())
    }
}

/// Audio output that records buffers in arrival order
#[derive(Default, Clone)]
pub struct CaptureSink {
    pub buffers: Rc<RefCell<Vec<AudioBuffer>>>,
}

impl CaptureSink {
    pub fn bytes(&self) -> Vec<u8> {
        self.buffers.borrow().iter().flat_map(|b| b.data.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.buffers.borrow().len()
    }
}

impl AudioSink for CaptureSink {
    fn has_free_slot(&self) -> bool {
        true
    }

    fn queue_audio(&mut self, buffer: AudioBuffer) -> DecodeResult<()> {
        self.buffers.borrow_mut().push(buffer);
        Ok(())
    }
}

/// Manual clock shared between the player and a test collaborator
#[derive(Clone, Default)]
pub struct SharedClock(pub Rc<RefCell<ManualClock>>);

impl SharedClock {
    pub fn new(start_ms: u64) -> Self {
        Self(Rc::new(RefCell::new(ManualClock::new(start_ms))))
    }

    pub fn advance(&self, ms: u64) {
        self.0.borrow_mut().advance(ms);
    }
}

impl Clock for SharedClock {
    fn now_ms(&self) -> u64 {
        self.0.borrow().now_ms()
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.0.borrow_mut().sleep_ms(ms);
    }

    fn spin(&mut self) {
        self.0.borrow_mut().spin();
    }
}
