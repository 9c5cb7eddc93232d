//! Palette ("PL") chunk decoding
//!
//! Payload records are `(first, count, count x (r, g, b))` with 6-bit
//! components; a count of zero means all 256 entries and `FF FF` ends the
//! list.

use super::{VideoError, VideoResult};

/// Number of palette entries
pub const PALETTE_SIZE: usize = 256;

/// Record list terminator
const END_MARKER: [u8; 2] = [0xFF, 0xFF];

/// Shift from a 6-bit component to the internal 16-bit value
const COMPONENT_SHIFT: u32 = 10;

/// One palette entry with 16 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb16 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Rgb16 {
    pub const BLACK: Rgb16 = Rgb16 { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb16 = Rgb16 {
        r: 0xFFFF,
        g: 0xFFFF,
        b: 0xFFFF,
    };

    /// Builds an entry from 6-bit VGA components
    pub fn from_vga(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: (r as u16) << COMPONENT_SHIFT,
            g: (g as u16) << COMPONENT_SHIFT,
            b: (b as u16) << COMPONENT_SHIFT,
        }
    }

    /// Display value, truncated to 8 bits per channel
    pub fn to_rgb8(self) -> [u8; 3] {
        [(self.r >> 8) as u8, (self.g >> 8) as u8, (self.b >> 8) as u8]
    }
}

/// 256-entry palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb16; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            entries: [Rgb16::BLACK; PALETTE_SIZE],
        }
    }
}

impl Palette {
    pub fn get(&self, index: u8) -> Rgb16 {
        self.entries[index as usize]
    }

    pub fn set(&mut self, index: u8, color: Rgb16) {
        self.entries[index as usize] = color;
    }

    pub fn entries(&self) -> &[Rgb16; PALETTE_SIZE] {
        &self.entries
    }

    /// Expands indexed pixels to packed RGB8
    pub fn expand(&self, pixels: &[u8]) -> Vec<u8> {
        pixels
            .iter()
            .flat_map(|&p| self.get(p).to_rgb8())
            .collect()
    }
}

/// Range of entries to push after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteRange {
    pub first: u8,
    pub count: u16,
}

impl PaletteRange {
    pub const FULL: PaletteRange = PaletteRange {
        first: 0,
        count: PALETTE_SIZE as u16,
    };
}

/// Palette codec state for one stream
#[derive(Debug, Clone)]
pub struct PaletteState {
    palette: Palette,
    visible: Palette,
    preserve_color0: bool,
    mac_palette: bool,
    range: PaletteRange,
}

impl PaletteState {
    /// Creates the codec state
    ///
    /// # Arguments
    ///
    /// * `preserve_color0` - Force index 0 to black after every update
    /// * `mac_palette` - Force index 0 to white and 255 to black
    /// * `range` - Entries pushed to the presenter; clamped to the palette
    pub fn new(preserve_color0: bool, mac_palette: bool, range: Option<(u8, u16)>) -> Self {
        let range = range
            .map(|(first, count)| PaletteRange {
                first,
                count: count.min(PALETTE_SIZE as u16 - first as u16),
            })
            .unwrap_or(PaletteRange::FULL);
        Self {
            palette: Palette::default(),
            visible: Palette::default(),
            preserve_color0,
            mac_palette,
            range,
        }
    }

    /// Decoded palette, including updates not yet pushed
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Palette last pushed to the presenter
    pub fn visible(&self) -> &Palette {
        &self.visible
    }

    /// Range to push after an update
    pub fn range(&self) -> PaletteRange {
        self.range
    }

    /// Decodes a palette payload into the working palette
    pub fn decode(&mut self, payload: &[u8]) -> VideoResult<()> {
        let mut pos = 0usize;
        while pos + 2 <= payload.len() && payload[pos..pos + 2] != END_MARKER {
            let first = payload[pos] as usize;
            let count = match payload[pos + 1] {
                0 => PALETTE_SIZE,
                n => n as usize,
            };
            pos += 2;

            if first + count > PALETTE_SIZE {
                return Err(VideoError::Corrupt(format!(
                    "palette record {}+{} exceeds {} entries",
                    first, count, PALETTE_SIZE
                )));
            }
            let rgb = payload.get(pos..pos + 3 * count).ok_or_else(|| {
                VideoError::Corrupt(format!("palette record of {} entries truncated", count))
            })?;
            for (i, c) in rgb.chunks_exact(3).enumerate() {
                self.palette.entries[first + i] = Rgb16::from_vga(c[0], c[1], c[2]);
            }
            pos += 3 * count;
        }

        if self.preserve_color0 {
            self.palette.entries[0] = Rgb16::BLACK;
        }
        if self.mac_palette {
            self.palette.entries[0] = Rgb16::WHITE;
            self.palette.entries[PALETTE_SIZE - 1] = Rgb16::BLACK;
        }
        Ok(())
    }

    /// Records the working palette as the one on screen
    pub fn commit(&mut self) {
        self.visible.clone_from(&self.palette);
    }

    /// Clears both palettes for a new playback
    pub fn reset(&mut self) {
        self.palette = Palette::default();
        self.visible = Palette::default();
    }
}
