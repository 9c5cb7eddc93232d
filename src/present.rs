//! Headless presenters for the `hnm` tool and tests

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::video::palette::Palette;
use crate::video::player::Presenter;
use crate::video::{VideoError, VideoResult};

/// Presenter that only counts what it is given
#[derive(Debug, Default)]
pub struct NullPresenter {
    pub frames: u32,
    pub palette_uploads: u32,
}

impl Presenter for NullPresenter {
    fn set_palette(&mut self, _palette: &Palette, _first: u8, _count: u16) -> VideoResult<()> {
        self.palette_uploads += 1;
        Ok(())
    }

    fn present(&mut self, _pixels: &[u8], _width: u16, _height: u16, _palette: &Palette) -> VideoResult<()> {
        self.frames += 1;
        Ok(())
    }
}

/// Writes every presented frame as `frame_NNNNN.png`
#[derive(Debug)]
pub struct PngDumper {
    dir: PathBuf,
    next: u32,
}

impl PngDumper {
    /// Creates the output directory if needed
    pub fn new(dir: impl AsRef<Path>) -> VideoResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, next: 0 })
    }

    /// Path the next frame will be written to
    pub fn next_path(&self) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", self.next))
    }

    pub fn frames_written(&self) -> u32 {
        self.next
    }
}

impl Presenter for PngDumper {
    fn set_palette(&mut self, _palette: &Palette, first: u8, count: u16) -> VideoResult<()> {
        log::debug!("Palette upload {}+{}", first, count);
        Ok(())
    }

    fn present(&mut self, pixels: &[u8], width: u16, height: u16, palette: &Palette) -> VideoResult<()> {
        let rgb = palette.expand(pixels);
        let img = RgbImage::from_raw(width as u32, height as u32, rgb)
            .ok_or_else(|| VideoError::Output(format!("frame is not {}x{}", width, height)))?;
        let path = self.next_path();
        img.save(&path)
            .map_err(|e| VideoError::Output(format!("{}: {}", path.display(), e)))?;
        self.next += 1;
        Ok(())
    }
}
