use std::path::Path;

use anyhow::{Context, Result};

use crate::logging::LogLevel;
use crate::propfile::load_propfile;
use crate::sound::AudioFormat;
use crate::video::{AudioCodec, InterlaceMode, PlayerConfig};

/// Player options that can be set via CLI or config file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Options {
    // Commandline-only options
    pub log_file: Option<String>,
    pub dump_dir: Option<String>,
    pub max_frames: Option<u32>,

    // Commandline and config file options
    pub log_level: Option<LogLevel>,
    pub interlace: Option<InterlaceMode>,
    pub preserve_color0: Option<bool>,
    pub mac_palette: Option<bool>,
    pub palette_range: Option<(u8, u16)>,
    pub use_sound: Option<bool>,
    pub audio_output: Option<bool>,
    pub audio_codec: Option<AudioCodec>,
    pub raw_format: Option<AudioFormat>,
    pub sample_rate: Option<u32>,
    pub sound_buffers: Option<usize>,
    pub frame_rate: Option<f32>,
    pub sync_threshold_ms: Option<u32>,
}

impl Options {
    /// Applies one `key = value` setting
    ///
    /// # Returns
    /// `false` if the key is not a known option
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool> {
        match key.to_ascii_lowercase().as_str() {
            "log_level" => {
                self.log_level = Some(value.parse().map_err(anyhow::Error::msg)?);
            }
            "interlace" => self.interlace = Some(parse_interlace(value)?),
            "preserve_color0" => self.preserve_color0 = Some(parse_bool(value)?),
            "mac_palette" => self.mac_palette = Some(parse_bool(value)?),
            "palette_range" => self.palette_range = Some(parse_palette_range(value)?),
            "sound" => self.use_sound = Some(parse_bool(value)?),
            "audio_output" => self.audio_output = Some(parse_bool(value)?),
            "audio_codec" => self.audio_codec = Some(parse_audio_codec(value)?),
            "raw_format" => {
                self.raw_format = Some(value.parse().map_err(anyhow::Error::msg)?);
            }
            "sample_rate" => self.sample_rate = Some(parse_sample_rate(value)?),
            "sound_buffers" => self.sound_buffers = Some(parse_sound_buffers(value)?),
            "fps" | "frame_rate" => self.frame_rate = Some(parse_frame_rate(value)?),
            "sync_threshold" => {
                self.sync_threshold_ms = Some(value.parse().context("Invalid sync threshold")?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Resolves the options into the codec and scheduler configuration
    pub fn to_player_config(&self) -> PlayerConfig {
        let defaults = PlayerConfig::default();
        PlayerConfig {
            interlace: self.interlace.unwrap_or(defaults.interlace),
            preserve_color0: self.preserve_color0.unwrap_or(defaults.preserve_color0),
            mac_palette: self.mac_palette.unwrap_or(defaults.mac_palette),
            palette_range: self.palette_range.or(defaults.palette_range),
            use_sound: self.use_sound.unwrap_or(defaults.use_sound),
            audio_codec: self.audio_codec.unwrap_or(defaults.audio_codec),
            raw_format: self.raw_format.unwrap_or(defaults.raw_format),
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
            sound_buffers: self.sound_buffers.unwrap_or(defaults.sound_buffers),
            frame_rate: self.frame_rate.or(defaults.frame_rate),
            sync_threshold_ms: self.sync_threshold_ms.unwrap_or(defaults.sync_threshold_ms),
        }
    }
}

/// Load options from a `key = value` config file
///
/// Without a path, defaults are returned. Unknown keys are logged and
/// ignored; invalid values are errors.
pub fn load_config(path: Option<&Path>) -> Result<Options> {
    let mut opts = Options::default();
    let Some(path) = path else {
        return Ok(opts);
    };

    let entries = load_propfile(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    for (line, key, value) in entries {
        let known = opts
            .set(&key, &value)
            .with_context(|| format!("{}:{}: bad value for '{}'", path.display(), line, key))?;
        if !known {
            log::warn!("{}:{}: unknown option '{}'", path.display(), line, key);
        }
    }
    Ok(opts)
}

/// Parse a boolean setting (yes/no, on/off, true/false, 1/0)
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "1" | "yes" | "on" | "true" => Ok(true),
        "0" | "no" | "off" | "false" => Ok(false),
        _ => anyhow::bail!("Invalid boolean: {}. Valid options: yes, no, on, off, true, false", s),
    }
}

/// Parse a frame rate in frames per second
pub fn parse_frame_rate(s: &str) -> Result<f32> {
    let fps: f32 = s.parse().context("Invalid frame rate")?;

    const MIN_FPS: f32 = 1.0;
    const MAX_FPS: f32 = 120.0;

    if !(MIN_FPS..=MAX_FPS).contains(&fps) {
        anyhow::bail!("Frame rate out of range (1 to 120)");
    }

    Ok(fps)
}

/// Parse an audio sample rate in Hz
pub fn parse_sample_rate(s: &str) -> Result<u32> {
    let rate: u32 = s.parse().context("Invalid sample rate")?;

    const MIN_RATE: u32 = 4000;
    const MAX_RATE: u32 = 192_000;

    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        anyhow::bail!("Sample rate out of range (4000 to 192000)");
    }

    Ok(rate)
}

/// Parse a palette push range in the format "FIRST:COUNT"
pub fn parse_palette_range(s: &str) -> Result<(u8, u16)> {
    let Some((first, count)) = s.split_once(':') else {
        anyhow::bail!("Palette range must be in FIRST:COUNT format");
    };

    let first: u8 = first.trim().parse().context("Invalid first palette index")?;
    let count: u16 = count.trim().parse().context("Invalid palette count")?;

    if count == 0 || first as u16 + count > 256 {
        anyhow::bail!("Palette range {}:{} outside 0..256", first, count);
    }

    Ok((first, count))
}

/// Parse the sound ring depth
pub fn parse_sound_buffers(s: &str) -> Result<usize> {
    let n: usize = s.parse().context("Invalid sound buffer count")?;
    if !(1..=64).contains(&n) {
        anyhow::bail!("Sound buffer count out of range (1 to 64)");
    }
    Ok(n)
}

pub fn parse_interlace(s: &str) -> Result<InterlaceMode> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(InterlaceMode::Auto),
        "interlaced" | "on" => Ok(InterlaceMode::Interlaced),
        "progressive" | "off" => Ok(InterlaceMode::Progressive),
        _ => anyhow::bail!(
            "Invalid interlace mode: {}. Valid options: auto, interlaced, progressive",
            s
        ),
    }
}

pub fn parse_audio_codec(s: &str) -> Result<AudioCodec> {
    match s.to_lowercase().as_str() {
        "raw" | "pcm" => Ok(AudioCodec::Raw),
        "adpcm" => Ok(AudioCodec::Adpcm),
        _ => anyhow::bail!("Invalid audio codec: {}. Valid options: raw, adpcm", s),
    }
}
