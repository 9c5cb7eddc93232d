//! Audio sample formats for decoded stream sound

use std::fmt;
use std::str::FromStr;

/// Audio sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// 8-bit unsigned mono (1 byte per sample)
    #[default]
    Mono8,
    /// 16-bit signed mono (2 bytes per sample)
    Mono16,
    /// 8-bit unsigned stereo (2 bytes per sample)
    Stereo8,
    /// 16-bit signed stereo (4 bytes per sample)
    Stereo16,
}

impl AudioFormat {
    /// Returns the number of bytes per sample frame
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            AudioFormat::Mono8 => 1,
            AudioFormat::Stereo8 => 2,
            AudioFormat::Mono16 => 2,
            AudioFormat::Stereo16 => 4,
        }
    }

    /// Returns the number of channels
    pub fn channels(&self) -> u16 {
        match self {
            AudioFormat::Mono8 | AudioFormat::Mono16 => 1,
            AudioFormat::Stereo8 | AudioFormat::Stereo16 => 2,
        }
    }

    /// Returns true if this is a 16-bit format
    pub fn is_16bit(&self) -> bool {
        matches!(self, AudioFormat::Mono16 | AudioFormat::Stereo16)
    }

    /// Converts little-endian PCM bytes in this format to signed 16-bit samples
    pub fn to_i16_samples(&self, data: &[u8]) -> Vec<i16> {
        if self.is_16bit() {
            data.chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]))
                .collect()
        } else {
            data.iter().map(|&b| ((b as i16) - 128) * 256).collect()
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AudioFormat::Mono8 => "mono8",
            AudioFormat::Mono16 => "mono16",
            AudioFormat::Stereo8 => "stereo8",
            AudioFormat::Stereo16 => "stereo16",
        };
        f.write_str(s)
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mono8" => Ok(AudioFormat::Mono8),
            "mono16" => Ok(AudioFormat::Mono16),
            "stereo8" => Ok(AudioFormat::Stereo8),
            "stereo16" => Ok(AudioFormat::Stereo16),
            other => Err(format!("unknown audio format '{}'", other)),
        }
    }
}
