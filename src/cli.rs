use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{parse_audio_codec, parse_frame_rate, parse_interlace, parse_palette_range, parse_sound_buffers};
use crate::config::Options;
use crate::sound::AudioFormat;
use crate::video::AudioCodec;

/// HNM cutscene player
#[derive(Parser, Debug, Default)]
#[command(name = "hnm")]
#[command(version)]
#[command(about = "Plays HNM full-motion video streams", long_about = None)]
pub struct Cli {
    /// Stream file to play
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Config file with key = value settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Frame rate override in frames per second
    #[arg(short, long, value_name = "FPS")]
    pub fps: Option<String>,

    /// Write every presented frame as PNG into this directory
    #[arg(short, long, value_name = "DIR")]
    pub dump_frames: Option<String>,

    /// Stop after this many frames
    #[arg(short, long, value_name = "N")]
    pub max_frames: Option<u32>,

    /// Play sound on the default output device
    #[arg(short, long)]
    pub audio: bool,

    /// Skip sound chunks entirely
    #[arg(long = "nosound")]
    pub nosound: bool,

    /// Sound chunk codec (raw, adpcm)
    #[arg(long, value_name = "CODEC")]
    pub codec: Option<String>,

    /// Sample layout of raw sound (mono8, mono16, stereo8, stereo16)
    #[arg(long, value_name = "FORMAT")]
    pub raw_format: Option<String>,

    /// Depth of the decoded sound ring
    #[arg(long, value_name = "N")]
    pub sound_buffers: Option<String>,

    /// Image layout (auto, interlaced, progressive)
    #[arg(short, long, value_name = "MODE")]
    pub interlace: Option<String>,

    /// Force palette index 0 to black
    #[arg(long)]
    pub preserve_color0: bool,

    /// Force palette index 0 white and 255 black
    #[arg(long)]
    pub mac_palette: bool,

    /// Palette entries pushed after each update
    #[arg(long, value_name = "FIRST:COUNT")]
    pub palette_range: Option<String>,

    /// Log level (nothing, error, warning, info, debug, all)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    pub logfile: Option<String>,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        // Override with command line arguments
        if let Some(ref fps) = self.fps {
            opts.frame_rate = Some(parse_frame_rate(fps).context("Invalid --fps")?);
        }

        if let Some(ref dir) = self.dump_frames {
            opts.dump_dir = Some(dir.clone());
        }

        if let Some(n) = self.max_frames {
            opts.max_frames = Some(n);
        }

        if self.audio {
            opts.audio_output = Some(true);
        }
        if self.nosound {
            opts.use_sound = Some(false);
        }

        if let Some(ref codec) = self.codec {
            opts.audio_codec = Some(Self::parse_codec(codec)?);
        }

        if let Some(ref format) = self.raw_format {
            let format: AudioFormat = format.parse().map_err(anyhow::Error::msg)?;
            opts.raw_format = Some(format);
        }

        if let Some(ref n) = self.sound_buffers {
            opts.sound_buffers = Some(parse_sound_buffers(n)?);
        }

        if let Some(ref mode) = self.interlace {
            opts.interlace = Some(parse_interlace(mode)?);
        }

        if self.preserve_color0 {
            opts.preserve_color0 = Some(true);
        }
        if self.mac_palette {
            opts.mac_palette = Some(true);
        }

        if let Some(ref range) = self.palette_range {
            opts.palette_range = Some(parse_palette_range(range).context("Invalid --palette-range")?);
        }

        if let Some(ref level) = self.log_level {
            opts.log_level = Some(level.parse().map_err(anyhow::Error::msg)?);
        }

        if let Some(ref log_file) = self.logfile {
            opts.log_file = Some(log_file.clone());
        }

        Ok(opts)
    }

    fn parse_codec(s: &str) -> Result<AudioCodec> {
        parse_audio_codec(s).context("Invalid --codec")
    }
}
