// HNM streaming video player library
// Container, codecs and playback scheduler, plus config, logging and presenters for the hnm tool

pub mod cli;
pub mod config;
pub mod logging;
pub mod present;
pub mod propfile;
pub mod sound;
pub mod time;
pub mod video;

pub use cli::Cli;
pub use config::Options;
pub use logging::LogLevel;
pub use video::player::{HnmPlayer, PlaybackSummary};
pub use video::{PlayerConfig, VideoError};
