use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use hnm_rust::config;
use hnm_rust::present::{NullPresenter, PngDumper};
use hnm_rust::sound::{AudioSink, NullSink};
use hnm_rust::time::SystemClock;
use hnm_rust::video::player::{HnmPlayer, PlaybackSummary, Presenter};
use hnm_rust::{logging, Cli, Options};

/// Where decoded sound goes
enum AudioOut {
    Silent(NullSink),
    #[cfg(feature = "rodio_output")]
    Device(hnm_rust::sound::RodioSink),
}

impl AudioOut {
    fn open(options: &Options) -> Result<Self> {
        if !options.audio_output.unwrap_or(false) {
            return Ok(AudioOut::Silent(NullSink::new()));
        }
        #[cfg(feature = "rodio_output")]
        {
            let depth = options.to_player_config().sound_buffers;
            let sink = hnm_rust::sound::RodioSink::open(depth).context("Failed to open audio output")?;
            Ok(AudioOut::Device(sink))
        }
        #[cfg(not(feature = "rodio_output"))]
        {
            log::warn!("Built without audio output support; sound is decoded but not played");
            Ok(AudioOut::Silent(NullSink::new()))
        }
    }

    fn sink(&mut self) -> &mut dyn AudioSink {
        match self {
            AudioOut::Silent(sink) => sink,
            #[cfg(feature = "rodio_output")]
            AudioOut::Device(sink) => sink,
        }
    }

    /// Lets queued sound finish before exit
    fn finish(&self) {
        #[cfg(feature = "rodio_output")]
        if let AudioOut::Device(sink) = self {
            sink.drain();
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("hnm: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load the config file, then let the command line override it
    let options = config::load_config(cli.config.as_deref())?;
    let options = cli.merge_into_options(options)?;

    logging::init(
        options.log_level.unwrap_or_default(),
        options.log_file.as_deref().map(Path::new),
    )
    .context("Failed to initialize logging")?;

    let mut player = HnmPlayer::open_path(&cli.file, options.to_player_config())
        .with_context(|| format!("Failed to open {}", cli.file.display()))?;
    player.set_chunk_hook(|chunk| {
        log::debug!("No handler for application chunk '{}'", chunk.tag_str());
    });

    let mut presenter: Box<dyn Presenter> = match &options.dump_dir {
        Some(dir) => Box::new(PngDumper::new(dir).context("Failed to create frame directory")?),
        None => Box::new(NullPresenter::default()),
    };
    let mut audio = AudioOut::open(&options)?;

    let max_frames = options.max_frames;
    let mut presented = 0u32;
    let mut cancel = || {
        presented += 1;
        max_frames.is_some_and(|max| presented >= max)
    };

    let summary = player
        .play(presenter.as_mut(), audio.sink(), &mut SystemClock::new(), &mut cancel)
        .with_context(|| format!("Playback of {} failed", cli.file.display()))?;
    audio.finish();

    report(&cli.file, &summary);
    Ok(())
}

fn report(file: &Path, summary: &PlaybackSummary) {
    println!(
        "{}: {} frames ({} late), {} audio buffers queued, {} dropped, {} unknown chunks{}",
        file.display(),
        summary.frames_presented,
        summary.late_frames,
        summary.audio_buffers_queued,
        summary.audio_buffers_dropped,
        summary.unknown_chunks,
        if summary.cancelled { ", stopped early" } else { "" }
    );
}
