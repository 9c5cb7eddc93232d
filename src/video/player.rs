//! Stream playback with fixed-rate pacing and audio hand-off.

use std::fs::File;
use std::path::Path;

use super::demux::{Chunk, ChunkTag, Demuxer};
use super::frame::FrameBuffers;
use super::palette::{Palette, PaletteState};
use super::source::ByteSource;
use super::{AudioCodec, HnmHeader, PlayerConfig, VideoError, VideoResult};
use crate::sound::{AdpcmDecoder, AudioBuffer, AudioSink, RawDecoder, SoundDecoder, SoundQueue};
use crate::time::{Clock, FrameTimer};

// ============================================================================
// Collaborators
// ============================================================================

/// Destination for decoded frames
pub trait Presenter {
    /// Uploads `count` palette entries starting at `first`
    fn set_palette(&mut self, palette: &Palette, first: u8, count: u16) -> VideoResult<()>;

    /// Shows one frame; `pixels` is `width * height` palette indices
    fn present(&mut self, pixels: &[u8], width: u16, height: u16, palette: &Palette) -> VideoResult<()>;
}

/// Asked once per frame whether playback should stop
pub trait CancelProbe {
    fn should_stop(&mut self) -> bool;
}

impl<F: FnMut() -> bool> CancelProbe for F {
    fn should_stop(&mut self) -> bool {
        self()
    }
}

/// Receives chunks with tags the player does not handle
pub type ChunkHook = Box<dyn FnMut(&Chunk<'_>)>;

/// Where playback is in its per-frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Opened, nothing decoded
    #[default]
    Idle,
    /// Session cleared; the next frame restarts timing
    Reset,
    /// Reading and dispatching chunks
    Decoding,
    /// Waiting for the frame deadline
    Waiting,
    /// Handing the frame to the presenter
    Presenting,
    /// Last frame done, cancelled, or failed
    Stopped,
}

/// Counters reported at the end of playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackSummary {
    pub frames_presented: u32,
    pub late_frames: u32,
    pub audio_buffers_queued: u64,
    pub audio_buffers_dropped: u64,
    pub unknown_chunks: u32,
    pub cancelled: bool,
}

// ============================================================================
// Session
// ============================================================================

/// Decoder and timing state owned by one stream
pub struct PlaybackSession {
    frames: FrameBuffers,
    palette: PaletteState,
    sound: Box<dyn SoundDecoder>,
    queue: SoundQueue,
    timer: FrameTimer,
    frame_num: u32,
    images_decoded: u32,
    allow_audio_sync: bool,
    frames_presented: u32,
    late_frames: u32,
    unknown_chunks: u32,
}

impl PlaybackSession {
    /// Allocates buffers for a stream
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::Alloc)` - If frame buffers or the sound ring cannot be reserved
    pub fn new(header: &HnmHeader, config: &PlayerConfig) -> VideoResult<Self> {
        let frames = FrameBuffers::new(header.width, header.height)?;
        let queue = SoundQueue::new(config.sound_buffers).map_err(|_| VideoError::Alloc {
            what: "sound ring",
            bytes: config.sound_buffers * std::mem::size_of::<AudioBuffer>(),
        })?;
        let sound: Box<dyn SoundDecoder> = match config.audio_codec {
            AudioCodec::Raw => Box::new(RawDecoder::new(config.raw_format)),
            AudioCodec::Adpcm => Box::new(AdpcmDecoder::new()),
        };
        let fps = config.effective_rate(header);

        Ok(Self {
            frames,
            palette: PaletteState::new(config.preserve_color0, config.mac_palette, config.palette_range),
            sound,
            queue,
            timer: FrameTimer::new(fps, config.sync_threshold_ms),
            frame_num: 0,
            images_decoded: 0,
            allow_audio_sync: true,
            frames_presented: 0,
            late_frames: 0,
            unknown_chunks: 0,
        })
    }

    /// Returns every decoder to its start-of-stream state
    fn reset(&mut self) {
        self.frames.clear();
        self.palette.reset();
        self.sound.reset();
        self.queue.reset();
        self.frame_num = 0;
        self.images_decoded = 0;
        self.allow_audio_sync = true;
        self.frames_presented = 0;
        self.late_frames = 0;
        self.unknown_chunks = 0;
    }

    /// Index of the next frame to decode
    pub fn frame_num(&self) -> u32 {
        self.frame_num
    }

    /// Number of image chunks decoded so far
    ///
    /// Frames without an image do not advance the buffer rotation.
    pub fn images_decoded(&self) -> u32 {
        self.images_decoded
    }

    pub fn frames(&self) -> &FrameBuffers {
        &self.frames
    }

    pub fn palette(&self) -> &PaletteState {
        &self.palette
    }

    pub fn sound_queue(&self) -> &SoundQueue {
        &self.queue
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Whether the last frame released its audio
    pub fn audio_sync_allowed(&self) -> bool {
        self.allow_audio_sync
    }

    /// Handles one chunk; returns `true` once the frame's image is done
    fn dispatch(
        &mut self,
        chunk: &Chunk<'_>,
        config: &PlayerConfig,
        hook: &mut Option<ChunkHook>,
        presenter: &mut dyn Presenter,
        audio: &mut dyn AudioSink,
    ) -> VideoResult<bool> {
        log::debug!(
            "Frame {}: chunk {} ({} bytes, flags {:02x} {:02x})",
            self.frame_num,
            chunk.tag_str(),
            chunk.len(),
            chunk.flags[0],
            chunk.flags[1]
        );

        match chunk.tag {
            ChunkTag::Palette => {
                self.palette.decode(chunk.payload)?;
                let range = self.palette.range();
                presenter.set_palette(self.palette.palette(), range.first, range.count)?;
                self.palette.commit();
            }
            ChunkTag::Keyframe => {
                let interlaced = config.interlace.is_interlaced(chunk.flags[0]);
                self.frames.select(self.images_decoded);
                self.images_decoded += 1;
                self.frames.apply_keyframe(chunk.payload, interlaced)?;
                return Ok(true);
            }
            ChunkTag::Delta => {
                let interlaced = config.interlace.is_interlaced(chunk.flags[0]);
                self.frames.select(self.images_decoded);
                self.images_decoded += 1;
                self.frames.apply_delta(chunk.payload, interlaced)?;
                return Ok(true);
            }
            ChunkTag::Sound => {
                if !config.use_sound {
                    return Ok(false);
                }
                if chunk.flags[0] != 0 {
                    return Err(VideoError::Unsupported(format!(
                        "compressed sound variant {:#04x}",
                        chunk.flags[0]
                    )));
                }
                let data = self.sound.decode_chunk(chunk.payload)?;
                let buffer = AudioBuffer::new(data, self.sound.format(), config.sample_rate);
                self.queue.push(buffer, audio)?;
            }
            ChunkTag::Unknown(_) => {
                log::warn!(
                    "Skipping unknown chunk '{}' ({} bytes) in frame {}",
                    chunk.tag_str(),
                    chunk.len(),
                    self.frame_num
                );
                self.unknown_chunks += 1;
                if let Some(hook) = hook.as_mut() {
                    hook(chunk);
                }
            }
        }
        Ok(false)
    }
}

// ============================================================================
// Player
// ============================================================================

/// Plays one HNM stream
pub struct HnmPlayer<S> {
    demux: Demuxer<S>,
    config: PlayerConfig,
    session: PlaybackSession,
    hook: Option<ChunkHook>,
    state: PlaybackState,
    cancelled: bool,
}

impl HnmPlayer<File> {
    /// Opens a stream file
    pub fn open_path(path: impl AsRef<Path>, config: PlayerConfig) -> VideoResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(file, config)
    }
}

impl<S: ByteSource> HnmPlayer<S> {
    /// Reads the header and allocates all per-stream buffers
    pub fn open(source: S, config: PlayerConfig) -> VideoResult<Self> {
        let demux = Demuxer::open(source)?;
        let session = PlaybackSession::new(demux.header(), &config)?;
        log::info!(
            "Playback at {:.2} fps, audio {:?}{}",
            config.effective_rate(demux.header()),
            config.audio_codec,
            if config.use_sound { "" } else { " (muted)" }
        );
        Ok(Self {
            demux,
            config,
            session,
            hook: None,
            state: PlaybackState::Idle,
            cancelled: false,
        })
    }

    /// Installs the handler for unrecognized chunks
    pub fn set_chunk_hook(&mut self, hook: impl FnMut(&Chunk<'_>) + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub fn header(&self) -> &HnmHeader {
        self.demux.header()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Buffer most recently handed to the presenter
    pub fn final_frame(&self) -> &[u8] {
        self.session.frames.final_frame()
    }

    /// Palette currently on screen
    pub fn visible_palette(&self) -> &Palette {
        self.session.palette.visible()
    }

    /// Decodes, paces, and presents one frame
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A frame was presented
    /// * `Ok(false)` - Playback is over (frame count or end marker reached)
    pub fn next_frame(
        &mut self,
        presenter: &mut dyn Presenter,
        audio: &mut dyn AudioSink,
        clock: &mut dyn Clock,
    ) -> VideoResult<bool> {
        let result = self.step(presenter, audio, clock);
        if result.is_err() {
            self.state = PlaybackState::Stopped;
        }
        result
    }

    fn step(
        &mut self,
        presenter: &mut dyn Presenter,
        audio: &mut dyn AudioSink,
        clock: &mut dyn Clock,
    ) -> VideoResult<bool> {
        match self.state {
            PlaybackState::Stopped => return Ok(false),
            PlaybackState::Idle | PlaybackState::Reset => {
                self.session.timer.reset(clock.now_ms());
            }
            _ => {}
        }

        if self.session.frame_num >= self.demux.header().frame_count {
            self.state = PlaybackState::Stopped;
            return Ok(false);
        }

        self.state = PlaybackState::Decoding;
        let Some(chunks) = self.demux.read_frame()? else {
            log::info!("End of stream after {} frames", self.session.frame_num);
            self.state = PlaybackState::Stopped;
            return Ok(false);
        };
        for chunk in chunks {
            let chunk = chunk?;
            if self
                .session
                .dispatch(&chunk, &self.config, &mut self.hook, presenter, audio)?
            {
                break;
            }
        }

        self.state = PlaybackState::Waiting;
        let slot = self.session.timer.wait(clock);
        self.session.allow_audio_sync = !slot.late;
        if slot.late {
            self.session.late_frames += 1;
            log::warn!(
                "Frame {} is {:.0} ms late, holding audio",
                self.session.frame_num,
                slot.presented_at as f64 - slot.deadline
            );
        }

        self.state = PlaybackState::Presenting;
        let header = self.demux.header();
        presenter.present(
            self.session.frames.final_frame(),
            header.width,
            header.height,
            self.session.palette.visible(),
        )?;
        self.session.frames_presented += 1;

        if self.session.allow_audio_sync {
            self.session.queue.release(audio)?;
        }
        self.session.frame_num += 1;
        Ok(true)
    }

    /// Plays until the end of the stream or until `cancel` asks to stop
    ///
    /// Cancellation is checked after each presented frame.
    pub fn play(
        &mut self,
        presenter: &mut dyn Presenter,
        audio: &mut dyn AudioSink,
        clock: &mut dyn Clock,
        cancel: &mut dyn CancelProbe,
    ) -> VideoResult<PlaybackSummary> {
        while self.next_frame(presenter, audio, clock)? {
            if cancel.should_stop() {
                log::info!("Playback cancelled after frame {}", self.session.frame_num);
                self.cancelled = true;
                self.state = PlaybackState::Stopped;
                break;
            }
        }
        let summary = self.summary();
        log::info!(
            "Playback finished: {} frames, {} late, {} audio buffers ({} dropped)",
            summary.frames_presented,
            summary.late_frames,
            summary.audio_buffers_queued,
            summary.audio_buffers_dropped
        );
        Ok(summary)
    }

    /// Starts over from the first frame with fresh decoder state
    pub fn rewind(&mut self) {
        self.demux.rewind();
        self.session.reset();
        self.cancelled = false;
        self.state = PlaybackState::Reset;
    }

    pub fn summary(&self) -> PlaybackSummary {
        PlaybackSummary {
            frames_presented: self.session.frames_presented,
            late_frames: self.session.late_frames,
            audio_buffers_queued: self.session.queue.queued(),
            audio_buffers_dropped: self.session.queue.dropped(),
            unknown_chunks: self.session.unknown_chunks,
            cancelled: self.cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::NullSink;
    use crate::time::ManualClock;
    use crate::video::lz;
    use crate::video::tests::header_bytes;
    use crate::video::{InterlaceMode, CHUNK_HEADER_SIZE};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Vec<u8>>,
        palettes: Vec<(u8, u16)>,
    }

    impl Presenter for Recorder {
        fn set_palette(&mut self, _palette: &Palette, first: u8, count: u16) -> VideoResult<()> {
            self.palettes.push((first, count));
            Ok(())
        }

        fn present(&mut self, pixels: &[u8], width: u16, height: u16, _palette: &Palette) -> VideoResult<()> {
            assert_eq!(pixels.len(), width as usize * height as usize);
            self.frames.push(pixels.to_vec());
            Ok(())
        }
    }

    fn chunk(tag: &[u8; 2], h6: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = ((payload.len() + CHUNK_HEADER_SIZE) as u32).to_le_bytes().to_vec();
        data.extend_from_slice(tag);
        data.extend_from_slice(&[h6, 0]);
        data.extend_from_slice(payload);
        data
    }

    fn stream(frames: &[Vec<Vec<u8>>]) -> Cursor<Vec<u8>> {
        let mut data = header_bytes(4, 2, frames.len() as i32, 1024);
        for chunks in frames {
            let body = chunks.concat();
            data.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
            data.extend(body);
        }
        data.extend_from_slice(&[0; 4]);
        Cursor::new(data)
    }

    fn keyframe(pixels: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8; 4];
        payload.extend(lz::compress(pixels));
        chunk(b"IZ", 1, &payload)
    }

    fn progressive() -> PlayerConfig {
        PlayerConfig {
            interlace: InterlaceMode::Progressive,
            ..PlayerConfig::default()
        }
    }

    #[test]
    fn test_states_through_playback() {
        let src = stream(&[vec![keyframe(&[1; 8])]]);
        let mut player = HnmPlayer::open(src, progressive()).unwrap();
        assert_eq!(player.state(), PlaybackState::Idle);

        let (mut out, mut audio, mut clock) = (Recorder::default(), NullSink::new(), ManualClock::new(0));
        assert!(player.next_frame(&mut out, &mut audio, &mut clock).unwrap());
        assert_eq!(player.state(), PlaybackState::Presenting);
        assert!(!player.next_frame(&mut out, &mut audio, &mut clock).unwrap());
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(out.frames, vec![vec![1; 8]]);

        player.rewind();
        assert_eq!(player.state(), PlaybackState::Reset);
        assert_eq!(player.final_frame(), &[0; 8]);
        assert!(player.next_frame(&mut out, &mut audio, &mut clock).unwrap());
    }

    #[test]
    fn test_frame_without_image_repeats() {
        let src = stream(&[
            vec![keyframe(&[5; 8])],
            vec![chunk(b"PL", 0, &[0, 1, 63, 0, 0])],
        ]);
        let mut player = HnmPlayer::open(src, progressive()).unwrap();
        let mut out = Recorder::default();
        let summary = player
            .play(&mut out, &mut NullSink::new(), &mut ManualClock::new(0), &mut || false)
            .unwrap();
        assert_eq!(summary.frames_presented, 2);
        assert_eq!(out.frames[1], vec![5; 8]);
        assert_eq!(out.palettes, vec![(0, 256)]);
        assert_eq!(player.visible_palette().get(0).to_rgb8(), [252, 0, 0]);
    }

    #[test]
    fn test_chunks_after_image_ignored() {
        let src = stream(&[vec![keyframe(&[2; 8]), chunk(b"XX", 0, &[1, 2])]]);
        let mut player = HnmPlayer::open(src, progressive()).unwrap();
        let summary = player
            .play(&mut Recorder::default(), &mut NullSink::new(), &mut ManualClock::new(0), &mut || false)
            .unwrap();
        assert_eq!(summary.unknown_chunks, 0);
    }

    #[test]
    fn test_unknown_chunk_hook() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let src = stream(&[vec![chunk(b"XY", 0, &[7, 7, 7]), keyframe(&[0; 8])]]);
        let mut player = HnmPlayer::open(src, progressive()).unwrap();
        let sink = Rc::clone(&seen);
        player.set_chunk_hook(move |c| sink.borrow_mut().push((c.raw_tag, c.payload.to_vec())));

        let summary = player
            .play(&mut Recorder::default(), &mut NullSink::new(), &mut ManualClock::new(0), &mut || false)
            .unwrap();
        assert_eq!(summary.unknown_chunks, 1);
        assert_eq!(seen.borrow().as_slice(), &[(*b"XY", vec![7, 7, 7])]);
    }

    #[test]
    fn test_compressed_sound_unsupported() {
        let src = stream(&[vec![chunk(b"sd", 1, &[0; 16]), keyframe(&[0; 8])]]);
        let mut player = HnmPlayer::open(src, progressive()).unwrap();
        let err = player
            .next_frame(&mut Recorder::default(), &mut NullSink::new(), &mut ManualClock::new(0))
            .unwrap_err();
        assert!(matches!(err, VideoError::Unsupported(_)));
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_sound_skipped_when_muted() {
        let src = stream(&[vec![chunk(b"sd", 1, &[0; 16]), keyframe(&[0; 8])]]);
        let config = PlayerConfig {
            use_sound: false,
            ..progressive()
        };
        let mut player = HnmPlayer::open(src, config).unwrap();
        let mut audio = NullSink::new();
        let summary = player
            .play(&mut Recorder::default(), &mut audio, &mut ManualClock::new(0), &mut || false)
            .unwrap();
        assert_eq!(summary.frames_presented, 1);
        assert_eq!(audio.buffers(), 0);
    }

    #[test]
    fn test_raw_sound_released_on_present() {
        let config = PlayerConfig {
            audio_codec: AudioCodec::Raw,
            ..progressive()
        };
        let src = stream(&[vec![chunk(b"sd", 0, &[128, 129, 130, 0, 0]), keyframe(&[0; 8])]]);
        let mut player = HnmPlayer::open(src, config).unwrap();
        let mut audio = NullSink::new();
        let summary = player
            .play(&mut Recorder::default(), &mut audio, &mut ManualClock::new(0), &mut || false)
            .unwrap();
        assert_eq!(summary.audio_buffers_queued, 1);
        assert_eq!(audio.bytes(), 3);
    }

    #[test]
    fn test_frame_count_limits_playback() {
        let mut data = stream(&[vec![keyframe(&[1; 8])], vec![keyframe(&[2; 8])]]).into_inner();
        data[16..20].copy_from_slice(&1i32.to_le_bytes());
        let mut player = HnmPlayer::open(Cursor::new(data), progressive()).unwrap();
        let summary = player
            .play(&mut Recorder::default(), &mut NullSink::new(), &mut ManualClock::new(0), &mut || false)
            .unwrap();
        assert_eq!(summary.frames_presented, 1);
    }

    #[test]
    fn test_frames_without_image_keep_rotation() {
        let src = stream(&[vec![keyframe(&[1; 8])], vec![], vec![keyframe(&[2; 8])]]);
        let mut player = HnmPlayer::open(src, progressive()).unwrap();
        let (mut out, mut audio, mut clock) = (Recorder::default(), NullSink::new(), ManualClock::new(0));

        assert!(player.next_frame(&mut out, &mut audio, &mut clock).unwrap());
        assert!(player.next_frame(&mut out, &mut audio, &mut clock).unwrap());
        assert_eq!(player.session().frame_num(), 2);
        assert_eq!(player.session().images_decoded(), 1);

        assert!(player.next_frame(&mut out, &mut audio, &mut clock).unwrap());
        assert_eq!(player.session().images_decoded(), 2);
        assert_eq!(out.frames, vec![vec![1; 8], vec![1; 8], vec![2; 8]]);
    }

    #[test]
    fn test_open_path() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&stream(&[vec![keyframe(&[3; 8])]]).into_inner()).unwrap();
        let player = HnmPlayer::open_path(file.path(), PlayerConfig::default()).unwrap();
        assert_eq!(player.header().width, 4);
    }
}
