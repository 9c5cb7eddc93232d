//! Clocks and frame pacing
//!
//! Playback never reads the system time directly; everything goes through
//! the [`Clock`] trait so pacing can run against a manual clock.

pub mod clock;
pub mod frame_timer;

pub use clock::{Clock, ManualClock, SystemClock, SPIN_THRESHOLD_MS};
pub use frame_timer::{FrameSlot, FrameTimer};
