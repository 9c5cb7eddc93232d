// Fixed-rate frame pacing with drift compensation
// Each frame's deadline is the ideal time minus the lateness carried over
// from the previous wait. A frame later than the threshold restarts the
// schedule from the moment it went out.

use super::clock::Clock;

/// Outcome of waiting for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSlot {
    /// Time the frame was due, in clock milliseconds
    pub deadline: f64,
    /// Clock time when the wait returned
    pub presented_at: u64,
    /// The frame was already more than the sync threshold behind
    pub late: bool,
}

/// Frame pacing state
#[derive(Debug, Clone)]
pub struct FrameTimer {
    interval: f64,
    threshold: f64,
    expected: f64,
    drift: f64,
}

impl FrameTimer {
    /// Creates a timer for `fps` frames per second
    ///
    /// # Arguments
    /// * `fps` - Frame rate; must be positive
    /// * `threshold_ms` - Lateness beyond which a frame counts as late
    pub fn new(fps: f32, threshold_ms: u32) -> Self {
        Self {
            interval: 1000.0 / fps as f64,
            threshold: threshold_ms as f64,
            expected: 0.0,
            drift: 0.0,
        }
    }

    /// Milliseconds between frames
    pub fn interval_ms(&self) -> f64 {
        self.interval
    }

    /// Lateness carried into the next deadline
    pub fn drift_ms(&self) -> f64 {
        self.drift
    }

    /// Starts pacing from `now`
    pub fn reset(&mut self, now: u64) {
        self.expected = now as f64;
        self.drift = 0.0;
    }

    /// Computes the next deadline and whether it has already been missed
    pub fn advance(&mut self, now: u64) -> (f64, bool) {
        self.expected += self.interval;
        let deadline = self.expected - self.drift;
        (deadline, now as f64 > deadline + self.threshold)
    }

    /// Records when the frame actually went out
    pub fn arrived(&mut self, deadline: f64, now: u64, late: bool) {
        if late {
            self.reset(now);
        } else {
            self.drift = now as f64 - deadline;
        }
    }

    /// Advances, waits for the deadline on `clock`, and records drift
    pub fn wait(&mut self, clock: &mut dyn Clock) -> FrameSlot {
        let (deadline, late) = self.advance(clock.now_ms());
        clock.wait_until(deadline);
        let presented_at = clock.now_ms();
        self.arrived(deadline, presented_at, late);
        FrameSlot {
            deadline,
            presented_at,
            late,
        }
    }
}
