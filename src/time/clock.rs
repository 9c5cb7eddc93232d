// Millisecond clock used to pace playback
// Real time comes from `SystemClock`; tests drive `ManualClock` by hand

use std::time::{Duration, Instant};

/// Remaining time (ms) below which waiting spins instead of sleeping
pub const SPIN_THRESHOLD_MS: f64 = 2.0;

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Blocks for roughly `ms` milliseconds
    fn sleep_ms(&mut self, ms: u64);

    /// One short busy-wait step
    fn spin(&mut self) {
        std::hint::spin_loop();
    }

    /// Blocks until `now_ms() >= deadline`
    ///
    /// Sleeps while the deadline is further away than
    /// [`SPIN_THRESHOLD_MS`], then spins.
    fn wait_until(&mut self, deadline: f64) {
        loop {
            let remaining = deadline - self.now_ms() as f64;
            if remaining <= 0.0 {
                break;
            }
            if remaining > SPIN_THRESHOLD_MS {
                self.sleep_ms((remaining - SPIN_THRESHOLD_MS).ceil() as u64);
            } else {
                self.spin();
            }
        }
    }
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Clock that only moves when told to
///
/// Sleeping advances it by the requested amount and each spin by one
/// millisecond, so waits complete instantly in tests and tools.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: u64,
    sleeps: u64,
    spins: u64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: start_ms,
            ..Self::default()
        }
    }

    /// Moves time forward without waiting
    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    /// Number of `sleep_ms` calls so far
    pub fn sleeps(&self) -> u64 {
        self.sleeps
    }

    /// Number of `spin` calls so far
    pub fn spins(&self) -> u64 {
        self.spins
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps += 1;
        self.now += ms;
    }

    fn spin(&mut self) {
        self.spins += 1;
        self.now += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_until_sleeps_then_spins() {
        let mut clock = ManualClock::new(100);
        clock.wait_until(150.5);
        assert_eq!(clock.now_ms(), 151);
        assert!(clock.sleeps() >= 1);
        assert!(clock.spins() >= 1);
    }

    #[test]
    fn test_wait_until_past_deadline() {
        let mut clock = ManualClock::new(100);
        clock.wait_until(50.0);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.sleeps() + clock.spins(), 0);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let mut clock = SystemClock::new();
        let a = clock.now_ms();
        clock.wait_until(a as f64 + 3.0);
        assert!(clock.now_ms() >= a + 3);
    }
}
