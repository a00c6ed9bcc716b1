//! Cooperative countdown timer.
//!
//! Checked on every poll against the caller's monotonic millisecond clock;
//! nothing here sleeps or blocks.

/// One-shot countdown measured in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    started_at: u64,
    period_ms: u32,
    running: bool,
}

impl Countdown {
    pub const fn new() -> Self {
        Self {
            started_at: 0,
            period_ms: 0,
            running: false,
        }
    }

    /// Arm the countdown for `period_ms` starting at `now`.
    pub fn start(&mut self, now: u64, period_ms: u32) {
        self.started_at = now;
        self.period_ms = period_ms;
        self.running = true;
    }

    /// Re-arm with the current period.
    pub fn restart(&mut self, now: u64) {
        self.start(now, self.period_ms);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub const fn is_running(&self) -> bool {
        self.running
    }

    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Milliseconds left, `0` when stopped or elapsed.
    pub fn remaining(&self, now: u64) -> u64 {
        if !self.running {
            return 0;
        }
        let deadline = self.started_at + u64::from(self.period_ms);
        deadline.saturating_sub(now)
    }

    /// Returns `true` exactly once when the period has elapsed, then stops.
    pub fn just_finished(&mut self, now: u64) -> bool {
        if self.running && now.saturating_sub(self.started_at) >= u64::from(self.period_ms) {
            self.running = false;
            return true;
        }
        false
    }
}
