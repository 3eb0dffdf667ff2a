use std::time::Duration;

/// Outbound `playerState` cadence.
pub static SYNC_INTERVAL: Duration = Duration::from_millis(50);

/// Frame rate the damage windows are authored against. Fixed, not per clip.
pub const ASSUMED_FRAMERATE: f32 = 24.0;

/// A timer counted down by the simulation's `dt`, never by the wall clock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn from_secs(secs: f32) -> Countdown {
        Countdown { remaining: secs.max(0.0) }
    }

    pub fn start(&mut self, secs: f32) {
        self.remaining = secs.max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    /// Returns true on the call that brings the timer to zero.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        self.remaining <= 0.0
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

/// Fires at most once per `advance` whenever a full period has accumulated.
#[derive(Clone, Copy, Debug)]
pub struct Interval {
    period: f32,
    accumulated: f32,
}

impl Interval {
    pub fn new(period: Duration) -> Interval {
        Interval { period: period.as_secs_f32(), accumulated: 0.0 }
    }

    pub fn advance(&mut self, dt: f32) -> bool {
        self.accumulated += dt;
        if self.accumulated >= self.period {
            // Drop the backlog instead of bursting after a long frame.
            self.accumulated %= self.period;
            true
        } else {
            false
        }
    }
}
