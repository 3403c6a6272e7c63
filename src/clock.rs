use std::fmt;

/// Countdown clock for one timed attempt.
///
/// The host schedules one `tick()` per wall-clock second while the clock is
/// `Running` (see `runtime`). The clock itself is not thread-safe; calls must
/// be serialized the way a UI event loop serializes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    InvalidDuration,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::InvalidDuration => write!(f, "timer duration must be positive"),
        }
    }
}

impl std::error::Error for ClockError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    total_secs: u32,
    remaining_secs: u32,
    state: ClockState,
}

impl SessionClock {
    /// Start a new countdown. Rejects a zero duration.
    pub fn start(total_secs: u32) -> Result<Self, ClockError> {
        if total_secs == 0 {
            return Err(ClockError::InvalidDuration);
        }
        Ok(Self {
            total_secs,
            remaining_secs: total_secs,
            state: ClockState::Running,
        })
    }

    /// A clock holding its full duration without running, for preview screens
    /// and resets.
    pub fn idle(total_secs: u32) -> Self {
        Self {
            total_secs,
            remaining_secs: total_secs,
            state: ClockState::Idle,
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `true` exactly once, on the tick that reaches zero and flips
    /// the clock to `Expired`. Ticking an `Idle` or `Expired` clock is a
    /// no-op that returns `false`.
    pub fn tick(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            self.state = ClockState::Expired;
            return true;
        }
        false
    }

    /// Put the clock back to `Idle` with a fresh duration. Always succeeds;
    /// the host must also cancel its periodic tick scheduling.
    pub fn reset(&mut self, total_secs: u32) {
        self.total_secs = total_secs;
        self.remaining_secs = total_secs;
        self.state = ClockState::Idle;
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.total_secs - self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn is_expired(&self) -> bool {
        self.state == ClockState::Expired
    }
}
