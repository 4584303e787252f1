//! One-second-resolution exam countdown.
//!
//! The countdown never schedules anything itself: the owner delivers one
//! [`Countdown::tick`] per elapsed second (see [`crate::runner`]). Keeping
//! the timer state owned by the session means a cancelled or restarted
//! countdown cannot be decremented by a tick meant for an earlier run.

/// Result of delivering one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown is not running; nothing changed.
    Idle,
    /// One second elapsed; this many remain.
    Remaining(u32),
    /// This tick brought the countdown to zero. Raised once per `start`.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    state: State,
}

impl Countdown {
    /// A stopped countdown showing `duration_secs` remaining.
    pub fn new(duration_secs: u32) -> Self {
        Self {
            remaining: duration_secs,
            state: State::Idle,
        }
    }

    /// Begin counting down from `duration_secs`.
    pub fn start(&mut self, duration_secs: u32) {
        self.remaining = duration_secs;
        self.state = State::Running;
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> Tick {
        if self.state != State::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = State::Expired;
            Tick::Expired
        } else {
            Tick::Remaining(self.remaining)
        }
    }

    /// Stop ticking. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.state == State::Running {
            self.state = State::Cancelled;
        }
    }

    /// Stop and show `duration_secs` again, as before a fresh start.
    pub fn reset(&mut self, duration_secs: u32) {
        self.remaining = duration_secs;
        self.state = State::Idle;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }
}
