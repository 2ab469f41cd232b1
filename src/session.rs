/// Which interval is being counted down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Phase {
    #[strum(serialize = "ROUND")]
    Round,
    #[strum(serialize = "REST")]
    Rest,
}

impl Phase {
    /// The phase entered once this one has run out.
    pub fn next(self) -> Self {
        match self {
            Phase::Round => Phase::Rest,
            Phase::Rest => Phase::Round,
        }
    }
}

/// Lifecycle of the countdown clock.
///
/// `Transitioning` spans the settle delay at a phase boundary; no ticks are
/// delivered while in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Status {
    Idle,
    Running,
    Paused,
    Transitioning,
}

impl Status {
    /// True while the clock is counting or about to resume counting on its
    /// own. Configuration edits and presets are refused in these states.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Running | Status::Transitioning)
    }
}

/// Snapshot of the countdown handed to the host after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub phase: Phase,
    pub status: Status,
}

impl TimerState {
    pub fn idle(round_seconds: u32) -> Self {
        Self {
            remaining_seconds: round_seconds,
            phase: Phase::Round,
            status: Status::Idle,
        }
    }

    /// Whether the clock is inside the final `window` seconds of its phase.
    /// Zero is outside the window: by then the phase is over.
    pub fn in_warning_window(&self, window: u32) -> bool {
        self.remaining_seconds > 0 && self.remaining_seconds <= window
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(0)
    }
}
