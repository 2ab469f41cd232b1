//! Mapping from clock events to audio cues.
//!
//! Nothing here plays sound or looks at time. The engine asks for a cue on
//! every tick and at every phase boundary and forwards the answer; the host
//! decides how a cue sounds. Swapping the audio backend never touches this
//! module or the engine.

use crate::session::Phase;

/// Default size of the warning window: ticks are audible during the final
/// ten seconds of a phase.
pub const DEFAULT_WARNING_WINDOW: u32 = 10;

/// Abstract audio event. Carries no audio data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Cue {
    RoundTick,
    RoundEnd,
    RestTick,
    RestEnd,
}

impl Cue {
    /// True for the cues that mark the end of a phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Cue::RoundEnd | Cue::RestEnd)
    }
}

/// Pure cue policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueScheduler {
    warning_window: u32,
}

impl CueScheduler {
    pub fn new(warning_window: u32) -> Self {
        Self { warning_window }
    }

    pub fn warning_window(&self) -> u32 {
        self.warning_window
    }

    /// Picks the cue for a clock event.
    ///
    /// `remaining` is the value after the tick's decrement. A terminal event
    /// always yields the phase's end cue. A non-terminal tick is audible only
    /// when it lands inside the warning window and above zero, so the last
    /// tick sounds one second before the end cue.
    pub fn cue_for(&self, phase: Phase, remaining: u32, is_terminal: bool) -> Option<Cue> {
        if is_terminal {
            return Some(match phase {
                Phase::Round => Cue::RoundEnd,
                Phase::Rest => Cue::RestEnd,
            });
        }

        if remaining == 0 || remaining > self.warning_window {
            return None;
        }

        Some(match phase {
            Phase::Round => Cue::RoundTick,
            Phase::Rest => Cue::RestTick,
        })
    }
}

impl Default for CueScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_WINDOW)
    }
}
