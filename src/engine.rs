//! The round/rest countdown state machine.
//!
//! The engine never reads a clock. The host delivers one [`TimerEngine::tick`]
//! per second while the status is `Running`. When a phase runs out the tick
//! returns a [`Settle`] request; the host waits out its delay and hands the
//! token back through [`TimerEngine::settle`]. All operations must be called
//! from one thread, in order.

use std::time::Duration;

use crate::config::{ConfigField, ConfigStore, Configuration, Step};
use crate::cue::{Cue, CueScheduler};
use crate::session::{Phase, Status, TimerState};

/// Settle delay after a round ends. Long enough for the buzzer to finish.
pub const ROUND_SETTLE: Duration = Duration::from_millis(950);
/// Settle delay after a rest ends.
pub const REST_SETTLE: Duration = Duration::from_millis(100);

/// Tunable timing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPolicy {
    pub cues: CueScheduler,
    pub round_settle: Duration,
    pub rest_settle: Duration,
}

impl TimingPolicy {
    /// Delay inserted when leaving `phase`.
    pub fn settle_after(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Round => self.round_settle,
            Phase::Rest => self.rest_settle,
        }
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            cues: CueScheduler::default(),
            round_settle: ROUND_SETTLE,
            rest_settle: REST_SETTLE,
        }
    }
}

/// Identifies one pending phase flip. A token outlives its flip only as a
/// stale value: once the flip has happened or been cancelled, handing the
/// token back does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettleToken(u64);

/// A one-shot request for the host: call [`TimerEngine::settle`] with
/// `token` once `delay` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settle {
    pub token: SettleToken,
    pub delay: Duration,
}

/// Outcome of an accepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub state: TimerState,
    pub cue: Option<Cue>,
    pub settle: Option<Settle>,
}

impl Update {
    fn quiet(state: TimerState) -> Self {
        Self {
            state,
            cue: None,
            settle: None,
        }
    }
}

/// Single countdown clock alternating rounds and rests.
///
/// Operations issued in a state that forbids them return `None` and leave
/// the engine untouched.
#[derive(Debug)]
pub struct TimerEngine<S: ConfigStore> {
    store: S,
    config: Configuration,
    policy: TimingPolicy,
    state: TimerState,
    pending: Option<SettleToken>,
    next_token: u64,
}

impl<S: ConfigStore> TimerEngine<S> {
    pub fn new(store: S, policy: TimingPolicy) -> Self {
        let config = store.load().clamped();
        Self {
            store,
            config,
            policy,
            state: TimerState::idle(config.round_duration()),
            pending: None,
            next_token: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn config(&self) -> Configuration {
        self.config
    }

    pub fn policy(&self) -> &TimingPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Starts or resumes the countdown. A finished clock is rearmed with a
    /// fresh round first.
    pub fn start(&mut self) -> Option<Update> {
        if !matches!(self.state.status, Status::Idle | Status::Paused) {
            tracing::debug!(status = %self.state.status, "start ignored");
            return None;
        }

        if self.state.remaining_seconds == 0 {
            self.state.phase = Phase::Round;
            self.state.remaining_seconds = self.config.round_duration();
        }
        self.state.status = Status::Running;

        tracing::info!(
            phase = %self.state.phase,
            remaining = self.state.remaining_seconds,
            "timer started"
        );
        Some(Update::quiet(self.state))
    }

    pub fn pause(&mut self) -> Option<Update> {
        if self.state.status != Status::Running {
            tracing::debug!(status = %self.state.status, "pause ignored");
            return None;
        }

        self.state.status = Status::Paused;
        tracing::info!(remaining = self.state.remaining_seconds, "timer paused");
        Some(Update::quiet(self.state))
    }

    /// Back to an idle, full-length round. Any pending flip is cancelled.
    pub fn reset(&mut self) -> Update {
        if let Some(token) = self.pending.take() {
            tracing::debug!(?token, "pending flip cancelled");
        }
        self.state = TimerState::idle(self.config.round_duration());
        tracing::info!(remaining = self.state.remaining_seconds, "timer reset");
        Update::quiet(self.state)
    }

    /// Advances the clock by one second.
    ///
    /// Reaching zero ends the phase on the same tick: the end cue is emitted
    /// and the engine enters `Transitioning` until [`TimerEngine::settle`].
    pub fn tick(&mut self) -> Option<Update> {
        match self.state.status {
            Status::Running => {}
            Status::Transitioning => {
                debug_assert!(false, "tick delivered while transitioning");
                tracing::warn!("tick delivered while transitioning, ignoring");
                return None;
            }
            Status::Idle | Status::Paused => {
                tracing::debug!(status = %self.state.status, "tick ignored");
                return None;
            }
        }

        if self.state.remaining_seconds == 0 {
            return Some(self.begin_transition());
        }

        self.state.remaining_seconds -= 1;
        if self.state.remaining_seconds == 0 {
            return Some(self.begin_transition());
        }

        let cue = self
            .policy
            .cues
            .cue_for(self.state.phase, self.state.remaining_seconds, false);
        tracing::debug!(remaining = self.state.remaining_seconds, ?cue, "tick");
        Some(Update {
            state: self.state,
            cue,
            settle: None,
        })
    }

    fn begin_transition(&mut self) -> Update {
        let leaving = self.state.phase;
        let cue = self.policy.cues.cue_for(leaving, 0, true);
        let token = SettleToken(self.next_token);
        self.next_token += 1;

        self.state.status = Status::Transitioning;
        self.pending = Some(token);

        let delay = self.policy.settle_after(leaving);
        tracing::info!(phase = %leaving, ?delay, "phase finished");
        Update {
            state: self.state,
            cue,
            settle: Some(Settle { token, delay }),
        }
    }

    /// Completes the flip requested by a terminal tick: switches phase, loads
    /// the new phase's duration from the current configuration and resumes
    /// running. Tokens from cancelled or completed flips are ignored.
    pub fn settle(&mut self, token: SettleToken) -> Option<Update> {
        if self.pending != Some(token) || self.state.status != Status::Transitioning {
            tracing::debug!(?token, "stale settle ignored");
            return None;
        }

        self.pending = None;
        self.state.phase = self.state.phase.next();
        self.state.remaining_seconds = self.config.duration_for(self.state.phase);
        self.state.status = Status::Running;

        tracing::info!(
            phase = %self.state.phase,
            remaining = self.state.remaining_seconds,
            "phase started"
        );
        Some(Update::quiet(self.state))
    }

    /// Steps one setting up or down. Refused while the clock is active.
    pub fn adjust_config(&mut self, field: ConfigField, step: Step) -> Option<Update> {
        if self.state.status.is_active() {
            tracing::debug!(%field, "adjust ignored while active");
            return None;
        }
        let next = self.config.stepped(field, step);
        Some(self.apply_config(next, field.phase()))
    }

    /// Replaces one setting from text input. Refused while the clock is
    /// active; malformed or out-of-range values clamp.
    pub fn set_config(&mut self, field: ConfigField, raw: &str) -> Option<Update> {
        if self.state.status.is_active() {
            tracing::debug!(%field, "edit ignored while active");
            return None;
        }
        let next = self.config.with_text(field, raw);
        Some(self.apply_config(next, field.phase()))
    }

    /// Sets the round to a whole number of minutes. When idle the clock is
    /// reset to the new round length immediately.
    pub fn select_preset(&mut self, minutes: u32) -> Option<Update> {
        if self.state.status.is_active() {
            tracing::debug!(minutes, "preset ignored while active");
            return None;
        }

        let next = self.config.with_preset(minutes);
        self.commit(next);
        if self.state.status == Status::Idle {
            self.state.phase = Phase::Round;
            self.state.remaining_seconds = self.config.round_duration();
        }
        tracing::info!(minutes = next.round_minutes, "preset selected");
        Some(Update::quiet(self.state))
    }

    /// Takes a fresh snapshot from the store after it reported a change.
    ///
    /// The snapshot replaces the engine's copy, so the next phase flip uses
    /// it; the displayed countdown only follows when idle. A missing or
    /// unreadable record leaves the current settings in place.
    pub fn reload_config(&mut self) -> Update {
        let Some(loaded) = self.store.reload() else {
            tracing::debug!("no usable settings record, reload skipped");
            return Update::quiet(self.state);
        };
        let loaded = loaded.clamped();
        if loaded != self.config {
            tracing::info!(?loaded, "settings changed on disk");
            self.config = loaded;
            self.rederive_if_idle(self.state.phase);
        }
        Update::quiet(self.state)
    }

    fn apply_config(&mut self, next: Configuration, affected: Phase) -> Update {
        self.commit(next);
        self.rederive_if_idle(affected);
        Update::quiet(self.state)
    }

    fn commit(&mut self, next: Configuration) {
        if next == self.config {
            return;
        }
        self.config = next;
        if let Err(err) = self.store.save(&self.config) {
            tracing::warn!(error = %err, "failed to persist settings");
        }
    }

    fn rederive_if_idle(&mut self, affected: Phase) {
        if self.state.status == Status::Idle && self.state.phase == affected {
            self.state.remaining_seconds = self.config.duration_for(affected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use crate::error::{Result, RingsideError};
    use assert_matches::assert_matches;

    fn engine(round_secs: u32, rest_minutes: f64) -> TimerEngine<MemoryConfigStore> {
        let cfg = Configuration::from_round_seconds(round_secs, rest_minutes);
        TimerEngine::new(MemoryConfigStore::new(cfg), TimingPolicy::default())
    }

    fn run_to_transition(engine: &mut TimerEngine<MemoryConfigStore>) -> Update {
        loop {
            let update = engine.tick().expect("tick while running");
            if update.state.status == Status::Transitioning {
                return update;
            }
        }
    }

    #[test]
    fn starts_idle_with_full_round() {
        let engine = engine(90, 1.0);
        assert_eq!(engine.state(), TimerState::idle(90));
    }

    #[test]
    fn start_runs_from_idle_and_paused() {
        let mut engine = engine(90, 1.0);
        assert_eq!(engine.start().unwrap().state.status, Status::Running);
        engine.pause().unwrap();
        assert_eq!(engine.start().unwrap().state.status, Status::Running);
    }

    #[test]
    fn start_is_noop_while_running_or_transitioning() {
        let mut engine = engine(1, 1.0);
        engine.start().unwrap();
        assert!(engine.start().is_none());
        run_to_transition(&mut engine);
        assert!(engine.start().is_none());
        assert_eq!(engine.state().status, Status::Transitioning);
    }

    #[test]
    fn start_rearms_a_finished_clock() {
        let mut engine = engine(0, 1.0);
        engine.state.phase = Phase::Rest;
        engine.set_config(ConfigField::RoundSeconds, "20").unwrap();
        assert_eq!(engine.state().remaining_seconds, 0);

        let update = engine.start().unwrap();
        assert_eq!(update.state.phase, Phase::Round);
        assert_eq!(update.state.remaining_seconds, 20);
    }

    #[test]
    fn pause_only_from_running() {
        let mut engine = engine(30, 1.0);
        assert!(engine.pause().is_none());
        engine.start().unwrap();
        assert_eq!(engine.pause().unwrap().state.status, Status::Paused);
        assert!(engine.pause().is_none());
    }

    #[test]
    fn tick_decrements_by_one() {
        let mut engine = engine(30, 1.0);
        engine.start().unwrap();
        let update = engine.tick().unwrap();
        assert_eq!(update.state.remaining_seconds, 29);
        assert_eq!(update.state.phase, Phase::Round);
        assert_eq!(update.state.status, Status::Running);
        assert_eq!(update.cue, None);
        assert_eq!(update.settle, None);
    }

    #[test]
    fn tick_ignored_while_paused_or_idle() {
        let mut engine = engine(30, 1.0);
        assert!(engine.tick().is_none());
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.pause().unwrap();
        assert!(engine.tick().is_none());
        assert_eq!(engine.state().remaining_seconds, 29);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "tick delivered while transitioning")]
    fn tick_while_transitioning_is_a_driver_bug() {
        let mut engine = engine(1, 1.0);
        engine.start().unwrap();
        run_to_transition(&mut engine);
        let _ = engine.tick();
    }

    #[test]
    fn ticks_sound_inside_warning_window() {
        let mut engine = engine(12, 1.0);
        engine.start().unwrap();
        let cues: Vec<Option<Cue>> = (0..12).map(|_| engine.tick().unwrap().cue).collect();

        assert_eq!(cues[0], None); // 11 left
        assert!(cues[1..11].iter().all(|c| *c == Some(Cue::RoundTick)));
        assert_eq!(cues[11], Some(Cue::RoundEnd));
    }

    #[test]
    fn reaching_zero_ends_the_round() {
        let mut engine = engine(2, 1.0);
        engine.start().unwrap();
        engine.tick().unwrap();
        let update = engine.tick().unwrap();

        assert_eq!(update.state.remaining_seconds, 0);
        assert_eq!(update.state.status, Status::Transitioning);
        assert_eq!(update.cue, Some(Cue::RoundEnd));
        assert_matches!(update.settle, Some(Settle { delay, .. }) if delay == ROUND_SETTLE);
    }

    #[test]
    fn running_at_zero_transitions_on_next_tick() {
        let mut engine = engine(0, 1.0);
        let started = engine.start().unwrap();
        assert_eq!(started.state.remaining_seconds, 0);

        let update = engine.tick().unwrap();
        assert_eq!(update.state.status, Status::Transitioning);
        assert_eq!(update.cue, Some(Cue::RoundEnd));
    }

    #[test]
    fn settle_flips_to_rest_with_configured_length() {
        let mut engine = engine(1, 0.5);
        engine.start().unwrap();
        let settle = run_to_transition(&mut engine).settle.unwrap();

        let update = engine.settle(settle.token).unwrap();
        assert_eq!(update.state.phase, Phase::Rest);
        assert_eq!(update.state.remaining_seconds, 30);
        assert_eq!(update.state.status, Status::Running);
    }

    #[test]
    fn rest_end_uses_short_settle() {
        let mut engine = engine(1, 0.1);
        engine.start().unwrap();
        let settle = run_to_transition(&mut engine).settle.unwrap();
        engine.settle(settle.token).unwrap();

        let update = run_to_transition(&mut engine);
        assert_eq!(update.cue, Some(Cue::RestEnd));
        assert_matches!(update.settle, Some(Settle { delay, .. }) if delay == REST_SETTLE);
    }

    #[test]
    fn settle_token_is_single_use() {
        let mut engine = engine(1, 1.0);
        engine.start().unwrap();
        let settle = run_to_transition(&mut engine).settle.unwrap();
        assert!(engine.settle(settle.token).is_some());
        assert!(engine.settle(settle.token).is_none());
    }

    #[test]
    fn reset_cancels_pending_flip() {
        let mut engine = engine(1, 1.0);
        engine.start().unwrap();
        let settle = run_to_transition(&mut engine).settle.unwrap();

        let update = engine.reset();
        assert_eq!(update.state, TimerState::idle(1));
        assert!(engine.settle(settle.token).is_none());
        assert_eq!(engine.state(), TimerState::idle(1));
    }

    #[test]
    fn stale_token_cannot_complete_a_later_transition() {
        let mut engine = engine(1, 1.0);
        engine.start().unwrap();
        let stale = run_to_transition(&mut engine).settle.unwrap();
        let _ = engine.reset();

        engine.start().unwrap();
        let fresh = run_to_transition(&mut engine).settle.unwrap();
        assert_ne!(stale.token, fresh.token);
        assert!(engine.settle(stale.token).is_none());
        assert!(engine.settle(fresh.token).is_some());
    }

    #[test]
    fn flip_reads_current_configuration() {
        let mut engine = engine(2, 1.0);
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.pause().unwrap();
        engine.set_config(ConfigField::RestMinutes, "0.5").unwrap();
        engine.start().unwrap();

        let settle = run_to_transition(&mut engine).settle.unwrap();
        let update = engine.settle(settle.token).unwrap();
        assert_eq!(update.state.remaining_seconds, 30);
    }

    #[test]
    fn edits_rejected_while_active() {
        let mut engine = engine(1, 1.0);
        engine.start().unwrap();
        assert!(engine
            .adjust_config(ConfigField::RoundMinutes, Step::Increment)
            .is_none());
        assert!(engine.set_config(ConfigField::RoundSeconds, "5").is_none());
        assert!(engine.select_preset(4).is_none());

        run_to_transition(&mut engine);
        assert!(engine
            .adjust_config(ConfigField::RestMinutes, Step::Increment)
            .is_none());
        assert!(engine.select_preset(4).is_none());
        assert_eq!(engine.config(), Configuration::from_round_seconds(1, 1.0));
    }

    #[test]
    fn idle_edit_updates_display() {
        let mut engine = engine(60, 1.0);
        let update = engine
            .adjust_config(ConfigField::RoundSeconds, Step::Increment)
            .unwrap();
        assert_eq!(update.state.remaining_seconds, 61);
        let update = engine.set_config(ConfigField::RoundMinutes, "3").unwrap();
        assert_eq!(update.state.remaining_seconds, 181);
    }

    #[test]
    fn seconds_clamp_at_59() {
        let mut engine = engine(59, 1.0);
        let update = engine
            .adjust_config(ConfigField::RoundSeconds, Step::Increment)
            .unwrap();
        assert_eq!(engine.config().round_seconds, 59);
        assert_eq!(update.state.remaining_seconds, 59);
    }

    #[test]
    fn rest_edit_leaves_round_display_alone() {
        let mut engine = engine(60, 1.0);
        let update = engine
            .adjust_config(ConfigField::RestMinutes, Step::Increment)
            .unwrap();
        assert_eq!(update.state.remaining_seconds, 60);
        assert_eq!(engine.config().rest_minutes, 1.1);
    }

    #[test]
    fn paused_edit_keeps_countdown() {
        let mut engine = engine(60, 1.0);
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.pause().unwrap();

        let update = engine.set_config(ConfigField::RoundMinutes, "10").unwrap();
        assert_eq!(update.state.remaining_seconds, 59);
        assert_eq!(engine.config().round_minutes, 10);
    }

    #[test]
    fn preset_resets_idle_clock() {
        let mut engine = engine(95, 1.0);
        let update = engine.select_preset(7).unwrap();
        assert_eq!(update.state, TimerState::idle(420));
        assert_eq!(engine.config().round_seconds, 0);
    }

    #[test]
    fn preset_while_paused_keeps_countdown() {
        let mut engine = engine(95, 1.0);
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.pause().unwrap();

        let update = engine.select_preset(4).unwrap();
        assert_eq!(update.state.remaining_seconds, 94);
        assert_eq!(update.state.status, Status::Paused);
        assert_eq!(engine.config().round_minutes, 4);
    }

    #[test]
    fn edits_are_persisted() {
        let mut engine = engine(60, 1.0);
        engine
            .adjust_config(ConfigField::RoundMinutes, Step::Increment)
            .unwrap();
        engine.select_preset(5).unwrap();
        assert_eq!(engine.store().saves(), 2);
        assert_eq!(engine.store().load().round_minutes, 5);
    }

    #[test]
    fn unchanged_edit_skips_save() {
        let mut engine = engine(59, 1.0);
        engine
            .adjust_config(ConfigField::RoundSeconds, Step::Increment)
            .unwrap();
        assert_eq!(engine.store().saves(), 0);
    }

    #[test]
    fn reload_rederives_idle_display() {
        let mut engine = engine(60, 1.0);
        engine
            .store_mut()
            .replace(Configuration::new(2, 30, 1.0));
        let update = engine.reload_config();
        assert_eq!(update.state.remaining_seconds, 150);
    }

    #[test]
    fn reload_while_running_only_swaps_snapshot() {
        let mut engine = engine(60, 1.0);
        engine.start().unwrap();
        engine.store_mut().replace(Configuration::new(2, 30, 0.5));
        let update = engine.reload_config();
        assert_eq!(update.state.remaining_seconds, 60);
        assert_eq!(engine.config().rest_minutes, 0.5);
    }

    #[test]
    fn unreadable_file_keeps_current_settings() {
        use crate::config::FileConfigStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut engine =
            TimerEngine::new(FileConfigStore::with_path(&path), TimingPolicy::default());
        engine.set_config(ConfigField::RoundMinutes, "3").unwrap();
        engine.set_config(ConfigField::RestMinutes, "0.5").unwrap();

        // An editor truncates the file before writing it back.
        std::fs::write(&path, "").unwrap();
        let update = engine.reload_config();
        assert_eq!(update.state, TimerState::idle(180));
        assert_eq!(engine.config(), Configuration::new(3, 0, 0.5));

        engine
            .adjust_config(ConfigField::RoundSeconds, Step::Increment)
            .unwrap();
        let on_disk = FileConfigStore::with_path(&path).load();
        assert_eq!(on_disk, Configuration::new(3, 1, 0.5));
    }

    #[test]
    fn deleted_file_keeps_current_settings() {
        use crate::config::FileConfigStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut engine =
            TimerEngine::new(FileConfigStore::with_path(&path), TimingPolicy::default());
        engine.select_preset(8).unwrap();

        std::fs::remove_file(&path).unwrap();
        engine.reload_config();
        assert_eq!(engine.config().round_minutes, 8);
        assert_eq!(engine.state(), TimerState::idle(480));
    }

    struct FailingStore;

    impl ConfigStore for FailingStore {
        fn load(&self) -> Configuration {
            Configuration::default()
        }

        fn save(&mut self, _cfg: &Configuration) -> Result<()> {
            Err(RingsideError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "read-only",
            )))
        }
    }

    #[test]
    fn failed_save_is_swallowed() {
        let mut engine = TimerEngine::new(FailingStore, TimingPolicy::default());
        let update = engine
            .adjust_config(ConfigField::RoundMinutes, Step::Increment)
            .unwrap();
        assert_eq!(update.state.remaining_seconds, 360);
    }

    #[test]
    fn settle_delays_follow_policy() {
        let policy = TimingPolicy {
            round_settle: Duration::from_millis(5),
            rest_settle: Duration::from_millis(1),
            ..TimingPolicy::default()
        };
        assert_eq!(policy.settle_after(Phase::Round), Duration::from_millis(5));
        assert_eq!(policy.settle_after(Phase::Rest), Duration::from_millis(1));
    }
}
