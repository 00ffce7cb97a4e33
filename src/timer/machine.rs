//! The timer state machine.
//!
//! [`TimerMachine`] owns a [`TimerState`] and exposes the user and driver
//! operations. Every operation is total: it replaces the state in one step and
//! returns the effects the caller should dispatch.

use crate::types::{Settings, TimerMode, TimerState};

use super::effect::{Chime, CompletedSession, Effect, Notice};
use super::rehydrate::rehydrate;

// ============================================================================
// Transition
// ============================================================================

/// Moves `state` to the mode that follows its current one.
///
/// Work increments the session tally and routes to a short or long break by
/// the interval rule; a break always routes back to work. The running flag and
/// timestamp are left to the caller. Returns the mode that ended.
pub(super) fn advance(state: &mut TimerState) -> TimerMode {
    let ended = state.mode;
    let next = match ended {
        TimerMode::Work => {
            state.sessions_completed = state.sessions_completed.saturating_add(1);
            state.settings.break_after(state.sessions_completed)
        }
        TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Work,
    };
    state.mode = next;
    state.time_left = state.settings.seconds_for(next);
    ended
}

/// History record for a session of `mode` that ran its full length.
pub(super) fn completed(mode: TimerMode, settings: &Settings) -> CompletedSession {
    CompletedSession {
        mode,
        elapsed_seconds: settings.seconds_for(mode),
    }
}

// ============================================================================
// TimerMachine
// ============================================================================

/// Single owner of the timer state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerMachine {
    state: TimerState,
}

impl TimerMachine {
    /// Wraps a state, clamping any out-of-range settings.
    pub fn new(mut state: TimerState) -> Self {
        state.settings = state.settings.sanitized();
        Self { state }
    }

    /// Returns the current state.
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Builds a machine from a persisted snapshot as of `now_ms`.
    ///
    /// See [`rehydrate`] for the reconciliation rules.
    pub fn rehydrate(snapshot: TimerState, now_ms: i64) -> (Self, Vec<Effect>) {
        let (state, effects) = rehydrate(snapshot, now_ms);
        (Self::new(state), effects)
    }

    /// Consumes the machine, returning its state.
    pub fn into_state(self) -> TimerState {
        self.state
    }

    /// Advances the countdown by one second.
    ///
    /// Inactive timers and an already-zero countdown are left untouched. At
    /// one second remaining the current mode completes.
    pub fn tick(&mut self, now_ms: i64) -> Vec<Effect> {
        if !self.state.is_active {
            return Vec::new();
        }

        match self.state.time_left {
            0 => Vec::new(),
            1 => self.complete(now_ms),
            _ => {
                self.state.time_left -= 1;
                self.state.last_tick_timestamp = now_ms;
                Vec::new()
            }
        }
    }

    fn complete(&mut self, now_ms: i64) -> Vec<Effect> {
        let ended = advance(&mut self.state);
        let settings = &self.state.settings;

        self.state.is_active = match ended {
            TimerMode::Work => settings.auto_start_breaks,
            TimerMode::ShortBreak | TimerMode::LongBreak => settings.auto_start_work,
        };
        self.state.last_tick_timestamp = now_ms;

        vec![
            Effect::StopSound,
            Effect::SaveSession(completed(ended, &self.state.settings)),
            Effect::PlaySound(Chime::for_ended(ended)),
            Effect::Notify(Notice::for_transition(ended, self.state.mode)),
        ]
    }

    /// Flips the running flag.
    ///
    /// Beyond the plain flip, activation refreshes a non-zero
    /// `last_tick_timestamp` so a crash before the next tick does not count
    /// the paused interval as elapsed. A zero timestamp stays zero.
    pub fn toggle(&mut self, now_ms: i64) -> Vec<Effect> {
        self.state.is_active = !self.state.is_active;
        if self.state.is_active {
            if self.state.last_tick_timestamp != 0 {
                self.state.last_tick_timestamp = now_ms;
            }
            Vec::new()
        } else {
            vec![Effect::StopSound]
        }
    }

    /// Restarts the current mode from its nominal duration, paused.
    pub fn reset(&mut self) -> Vec<Effect> {
        self.state.time_left = self.state.nominal_seconds();
        self.state.is_active = false;
        vec![Effect::StopSound]
    }

    /// Jumps to the next mode, paused, without recording a session.
    ///
    /// Also stamps `last_tick_timestamp` with `now_ms`, like a natural
    /// transition.
    pub fn skip(&mut self, now_ms: i64) -> Vec<Effect> {
        advance(&mut self.state);
        self.state.is_active = false;
        self.state.last_tick_timestamp = now_ms;
        vec![Effect::StopSound]
    }

    /// Adds `seconds` to the countdown.
    pub fn extend(&mut self, seconds: u32) -> Vec<Effect> {
        self.state.time_left = self.state.time_left.saturating_add(seconds);
        Vec::new()
    }

    /// Switches to `mode` outside the natural cycle, paused.
    pub fn set_mode(&mut self, mode: TimerMode) -> Vec<Effect> {
        self.state.mode = mode;
        self.state.time_left = self.state.nominal_seconds();
        self.state.is_active = false;
        vec![Effect::StopSound]
    }

    /// Overrides the duration of `mode`; restarts the countdown if it is current.
    pub fn set_custom_time(&mut self, mode: TimerMode, minutes: u32) -> Vec<Effect> {
        self.state.settings.set_minutes(mode, minutes);
        if self.state.mode == mode {
            self.state.time_left = self.state.nominal_seconds();
        }
        Vec::new()
    }

    /// Replaces the settings and restarts the current mode, paused.
    pub fn update_settings(&mut self, settings: Settings) -> Vec<Effect> {
        self.state.settings = settings.sanitized();
        self.state.time_left = self.state.nominal_seconds();
        self.state.is_active = false;
        Vec::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
