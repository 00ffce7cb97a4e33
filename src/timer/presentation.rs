//! Presentation hints derived from the timer state.
//!
//! External collaborators (sound loop, status indicator, strict break overlay,
//! idle sensing) react to `(mode, is_active, settings)` rather than to the
//! individual operations. [`Presentation::derive`] is the single place that
//! mapping lives.

use crate::types::{TimerMode, TimerState};

use super::effect::LoopSound;

/// Values shown by a tray or status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusHint {
    /// Current mode
    pub mode: TimerMode,
    /// Remaining seconds
    pub time_left: u32,
    /// Running flag
    pub is_active: bool,
    /// Completed work sessions
    pub sessions_completed: u32,
}

/// Everything the outside world should present for a given state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presentation {
    /// Sound that should currently be looping
    pub loop_sound: Option<LoopSound>,
    /// Fullscreen break requested
    pub strict_break: bool,
    /// Idle sensing should be running
    pub idle_detection: bool,
    /// Indicator values
    pub status: StatusHint,
}

impl Presentation {
    /// Derives the hints for `state`.
    pub fn derive(state: &TimerState) -> Self {
        let settings = &state.settings;

        let loop_sound = match (state.is_active, state.mode) {
            (false, _) => None,
            (true, TimerMode::Work) if settings.enable_ticking => {
                LoopSound::from_ticking(settings.ticking_sound)
            }
            (true, TimerMode::Work) => None,
            (true, _) if settings.enable_break_sound => Some(LoopSound::Birds),
            (true, _) => None,
        };

        Self {
            loop_sound,
            strict_break: settings.enable_strict_break
                && state.mode.is_break()
                && state.is_active,
            idle_detection: settings.pause_when_idle,
            status: StatusHint {
                mode: state.mode,
                time_left: state.time_left,
                is_active: state.is_active,
                sessions_completed: state.sessions_completed,
            },
        }
    }
}
