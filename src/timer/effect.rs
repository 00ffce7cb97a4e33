//! Side-effect requests produced by the timer state machine.
//!
//! The machine never performs I/O. Each operation returns an ordered list of
//! [`Effect`]s which the daemon hands to its collaborators.

use crate::types::{TickingSound, TimerMode};

use super::presentation::Presentation;

/// Title used for every timer notification.
pub const NOTIFICATION_TITLE: &str = "🍅 ポモドーロタイマー";

// ============================================================================
// Sound names
// ============================================================================

/// Sound looped while the countdown runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopSound {
    /// Mechanical clock ticking (work)
    Clock,
    /// Kitchen timer ticking (work)
    Timer,
    /// Ambient birdsong (breaks)
    Birds,
}

impl LoopSound {
    /// Returns the sound file stem.
    pub fn name(&self) -> &'static str {
        match self {
            LoopSound::Clock => "clock",
            LoopSound::Timer => "timer",
            LoopSound::Birds => "birds",
        }
    }

    /// Maps the user's ticking choice to a loop, if any.
    pub fn from_ticking(sound: TickingSound) -> Option<Self> {
        match sound {
            TickingSound::Clock => Some(LoopSound::Clock),
            TickingSound::Timer => Some(LoopSound::Timer),
            TickingSound::None => None,
        }
    }
}

/// One-shot completion sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chime {
    /// A work session ended
    Bell,
    /// A break ended
    LoudBell,
}

impl Chime {
    /// Returns the sound file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Chime::Bell => "bell",
            Chime::LoudBell => "loud-bell",
        }
    }

    /// Chime for a session of `mode` that just ended.
    pub fn for_ended(mode: TimerMode) -> Self {
        if mode == TimerMode::Work {
            Chime::Bell
        } else {
            Chime::LoudBell
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A session that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedSession {
    /// Mode that expired
    pub mode: TimerMode,
    /// Nominal duration of that mode in seconds
    pub elapsed_seconds: u32,
}

/// Notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Action category (`work-done` or `break-done`)
    pub action_type_id: String,
}

impl Notice {
    /// Builds the notice for a natural expiry of `ended`, with `next` now current.
    pub fn for_transition(ended: TimerMode, next: TimerMode) -> Self {
        let body = match (ended, next) {
            (TimerMode::Work, TimerMode::LongBreak) => "お疲れさまでした！長い休憩の時間です。",
            (TimerMode::Work, _) => "お疲れさまでした！短い休憩の時間です。",
            _ => "休憩終了です。作業を再開しましょう！",
        };
        let action_type_id = if ended == TimerMode::Work {
            "work-done"
        } else {
            "break-done"
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: body.to_string(),
            action_type_id: action_type_id.to_string(),
        }
    }
}

// ============================================================================
// Effect
// ============================================================================

/// A fire-and-forget request to an external collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Halt any looping sound
    StopSound,
    /// Start a looping sound
    PlaySoundLoop(LoopSound),
    /// Play a one-shot sound
    PlaySound(Chime),
    /// Append a completed session to the history
    SaveSession(CompletedSession),
    /// Show an OS notification
    Notify(Notice),
    /// Update presentation hints (indicator, strict break, idle sensing)
    Present(Presentation),
}
