//! Icon and title management for the status indicator.
//!
//! This module handles:
//! - Generating display text for a tray or status bar (e.g., "🍅 15:30")
//! - Choosing the icon per timer mode
//!
//! The text generation logic is platform-independent and fully testable.

use crate::timer::StatusHint;
use crate::types::TimerMode;

// ============================================================================
// Constants
// ============================================================================

/// Emoji for work session
const WORKING_EMOJI: &str = "🍅";

/// Emoji for break session
const BREAK_EMOJI: &str = "☕";

/// Emoji for paused state
const PAUSED_EMOJI: &str = "⏸";

// ============================================================================
// IconManager
// ============================================================================

/// Manages icon and title generation for the status indicator.
#[derive(Debug, Default)]
pub struct IconManager {
    /// Last known mode (for icon updates)
    last_mode: Option<TimerMode>,
}

impl IconManager {
    /// Creates a new IconManager.
    pub fn new() -> Self {
        Self { last_mode: None }
    }

    /// Generates the title text.
    ///
    /// Format:
    /// - Running work: "🍅 MM:SS"
    /// - Running break: "☕ MM:SS"
    /// - Paused: "⏸ MM:SS"
    ///
    /// # Examples
    ///
    /// ```
    /// use pomodoro_keeper::menubar::IconManager;
    /// use pomodoro_keeper::timer::StatusHint;
    /// use pomodoro_keeper::types::TimerMode;
    ///
    /// let status = StatusHint {
    ///     mode: TimerMode::Work,
    ///     time_left: 930,
    ///     is_active: true,
    ///     sessions_completed: 0,
    /// };
    /// assert_eq!(IconManager::new().generate_title(&status), "🍅 15:30");
    /// ```
    pub fn generate_title(&self, status: &StatusHint) -> String {
        format!(
            "{} {}",
            self.get_emoji(status.mode, status.is_active),
            Self::format_time(status.time_left)
        )
    }

    /// Returns the emoji for a mode and running flag.
    pub fn get_emoji(&self, mode: TimerMode, is_active: bool) -> &'static str {
        match (is_active, mode) {
            (false, _) => PAUSED_EMOJI,
            (true, TimerMode::Work) => WORKING_EMOJI,
            (true, TimerMode::ShortBreak | TimerMode::LongBreak) => BREAK_EMOJI,
        }
    }

    /// Returns the icon name for a mode.
    pub fn icon_name(mode: TimerMode) -> &'static str {
        match mode {
            TimerMode::Work => "work",
            TimerMode::ShortBreak => "short-break",
            TimerMode::LongBreak => "long-break",
        }
    }

    /// Checks if the mode has changed since last update.
    ///
    /// Only a mode change requires swapping the icon image.
    pub fn mode_changed(&mut self, mode: TimerMode) -> bool {
        let changed = self.last_mode != Some(mode);
        if changed {
            self.last_mode = Some(mode);
        }
        changed
    }

    /// Formats remaining time as MM:SS string.
    pub fn format_time(remaining_seconds: u32) -> String {
        let minutes = remaining_seconds / 60;
        let seconds = remaining_seconds % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }
}

// ============================================================================
// Tests
// ============================================================================
