//! Core data types for the Pomodoro Timer.
//!
//! This module defines the data structures used for:
//! - Timer modes and user settings (with clamping of malformed minute values)
//! - The persisted timer snapshot
//! - IPC request/response serialization

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Seconds added by `extend` when the caller does not specify an amount.
pub const DEFAULT_EXTEND_SECONDS: u32 = 60;

// ============================================================================
// TimerMode
// ============================================================================

/// The session kind the countdown is currently measuring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    /// Focused work session
    #[default]
    Work,
    /// Short break between work sessions
    ShortBreak,
    /// Long break after every `long_break_interval` work sessions
    LongBreak,
}

impl TimerMode {
    /// Returns the string representation used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::ShortBreak => "shortBreak",
            TimerMode::LongBreak => "longBreak",
        }
    }

    /// Returns true for either kind of break.
    pub fn is_break(&self) -> bool {
        matches!(self, TimerMode::ShortBreak | TimerMode::LongBreak)
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "作業",
            TimerMode::ShortBreak => "短い休憩",
            TimerMode::LongBreak => "長い休憩",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "work" => Ok(TimerMode::Work),
            "shortBreak" | "short-break" | "short" => Ok(TimerMode::ShortBreak),
            "longBreak" | "long-break" | "long" => Ok(TimerMode::LongBreak),
            other => Err(format!("不明なモードです: {}", other)),
        }
    }
}

// ============================================================================
// TickingSound
// ============================================================================

/// Ambient sound looped during work sessions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TickingSound {
    /// Mechanical clock ticking
    #[default]
    Clock,
    /// Kitchen timer ticking
    Timer,
    /// No ticking; disables ticking regardless of `enable_ticking`
    None,
}

// ============================================================================
// Minute clamping
// ============================================================================

/// Clamps an externally supplied minute value to the valid range (>= 1).
pub fn clamp_minutes(value: i64) -> u32 {
    value.clamp(1, i64::from(u32::MAX)) as u32
}

/// Raw minute value as it may arrive from a client or an old snapshot.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinutes {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl RawMinutes {
    fn clamped(self) -> u32 {
        match self {
            RawMinutes::Int(v) => clamp_minutes(v),
            RawMinutes::Float(v) => clamp_minutes(v as i64),
            RawMinutes::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    .map_or(1, clamp_minutes)
            }
            RawMinutes::Other(_) => 1,
        }
    }
}

/// Deserializes a minute value leniently: negative, zero, non-numeric or
/// missing-in-spirit values become 1 instead of failing the whole payload.
pub fn lenient_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawMinutes::deserialize(deserializer)?.clamped())
}

// ============================================================================
// Settings
// ============================================================================

/// User-facing timer configuration. Replaced wholesale, never patched by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Work duration in minutes
    #[serde(deserialize_with = "lenient_minutes")]
    pub work: u32,
    /// Short break duration in minutes
    #[serde(deserialize_with = "lenient_minutes")]
    pub short_break: u32,
    /// Long break duration in minutes
    #[serde(deserialize_with = "lenient_minutes")]
    pub long_break: u32,
    /// Number of work sessions between long breaks
    #[serde(deserialize_with = "lenient_minutes")]
    pub long_break_interval: u32,
    /// Loop a ticking sound during work
    pub enable_ticking: bool,
    /// Which ticking sound to loop
    pub ticking_sound: TickingSound,
    /// Loop an ambient sound during breaks
    pub enable_break_sound: bool,
    /// Request fullscreen presentation while a break is running
    pub enable_strict_break: bool,
    /// Start breaks automatically when a work session ends
    pub auto_start_breaks: bool,
    /// Start work automatically when a break ends
    pub auto_start_work: bool,
    /// Pause the countdown while the user is idle
    pub pause_when_idle: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work: 25,
            short_break: 5,
            long_break: 15,
            long_break_interval: 4,
            enable_ticking: false,
            ticking_sound: TickingSound::Clock,
            enable_break_sound: true,
            enable_strict_break: false,
            auto_start_breaks: false,
            auto_start_work: false,
            pause_when_idle: false,
        }
    }
}

impl Settings {
    /// Sets the work duration.
    pub fn with_work_minutes(mut self, minutes: u32) -> Self {
        self.work = minutes;
        self
    }

    /// Sets the short break duration.
    pub fn with_short_break_minutes(mut self, minutes: u32) -> Self {
        self.short_break = minutes;
        self
    }

    /// Sets the long break duration.
    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break = minutes;
        self
    }

    /// Sets the long break interval.
    pub fn with_long_break_interval(mut self, interval: u32) -> Self {
        self.long_break_interval = interval;
        self
    }

    /// Returns a copy with every duration and the interval raised to at least 1.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.work = self.work.max(1);
        self.short_break = self.short_break.max(1);
        self.long_break = self.long_break.max(1);
        self.long_break_interval = self.long_break_interval.max(1);
        self
    }

    /// Returns the configured duration of `mode` in minutes.
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        }
    }

    /// Returns the nominal duration of `mode` in seconds.
    pub fn seconds_for(&self, mode: TimerMode) -> u32 {
        self.minutes_for(mode).saturating_mul(60)
    }

    /// Overwrites the duration of a single mode.
    pub fn set_minutes(&mut self, mode: TimerMode, minutes: u32) {
        let minutes = minutes.max(1);
        match mode {
            TimerMode::Work => self.work = minutes,
            TimerMode::ShortBreak => self.short_break = minutes,
            TimerMode::LongBreak => self.long_break = minutes,
        }
    }

    /// Picks the break that follows the work session which brought the tally
    /// to `sessions_completed`.
    ///
    /// Shared by natural completion, skip and rehydration.
    pub fn break_after(&self, sessions_completed: u32) -> TimerMode {
        let interval = self.long_break_interval.max(1);
        if sessions_completed > 0 && sessions_completed % interval == 0 {
            TimerMode::LongBreak
        } else {
            TimerMode::ShortBreak
        }
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The full mutable timer state; persisted as a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Current mode
    pub mode: TimerMode,
    /// Remaining seconds in the current mode
    pub time_left: u32,
    /// Whether the once-per-second driver should be ticking
    pub is_active: bool,
    /// Completed work sessions
    pub sessions_completed: u32,
    /// Epoch milliseconds of the last decrement or transition (0 = never)
    pub last_tick_timestamp: i64,
    /// User settings
    pub settings: Settings,
}

impl TimerState {
    /// Creates an inactive work state for the given settings.
    pub fn new(settings: Settings) -> Self {
        let settings = settings.sanitized();
        Self {
            mode: TimerMode::Work,
            time_left: settings.seconds_for(TimerMode::Work),
            is_active: false,
            sessions_completed: 0,
            last_tick_timestamp: 0,
            settings,
        }
    }

    /// Returns the nominal duration of the current mode in seconds.
    pub fn nominal_seconds(&self) -> u32 {
        self.settings.seconds_for(self.mode)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Aggregated work sessions for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStat {
    /// Calendar date (YYYY-MM-DD)
    pub date: String,
    /// Number of completed work sessions
    pub count: i64,
    /// Total focused minutes
    pub total_minutes: f64,
}

/// Range selector for session statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "range", rename_all = "camelCase")]
pub enum StatsQuery {
    /// A single day
    Day {
        /// The day to aggregate
        date: NaiveDate,
    },
    /// Seven days starting at `start`
    Week {
        /// First day of the week
        start: NaiveDate,
    },
    /// A calendar month
    Month {
        /// Year
        year: i32,
        /// Month (1-12)
        month: u32,
    },
}

// ============================================================================
// IPC Types
// ============================================================================

fn default_extend_seconds() -> u32 {
    DEFAULT_EXTEND_SECONDS
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum IpcRequest {
    /// Flip the running flag
    Toggle,
    /// Activate if inactive
    Start,
    /// Deactivate if active
    Stop,
    /// Jump to the next mode without recording a session
    Skip,
    /// Restart the current mode
    Reset,
    /// Add seconds to the countdown
    Extend {
        /// Seconds to add
        #[serde(default = "default_extend_seconds")]
        seconds: u32,
    },
    /// Switch mode explicitly
    SetMode {
        /// Target mode
        mode: TimerMode,
    },
    /// Override one mode's duration
    SetCustomTime {
        /// Mode whose duration changes
        mode: TimerMode,
        /// New duration in minutes
        #[serde(deserialize_with = "lenient_minutes")]
        minutes: u32,
    },
    /// Replace the settings wholesale
    UpdateSettings {
        /// New settings
        settings: Settings,
    },
    /// The user went idle
    IdleDetected,
    /// The user came back
    IdleCleared,
    /// Query the current status
    Status,
    /// Query the session history
    Stats {
        /// Requested range
        query: StatsQuery,
    },
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Current mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<TimerMode>,
    /// Remaining seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    /// Running flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Completed work sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_completed: Option<u32>,
    /// Current settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    /// Status indicator title (e.g. "🍅 24:59")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Whether strict break presentation is requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_break: Option<bool>,
    /// Session statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Vec<DayStat>>,
}

impl ResponseData {
    /// Creates response data from timer state.
    pub fn from_timer_state(state: &TimerState) -> Self {
        Self {
            mode: Some(state.mode),
            time_left: Some(state.time_left),
            is_active: Some(state.is_active),
            sessions_completed: Some(state.sessions_completed),
            settings: Some(state.settings.clone()),
            ..Default::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if this is an error response.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// ============================================================================
// Tests
// ============================================================================
