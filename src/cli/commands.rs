//! Command definitions for the Pomodoro Timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use chrono::{Datelike, Duration, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::store::DATA_DIR_ENV;
use crate::types::{Settings, StatsQuery, TickingSound, TimerMode, DEFAULT_EXTEND_SECONDS};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro Timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro",
    version,
    about = "クラッシュに強いポモドーロタイマー",
    long_about = "バックグラウンドのDaemonがタイマーを管理し、CLIからソケット経由で操作します。\n\
                  Daemonが停止してもタイマーの状態は保存され、再起動時に経過時間を反映して復元されます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory (socket, state and session history)
    #[arg(long, global = true, env = DATA_DIR_ENV, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start or pause the timer
    Toggle,

    /// Start the timer
    Start,

    /// Pause the timer
    Stop,

    /// Skip to the next mode
    Skip,

    /// Restart the current mode
    Reset,

    /// Add time to the countdown
    Extend {
        /// Seconds to add
        #[arg(
            default_value_t = DEFAULT_EXTEND_SECONDS,
            value_parser = clap::value_parser!(u32).range(1..=3600)
        )]
        seconds: u32,
    },

    /// Switch to a mode (paused)
    Mode {
        /// Target mode
        #[arg(value_enum)]
        mode: TimerMode,
    },

    /// Set one mode's duration in minutes
    SetTime {
        /// Mode to change
        #[arg(value_enum)]
        mode: TimerMode,

        /// Duration in minutes (1-600)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=600))]
        minutes: u32,
    },

    /// Show or change settings
    Settings(SettingsArgs),

    /// Show current timer status
    Status {
        /// Print only the one-line indicator title
        #[arg(long)]
        title: bool,
    },

    /// Show completed work sessions
    Stats {
        /// Range to aggregate (default: today)
        #[command(subcommand)]
        range: Option<StatsRange>,
    },

    /// Report idle state changes from an external idle monitor
    Idle {
        /// Idle signal
        #[arg(value_enum)]
        signal: IdleSignal,
    },

    /// Run as daemon (background service)
    Daemon(DaemonArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Settings Arguments
// ============================================================================

/// Arguments for the settings command. Omitted flags keep their value.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsArgs {
    /// Work duration in minutes (1-600)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=600))]
    pub work: Option<u32>,

    /// Short break duration in minutes (1-600)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=600))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-600)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=600))]
    pub long_break: Option<u32>,

    /// Work sessions between long breaks (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub long_break_interval: Option<u32>,

    /// Loop a ticking sound during work
    #[arg(long, value_name = "BOOL")]
    pub ticking: Option<bool>,

    /// Ticking sound
    #[arg(long, value_enum)]
    pub ticking_sound: Option<TickingSound>,

    /// Loop birdsong during breaks
    #[arg(long, value_name = "BOOL")]
    pub break_sound: Option<bool>,

    /// Request fullscreen presentation during breaks
    #[arg(long, value_name = "BOOL")]
    pub strict_break: Option<bool>,

    /// Start breaks automatically
    #[arg(long, value_name = "BOOL")]
    pub auto_start_breaks: Option<bool>,

    /// Start work automatically after a break
    #[arg(long, value_name = "BOOL")]
    pub auto_start_work: Option<bool>,

    /// Pause while the user is idle
    #[arg(long, value_name = "BOOL")]
    pub pause_when_idle: Option<bool>,
}

impl SettingsArgs {
    /// Returns true if no flag was given.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the given flags on top of `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(minutes) = self.work {
            settings.work = minutes;
        }
        if let Some(minutes) = self.short_break {
            settings.short_break = minutes;
        }
        if let Some(minutes) = self.long_break {
            settings.long_break = minutes;
        }
        if let Some(interval) = self.long_break_interval {
            settings.long_break_interval = interval;
        }
        if let Some(enabled) = self.ticking {
            settings.enable_ticking = enabled;
        }
        if let Some(sound) = self.ticking_sound {
            settings.ticking_sound = sound;
        }
        if let Some(enabled) = self.break_sound {
            settings.enable_break_sound = enabled;
        }
        if let Some(enabled) = self.strict_break {
            settings.enable_strict_break = enabled;
        }
        if let Some(enabled) = self.auto_start_breaks {
            settings.auto_start_breaks = enabled;
        }
        if let Some(enabled) = self.auto_start_work {
            settings.auto_start_work = enabled;
        }
        if let Some(enabled) = self.pause_when_idle {
            settings.pause_when_idle = enabled;
        }
        settings
    }
}

// ============================================================================
// Stats Range
// ============================================================================

/// Statistics range
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StatsRange {
    /// Today
    Today,

    /// A single day
    Day {
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Seven days
    Week {
        /// First day (YYYY-MM-DD, default: this week's Monday)
        start: Option<NaiveDate>,
    },

    /// A calendar month
    Month {
        /// Year (default: this year)
        year: Option<i32>,

        /// Month 1-12 (default: this month)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
}

impl StatsRange {
    /// Resolves the range into a query, filling defaults relative to `today`.
    pub fn to_query(&self, today: NaiveDate) -> StatsQuery {
        match *self {
            StatsRange::Today => StatsQuery::Day { date: today },
            StatsRange::Day { date } => StatsQuery::Day { date },
            StatsRange::Week { start } => StatsQuery::Week {
                start: start.unwrap_or_else(|| {
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
                }),
            },
            StatsRange::Month { year, month } => StatsQuery::Month {
                year: year.unwrap_or_else(|| today.year()),
                month: month.unwrap_or_else(|| today.month()),
            },
        }
    }
}

// ============================================================================
// Idle / Daemon Arguments
// ============================================================================

/// Idle signal reported by an external monitor
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSignal {
    /// The user went idle
    Detected,
    /// The user came back
    Cleared,
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Directory containing <name>.ogg sounds (default: <data-dir>/sounds)
    #[arg(long, value_name = "DIR")]
    pub sounds_dir: Option<PathBuf>,

    /// Disable all sounds
    #[arg(long)]
    pub no_sound: bool,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,
}

// ============================================================================
// Tests
// ============================================================================
