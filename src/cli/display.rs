//! Display utilities for the Pomodoro Timer CLI.
//!
//! This module provides formatted output for:
//! - Success messages
//! - Error messages
//! - Status display
//! - Settings and statistics tables

use crate::timer::LoopSound;
use crate::types::{DayStat, IpcResponse, ResponseData, Settings, TimerMode};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the daemon's message followed by the remaining time.
    pub fn show_command_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("{}", response.message);
        }
        if let Some(data) = &response.data {
            if let Some(line) = Self::summary_line(data) {
                println!("  {}", line);
            }
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        println!("ポモドーロタイマー ステータス");
        println!("─────────────────────────────");

        let Some(data) = &response.data else {
            println!("ステータスを取得できませんでした");
            return;
        };

        if let Some(mode) = data.mode {
            println!("モード: {}", mode.label());
        }
        if let Some(is_active) = data.is_active {
            println!("状態: {}", if is_active { "実行中" } else { "一時停止中" });
        }
        if let Some(time_left) = data.time_left {
            println!("残り時間: {}", Self::format_time(time_left));
        }
        if let Some(count) = data.sessions_completed {
            println!("完了セッション: {}", count);
        }
        if data.strict_break == Some(true) {
            println!("ストリクト休憩: 有効");
        }
    }

    /// Shows only the one-line indicator title.
    pub fn show_title(response: &IpcResponse) {
        let title = response
            .data
            .as_ref()
            .and_then(|data| data.title.clone())
            .unwrap_or_default();
        println!("{}", title);
    }

    /// Shows the current settings.
    pub fn show_settings(settings: &Settings) {
        for line in Self::settings_lines(settings) {
            println!("{}", line);
        }
    }

    /// Shows session statistics.
    pub fn show_stats(stats: &[DayStat]) {
        for line in Self::stats_lines(stats) {
            println!("{}", line);
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Formats remaining seconds as MM:SS.
    pub fn format_time(total_seconds: u32) -> String {
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    fn summary_line(data: &ResponseData) -> Option<String> {
        let mode = data.mode?;
        let time_left = data.time_left?;
        Some(format!("{} 残り {}", mode.label(), Self::format_time(time_left)))
    }

    fn on_off(enabled: bool) -> &'static str {
        if enabled {
            "オン"
        } else {
            "オフ"
        }
    }

    fn settings_lines(settings: &Settings) -> Vec<String> {
        vec![
            "設定".to_string(),
            "─────────────────────────────".to_string(),
            format!("{}: {}分", TimerMode::Work.label(), settings.work),
            format!("{}: {}分", TimerMode::ShortBreak.label(), settings.short_break),
            format!("{}: {}分", TimerMode::LongBreak.label(), settings.long_break),
            format!("長い休憩までのセッション数: {}", settings.long_break_interval),
            format!(
                "ティック音: {} ({})",
                Self::on_off(settings.enable_ticking),
                LoopSound::from_ticking(settings.ticking_sound)
                    .filter(|_| settings.enable_ticking)
                    .map_or("none", |sound| sound.name())
            ),
            format!("休憩中のサウンド: {}", Self::on_off(settings.enable_break_sound)),
            format!("ストリクト休憩: {}", Self::on_off(settings.enable_strict_break)),
            format!("休憩を自動開始: {}", Self::on_off(settings.auto_start_breaks)),
            format!("作業を自動開始: {}", Self::on_off(settings.auto_start_work)),
            format!("アイドル時に一時停止: {}", Self::on_off(settings.pause_when_idle)),
        ]
    }

    fn stats_lines(stats: &[DayStat]) -> Vec<String> {
        if stats.iter().all(|stat| stat.count == 0) {
            return vec!["完了した作業セッションはありません".to_string()];
        }

        let mut lines: Vec<String> = stats
            .iter()
            .filter(|stat| stat.count > 0)
            .map(|stat| {
                format!(
                    "{}  {:>3}回  {:>6.1}分",
                    stat.date, stat.count, stat.total_minutes
                )
            })
            .collect();

        let count: i64 = stats.iter().map(|stat| stat.count).sum();
        let minutes: f64 = stats.iter().map(|stat| stat.total_minutes).sum();
        lines.push(format!("合計: {}回 / {:.1}分", count, minutes));
        lines
    }
}

// ============================================================================
// Tests
// ============================================================================
