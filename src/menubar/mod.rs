//! Status indicator for the Pomodoro Timer.
//!
//! This module provides:
//! - Title and icon generation for a tray or status bar (`icon.rs`)
//! - [`StatusBoard`]: the latest presentation hints, shared between the
//!   effect executor (writer) and IPC `status` (reader)
//!
//! Rendering is left to whichever bar polls `pomodoro status --title`.

pub mod icon;

pub use icon::IconManager;

use std::sync::{Mutex, RwLock};

use crate::timer::Presentation;

// ============================================================================
// TrayUpdate
// ============================================================================

/// A change an indicator should apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayUpdate {
    /// New title text
    SetTitle(String),
    /// New icon name
    SetIcon(&'static str),
    /// Strict break presentation switched on or off
    SetStrictBreak(bool),
    /// Idle sensing switched on or off
    SetIdleDetection(bool),
}

// ============================================================================
// StatusBoard
// ============================================================================

/// Holds the most recent presentation hints.
#[derive(Debug, Default)]
pub struct StatusBoard {
    current: RwLock<Presentation>,
    icon_manager: Mutex<IconManager>,
}

impl StatusBoard {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `presentation` and returns what an indicator has to change.
    pub fn update(&self, presentation: Presentation) -> Vec<TrayUpdate> {
        let mut updates = Vec::new();
        let mode = presentation.status.mode;

        if let Ok(mut icon_manager) = self.icon_manager.lock() {
            updates.push(TrayUpdate::SetTitle(
                icon_manager.generate_title(&presentation.status),
            ));
            if icon_manager.mode_changed(mode) {
                updates.push(TrayUpdate::SetIcon(IconManager::icon_name(mode)));
            }
        }

        if let Ok(mut current) = self.current.write() {
            if current.strict_break != presentation.strict_break {
                updates.push(TrayUpdate::SetStrictBreak(presentation.strict_break));
            }
            if current.idle_detection != presentation.idle_detection {
                updates.push(TrayUpdate::SetIdleDetection(presentation.idle_detection));
            }
            *current = presentation;
        }

        updates
    }

    /// Returns a copy of the latest hints.
    pub fn snapshot(&self) -> Presentation {
        self.current
            .read()
            .map(|current| current.clone())
            .unwrap_or_default()
    }

    /// Returns the indicator title for the latest hints.
    pub fn title(&self) -> String {
        let status = self.snapshot().status;
        match self.icon_manager.lock() {
            Ok(icon_manager) => icon_manager.generate_title(&status),
            Err(_) => IconManager::format_time(status.time_left),
        }
    }

    /// Returns true if strict break presentation is currently requested.
    pub fn strict_break(&self) -> bool {
        self.snapshot().strict_break
    }
}
