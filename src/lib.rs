//! Pomodoro Keeper Library
//!
//! A crash-safe Pomodoro timer. It includes:
//! - A pure timer state machine with wall-clock rehydration (`timer`)
//! - Snapshot persistence and completed-session history (`store`)
//! - The daemon: engine, effect dispatch and IPC server (`daemon`)
//! - CLI command parsing, IPC client and display utilities (`cli`)
//! - Sound playback on a dedicated audio thread (`sound`)
//! - Desktop notifications (`notification`)
//! - Status indicator title and hints (`menubar`)
//! - Type definitions for settings, state and IPC (`types`)

pub mod cli;
pub mod daemon;
pub mod menubar;
pub mod notification;
pub mod sound;
pub mod store;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    IpcRequest, IpcResponse, ResponseData, Settings, StatsQuery, TickingSound, TimerMode,
    TimerState,
};

pub use timer::{Effect, Presentation, TimerMachine};

pub use store::{SessionLog, SnapshotStore, StoreError};

pub use daemon::{DaemonConfig, EffectExecutor, TimerEngine};

// Re-export notification types
pub use notification::{
    DesktopNotifier, MockNotificationSender, NotificationError, NotificationSender,
};

// Re-export menubar types
pub use menubar::{IconManager, StatusBoard, TrayUpdate};

// Re-export sound types
pub use sound::{
    MockSoundPlayer, RodioSoundPlayer, SoundError, SoundLibrary, SoundPlayer, SoundSource,
    SoundWorker,
};
