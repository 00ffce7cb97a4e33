//! Daemon module for the Pomodoro Timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with write-through persistence and the 1 Hz ticker
//! - `effects`: Dispatch of timer effects to sound, notifications and history
//! - `ipc`: Unix socket server for CLI commands
//!
//! [`run`] wires them together and blocks until SIGINT or SIGTERM.

pub mod effects;
pub mod ipc;
pub mod timer;

pub use effects::{EffectExecutor, SharedSoundPlayer};
pub use ipc::{IpcError, IpcServer, RequestHandler, SOCKET_FILE_NAME};
pub use timer::{now_ms, run_ticker, Clock, TimerEngine};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::menubar::StatusBoard;
use crate::notification::DesktopNotifier;
use crate::sound::{try_spawn_worker, SoundLibrary};
use crate::store::{default_data_dir, SessionLog, SnapshotStore, StoreError};

/// Snapshot file name inside the data directory
pub const STATE_FILE_NAME: &str = "state.json";

/// Session database file name inside the data directory
pub const SESSIONS_FILE_NAME: &str = "sessions.sqlite";

/// Sounds directory name inside the data directory
pub const SOUNDS_DIR_NAME: &str = "sounds";

// ============================================================================
// DaemonConfig
// ============================================================================

/// Process-level configuration for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Directory holding the socket, snapshot and session database
    pub data_dir: PathBuf,
    /// Sounds directory override
    pub sounds_dir: Option<PathBuf>,
    /// Skip audio entirely
    pub no_sound: bool,
    /// Skip desktop notifications
    pub no_notify: bool,
}

impl DaemonConfig {
    /// Creates a configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sounds_dir: None,
            no_sound: false,
            no_notify: false,
        }
    }

    /// Creates a configuration rooted at the default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self::new(default_data_dir()?))
    }

    #[must_use]
    pub fn with_sounds_dir(mut self, sounds_dir: Option<PathBuf>) -> Self {
        self.sounds_dir = sounds_dir;
        self
    }

    #[must_use]
    pub fn with_no_sound(mut self, no_sound: bool) -> Self {
        self.no_sound = no_sound;
        self
    }

    #[must_use]
    pub fn with_no_notify(mut self, no_notify: bool) -> Self {
        self.no_notify = no_notify;
        self
    }

    pub fn socket_path(&self) -> PathBuf {
        socket_path_in(&self.data_dir)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE_NAME)
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.data_dir.join(SESSIONS_FILE_NAME)
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.sounds_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SOUNDS_DIR_NAME))
    }
}

/// Returns the socket path for a data directory.
pub fn socket_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(SOCKET_FILE_NAME)
}

// ============================================================================
// Run
// ============================================================================

/// Runs the daemon until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the data directory or the socket cannot be set up.
pub async fn run(config: DaemonConfig) -> Result<()> {
    run_until(config, shutdown_signal()).await
}

/// Runs the daemon until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the data directory or the socket cannot be set up.
pub async fn run_until<F>(config: DaemonConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("データディレクトリを作成できません: {:?}", config.data_dir))?;

    // Bound before the snapshot is touched so a second daemon on the same
    // data directory fails without restoring or ticking anything.
    let server = IpcServer::new(&config.socket_path())?;

    let board = Arc::new(StatusBoard::new());
    let sessions = match SessionLog::open(&config.sessions_path()) {
        Ok(log) => Some(Arc::new(log)),
        Err(e) => {
            warn!("セッション履歴を開けません: {} ({})", e, e.suggestion());
            None
        }
    };

    let library = SoundLibrary::new(config.sounds_dir());
    info!(
        "サウンドディレクトリ: {} ({:?})",
        library.dir().display(),
        library.discover()
    );

    let mut executor = EffectExecutor::new(library, Arc::clone(&board));
    if config.no_sound {
        info!("サウンドは無効です");
    } else if let Some(worker) = try_spawn_worker() {
        executor = executor.with_sound(Arc::new(worker));
    }
    if config.no_notify {
        info!("通知は無効です");
    } else {
        executor = executor.with_notifier(Arc::new(DesktopNotifier::new()));
    }
    if let Some(log) = &sessions {
        executor = executor.with_sessions(Arc::clone(log));
    }

    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let executor_handle = tokio::spawn(executor.run(effect_rx));

    let engine = TimerEngine::restore(
        SnapshotStore::new(config.state_path()),
        effect_tx,
        Arc::new(now_ms),
    );
    let engine = Arc::new(Mutex::new(engine));

    info!("Daemonを起動しました: {}", server.socket_path().display());

    let mut handler = RequestHandler::new(Arc::clone(&engine), board);
    if let Some(log) = sessions {
        handler = handler.with_sessions(log);
    }

    let ticker_handle = tokio::spawn(run_ticker(Arc::clone(&engine)));
    let server_handle = tokio::spawn(server.serve(Arc::new(handler)));

    shutdown.await;
    info!("Daemonを終了します");

    ticker_handle.abort();
    server_handle.abort();
    let _ = ticker_handle.await;
    let _ = server_handle.await;

    // The engine holds the last effect sender; dropping it ends the executor.
    drop(engine);
    let _ = executor_handle.await;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("SIGINTの監視に失敗しました: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("SIGTERMの監視に失敗しました: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// ============================================================================
// Tests
// ============================================================================
