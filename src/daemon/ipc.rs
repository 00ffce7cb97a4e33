//! IPC Server for the Pomodoro Timer.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer commands
//! - Integration with TimerEngine for command execution
//!
//! One JSON request per connection. The client shuts down its write half
//! after sending, and the server answers with one JSON response.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::menubar::StatusBoard;
use crate::store::SessionLog;
use crate::types::{IpcRequest, IpcResponse, ResponseData, Settings, StatsQuery, TimerMode};

use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Socket file name inside the data directory
pub const SOCKET_FILE_NAME: &str = "pomodoro.sock";

/// Maximum request size in bytes (16KB)
const MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("リクエストの読み込みに失敗しました: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("リクエストの読み込みがタイムアウトしました")]
    Timeout,

    /// Request too large
    #[error("リクエストが大きすぎます（最大{MAX_REQUEST_SIZE}バイト）")]
    RequestTooLarge,

    /// Empty request
    #[error("クライアントが接続を閉じました")]
    EmptyRequest,

    /// Stats requested without a session log
    #[error("セッション履歴が利用できません")]
    HistoryUnavailable,

    /// Another daemon answers on the socket
    #[error("Daemonは既に起動しています: {0}")]
    DaemonRunning(String),
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file is removed before binding. A socket that still
    /// accepts connections belongs to a live daemon and is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::DaemonRunning`] if another daemon is listening, or
    /// an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            if std::os::unix::net::UnixStream::connect(socket_path).is_ok() {
                return Err(IpcError::DaemonRunning(socket_path.display().to_string()).into());
            }
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Reads until the client closes its write half, bounded by a timeout
    /// and [`MAX_REQUEST_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::new();
        let limit = (MAX_REQUEST_SIZE + 1) as u64;

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            (&mut *stream).take(limit).read_to_end(&mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.is_empty() {
            return Err(IpcError::EmptyRequest.into());
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer)
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accepts connections forever, answering each on its own task.
    pub async fn serve(self, handler: Arc<RequestHandler>) {
        loop {
            match self.accept().await {
                Ok(stream) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(handle_connection(stream, handler));
                }
                Err(e) => warn!("接続の受け付けに失敗しました: {:#}", e),
            }
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Answers a single client connection.
///
/// Malformed requests get an error response rather than a dropped connection.
pub async fn handle_connection(mut stream: UnixStream, handler: Arc<RequestHandler>) {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            debug!("IPCリクエスト: {:?}", request);
            handler.handle(request).await
        }
        Err(e) => {
            debug!("不正なIPCリクエスト: {:#}", e);
            IpcResponse::error(format!("{:#}", e))
        }
    };

    if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
        warn!("レスポンスの送信に失敗しました: {:#}", e);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to TimerEngine.
pub struct RequestHandler {
    /// Shared reference to the timer engine
    engine: Arc<Mutex<TimerEngine>>,
    /// Latest presentation hints
    board: Arc<StatusBoard>,
    /// Completed-session history
    sessions: Option<Arc<SessionLog>>,
}

impl RequestHandler {
    /// Creates a new request handler with the given timer engine.
    pub fn new(engine: Arc<Mutex<TimerEngine>>, board: Arc<StatusBoard>) -> Self {
        Self {
            engine,
            board,
            sessions: None,
        }
    }

    /// Enables `stats` requests.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionLog>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Toggle => self.handle_toggle().await,
            IpcRequest::Start => self.handle_start().await,
            IpcRequest::Stop => self.handle_stop().await,
            IpcRequest::Skip => self.handle_skip().await,
            IpcRequest::Reset => self.handle_reset().await,
            IpcRequest::Extend { seconds } => self.handle_extend(seconds).await,
            IpcRequest::SetMode { mode } => self.handle_set_mode(mode).await,
            IpcRequest::SetCustomTime { mode, minutes } => {
                self.handle_set_custom_time(mode, minutes).await
            }
            IpcRequest::UpdateSettings { settings } => self.handle_update_settings(settings).await,
            IpcRequest::IdleDetected => self.handle_idle_detected().await,
            IpcRequest::IdleCleared => self.handle_idle_cleared().await,
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::Stats { query } => self.handle_stats(query),
        }
    }

    fn state_response(engine: &TimerEngine, message: impl Into<String>) -> IpcResponse {
        IpcResponse::success(
            message,
            Some(ResponseData::from_timer_state(engine.get_state())),
        )
    }

    async fn handle_toggle(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.toggle();

        let message = if engine.get_state().is_active {
            "タイマーを開始しました"
        } else {
            "タイマーを一時停止しました"
        };
        Self::state_response(&engine, message)
    }

    /// Starting a running timer is a no-op, not an error.
    async fn handle_start(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.start() {
            "タイマーを開始しました"
        } else {
            "タイマーは既に実行中です"
        };
        Self::state_response(&engine, message)
    }

    /// Stopping a paused timer is a no-op, not an error.
    async fn handle_stop(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.stop() {
            "タイマーを一時停止しました"
        } else {
            "タイマーは既に一時停止中です"
        };
        Self::state_response(&engine, message)
    }

    async fn handle_skip(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.skip();

        let message = format!("{}へスキップしました", engine.get_state().mode.label());
        Self::state_response(&engine, message)
    }

    async fn handle_reset(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.reset();
        Self::state_response(&engine, "タイマーをリセットしました")
    }

    async fn handle_extend(&self, seconds: u32) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.extend(seconds);
        Self::state_response(&engine, format!("{}秒延長しました", seconds))
    }

    async fn handle_set_mode(&self, mode: TimerMode) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.set_mode(mode);
        Self::state_response(&engine, format!("{}に切り替えました", mode.label()))
    }

    async fn handle_set_custom_time(&self, mode: TimerMode, minutes: u32) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.set_custom_time(mode, minutes);

        let applied = engine.get_state().settings.minutes_for(mode);
        Self::state_response(
            &engine,
            format!("{}の時間を{}分に設定しました", mode.label(), applied),
        )
    }

    async fn handle_update_settings(&self, settings: Settings) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.update_settings(settings);
        Self::state_response(&engine, "設定を更新しました")
    }

    async fn handle_idle_detected(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.idle_detected() {
            "アイドル状態のため一時停止しました"
        } else {
            "変更はありません"
        };
        Self::state_response(&engine, message)
    }

    async fn handle_idle_cleared(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.idle_cleared() {
            "タイマーを再開しました"
        } else {
            "変更はありません"
        };
        Self::state_response(&engine, message)
    }

    /// Reports the state together with the indicator title.
    ///
    /// The board is brought up to date first so the title never lags behind
    /// the effect executor.
    async fn handle_status(&self) -> IpcResponse {
        let engine = self.engine.lock().await;
        self.board.update(engine.presentation());

        let mut data = ResponseData::from_timer_state(engine.get_state());
        data.title = Some(self.board.title());
        data.strict_break = Some(self.board.strict_break());

        IpcResponse::success("", Some(data))
    }

    fn handle_stats(&self, query: StatsQuery) -> IpcResponse {
        let Some(sessions) = &self.sessions else {
            return IpcResponse::error(IpcError::HistoryUnavailable.to_string());
        };

        match sessions.query(&query) {
            Ok(stats) => IpcResponse::success(
                "",
                Some(ResponseData {
                    stats: Some(stats),
                    ..Default::default()
                }),
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
