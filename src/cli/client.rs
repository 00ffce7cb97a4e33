//! IPC Client for communicating with the Pomodoro Timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::cli::commands::IdleSignal;
use crate::daemon::socket_path_in;
use crate::store::default_data_dir;
use crate::types::{IpcRequest, IpcResponse, Settings, StatsQuery, TimerMode};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (1MB, a month of stats fits easily)
const MAX_RESPONSE_SIZE: u64 = 1024 * 1024;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client for the default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self> {
        let data_dir = default_data_dir().context("データディレクトリを特定できません")?;
        Ok(Self::for_data_dir(&data_dir))
    }

    /// Creates a new IPC client for the daemon serving `data_dir`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::with_socket_path(socket_path_in(data_dir))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    pub async fn toggle(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Toggle).await
    }

    pub async fn start(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start).await
    }

    pub async fn stop(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Stop).await
    }

    pub async fn skip(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Skip).await
    }

    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset).await
    }

    pub async fn extend(&self, seconds: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Extend { seconds })
            .await
    }

    pub async fn set_mode(&self, mode: TimerMode) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::SetMode { mode })
            .await
    }

    pub async fn set_custom_time(&self, mode: TimerMode, minutes: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::SetCustomTime { mode, minutes })
            .await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::UpdateSettings { settings })
            .await
    }

    /// Forwards an idle signal from an external monitor.
    pub async fn idle(&self, signal: IdleSignal) -> Result<IpcResponse> {
        let request = match signal {
            IdleSignal::Detected => IpcRequest::IdleDetected,
            IdleSignal::Cleared => IpcRequest::IdleCleared,
        };
        self.send_request_with_retry(&request).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Queries the session history.
    pub async fn stats(&self, query: StatsQuery) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Stats { query })
            .await
    }

    /// Sends a request to the daemon with retry logic.
    ///
    /// Only the connection is retried. Once the request has been written
    /// the daemon may already have applied it, so later failures are
    /// returned as is. Error responses from the daemon are returned
    /// immediately.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = self.connect_with_retry().await?;
        let response = self.send_request(&mut stream, request).await?;

        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Connects to the daemon, retrying while it cannot be reached.
    async fn connect_with_retry(&self) -> Result<UnixStream> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.connect().await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::warn!("接続失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Daemonへのリクエストに失敗しました")))
    }

    async fn connect(&self) -> Result<UnixStream> {
        let stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("Daemonに接続できません。'pomodoro daemon' を起動してください")?;
        Ok(stream)
    }

    /// Sends a single request on `stream` and returns the daemon's response as is.
    async fn send_request(
        &self,
        stream: &mut UnixStream,
        request: &IpcRequest,
    ) -> Result<IpcResponse> {
        let request_json =
            serde_json::to_string(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut *stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")?;

        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
