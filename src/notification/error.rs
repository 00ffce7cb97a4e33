//! Notification system error types.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to send a notification.
    #[error("通知の送信に失敗しました: {0}")]
    SendFailed(String),

    /// Invalid input provided to the notification system.
    #[error("無効な入力: {0}")]
    InvalidInput(String),

    /// No notification server is reachable.
    #[error("通知サーバーが利用できません")]
    NotAvailable,

    /// The blocking task running the send was cancelled or panicked.
    #[error("通知タスクが失敗しました: {0}")]
    TaskFailed(String),
}

impl NotificationError {
    /// Returns true if retrying the same notification may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::TaskFailed(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "通知デーモンが起動しているか確認してください",
            Self::InvalidInput(_) => "通知内容を確認してください",
            Self::NotAvailable => "--no-notify で通知を無効にできます",
            Self::TaskFailed(_) => "デーモンを再起動してください",
        }
    }
}
