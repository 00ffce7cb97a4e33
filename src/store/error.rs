//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the snapshot store and the session log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The home directory could not be determined.
    #[error("ホームディレクトリが見つかりません")]
    NoHomeDir,

    /// Reading or writing a file failed.
    #[error("ファイル操作に失敗しました ({path}): {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The persisted snapshot could not be parsed.
    #[error("スナップショットが破損しています ({path}): {source}")]
    CorruptSnapshot {
        /// Snapshot file
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the snapshot failed.
    #[error("スナップショットのシリアライズに失敗しました: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A database operation failed.
    #[error("データベースエラー: {0}")]
    Database(#[from] rusqlite::Error),

    /// A requested date range was invalid.
    #[error("無効な日付です: {0}")]
    InvalidDate(String),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("データベース接続のロックに失敗しました")]
    LockPoisoned,
}

impl StoreError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the on-disk snapshot should be discarded.
    #[must_use]
    pub fn is_corrupt_snapshot(&self) -> bool {
        matches!(self, Self::CorruptSnapshot { .. })
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NoHomeDir => "--data-dir でデータディレクトリを指定してください",
            Self::Io { .. } => "データディレクトリの権限を確認してください",
            Self::CorruptSnapshot { .. } => "既定の状態で起動し直します",
            Self::Serialize(_) => "アプリケーションを再起動してください",
            Self::Database(_) => "セッション履歴ファイルを確認してください",
            Self::InvalidDate(_) => "YYYY-MM-DD 形式で指定してください",
            Self::LockPoisoned => "デーモンを再起動してください",
        }
    }
}
