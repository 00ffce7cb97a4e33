//! Desktop notification integration.
//!
//! This module provides:
//!
//! - The [`NotificationSender`] abstraction used by the effect executor
//! - A `notify-rust` backed [`DesktopNotifier`]
//! - Async sending with retry on a blocking task
//! - [`MockNotificationSender`] for tests

mod desktop;
pub mod error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use self::desktop::{DesktopNotifier, APP_NAME};
pub use self::error::NotificationError;

use crate::timer::Notice;

/// Maximum retry attempts for sending notifications.
const MAX_RETRIES: u32 = 3;

/// Delay between retry attempts in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Maximum body length in characters.
const MAX_BODY_CHARS: usize = 256;

/// Sends notices to the user.
///
/// `send` may block (e.g. on D-Bus); call it through [`send_with_retry`]
/// from async code.
pub trait NotificationSender: Send + Sync {
    /// Shows `notice`.
    ///
    /// # Errors
    ///
    /// Returns an error if the notice is invalid or delivery fails.
    fn send(&self, notice: &Notice) -> Result<(), NotificationError>;

    /// Returns true if notifications can be delivered.
    fn is_available(&self) -> bool;
}

/// Rejects notices that would render as empty or oversized.
///
/// # Errors
///
/// Returns [`NotificationError::InvalidInput`] describing the problem.
pub fn validate_notice(notice: &Notice) -> Result<(), NotificationError> {
    if notice.title.trim().is_empty() {
        return Err(NotificationError::InvalidInput("タイトルが空です".to_string()));
    }
    if notice.body.trim().is_empty() {
        return Err(NotificationError::InvalidInput("本文が空です".to_string()));
    }
    if notice.body.chars().count() > MAX_BODY_CHARS {
        return Err(NotificationError::InvalidInput(format!(
            "本文は{}文字以内にしてください",
            MAX_BODY_CHARS
        )));
    }
    Ok(())
}

/// Sends `notice` on a blocking task, retrying transient failures.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or immediately for a
/// non-retryable error.
pub async fn send_with_retry(
    sender: Arc<dyn NotificationSender>,
    notice: Notice,
) -> Result<(), NotificationError> {
    if !sender.is_available() {
        return Err(NotificationError::NotAvailable);
    }

    let mut retries = 0;
    loop {
        let attempt_sender = Arc::clone(&sender);
        let attempt_notice = notice.clone();
        let result = tokio::task::spawn_blocking(move || attempt_sender.send(&attempt_notice))
            .await
            .map_err(|e| NotificationError::TaskFailed(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && retries < MAX_RETRIES => {
                retries += 1;
                tracing::warn!(
                    "通知送信失敗（リトライ {}/{}）: {}",
                    retries,
                    MAX_RETRIES,
                    e
                );
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Mock notification sender for testing.
#[derive(Debug, Default)]
pub struct MockNotificationSender {
    notifications: Mutex<Vec<Notice>>,
    available: AtomicBool,
    should_fail: AtomicBool,
}

impl MockNotificationSender {
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get_notifications(&self) -> Vec<Notice> {
        self.notifications.lock().unwrap().clone()
    }

    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn clear_recorded(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl NotificationSender for MockNotificationSender {
    fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::InvalidInput("Mock failure".to_string()));
        }
        validate_notice(notice)?;
        self.notifications.lock().unwrap().push(notice.clone());
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimerMode;

    fn notice() -> Notice {
        Notice::for_transition(TimerMode::Work, TimerMode::LongBreak)
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_valid_notice() {
            assert!(validate_notice(&notice()).is_ok());
        }

        #[test]
        fn test_empty_title() {
            let mut n = notice();
            n.title = "  ".to_string();
            assert!(validate_notice(&n).is_err());
        }

        #[test]
        fn test_body_too_long() {
            let mut n = notice();
            n.body = "あ".repeat(MAX_BODY_CHARS + 1);
            assert!(validate_notice(&n).is_err());

            n.body = "あ".repeat(MAX_BODY_CHARS);
            assert!(validate_notice(&n).is_ok());
        }
    }

    mod mock_tests {
        use super::*;

        #[tokio::test]
        async fn test_send_with_retry_delivers() {
            let mock = Arc::new(MockNotificationSender::new());
            send_with_retry(mock.clone(), notice()).await.unwrap();

            assert_eq!(mock.notification_count(), 1);
            assert_eq!(mock.get_notifications()[0].action_type_id, "work-done");
        }

        #[tokio::test]
        async fn test_send_with_retry_unavailable() {
            let mock = Arc::new(MockNotificationSender::new());
            mock.set_available(false);

            let err = send_with_retry(mock.clone(), notice()).await.unwrap_err();
            assert!(matches!(err, NotificationError::NotAvailable));
            assert_eq!(mock.notification_count(), 0);
        }

        #[tokio::test]
        async fn test_send_with_retry_non_retryable_fails_fast() {
            let mock = Arc::new(MockNotificationSender::new());
            mock.set_should_fail(true);

            let err = send_with_retry(mock.clone(), notice()).await.unwrap_err();
            assert!(matches!(err, NotificationError::InvalidInput(_)));
        }

        #[test]
        fn test_clear_recorded() {
            let mock = MockNotificationSender::new();
            mock.send(&notice()).unwrap();
            mock.clear_recorded();
            assert_eq!(mock.notification_count(), 0);
        }
    }
}
