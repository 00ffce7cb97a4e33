//! Desktop notifications via `notify-rust`.

#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::Hint;
use notify_rust::Notification;
use tracing::debug;

use crate::timer::Notice;

use super::error::NotificationError;
use super::NotificationSender;

/// Application name shown by the notification server.
pub const APP_NAME: &str = "pomodoro-keeper";

/// Sends notices to the desktop notification server.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
    icon: Option<String>,
}

impl DesktopNotifier {
    /// Creates a notifier using the default application name.
    pub fn new() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            icon: None,
        }
    }

    /// Sets the icon name or path shown with each notification.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    fn build(&self, notice: &Notice) -> Notification {
        let mut notification = Notification::new();
        notification
            .summary(&notice.title)
            .body(&notice.body)
            .appname(&self.app_name);

        if let Some(icon) = &self.icon {
            notification.icon(icon);
        }

        // The action id doubles as the notification category where supported.
        #[cfg(all(unix, not(target_os = "macos")))]
        notification.hint(Hint::Category(notice.action_type_id.clone()));

        notification
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSender for DesktopNotifier {
    fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        super::validate_notice(notice)?;

        self.build(notice)
            .show()
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        debug!("通知を送信しました: {}", notice.action_type_id);
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}
