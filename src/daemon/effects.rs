//! Effect execution for the Pomodoro Timer daemon.
//!
//! The engine sends [`Effect`]s over an unbounded channel; this module turns
//! them into sound, notifications, session history rows and status board
//! updates. Every failure here is logged and dropped. Nothing is reported
//! back to the engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::menubar::StatusBoard;
use crate::notification::{send_with_retry, NotificationSender};
use crate::sound::{SoundLibrary, SoundPlayer};
use crate::store::SessionLog;
use crate::timer::{Chime, CompletedSession, Effect, LoopSound, Notice, Presentation};

/// Shared sound player handle.
pub type SharedSoundPlayer = Arc<dyn SoundPlayer + Send + Sync>;

/// Runs effects against whichever collaborators are available.
pub struct EffectExecutor {
    sound: Option<SharedSoundPlayer>,
    notifier: Option<Arc<dyn NotificationSender>>,
    sessions: Option<Arc<SessionLog>>,
    library: SoundLibrary,
    board: Arc<StatusBoard>,
}

impl EffectExecutor {
    /// Creates an executor with no sound, notifier or history.
    pub fn new(library: SoundLibrary, board: Arc<StatusBoard>) -> Self {
        Self {
            sound: None,
            notifier: None,
            sessions: None,
            library,
            board,
        }
    }

    #[must_use]
    pub fn with_sound(mut self, sound: SharedSoundPlayer) -> Self {
        self.sound = Some(sound);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSender>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionLog>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Executes effects until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<Effect>) {
        while let Some(effect) = rx.recv().await {
            self.execute(effect);
        }
        debug!("エフェクト実行ループを終了します");
    }

    /// Executes a single effect.
    ///
    /// Notifications are sent on a spawned task, so this must be called
    /// inside a Tokio runtime.
    pub fn execute(&self, effect: Effect) {
        match effect {
            Effect::StopSound => self.stop_sound(),
            Effect::PlaySoundLoop(sound) => self.play_loop(sound),
            Effect::PlaySound(chime) => self.play_chime(chime),
            Effect::SaveSession(session) => self.save_session(session),
            Effect::Notify(notice) => self.notify(notice),
            Effect::Present(presentation) => self.present(presentation),
        }
    }

    fn stop_sound(&self) {
        if let Some(sound) = &self.sound {
            sound.stop();
        }
    }

    fn play_loop(&self, sound: LoopSound) {
        let Some(player) = &self.sound else {
            return;
        };
        let Some(source) = self.library.resolve_loop(sound) else {
            return;
        };
        if let Err(e) = player.play_loop(&source) {
            warn!("ループサウンドの再生に失敗しました: {} ({})", e, e.suggestion());
        }
    }

    fn play_chime(&self, chime: Chime) {
        let Some(player) = &self.sound else {
            return;
        };
        let source = self.library.resolve_chime(chime);
        if let Err(e) = player.play(&source) {
            warn!("サウンドの再生に失敗しました: {} ({})", e, e.suggestion());
        }
    }

    fn save_session(&self, session: CompletedSession) {
        let Some(sessions) = &self.sessions else {
            return;
        };
        match sessions.record(&session) {
            Ok(id) => debug!("セッションを記録しました: id={} mode={}", id, session.mode),
            Err(e) => warn!("セッションの記録に失敗しました: {} ({})", e, e.suggestion()),
        }
    }

    fn notify(&self, notice: Notice) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let notifier = Arc::clone(notifier);
        tokio::spawn(async move {
            if let Err(e) = send_with_retry(notifier, notice).await {
                warn!("通知の送信に失敗しました: {} ({})", e, e.suggestion());
            }
        });
    }

    fn present(&self, presentation: Presentation) {
        for update in self.board.update(presentation) {
            debug!("インジケーター更新: {:?}", update);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use tempfile::TempDir;
    use tokio::time::{sleep, Duration};

    use crate::notification::MockNotificationSender;
    use crate::sound::{MockSoundPlayer, SoundSource};
    use crate::types::{Settings, TimerMode, TimerState};

    struct Harness {
        executor: EffectExecutor,
        sound: Arc<MockSoundPlayer>,
        notifier: Arc<MockNotificationSender>,
        sessions: Arc<SessionLog>,
        board: Arc<StatusBoard>,
        dir: TempDir,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let sound = Arc::new(MockSoundPlayer::new());
        let notifier = Arc::new(MockNotificationSender::new());
        let sessions = Arc::new(SessionLog::open_memory().unwrap());
        let board = Arc::new(StatusBoard::new());

        let executor = EffectExecutor::new(SoundLibrary::new(dir.path()), Arc::clone(&board))
            .with_sound(Arc::clone(&sound) as SharedSoundPlayer)
            .with_notifier(Arc::clone(&notifier) as Arc<dyn NotificationSender>)
            .with_sessions(Arc::clone(&sessions));

        Harness {
            executor,
            sound,
            notifier,
            sessions,
            board,
            dir,
        }
    }

    mod sound_tests {
        use super::*;

        #[test]
        fn test_stop_sound() {
            let h = harness();
            h.executor.execute(Effect::StopSound);
            assert_eq!(h.sound.stop_count(), 1);
        }

        #[test]
        fn test_chime_falls_back_to_tone() {
            let h = harness();
            h.executor.execute(Effect::PlaySound(Chime::Bell));

            let calls = h.sound.get_play_calls();
            assert_eq!(calls.len(), 1);
            assert!(calls[0].is_tone());
            assert_eq!(calls[0].name(), "bell");
        }

        #[test]
        fn test_loop_uses_library_file() {
            let h = harness();
            let path = h.dir.path().join("birds.ogg");
            std::fs::write(&path, b"not really ogg").unwrap();

            h.executor.execute(Effect::PlaySoundLoop(LoopSound::Birds));

            assert_eq!(h.sound.get_loop_calls(), vec![SoundSource::file("birds", path)]);
        }

        #[test]
        fn test_missing_loop_is_skipped() {
            let h = harness();
            h.executor.execute(Effect::PlaySoundLoop(LoopSound::Clock));
            assert_eq!(h.sound.loop_count(), 0);
        }

        #[test]
        fn test_player_failure_is_swallowed() {
            let h = harness();
            h.sound.set_should_fail(true);
            h.executor.execute(Effect::PlaySound(Chime::LoudBell));
            assert_eq!(h.sound.play_count(), 0);
        }

        #[test]
        fn test_without_sound_player() {
            let dir = TempDir::new().unwrap();
            let executor =
                EffectExecutor::new(SoundLibrary::new(dir.path()), Arc::new(StatusBoard::new()));
            executor.execute(Effect::PlaySound(Chime::Bell));
            executor.execute(Effect::StopSound);
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_save_session_records_row() {
            let h = harness();
            h.executor.execute(Effect::SaveSession(CompletedSession {
                mode: TimerMode::Work,
                elapsed_seconds: 1500,
            }));

            let stat = h.sessions.daily_stats(Local::now().date_naive()).unwrap();
            assert_eq!(stat.count, 1);
            assert!((stat.total_minutes - 25.0).abs() < f64::EPSILON);
        }
    }

    mod notify_tests {
        use super::*;

        #[tokio::test]
        async fn test_notify_is_delivered() {
            let h = harness();
            let notice = Notice::for_transition(TimerMode::Work, TimerMode::ShortBreak);
            h.executor.execute(Effect::Notify(notice.clone()));

            for _ in 0..50 {
                if h.notifier.notification_count() > 0 {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
            assert_eq!(h.notifier.get_notifications(), vec![notice]);
        }

        #[tokio::test]
        async fn test_run_drains_channel() {
            let h = harness();
            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(Effect::StopSound).unwrap();
            tx.send(Effect::PlaySound(Chime::Bell)).unwrap();
            drop(tx);

            let sound = Arc::clone(&h.sound);
            h.executor.run(rx).await;

            assert_eq!(sound.stop_count(), 1);
            assert_eq!(sound.play_count(), 1);
        }
    }

    mod present_tests {
        use super::*;

        #[test]
        fn test_present_updates_board() {
            let h = harness();
            let mut settings = Settings::default();
            settings.enable_strict_break = true;
            let mut state = TimerState::new(settings);
            state.mode = TimerMode::ShortBreak;
            state.time_left = 300;
            state.is_active = true;

            h.executor.execute(Effect::Present(Presentation::derive(&state)));

            assert!(h.board.strict_break());
            assert_eq!(h.board.title(), "☕ 05:00");
        }
    }
}
