//! Timer engine for the Pomodoro Timer daemon.
//!
//! This module wraps the pure [`TimerMachine`] with everything it must not do
//! itself:
//! - Reading the wall clock
//! - Writing the snapshot after every mutation
//! - Diffing presentation hints into loop-sound and indicator effects
//! - Remembering whether the last pause came from idle detection
//! - Driving `tick` once per second with `tokio::time::interval`

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::store::SnapshotStore;
use crate::timer::{Effect, Presentation, TimerMachine};
use crate::types::{Settings, TimerMode, TimerState};

/// Source of epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Owns the timer state for the daemon.
///
/// Every public operation is infallible: persistence and effect delivery
/// failures are logged and never roll back a state change.
pub struct TimerEngine {
    /// The state machine
    machine: TimerMachine,
    /// Snapshot persistence (none in tests)
    store: Option<SnapshotStore>,
    /// Effect sender channel
    effect_tx: mpsc::UnboundedSender<Effect>,
    /// Hints last published
    presented: Option<Presentation>,
    /// Whether the current pause was caused by idle detection
    paused_by_idle: bool,
    /// Wall clock
    clock: Clock,
}

impl TimerEngine {
    /// Creates an engine around `state` without persistence.
    pub fn new(state: TimerState, effect_tx: mpsc::UnboundedSender<Effect>) -> Self {
        Self {
            machine: TimerMachine::new(state),
            store: None,
            effect_tx,
            presented: None,
            paused_by_idle: false,
            clock: Arc::new(now_ms),
        }
    }

    /// Restores the engine from `store`, reconciling against the clock.
    ///
    /// A missing or corrupt snapshot yields the default state. The restored
    /// state is written back and the initial hints are published.
    pub fn restore(
        store: SnapshotStore,
        effect_tx: mpsc::UnboundedSender<Effect>,
        clock: Clock,
    ) -> Self {
        let snapshot = store.load_or_default();
        let (machine, effects) = TimerMachine::rehydrate(snapshot, clock());

        let state = machine.state();
        info!(
            "タイマー状態を復元しました: {} 残り{}秒 (完了{}回)",
            state.mode, state.time_left, state.sessions_completed
        );

        let mut engine = Self {
            machine,
            store: Some(store),
            effect_tx,
            presented: None,
            paused_by_idle: false,
            clock,
        };
        engine.commit(effects);
        engine
    }

    /// Attaches snapshot persistence.
    #[must_use]
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Returns a reference to the current timer state.
    pub fn get_state(&self) -> &TimerState {
        self.machine.state()
    }

    /// Returns the hints for the current state.
    pub fn presentation(&self) -> Presentation {
        Presentation::derive(self.machine.state())
    }

    /// Returns true if the timer is paused because the user went idle.
    pub fn is_paused_by_idle(&self) -> bool {
        self.paused_by_idle
    }

    /// Publishes the current hints even if nothing changed.
    pub fn publish(&mut self) {
        self.presented = None;
        self.commit(Vec::new());
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Advances the countdown by one second.
    pub fn tick(&mut self) {
        if !self.machine.state().is_active {
            return;
        }
        let now = self.now();
        self.apply(|machine| machine.tick(now));
    }

    /// Flips the running flag.
    pub fn toggle(&mut self) {
        self.paused_by_idle = false;
        let now = self.now();
        self.apply(|machine| machine.toggle(now));
    }

    /// Activates the timer if it is paused. Returns true if it was paused.
    pub fn start(&mut self) -> bool {
        if self.machine.state().is_active {
            return false;
        }
        self.toggle();
        true
    }

    /// Pauses the timer if it is running. Returns true if it was running.
    pub fn stop(&mut self) -> bool {
        if !self.machine.state().is_active {
            return false;
        }
        self.toggle();
        true
    }

    /// Restarts the current mode, paused.
    pub fn reset(&mut self) {
        self.paused_by_idle = false;
        self.apply(TimerMachine::reset);
    }

    /// Jumps to the next mode, paused.
    pub fn skip(&mut self) {
        self.paused_by_idle = false;
        let now = self.now();
        self.apply(|machine| machine.skip(now));
    }

    /// Adds seconds to the countdown.
    pub fn extend(&mut self, seconds: u32) {
        self.apply(|machine| machine.extend(seconds));
    }

    /// Switches mode explicitly, paused.
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.paused_by_idle = false;
        self.apply(|machine| machine.set_mode(mode));
    }

    /// Overrides one mode's duration.
    pub fn set_custom_time(&mut self, mode: TimerMode, minutes: u32) {
        self.apply(|machine| machine.set_custom_time(mode, minutes));
    }

    /// Replaces the settings, pausing the timer.
    pub fn update_settings(&mut self, settings: Settings) {
        self.paused_by_idle = false;
        self.apply(|machine| machine.update_settings(settings));
    }

    /// Handles the user going idle. Returns true if the timer was paused.
    ///
    /// Ignored unless idle pausing is enabled.
    pub fn idle_detected(&mut self) -> bool {
        let state = self.machine.state();
        if !state.settings.pause_when_idle || !state.is_active {
            return false;
        }
        let now = self.now();
        self.apply(|machine| machine.toggle(now));
        self.paused_by_idle = true;
        debug!("アイドル状態のため一時停止しました");
        true
    }

    /// Handles the user returning. Returns true if the timer was resumed.
    ///
    /// Only a pause caused by [`Self::idle_detected`] is undone.
    pub fn idle_cleared(&mut self) -> bool {
        let state = self.machine.state();
        if !state.settings.pause_when_idle || !self.paused_by_idle {
            return false;
        }
        self.paused_by_idle = false;
        if self.machine.state().is_active {
            return false;
        }
        let now = self.now();
        self.apply(|machine| machine.toggle(now));
        debug!("アイドル状態から復帰したため再開しました");
        true
    }

    // ------------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------------

    fn apply<F>(&mut self, op: F)
    where
        F: FnOnce(&mut TimerMachine) -> Vec<Effect>,
    {
        let before = self.machine.state().clone();
        let effects = op(&mut self.machine);
        if effects.is_empty() && self.machine.state() == &before {
            return;
        }
        self.commit(effects);
    }

    /// Persists the state, then sends the operation's effects followed by
    /// whatever the presentation diff requires.
    fn commit(&mut self, mut effects: Vec<Effect>) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(self.machine.state()) {
                warn!("状態の保存に失敗しました: {} ({})", e, e.suggestion());
            }
        }

        let current = self.presentation();
        let previous_loop = if effects.contains(&Effect::StopSound) {
            None
        } else {
            self.presented.as_ref().and_then(|p| p.loop_sound)
        };
        if current.loop_sound != previous_loop {
            effects.push(match current.loop_sound {
                Some(sound) => Effect::PlaySoundLoop(sound),
                None => Effect::StopSound,
            });
        }
        if self.presented.as_ref() != Some(&current) {
            effects.push(Effect::Present(current.clone()));
        }
        self.presented = Some(current);

        for effect in effects {
            if self.effect_tx.send(effect).is_err() {
                debug!("エフェクトの受信側が閉じています");
                break;
            }
        }
    }
}

// ============================================================================
// Ticker
// ============================================================================

/// Drives [`TimerEngine::tick`] once per second.
///
/// The lock is held only for the duration of each tick. Runs until the task
/// is aborted.
pub async fn run_ticker(engine: Arc<Mutex<TimerEngine>>) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of an interval completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        engine.lock().await.tick();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    use crate::timer::{Chime, LoopSound};

    const T0: i64 = 1_700_000_000_000;

    fn fixed_clock() -> (Clock, Arc<AtomicI64>) {
        let now = Arc::new(AtomicI64::new(T0));
        let handle = Arc::clone(&now);
        (Arc::new(move || handle.load(Ordering::SeqCst)), now)
    }

    fn create_engine_with(
        settings: Settings,
    ) -> (TimerEngine, mpsc::UnboundedReceiver<Effect>, Arc<AtomicI64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (clock, now) = fixed_clock();
        let engine = TimerEngine::new(TimerState::new(settings), tx).with_clock(clock);
        (engine, rx, now)
    }

    fn create_engine() -> (TimerEngine, mpsc::UnboundedReceiver<Effect>, Arc<AtomicI64>) {
        create_engine_with(Settings::default())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Effect>) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Ok(effect) = rx.try_recv() {
            effects.push(effect);
        }
        effects
    }

    fn without_present(effects: Vec<Effect>) -> Vec<Effect> {
        effects
            .into_iter()
            .filter(|e| !matches!(e, Effect::Present(_)))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Operation Tests
    // ------------------------------------------------------------------------

    mod engine_tests {
        use super::*;

        #[test]
        fn test_new_engine() {
            let (engine, mut rx, _) = create_engine();
            let state = engine.get_state();

            assert_eq!(state.mode, TimerMode::Work);
            assert_eq!(state.time_left, 1500);
            assert!(!state.is_active);
            assert!(drain(&mut rx).is_empty());
        }

        #[test]
        fn test_tick_inactive_sends_nothing() {
            let (mut engine, mut rx, _) = create_engine();
            engine.tick();
            assert!(drain(&mut rx).is_empty());
        }

        #[test]
        fn test_toggle_publishes_presentation() {
            let (mut engine, mut rx, _) = create_engine();
            engine.toggle();

            let effects = drain(&mut rx);
            assert_eq!(effects.len(), 1);
            match &effects[0] {
                Effect::Present(p) => assert!(p.status.is_active),
                other => panic!("Expected Present, got {:?}", other),
            }
        }

        #[test]
        fn test_tick_uses_clock() {
            let (mut engine, _rx, now) = create_engine();
            engine.start();
            now.store(T0 + 1000, Ordering::SeqCst);
            engine.tick();

            assert_eq!(engine.get_state().time_left, 1499);
            assert_eq!(engine.get_state().last_tick_timestamp, T0 + 1000);
        }

        #[test]
        fn test_start_and_stop_are_conditional() {
            let (mut engine, _rx, _) = create_engine();

            assert!(engine.start());
            assert!(!engine.start());
            assert!(engine.get_state().is_active);

            assert!(engine.stop());
            assert!(!engine.stop());
            assert!(!engine.get_state().is_active);
        }

        #[test]
        fn test_completion_effect_order() {
            let mut settings = Settings::default().with_work_minutes(1);
            settings.auto_start_breaks = true;
            let (mut engine, mut rx, _) = create_engine_with(settings);
            engine.start();
            drain(&mut rx);

            for _ in 0..60 {
                engine.tick();
            }

            let effects = without_present(drain(&mut rx));
            assert_eq!(effects[0], Effect::StopSound);
            assert!(matches!(effects[1], Effect::SaveSession(_)));
            assert_eq!(effects[2], Effect::PlaySound(Chime::Bell));
            assert!(matches!(effects[3], Effect::Notify(_)));
            assert_eq!(effects[4], Effect::PlaySoundLoop(LoopSound::Birds));
            assert_eq!(effects.len(), 5);
            assert_eq!(engine.get_state().mode, TimerMode::ShortBreak);
        }
    }

    // ------------------------------------------------------------------------
    // Loop Sound Diff Tests
    // ------------------------------------------------------------------------

    mod loop_sound_tests {
        use super::*;

        fn ticking() -> Settings {
            let mut settings = Settings::default();
            settings.enable_ticking = true;
            settings
        }

        #[test]
        fn test_activation_starts_ticking() {
            let (mut engine, mut rx, _) = create_engine_with(ticking());
            engine.toggle();
            assert_eq!(
                without_present(drain(&mut rx)),
                vec![Effect::PlaySoundLoop(LoopSound::Clock)]
            );
        }

        #[test]
        fn test_pause_stops_once() {
            let (mut engine, mut rx, _) = create_engine_with(ticking());
            engine.toggle();
            drain(&mut rx);

            engine.toggle();
            assert_eq!(without_present(drain(&mut rx)), vec![Effect::StopSound]);
        }

        #[test]
        fn test_ticks_do_not_restart_loop() {
            let (mut engine, mut rx, _) = create_engine_with(ticking());
            engine.toggle();
            drain(&mut rx);

            engine.tick();
            engine.tick();
            assert!(without_present(drain(&mut rx)).is_empty());
        }

        #[test]
        fn test_settings_change_stops_loop() {
            let (mut engine, mut rx, _) = create_engine_with(ticking());
            engine.toggle();
            drain(&mut rx);

            engine.update_settings(ticking().with_work_minutes(50));
            assert_eq!(without_present(drain(&mut rx)), vec![Effect::StopSound]);
            assert_eq!(engine.get_state().time_left, 3000);
        }

        #[test]
        fn test_publish_resends_loop() {
            let (mut engine, mut rx, _) = create_engine_with(ticking());
            engine.toggle();
            drain(&mut rx);

            engine.publish();
            let effects = drain(&mut rx);
            assert!(effects.contains(&Effect::PlaySoundLoop(LoopSound::Clock)));
            assert!(effects.iter().any(|e| matches!(e, Effect::Present(_))));
        }
    }

    // ------------------------------------------------------------------------
    // Idle Tests
    // ------------------------------------------------------------------------

    mod idle_tests {
        use super::*;

        fn idle_enabled() -> Settings {
            let mut settings = Settings::default();
            settings.pause_when_idle = true;
            settings
        }

        #[test]
        fn test_idle_ignored_when_disabled() {
            let (mut engine, _rx, _) = create_engine();
            engine.start();
            assert!(!engine.idle_detected());
            assert!(engine.get_state().is_active);
        }

        #[test]
        fn test_idle_pause_and_resume() {
            let (mut engine, _rx, _) = create_engine_with(idle_enabled());
            engine.start();

            assert!(engine.idle_detected());
            assert!(!engine.get_state().is_active);
            assert!(engine.is_paused_by_idle());

            assert!(engine.idle_cleared());
            assert!(engine.get_state().is_active);
            assert!(!engine.is_paused_by_idle());
        }

        #[test]
        fn test_idle_clear_does_not_override_manual_pause() {
            let (mut engine, _rx, _) = create_engine_with(idle_enabled());
            engine.start();
            engine.stop();

            assert!(!engine.idle_detected());
            assert!(!engine.idle_cleared());
            assert!(!engine.get_state().is_active);
        }

        #[test]
        fn test_user_action_clears_idle_flag() {
            let (mut engine, _rx, _) = create_engine_with(idle_enabled());
            engine.start();
            engine.idle_detected();
            engine.reset();

            assert!(!engine.is_paused_by_idle());
            assert!(!engine.idle_cleared());
            assert!(!engine.get_state().is_active);
        }
    }

    // ------------------------------------------------------------------------
    // Persistence Tests
    // ------------------------------------------------------------------------

    mod persistence_tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_every_mutation_is_persisted() {
            let dir = TempDir::new().unwrap();
            let store = SnapshotStore::new(dir.path().join("state.json"));
            let (engine, _rx, _) = create_engine();
            let mut engine = engine.with_store(store.clone());

            engine.start();
            assert!(store.load().unwrap().unwrap().is_active);

            engine.extend(30);
            assert_eq!(store.load().unwrap().unwrap().time_left, 1530);
        }

        #[test]
        fn test_save_failure_does_not_stop_the_timer() {
            let dir = TempDir::new().unwrap();
            let blocker = dir.path().join("blocker");
            std::fs::write(&blocker, "not a directory").unwrap();
            // The parent is a regular file, so every save fails.
            let store = SnapshotStore::new(blocker.join("state.json"));

            let (engine, mut rx, now) =
                create_engine_with(Settings::default().with_work_minutes(1));
            let mut engine = engine.with_store(store.clone());

            engine.toggle();
            assert!(engine.get_state().is_active);
            assert!(drain(&mut rx).iter().any(|e| matches!(e, Effect::Present(_))));

            now.fetch_add(1000, Ordering::SeqCst);
            engine.tick();
            assert_eq!(engine.get_state().time_left, 59);

            for _ in 0..59 {
                engine.tick();
            }
            let effects = drain(&mut rx);
            assert_eq!(engine.get_state().mode, TimerMode::ShortBreak);
            assert_eq!(engine.get_state().sessions_completed, 1);
            assert!(effects.iter().any(|e| matches!(e, Effect::SaveSession(_))));
            assert!(effects.iter().any(|e| matches!(e, Effect::Notify(_))));
            assert!(store.save(engine.get_state()).is_err());
        }

        #[test]
        fn test_restore_rehydrates_and_records_expired_session() {
            let dir = TempDir::new().unwrap();
            let store = SnapshotStore::new(dir.path().join("state.json"));

            let mut snapshot = TimerState::default();
            snapshot.time_left = 10;
            snapshot.is_active = true;
            snapshot.last_tick_timestamp = T0 - 20_000;
            store.save(&snapshot).unwrap();

            let (tx, mut rx) = mpsc::unbounded_channel();
            let (clock, _) = fixed_clock();
            let engine = TimerEngine::restore(store.clone(), tx, clock);

            assert_eq!(engine.get_state().mode, TimerMode::ShortBreak);
            assert!(!engine.get_state().is_active);
            assert_eq!(store.load().unwrap().unwrap().mode, TimerMode::ShortBreak);

            let effects = drain(&mut rx);
            assert!(matches!(effects[0], Effect::SaveSession(_)));
            assert!(effects.iter().any(|e| matches!(e, Effect::Present(_))));
        }

        #[test]
        fn test_restore_running_timer_resumes_loop() {
            let dir = TempDir::new().unwrap();
            let store = SnapshotStore::new(dir.path().join("state.json"));

            let mut snapshot = TimerState::default();
            snapshot.mode = TimerMode::ShortBreak;
            snapshot.time_left = 100;
            snapshot.is_active = true;
            snapshot.last_tick_timestamp = T0 - 5_000;
            store.save(&snapshot).unwrap();

            let (tx, mut rx) = mpsc::unbounded_channel();
            let (clock, _) = fixed_clock();
            let engine = TimerEngine::restore(store, tx, clock);

            assert_eq!(engine.get_state().time_left, 95);
            assert!(drain(&mut rx).contains(&Effect::PlaySoundLoop(LoopSound::Birds)));
        }

        #[test]
        fn test_restore_corrupt_snapshot_uses_default() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("state.json");
            std::fs::write(&path, "garbage").unwrap();

            let (tx, _rx) = mpsc::unbounded_channel();
            let (clock, _) = fixed_clock();
            let engine = TimerEngine::restore(SnapshotStore::new(&path), tx, clock);

            assert_eq!(engine.get_state(), &TimerState::default());
        }

        #[test]
        fn test_dropped_receiver_does_not_panic() {
            let (mut engine, rx, _) = create_engine();
            drop(rx);
            engine.toggle();
            assert!(engine.get_state().is_active);
        }
    }

    // ------------------------------------------------------------------------
    // Ticker Tests
    // ------------------------------------------------------------------------

    mod ticker_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_ticker_decrements_running_timer() {
            let (mut engine, _rx, _) = create_engine();
            engine.start();
            let engine = Arc::new(Mutex::new(engine));

            let handle = tokio::spawn(run_ticker(Arc::clone(&engine)));
            tokio::time::sleep(Duration::from_millis(3500)).await;
            handle.abort();

            assert_eq!(engine.lock().await.get_state().time_left, 1497);
        }

        #[tokio::test(start_paused = true)]
        async fn test_ticker_releases_lock_between_ticks() {
            let (engine, _rx, _) = create_engine();
            let engine = Arc::new(Mutex::new(engine));

            let handle = tokio::spawn(run_ticker(Arc::clone(&engine)));
            tokio::time::sleep(Duration::from_millis(1500)).await;

            engine.lock().await.start();
            tokio::time::sleep(Duration::from_millis(1000)).await;
            handle.abort();

            assert_eq!(engine.lock().await.get_state().time_left, 1499);
        }
    }
}
