//! Reconciles a persisted snapshot with wall-clock time at start-up.

use crate::types::TimerState;

use super::effect::Effect;
use super::machine::{advance, completed};

/// Restores `snapshot` as of `now_ms`.
///
/// - Inactive snapshots, or ones that never ticked, come back verbatim.
/// - A running countdown loses the whole seconds elapsed since its last tick.
/// - A countdown that expired while the process was down performs exactly one
///   transition, comes back paused and records the expired session. Elapsed
///   time beyond that first expiry is discarded.
pub fn rehydrate(mut snapshot: TimerState, now_ms: i64) -> (TimerState, Vec<Effect>) {
    snapshot.settings = snapshot.settings.sanitized();

    if !snapshot.is_active || snapshot.last_tick_timestamp == 0 {
        return (snapshot, Vec::new());
    }

    // A clock that moved backwards counts as no elapsed time.
    let elapsed_seconds = now_ms.saturating_sub(snapshot.last_tick_timestamp).max(0) / 1000;
    let projected = i64::from(snapshot.time_left) - elapsed_seconds;

    if projected > 0 {
        snapshot.time_left = projected as u32;
        snapshot.last_tick_timestamp = now_ms;
        return (snapshot, Vec::new());
    }

    let ended = advance(&mut snapshot);
    snapshot.is_active = false;
    snapshot.last_tick_timestamp = now_ms;

    let session = completed(ended, &snapshot.settings);
    (snapshot, vec![Effect::SaveSession(session)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::effect::CompletedSession;
    use crate::types::{Settings, TimerMode};

    const NOW: i64 = 1_700_000_000_000;

    fn active_snapshot(time_left: u32, last_tick: i64) -> TimerState {
        let mut state = TimerState::default();
        state.time_left = time_left;
        state.is_active = true;
        state.last_tick_timestamp = last_tick;
        state
    }

    #[test]
    fn test_inactive_snapshot_is_identity() {
        let mut snapshot = TimerState::default();
        snapshot.time_left = 321;
        snapshot.sessions_completed = 7;
        snapshot.last_tick_timestamp = NOW - 3_600_000;

        let (restored, effects) = rehydrate(snapshot.clone(), NOW);

        assert_eq!(restored, snapshot);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_roundtrip_through_json_without_elapsed_time() {
        let mut snapshot = TimerState::default();
        snapshot.mode = TimerMode::ShortBreak;
        snapshot.time_left = 200;
        snapshot.sessions_completed = 1;

        let json = serde_json::to_string(&snapshot).unwrap();
        let loaded: TimerState = serde_json::from_str(&json).unwrap();
        let (restored, _) = rehydrate(loaded, NOW);

        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_never_ticked_snapshot_is_identity() {
        let snapshot = active_snapshot(500, 0);
        let (restored, effects) = rehydrate(snapshot.clone(), NOW);
        assert_eq!(restored, snapshot);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_running_countdown_catches_up() {
        let (restored, effects) = rehydrate(active_snapshot(10, NOW - 5000), NOW);

        assert_eq!(restored.time_left, 5);
        assert!(restored.is_active);
        assert_eq!(restored.last_tick_timestamp, NOW);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_partial_seconds_are_floored() {
        let (restored, _) = rehydrate(active_snapshot(10, NOW - 2999), NOW);
        assert_eq!(restored.time_left, 8);
    }

    #[test]
    fn test_expired_work_performs_one_transition() {
        let snapshot = active_snapshot(10, NOW - 20_000);

        let (restored, effects) = rehydrate(snapshot, NOW);

        assert_eq!(restored.mode, TimerMode::ShortBreak);
        assert_eq!(restored.sessions_completed, 1);
        assert!(!restored.is_active);
        assert_eq!(restored.time_left, 5 * 60);
        assert_eq!(
            effects,
            vec![Effect::SaveSession(CompletedSession {
                mode: TimerMode::Work,
                elapsed_seconds: 1500,
            })]
        );
    }

    #[test]
    fn test_exact_expiry_transitions() {
        let (restored, _) = rehydrate(active_snapshot(10, NOW - 10_000), NOW);
        assert_eq!(restored.mode, TimerMode::ShortBreak);
    }

    #[test]
    fn test_multiple_cycles_collapse_into_one() {
        let (restored, effects) = rehydrate(active_snapshot(10, NOW - 86_400_000), NOW);

        assert_eq!(restored.mode, TimerMode::ShortBreak);
        assert_eq!(restored.sessions_completed, 1);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_expiry_ignores_auto_start() {
        let mut snapshot = active_snapshot(10, NOW - 20_000);
        snapshot.settings = Settings {
            auto_start_breaks: true,
            auto_start_work: true,
            ..Settings::default()
        };

        let (restored, _) = rehydrate(snapshot, NOW);
        assert!(!restored.is_active);
    }

    #[test]
    fn test_expired_break_returns_to_work() {
        let mut snapshot = active_snapshot(3, NOW - 60_000);
        snapshot.mode = TimerMode::LongBreak;
        snapshot.sessions_completed = 4;

        let (restored, effects) = rehydrate(snapshot, NOW);

        assert_eq!(restored.mode, TimerMode::Work);
        assert_eq!(restored.sessions_completed, 4);
        assert_eq!(restored.time_left, 1500);
        assert_eq!(
            effects,
            vec![Effect::SaveSession(CompletedSession {
                mode: TimerMode::LongBreak,
                elapsed_seconds: 900,
            })]
        );
    }

    #[test]
    fn test_long_break_routing_on_expiry() {
        let mut snapshot = active_snapshot(10, NOW - 20_000);
        snapshot.sessions_completed = 3;

        let (restored, _) = rehydrate(snapshot, NOW);

        assert_eq!(restored.mode, TimerMode::LongBreak);
        assert_eq!(restored.sessions_completed, 4);
    }

    #[test]
    fn test_clock_moved_backwards() {
        let (restored, effects) = rehydrate(active_snapshot(10, NOW + 5000), NOW);
        assert_eq!(restored.time_left, 10);
        assert!(restored.is_active);
        assert!(effects.is_empty());
    }
}
