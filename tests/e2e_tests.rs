//! End-to-End Tests for Pomodoro Timer CLI.
//!
//! These tests verify complete user workflows:
//! - Full work and break cycle driven by ticks
//! - Auto-start cycle
//! - Long break after the configured interval
//! - The `pomodoro` binary: help, completions, argument errors
//! - A real daemon process surviving a crash and catching up on restart

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

use pomodoro_keeper::cli::IpcClient;
use pomodoro_keeper::daemon::{socket_path_in, IpcServer, RequestHandler, TimerEngine};
use pomodoro_keeper::menubar::StatusBoard;
use pomodoro_keeper::store::SnapshotStore;
use pomodoro_keeper::timer::Effect;
use pomodoro_keeper::types::{Settings, TimerMode, TimerState};

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates a temporary socket path for testing.
fn create_temp_socket_path() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("e2e_test.sock");
    // Keep the directory so it's not deleted
    std::mem::forget(dir);
    path
}

/// Creates a fast configuration for quick tests (1-minute sessions).
fn create_fast_settings() -> Settings {
    Settings::default()
        .with_work_minutes(1)
        .with_short_break_minutes(1)
        .with_long_break_minutes(2)
}

/// Serves an in-process engine and returns a client for it.
fn serve_engine(
    settings: Settings,
) -> (
    IpcClient,
    Arc<Mutex<TimerEngine>>,
    mpsc::UnboundedReceiver<Effect>,
    tokio::task::JoinHandle<()>,
) {
    let socket_path = create_temp_socket_path();
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Arc::new(Mutex::new(TimerEngine::new(TimerState::new(settings), tx)));
    let handler = RequestHandler::new(Arc::clone(&engine), Arc::new(StatusBoard::new()));

    let server = IpcServer::new(&socket_path).unwrap();
    let handle = tokio::spawn(server.serve(Arc::new(handler)));

    (IpcClient::with_socket_path(socket_path), engine, rx, handle)
}

/// Ticks the engine until the current mode runs out.
async fn run_out(engine: &Arc<Mutex<TimerEngine>>) {
    let mut engine = engine.lock().await;
    let seconds = engine.get_state().time_left;
    for _ in 0..seconds {
        engine.tick();
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Effect>) -> Vec<Effect> {
    let mut effects = Vec::new();
    while let Ok(effect) = rx.try_recv() {
        effects.push(effect);
    }
    effects
}

/// `pomodoro` bound to a private data directory.
fn pomodoro(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pomodoro").unwrap();
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

/// A daemon process killed when dropped.
struct DaemonProcess {
    child: Child,
}

impl DaemonProcess {
    fn spawn(data_dir: &Path) -> Self {
        let child = pomodoro(data_dir)
            .args(["daemon", "--no-sound", "--no-notify"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let daemon = Self { child };
        daemon.wait_ready(data_dir);
        daemon
    }

    fn wait_ready(&self, data_dir: &Path) {
        for _ in 0..50 {
            if socket_path_in(data_dir).exists() && pomodoro(data_dir).arg("status").ok().is_ok() {
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        panic!("daemon did not start");
    }

    /// Simulates a crash: SIGKILL, no shutdown path runs.
    fn crash(mut self) {
        self.child.kill().unwrap();
        self.child.wait().unwrap();
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================================
// In-process Workflows
// ============================================================================

/// 完全なポモドーロサイクル
///
/// テスト手順:
/// 1. `pomodoro start`
/// 2. 作業完了まで待機
/// 3. 短い休憩に移行し一時停止していることを確認
/// 4. 休憩を開始し完了まで待機
/// 期待結果: 作業に戻り、完了セッション数が1
#[tokio::test]
async fn test_complete_pomodoro_cycle() {
    let (client, engine, mut rx, server) = serve_engine(create_fast_settings());

    let response = client.start().await.unwrap();
    assert_eq!(response.message, "タイマーを開始しました");

    run_out(&engine).await;
    let effects = drain(&mut rx);
    assert!(effects.iter().any(|e| matches!(e, Effect::SaveSession(s) if s.mode == TimerMode::Work)));
    assert!(effects.iter().any(|e| matches!(e, Effect::Notify(_))));

    let data = client.status().await.unwrap().data.unwrap();
    assert_eq!(data.mode, Some(TimerMode::ShortBreak));
    assert_eq!(data.is_active, Some(false));
    assert_eq!(data.sessions_completed, Some(1));
    assert_eq!(data.title, Some("⏸ 01:00".to_string()));

    client.start().await.unwrap();
    run_out(&engine).await;

    let data = client.status().await.unwrap().data.unwrap();
    assert_eq!(data.mode, Some(TimerMode::Work));
    assert_eq!(data.sessions_completed, Some(1));
    assert_eq!(data.time_left, Some(60));

    server.abort();
}

/// 自動開始サイクル
///
/// 期待結果: 作業完了後に休憩が、休憩完了後に作業が自動で開始される
#[tokio::test]
async fn test_auto_start_cycle() {
    let mut settings = create_fast_settings();
    settings.auto_start_breaks = true;
    settings.auto_start_work = true;
    let (client, engine, _rx, server) = serve_engine(settings);

    client.start().await.unwrap();
    run_out(&engine).await;

    let data = client.status().await.unwrap().data.unwrap();
    assert_eq!(data.mode, Some(TimerMode::ShortBreak));
    assert_eq!(data.is_active, Some(true));

    run_out(&engine).await;

    let data = client.status().await.unwrap().data.unwrap();
    assert_eq!(data.mode, Some(TimerMode::Work));
    assert_eq!(data.is_active, Some(true));

    server.abort();
}

/// 4ポモドーロ後の長い休憩
#[tokio::test]
async fn test_long_break_after_four_pomodoros() {
    let mut settings = create_fast_settings();
    settings.auto_start_breaks = true;
    settings.auto_start_work = true;
    let (client, engine, _rx, server) = serve_engine(settings);

    client.start().await.unwrap();
    for _ in 0..7 {
        run_out(&engine).await;
    }

    let data = client.status().await.unwrap().data.unwrap();
    assert_eq!(data.mode, Some(TimerMode::LongBreak));
    assert_eq!(data.sessions_completed, Some(4));
    assert_eq!(data.time_left, Some(120));

    server.abort();
}

/// 一時停止と再開を繰り返しても残り時間が保たれる
#[tokio::test]
async fn test_multiple_pause_resume() {
    let (client, engine, _rx, server) = serve_engine(Settings::default());

    for _ in 0..3 {
        client.toggle().await.unwrap();
        engine.lock().await.tick();
        client.toggle().await.unwrap();
        // Paused ticks are ignored.
        engine.lock().await.tick();
    }

    let data = client.status().await.unwrap().data.unwrap();
    assert_eq!(data.time_left, Some(1497));
    assert_eq!(data.is_active, Some(false));

    server.abort();
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("pomodoro")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("toggle"))
        .stdout(predicate::str::contains("stats"));
}

#[test]
fn test_completions_bash() {
    Command::cargo_bin("pomodoro")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pomodoro"));
}

#[test]
fn test_invalid_mode_is_rejected() {
    Command::cargo_bin("pomodoro")
        .unwrap()
        .args(["mode", "nap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nap"));
}

#[test]
fn test_status_without_daemon_fails() {
    let dir = TempDir::new().unwrap();

    pomodoro(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Daemonに接続できません"));
}

// ============================================================================
// Daemon Process
// ============================================================================

/// クラッシュからの復旧
///
/// テスト手順:
/// 1. Daemonを起動し `pomodoro start`
/// 2. DaemonをSIGKILLで強制終了
/// 3. Daemonを再起動
/// 期待結果: タイマーは実行中のまま復元される
#[test]
fn test_daemon_restores_running_timer_after_crash() {
    let dir = TempDir::new().unwrap();

    let daemon = DaemonProcess::spawn(dir.path());
    pomodoro(dir.path())
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("タイマーを開始しました"));
    pomodoro(dir.path())
        .args(["status", "--title"])
        .assert()
        .success()
        .stdout(predicate::str::contains("🍅"));

    daemon.crash();

    let _daemon = DaemonProcess::spawn(dir.path());
    pomodoro(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("作業"))
        .stdout(predicate::str::contains("実行中"));
}

/// 停止中に期限切れになった作業セッションは再起動時に1回だけ記録される
#[test]
fn test_daemon_records_session_expired_while_down() {
    let dir = TempDir::new().unwrap();

    let mut snapshot = TimerState::new(Settings::default());
    snapshot.is_active = true;
    snapshot.time_left = 100;
    snapshot.last_tick_timestamp = chrono::Utc::now().timestamp_millis() - 2 * 3_600_000;
    SnapshotStore::new(dir.path().join("state.json"))
        .save(&snapshot)
        .unwrap();

    let _daemon = DaemonProcess::spawn(dir.path());

    pomodoro(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("短い休憩"))
        .stdout(predicate::str::contains("一時停止中"));

    pomodoro(dir.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("合計: 1回 / 25.0分"));
}

#[test]
fn test_settings_persist_across_restart() {
    let dir = TempDir::new().unwrap();

    {
        let _daemon = DaemonProcess::spawn(dir.path());
        pomodoro(dir.path())
            .args(["settings", "--work", "45"])
            .assert()
            .success();
    }

    let _daemon = DaemonProcess::spawn(dir.path());
    pomodoro(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("45:00"));
}
